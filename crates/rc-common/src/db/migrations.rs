use deadpool_postgres::PoolError;
use thiserror::Error;
use tokio_postgres::Error as PgError;
use tracing::{info, instrument};

use crate::db::{DbPoolError, PgPool};
use crate::schema;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("failed to run migration: {0}")]
    Postgres(#[from] PgError),
    #[error("failed to build pool: {0}")]
    PoolBuild(#[from] DbPoolError),
}

struct Migration {
    id: i32,
    description: &'static str,
    sql: String,
}

/// Table creation is guarded so a database where the profile service already
/// owns hire.candidates keeps its copy untouched.
fn table_bootstrap(table: &str, ddl: &str) -> String {
    format!(
        "DO $$\n\
         BEGIN\n\
             IF NOT EXISTS (\n\
                 SELECT 1 FROM information_schema.tables\n\
                 WHERE table_schema = 'hire' AND table_name = '{table}'\n\
             ) THEN\n\
                 {ddl}\n\
             END IF;\n\
         END $$;\n"
    )
}

fn migrations() -> Vec<Migration> {
    let bootstrap = [
        ("candidates", schema::CANDIDATES_DDL),
        ("requirements", schema::REQUIREMENTS_DDL),
        ("work_history", schema::WORK_HISTORY_DDL),
        ("requirement_views", schema::REQUIREMENT_VIEWS_DDL),
        ("ats_scores", schema::ATS_SCORES_DDL),
        ("view_quotas", schema::ENGAGEMENT_DDL),
    ]
    .map(|(table, ddl)| table_bootstrap(table, ddl))
    .concat();

    vec![Migration {
        id: 1,
        description: "bootstrap hire schema tables",
        sql: bootstrap,
    }]
}

#[instrument(skip(pool))]
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    let mut client = pool.get().await?;
    client
        .batch_execute(
            "CREATE SCHEMA IF NOT EXISTS hire;
             CREATE TABLE IF NOT EXISTS hire.schema_migrations (
                id INTEGER PRIMARY KEY,
                description TEXT NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
             );",
        )
        .await?;

    for migration in migrations() {
        let already_applied: bool = client
            .query_one(
                "SELECT EXISTS (SELECT 1 FROM hire.schema_migrations WHERE id = $1)",
                &[&migration.id],
            )
            .await?
            .get(0);

        if already_applied {
            continue;
        }

        let tx = client.transaction().await?;
        tx.batch_execute(&migration.sql).await?;
        tx.execute(
            "INSERT INTO hire.schema_migrations (id, description) VALUES ($1, $2)",
            &[&migration.id, &migration.description],
        )
        .await?;
        tx.commit().await?;

        info!(
            id = migration.id,
            description = migration.description,
            "applied migration"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migration_ids_are_unique_and_ascending() {
        let migrations = migrations();
        for pair in migrations.windows(2) {
            assert!(pair[0].id < pair[1].id);
        }
    }

    #[test]
    fn bootstrap_guards_every_table() {
        let migrations = migrations();
        let bootstrap = &migrations[0].sql;

        for table in [
            "candidates",
            "requirements",
            "work_history",
            "requirement_views",
            "ats_scores",
            "view_quotas",
        ] {
            assert!(
                bootstrap.contains(&format!("table_name = '{table}'")),
                "missing guard for {table}"
            );
        }
    }
}
