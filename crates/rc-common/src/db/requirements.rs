use deadpool_postgres::PoolError;
use tokio_postgres::Error as PgError;
use tokio_postgres::Row;
use tracing::instrument;

use crate::Requirement;
use crate::db::PgPool;
use crate::db::util::{TimedClientExt, json_string_list};

#[derive(Debug, thiserror::Error)]
pub enum RequirementFetchError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
}

const REQUIREMENT_COLUMNS: &str = "id, employer_id, title, description, required_skills, \
    additional_skills, excluded_skills, include_locations, exclude_locations, designations, \
    experience_min, experience_max, salary_min, salary_max, currency, education, institute, \
    current_company, notice_period_max_days, remote_preference, gender_preferences, \
    active_within_days, include_willing_to_relocate, include_not_mentioned_values, metadata";

fn row_to_requirement(row: &Row) -> Result<Requirement, PgError> {
    Ok(Requirement {
        id: row.try_get("id")?,
        employer_id: row.try_get("employer_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        required_skills: json_string_list(row.try_get("required_skills")?),
        additional_skills: json_string_list(row.try_get("additional_skills")?),
        excluded_skills: json_string_list(row.try_get("excluded_skills")?),
        include_locations: json_string_list(row.try_get("include_locations")?),
        exclude_locations: json_string_list(row.try_get("exclude_locations")?),
        designations: json_string_list(row.try_get("designations")?),
        experience_min: row.try_get("experience_min")?,
        experience_max: row.try_get("experience_max")?,
        salary_min: row.try_get("salary_min")?,
        salary_max: row.try_get("salary_max")?,
        currency: row.try_get("currency")?,
        education: row.try_get("education")?,
        institute: row.try_get("institute")?,
        current_company: row.try_get("current_company")?,
        notice_period_max_days: row.try_get("notice_period_max_days")?,
        remote_preference: row.try_get("remote_preference")?,
        gender_preferences: json_string_list(row.try_get("gender_preferences")?),
        active_within_days: row.try_get("active_within_days")?,
        include_willing_to_relocate: row.try_get("include_willing_to_relocate")?,
        include_not_mentioned_values: row.try_get("include_not_mentioned_values")?,
        metadata: row.try_get("metadata")?,
    })
}

#[instrument(skip(pool))]
pub async fn fetch_requirement(
    pool: &PgPool,
    id: i64,
) -> Result<Option<Requirement>, RequirementFetchError> {
    let client = pool.get().await?;
    let query = format!("SELECT {REQUIREMENT_COLUMNS} FROM hire.requirements WHERE id = $1");

    let row = client
        .timed_query_opt_cached(&query, &[&id], "requirements.fetch")
        .await?;

    Ok(row.map(|r| row_to_requirement(&r)).transpose()?)
}
