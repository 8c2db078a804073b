use chrono::{DateTime, Duration, Utc};
use deadpool_postgres::PoolError;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Error as PgError, Row};
use tracing::instrument;

use crate::Candidate;
use crate::db::PgPool;
use crate::db::util::{TimedClientExt, json_string_list};
use crate::matching::predicate::{
    FlagField, ListField, NumberField, Predicate, PredicateSet, TextField,
};

#[derive(Debug, thiserror::Error)]
pub enum CandidateFetchError {
    #[error("failed to get postgres connection: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] PgError),
}

const CANDIDATE_COLUMNS: &str = "id, full_name, kind, account_status, profile_active, \
    current_location, preferred_locations, willing_to_relocate, skills, key_skills, headline, \
    summary, designation, education, institute, preferred_work_mode, experience_years, \
    current_salary, expected_salary, notice_period_days, gender, profile_completion, \
    email_verified, phone_verified, last_login_at, profile_updated_at";

/// Columns the count path needs: enough for the post-filter sweep, nothing
/// the scorer would want.
const SLIM_COLUMNS: &str = "id, skills, key_skills, headline, summary, designation";

fn text_column(field: TextField) -> &'static str {
    match field {
        TextField::Kind => "kind",
        TextField::AccountStatus => "account_status",
        TextField::CurrentLocation => "current_location",
        TextField::Headline => "headline",
        TextField::Summary => "summary",
        TextField::Designation => "designation",
        TextField::Education => "education",
        TextField::Institute => "institute",
        TextField::PreferredWorkMode => "preferred_work_mode",
        TextField::Gender => "gender",
    }
}

fn list_column(field: ListField) -> &'static str {
    match field {
        ListField::Skills => "skills",
        ListField::KeySkills => "key_skills",
        ListField::PreferredLocations => "preferred_locations",
    }
}

fn number_column(field: NumberField) -> &'static str {
    match field {
        NumberField::ExperienceYears => "experience_years",
        NumberField::ExpectedSalary => "expected_salary",
        NumberField::NoticePeriodDays => "notice_period_days",
    }
}

fn flag_column(field: FlagField) -> &'static str {
    match field {
        FlagField::ProfileActive => "profile_active",
        FlagField::WillingToRelocate => "willing_to_relocate",
    }
}

pub(crate) fn like_pattern(value: &str) -> String {
    format!("%{}%", value.to_lowercase())
}

struct SqlBuilder {
    sql: String,
    values: Vec<Box<dyn ToSql + Sync + Send>>,
    now: DateTime<Utc>,
}

impl SqlBuilder {
    fn bind(&mut self, value: Box<dyn ToSql + Sync + Send>) -> usize {
        self.values.push(value);
        self.values.len()
    }

    fn render(&mut self, predicate: &Predicate) {
        match predicate {
            Predicate::And(children) => self.render_group(children, " AND ", "TRUE"),
            Predicate::Or(children) => self.render_group(children, " OR ", "FALSE"),
            Predicate::Not(inner) => {
                self.sql.push_str("(NOT ");
                self.render(inner);
                self.sql.push(')');
            }
            Predicate::TextContains(field, value) => {
                let slot = self.bind(Box::new(like_pattern(value)));
                self.sql
                    .push_str(&format!("{} ILIKE ${slot}", text_column(*field)));
            }
            Predicate::TextEquals(field, value) => {
                let slot = self.bind(Box::new(value.to_lowercase()));
                self.sql
                    .push_str(&format!("LOWER({}) = ${slot}", text_column(*field)));
            }
            Predicate::ListAnyContains(field, value) => {
                let slot = self.bind(Box::new(like_pattern(value)));
                self.sql.push_str(&format!(
                    "EXISTS (SELECT 1 FROM jsonb_array_elements_text({}) AS elem(value) \
                     WHERE elem.value ILIKE ${slot})",
                    list_column(*field)
                ));
            }
            Predicate::NumberAtLeast(field, value) => {
                let slot = self.bind(Box::new(*value));
                self.sql
                    .push_str(&format!("{} >= ${slot}::float8", number_column(*field)));
            }
            Predicate::NumberAtMost(field, value) => {
                let slot = self.bind(Box::new(*value));
                self.sql
                    .push_str(&format!("{} <= ${slot}::float8", number_column(*field)));
            }
            Predicate::NumberUnset(field) => {
                self.sql
                    .push_str(&format!("{} IS NULL", number_column(*field)));
            }
            Predicate::Flag(field, expected) => {
                let slot = self.bind(Box::new(*expected));
                self.sql
                    .push_str(&format!("{} = ${slot}", flag_column(*field)));
            }
            Predicate::ActiveWithin(days) => {
                let cutoff = self.now - Duration::days(i64::from(*days));
                let slot = self.bind(Box::new(cutoff));
                self.sql.push_str(&format!("last_login_at >= ${slot}"));
            }
        }
    }

    fn render_group(&mut self, children: &[Predicate], joiner: &str, empty: &str) {
        if children.is_empty() {
            self.sql.push_str(empty);
            return;
        }

        self.sql.push('(');
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(joiner);
            }
            self.render(child);
        }
        self.sql.push(')');
    }
}

/// Render a predicate set into a WHERE expression plus its ordered params.
/// An empty set renders TRUE; the guard against unconstrained scans lives in
/// the engine, not here.
pub fn render_where(
    set: &PredicateSet,
    now: DateTime<Utc>,
) -> (String, Vec<Box<dyn ToSql + Sync + Send>>) {
    let mut builder = SqlBuilder {
        sql: String::new(),
        values: Vec::new(),
        now,
    };

    if set.clauses.is_empty() {
        builder.sql.push_str("TRUE");
    }
    for (i, (_, predicate)) in set.clauses.iter().enumerate() {
        if i > 0 {
            builder.sql.push_str(" AND ");
        }
        builder.render(predicate);
    }

    (builder.sql, builder.values)
}

fn borrow_params(values: &[Box<dyn ToSql + Sync + Send>]) -> Vec<&(dyn ToSql + Sync)> {
    values
        .iter()
        .map(|v| v.as_ref() as &(dyn ToSql + Sync))
        .collect()
}

pub(crate) fn row_to_candidate(row: &Row) -> Result<Candidate, PgError> {
    Ok(Candidate {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        kind: row.try_get("kind")?,
        account_status: row.try_get("account_status")?,
        profile_active: row.try_get("profile_active")?,
        current_location: row.try_get("current_location")?,
        preferred_locations: json_string_list(row.try_get("preferred_locations")?),
        willing_to_relocate: row.try_get("willing_to_relocate")?,
        skills: json_string_list(row.try_get("skills")?),
        key_skills: json_string_list(row.try_get("key_skills")?),
        headline: row.try_get("headline")?,
        summary: row.try_get("summary")?,
        designation: row.try_get("designation")?,
        education: row.try_get("education")?,
        institute: row.try_get("institute")?,
        preferred_work_mode: row.try_get("preferred_work_mode")?,
        experience_years: row.try_get("experience_years")?,
        current_salary: row.try_get("current_salary")?,
        expected_salary: row.try_get("expected_salary")?,
        notice_period_days: row.try_get("notice_period_days")?,
        gender: row.try_get("gender")?,
        profile_completion: row.try_get("profile_completion")?,
        email_verified: row.try_get("email_verified")?,
        phone_verified: row.try_get("phone_verified")?,
        last_login_at: row.try_get("last_login_at")?,
        profile_updated_at: row.try_get("profile_updated_at")?,
    })
}

fn row_to_slim_candidate(row: &Row) -> Result<Candidate, PgError> {
    Ok(Candidate {
        id: row.try_get("id")?,
        skills: json_string_list(row.try_get("skills")?),
        key_skills: json_string_list(row.try_get("key_skills")?),
        headline: row.try_get("headline")?,
        summary: row.try_get("summary")?,
        designation: row.try_get("designation")?,
        ..Candidate::default()
    })
}

/// Execute a predicate set and return full rows, capped and in stable id
/// order. Ranking happens in the engine after the post-filter.
#[instrument(skip(pool, predicates))]
pub async fn fetch_matching(
    pool: &PgPool,
    predicates: &PredicateSet,
    now: DateTime<Utc>,
    scan_cap: i64,
) -> Result<Vec<Candidate>, CandidateFetchError> {
    let client = pool.get().await?;

    let (where_sql, mut values) = render_where(predicates, now);
    let query = format!(
        "SELECT {CANDIDATE_COLUMNS} FROM hire.candidates \
         WHERE {where_sql} ORDER BY id LIMIT ${}",
        values.len() + 1
    );
    values.push(Box::new(scan_cap));

    let params = borrow_params(&values);
    let rows = client
        .timed_query(&query, &params, "candidates.fetch_matching")
        .await?;

    Ok(rows
        .iter()
        .map(row_to_candidate)
        .collect::<Result<Vec<_>, _>>()?)
}

/// Count-path variant of [`fetch_matching`]: same WHERE, slim projection.
#[instrument(skip(pool, predicates))]
pub async fn fetch_matching_slim(
    pool: &PgPool,
    predicates: &PredicateSet,
    now: DateTime<Utc>,
    scan_cap: i64,
) -> Result<Vec<Candidate>, CandidateFetchError> {
    let client = pool.get().await?;

    let (where_sql, mut values) = render_where(predicates, now);
    let query = format!(
        "SELECT {SLIM_COLUMNS} FROM hire.candidates \
         WHERE {where_sql} ORDER BY id LIMIT ${}",
        values.len() + 1
    );
    values.push(Box::new(scan_cap));

    let params = borrow_params(&values);
    let rows = client
        .timed_query(&query, &params, "candidates.fetch_matching_slim")
        .await?;

    Ok(rows
        .iter()
        .map(row_to_slim_candidate)
        .collect::<Result<Vec<_>, _>>()?)
}

#[instrument(skip(pool))]
pub async fn fetch_by_ids(
    pool: &PgPool,
    ids: &[i64],
) -> Result<Vec<Candidate>, CandidateFetchError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let client = pool.get().await?;
    let query =
        format!("SELECT {CANDIDATE_COLUMNS} FROM hire.candidates WHERE id = ANY($1) ORDER BY id");

    let rows = client
        .timed_query_cached(&query, &[&ids], "candidates.fetch_by_ids")
        .await?;

    Ok(rows
        .iter()
        .map(row_to_candidate)
        .collect::<Result<Vec<_>, _>>()?)
}
