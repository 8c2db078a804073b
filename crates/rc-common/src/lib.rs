pub mod api;
pub mod ats;
pub mod db;
pub mod logging;
pub mod matching;
pub mod run_id;
pub mod schema;
pub mod skills;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

// Commonly used data models for the matching engine. Requirements and
// candidates are owned by other services; the engine reads them only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Requirement {
    pub id: i64,
    pub employer_id: Option<i64>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub required_skills: Vec<String>,
    pub additional_skills: Vec<String>,
    pub excluded_skills: Vec<String>,
    pub include_locations: Vec<String>,
    pub exclude_locations: Vec<String>,
    pub designations: Vec<String>,
    pub experience_min: Option<f64>,
    pub experience_max: Option<f64>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub currency: Option<String>,
    pub education: Option<String>,
    pub institute: Option<String>,
    pub current_company: Option<String>,
    pub notice_period_max_days: Option<i32>,
    pub remote_preference: Option<String>,
    pub gender_preferences: Vec<String>,
    pub active_within_days: Option<i32>,
    pub include_willing_to_relocate: bool,
    pub include_not_mentioned_values: bool,
    /// Flexible bag for fields that predate their typed columns. Criteria
    /// normalization resolves current and legacy key spellings from here.
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidate {
    pub id: i64,
    pub full_name: Option<String>,
    pub kind: Option<String>,
    pub account_status: Option<String>,
    pub profile_active: bool,
    pub current_location: Option<String>,
    pub preferred_locations: Vec<String>,
    pub willing_to_relocate: bool,
    pub skills: Vec<String>,
    pub key_skills: Vec<String>,
    pub headline: Option<String>,
    pub summary: Option<String>,
    pub designation: Option<String>,
    pub education: Option<String>,
    pub institute: Option<String>,
    pub preferred_work_mode: Option<String>,
    pub experience_years: Option<f64>,
    pub current_salary: Option<f64>,
    pub expected_salary: Option<f64>,
    pub notice_period_days: Option<i32>,
    pub gender: Option<String>,
    pub profile_completion: Option<i32>,
    pub email_verified: bool,
    pub phone_verified: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub profile_updated_at: Option<DateTime<Utc>>,
}

/// One employment record. Fetched separately from the candidate row and only
/// when designation or company criteria are in play.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkHistoryEntry {
    pub candidate_id: i64,
    pub company: Option<String>,
    pub title: Option<String>,
    pub started_at: Option<NaiveDate>,
    pub ended_at: Option<NaiveDate>,
    pub is_current: bool,
}
