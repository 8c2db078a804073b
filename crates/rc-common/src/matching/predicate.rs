use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::Candidate;
use crate::matching::criteria::MatchCriteria;

/// Candidate text columns a predicate can touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    Kind,
    AccountStatus,
    CurrentLocation,
    Headline,
    Summary,
    Designation,
    Education,
    Institute,
    PreferredWorkMode,
    Gender,
}

/// Candidate JSON-array columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListField {
    Skills,
    KeySkills,
    PreferredLocations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberField {
    ExperienceYears,
    ExpectedSalary,
    NoticePeriodDays,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagField {
    ProfileActive,
    WillingToRelocate,
}

/// Store-agnostic filter tree. The SQL renderer and the in-memory evaluator
/// both consume this, which is what keeps the matcher and the aggregate
/// counter agreeing on semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// Case-insensitive substring on a text field. Null text never matches.
    TextContains(TextField, String),
    /// Case-insensitive equality on a text field.
    TextEquals(TextField, String),
    /// Any array element contains the needle, case-insensitively.
    ListAnyContains(ListField, String),
    NumberAtLeast(NumberField, f64),
    NumberAtMost(NumberField, f64),
    NumberUnset(NumberField),
    Flag(FlagField, bool),
    /// Candidate logged in within the last N days.
    ActiveWithin(i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClauseName {
    Base,
    Experience,
    Salary,
    Location,
    ExcludedLocations,
    Skills,
    ExcludedSkills,
    Education,
    Institute,
    RemotePreference,
    Designation,
    CurrentCompany,
    NoticePeriod,
    Diversity,
    RecentActivity,
    Keyword,
}

impl ClauseName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClauseName::Base => "base",
            ClauseName::Experience => "experience",
            ClauseName::Salary => "salary",
            ClauseName::Location => "location",
            ClauseName::ExcludedLocations => "excluded_locations",
            ClauseName::Skills => "skills",
            ClauseName::ExcludedSkills => "excluded_skills",
            ClauseName::Education => "education",
            ClauseName::Institute => "institute",
            ClauseName::RemotePreference => "remote_preference",
            ClauseName::Designation => "designation",
            ClauseName::CurrentCompany => "current_company",
            ClauseName::NoticePeriod => "notice_period",
            ClauseName::Diversity => "diversity",
            ClauseName::RecentActivity => "recent_activity",
            ClauseName::Keyword => "keyword",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ClauseError {
    #[error("range minimum {min} exceeds maximum {max}")]
    InvertedRange { min: f64, max: f64 },
    #[error("negative bound: {0}")]
    NegativeBound(f64),
}

/// Conjunction of named clauses plus the record of clauses that had to be
/// skipped on malformed data. Consumers that execute the set must honor the
/// same skips, or counts and pages drift apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredicateSet {
    pub clauses: Vec<(ClauseName, Predicate)>,
    pub skipped: Vec<ClauseName>,
}

impl PredicateSet {
    fn push(&mut self, name: ClauseName, built: Result<Option<Predicate>, ClauseError>) {
        match built {
            Ok(Some(predicate)) => self.clauses.push((name, predicate)),
            Ok(None) => {}
            Err(err) => {
                warn!(clause = name.as_str(), error = %err, "skipping malformed filter clause");
                self.skipped.push(name);
            }
        }
    }

    pub fn applied(&self) -> Vec<ClauseName> {
        self.clauses.iter().map(|(name, _)| *name).collect()
    }

    /// True when a positive clause narrows the population beyond the base.
    /// Exclusion clauses alone do not count; a query carrying only those
    /// would still sweep the whole candidate base.
    pub fn has_criteria_clauses(&self) -> bool {
        self.clauses.iter().any(|(name, _)| {
            !matches!(
                name,
                ClauseName::Base | ClauseName::ExcludedSkills | ClauseName::ExcludedLocations
            )
        })
    }

    pub fn matches(&self, candidate: &Candidate, now: DateTime<Utc>) -> bool {
        self.clauses
            .iter()
            .all(|(_, predicate)| predicate.matches(candidate, now))
    }
}

/// Build the strict predicate set for one criteria value.
///
/// Clause order follows filter priority. Education, institute and remote
/// preference only filter when no skills were requested; with skills present
/// they stay scoring-only signals.
pub fn build(criteria: &MatchCriteria) -> PredicateSet {
    let mut set = PredicateSet::default();

    set.push(ClauseName::Base, Ok(Some(base_clause())));
    set.push(
        ClauseName::Experience,
        range_clause(criteria.experience.as_ref(), NumberField::ExperienceYears, false),
    );
    set.push(
        ClauseName::Salary,
        range_clause(
            criteria.salary.as_ref(),
            NumberField::ExpectedSalary,
            criteria.include_not_mentioned_values,
        ),
    );
    set.push(ClauseName::Location, location_clause(criteria));
    set.push(ClauseName::ExcludedLocations, excluded_locations_clause(criteria));
    set.push(ClauseName::Skills, skills_clause(criteria));
    set.push(ClauseName::ExcludedSkills, excluded_skills_clause(criteria));

    if criteria.skills.is_empty() {
        set.push(
            ClauseName::Education,
            Ok(text_contains_clause(TextField::Education, criteria.education.as_deref())),
        );
        set.push(
            ClauseName::Institute,
            Ok(text_contains_clause(TextField::Institute, criteria.institute.as_deref())),
        );
        set.push(
            ClauseName::RemotePreference,
            Ok(text_contains_clause(
                TextField::PreferredWorkMode,
                criteria.remote_preference.as_deref(),
            )),
        );
    }

    set.push(ClauseName::Designation, designation_clause(criteria));
    set.push(ClauseName::CurrentCompany, company_clause(criteria));
    set.push(ClauseName::NoticePeriod, notice_clause(criteria));
    set.push(ClauseName::Diversity, diversity_clause(criteria));
    set.push(ClauseName::RecentActivity, recency_clause(criteria));
    set.push(ClauseName::Keyword, keyword_clause(criteria));

    set
}

/// Narrowed set for the relaxation pass: categorical clauses only. Ranged
/// constraints, exclusions and the softer criteria are all dropped.
pub fn build_relaxed(criteria: &MatchCriteria) -> PredicateSet {
    let mut set = PredicateSet::default();

    set.push(ClauseName::Base, Ok(Some(base_clause())));
    set.push(ClauseName::Skills, skills_clause(criteria));
    set.push(ClauseName::Location, location_clause(criteria));
    set.push(ClauseName::Designation, designation_clause(criteria));

    set
}

fn base_clause() -> Predicate {
    Predicate::And(vec![
        Predicate::TextEquals(TextField::Kind, "jobseeker".into()),
        Predicate::Flag(FlagField::ProfileActive, true),
        Predicate::TextEquals(TextField::AccountStatus, "active".into()),
    ])
}

fn range_clause(
    range: Option<&crate::matching::criteria::RangeFilter>,
    field: NumberField,
    include_unset: bool,
) -> Result<Option<Predicate>, ClauseError> {
    let Some(range) = range else {
        return Ok(None);
    };

    if let (Some(min), Some(max)) = (range.min, range.max) {
        if min > max {
            return Err(ClauseError::InvertedRange { min, max });
        }
    }
    if let Some(bound) = range.min.into_iter().chain(range.max).find(|b| *b < 0.0) {
        return Err(ClauseError::NegativeBound(bound));
    }

    let mut bounds = Vec::new();
    if let Some(min) = range.min {
        bounds.push(Predicate::NumberAtLeast(field, min));
    }
    if let Some(max) = range.max {
        bounds.push(Predicate::NumberAtMost(field, max));
    }

    let in_range = match bounds.len() {
        1 => bounds.into_iter().next().unwrap_or(Predicate::And(Vec::new())),
        _ => Predicate::And(bounds),
    };

    if include_unset {
        Ok(Some(Predicate::Or(vec![
            in_range,
            Predicate::NumberUnset(field),
        ])))
    } else {
        Ok(Some(in_range))
    }
}

fn location_clause(criteria: &MatchCriteria) -> Result<Option<Predicate>, ClauseError> {
    if criteria.include_locations.is_empty() {
        return Ok(None);
    }

    let mut alternatives = Vec::new();
    for location in &criteria.include_locations {
        alternatives.push(Predicate::TextContains(
            TextField::CurrentLocation,
            location.clone(),
        ));
        alternatives.push(Predicate::ListAnyContains(
            ListField::PreferredLocations,
            location.clone(),
        ));
    }
    if criteria.include_willing_to_relocate {
        alternatives.push(Predicate::Flag(FlagField::WillingToRelocate, true));
    }

    Ok(Some(Predicate::Or(alternatives)))
}

// Negates the whole disjunction over the current location. Preferred
// locations and relocation willingness never re-include an excluded
// candidate.
fn excluded_locations_clause(criteria: &MatchCriteria) -> Result<Option<Predicate>, ClauseError> {
    if criteria.exclude_locations.is_empty() {
        return Ok(None);
    }

    let matches_any = criteria
        .exclude_locations
        .iter()
        .map(|location| Predicate::TextContains(TextField::CurrentLocation, location.clone()))
        .collect();

    Ok(Some(Predicate::Not(Box::new(Predicate::Or(matches_any)))))
}

fn skill_alternatives(skill: &str) -> Vec<Predicate> {
    vec![
        Predicate::ListAnyContains(ListField::Skills, skill.to_string()),
        Predicate::ListAnyContains(ListField::KeySkills, skill.to_string()),
        Predicate::TextContains(TextField::Headline, skill.to_string()),
        Predicate::TextContains(TextField::Summary, skill.to_string()),
    ]
}

fn skills_clause(criteria: &MatchCriteria) -> Result<Option<Predicate>, ClauseError> {
    if criteria.skills.is_empty() {
        return Ok(None);
    }

    let mut alternatives: Vec<Predicate> = criteria
        .skills
        .iter()
        .flat_map(|skill| skill_alternatives(skill))
        .collect();

    // A strong title can stand in for a skill match: every meaningful title
    // word must appear in the candidate's designation or headline.
    if criteria.title_suggests_role() {
        let per_token = criteria
            .title_role_tokens()
            .into_iter()
            .map(|token| {
                Predicate::Or(vec![
                    Predicate::TextContains(TextField::Designation, token.clone()),
                    Predicate::TextContains(TextField::Headline, token),
                ])
            })
            .collect();
        alternatives.push(Predicate::And(per_token));
    }

    Ok(Some(Predicate::Or(alternatives)))
}

fn excluded_skills_clause(criteria: &MatchCriteria) -> Result<Option<Predicate>, ClauseError> {
    if criteria.excluded_skills.is_empty() {
        return Ok(None);
    }

    let anywhere = criteria
        .excluded_skills
        .iter()
        .flat_map(|skill| skill_alternatives(skill))
        .collect();

    Ok(Some(Predicate::Not(Box::new(Predicate::Or(anywhere)))))
}

fn text_contains_clause(field: TextField, value: Option<&str>) -> Option<Predicate> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| Predicate::TextContains(field, v.to_string()))
}

fn designation_clause(criteria: &MatchCriteria) -> Result<Option<Predicate>, ClauseError> {
    if criteria.designations.is_empty() {
        return Ok(None);
    }

    let alternatives = criteria
        .designations
        .iter()
        .flat_map(|designation| {
            [
                Predicate::TextContains(TextField::Designation, designation.clone()),
                Predicate::TextContains(TextField::Headline, designation.clone()),
            ]
        })
        .collect();

    Ok(Some(Predicate::Or(alternatives)))
}

// The candidate row has no company column; until work history is consulted
// in the post filter, company criteria can only probe free text.
fn company_clause(criteria: &MatchCriteria) -> Result<Option<Predicate>, ClauseError> {
    let Some(company) = criteria.current_company.as_deref() else {
        return Ok(None);
    };

    Ok(Some(Predicate::Or(vec![
        Predicate::TextContains(TextField::Headline, company.to_string()),
        Predicate::TextContains(TextField::Summary, company.to_string()),
    ])))
}

fn notice_clause(criteria: &MatchCriteria) -> Result<Option<Predicate>, ClauseError> {
    let Some(max_days) = criteria.notice_period_max_days else {
        return Ok(None);
    };

    if max_days < 0 {
        return Err(ClauseError::NegativeBound(f64::from(max_days)));
    }

    // Lenient: an unset notice period is kept.
    Ok(Some(Predicate::Or(vec![
        Predicate::NumberAtMost(NumberField::NoticePeriodDays, f64::from(max_days)),
        Predicate::NumberUnset(NumberField::NoticePeriodDays),
    ])))
}

fn diversity_clause(criteria: &MatchCriteria) -> Result<Option<Predicate>, ClauseError> {
    if criteria.genders.is_empty() {
        return Ok(None);
    }

    let alternatives = criteria
        .genders
        .iter()
        .map(|gender| Predicate::TextEquals(TextField::Gender, gender.clone()))
        .collect();

    Ok(Some(Predicate::Or(alternatives)))
}

fn recency_clause(criteria: &MatchCriteria) -> Result<Option<Predicate>, ClauseError> {
    let Some(days) = criteria.active_within_days else {
        return Ok(None);
    };

    if days <= 0 {
        return Err(ClauseError::NegativeBound(f64::from(days)));
    }

    Ok(Some(Predicate::ActiveWithin(days)))
}

fn keyword_clause(criteria: &MatchCriteria) -> Result<Option<Predicate>, ClauseError> {
    let Some(keyword) = criteria.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty())
    else {
        return Ok(None);
    };

    Ok(Some(Predicate::Or(vec![
        Predicate::TextContains(TextField::Headline, keyword.to_string()),
        Predicate::TextContains(TextField::Summary, keyword.to_string()),
        Predicate::TextContains(TextField::Designation, keyword.to_string()),
        Predicate::ListAnyContains(ListField::Skills, keyword.to_string()),
        Predicate::ListAnyContains(ListField::KeySkills, keyword.to_string()),
    ])))
}

fn text_value<'a>(candidate: &'a Candidate, field: TextField) -> Option<&'a str> {
    match field {
        TextField::Kind => candidate.kind.as_deref(),
        TextField::AccountStatus => candidate.account_status.as_deref(),
        TextField::CurrentLocation => candidate.current_location.as_deref(),
        TextField::Headline => candidate.headline.as_deref(),
        TextField::Summary => candidate.summary.as_deref(),
        TextField::Designation => candidate.designation.as_deref(),
        TextField::Education => candidate.education.as_deref(),
        TextField::Institute => candidate.institute.as_deref(),
        TextField::PreferredWorkMode => candidate.preferred_work_mode.as_deref(),
        TextField::Gender => candidate.gender.as_deref(),
    }
}

fn list_value<'a>(candidate: &'a Candidate, field: ListField) -> &'a [String] {
    match field {
        ListField::Skills => &candidate.skills,
        ListField::KeySkills => &candidate.key_skills,
        ListField::PreferredLocations => &candidate.preferred_locations,
    }
}

fn number_value(candidate: &Candidate, field: NumberField) -> Option<f64> {
    match field {
        NumberField::ExperienceYears => candidate.experience_years,
        NumberField::ExpectedSalary => candidate.expected_salary,
        NumberField::NoticePeriodDays => candidate.notice_period_days.map(f64::from),
    }
}

fn flag_value(candidate: &Candidate, field: FlagField) -> bool {
    match field {
        FlagField::ProfileActive => candidate.profile_active,
        FlagField::WillingToRelocate => candidate.willing_to_relocate,
    }
}

impl Predicate {
    /// In-memory evaluation with the same semantics the SQL renderer
    /// produces. Used by the post filter and for predicate unit tests.
    pub fn matches(&self, candidate: &Candidate, now: DateTime<Utc>) -> bool {
        match self {
            Predicate::And(children) => children.iter().all(|child| child.matches(candidate, now)),
            Predicate::Or(children) => children.iter().any(|child| child.matches(candidate, now)),
            Predicate::Not(inner) => !inner.matches(candidate, now),
            Predicate::TextContains(field, needle) => text_value(candidate, *field)
                .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
            Predicate::TextEquals(field, expected) => text_value(candidate, *field)
                .is_some_and(|text| text.trim().eq_ignore_ascii_case(expected.trim())),
            Predicate::ListAnyContains(field, needle) => {
                let needle = needle.to_lowercase();
                list_value(candidate, *field)
                    .iter()
                    .any(|item| item.to_lowercase().contains(&needle))
            }
            Predicate::NumberAtLeast(field, bound) => {
                number_value(candidate, *field).is_some_and(|value| value >= *bound)
            }
            Predicate::NumberAtMost(field, bound) => {
                number_value(candidate, *field).is_some_and(|value| value <= *bound)
            }
            Predicate::NumberUnset(field) => number_value(candidate, *field).is_none(),
            Predicate::Flag(field, expected) => flag_value(candidate, *field) == *expected,
            Predicate::ActiveWithin(days) => candidate
                .last_login_at
                .is_some_and(|at| at >= now - Duration::days(i64::from(*days))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::criteria::RangeFilter;
    use chrono::TimeZone;

    fn base_candidate() -> Candidate {
        Candidate {
            id: 7,
            kind: Some("jobseeker".into()),
            account_status: Some("active".into()),
            profile_active: true,
            current_location: Some("Bangalore".into()),
            skills: vec!["react".into(), "node".into()],
            experience_years: Some(3.0),
            ..Candidate::default()
        }
    }

    fn criteria_with_skills() -> MatchCriteria {
        MatchCriteria {
            skills: vec!["React".into()],
            education: Some("B.Tech".into()),
            institute: Some("IIT".into()),
            remote_preference: Some("remote".into()),
            ..MatchCriteria::default()
        }
    }

    fn clause_names(set: &PredicateSet) -> Vec<ClauseName> {
        set.applied()
    }

    #[test]
    fn empty_criteria_builds_only_the_base_clause() {
        let set = build(&MatchCriteria::default());

        assert_eq!(clause_names(&set), vec![ClauseName::Base]);
        assert!(!set.has_criteria_clauses());
        assert!(set.skipped.is_empty());
    }

    #[test]
    fn education_and_remote_filter_only_without_skills() {
        let with_skills = build(&criteria_with_skills());
        assert!(!clause_names(&with_skills).contains(&ClauseName::Education));
        assert!(!clause_names(&with_skills).contains(&ClauseName::Institute));
        assert!(!clause_names(&with_skills).contains(&ClauseName::RemotePreference));

        let mut without_skills = criteria_with_skills();
        without_skills.skills.clear();
        let set = build(&without_skills);
        assert!(clause_names(&set).contains(&ClauseName::Education));
        assert!(clause_names(&set).contains(&ClauseName::Institute));
        assert!(clause_names(&set).contains(&ClauseName::RemotePreference));
    }

    #[test]
    fn location_clause_is_omitted_without_include_locations() {
        let mut criteria = MatchCriteria::default();
        criteria.exclude_locations = vec!["Delhi".into()];

        let set = build(&criteria);

        assert!(!clause_names(&set).contains(&ClauseName::Location));
        assert!(clause_names(&set).contains(&ClauseName::ExcludedLocations));
    }

    #[test]
    fn excluded_location_negates_current_location_only() {
        let mut criteria = MatchCriteria::default();
        criteria.exclude_locations = vec!["Delhi".into()];
        let set = build(&criteria);

        let now = Utc::now();
        let mut in_delhi = base_candidate();
        in_delhi.current_location = Some("New Delhi".into());
        in_delhi.willing_to_relocate = true;
        assert!(!set.matches(&in_delhi, now));

        let mut prefers_delhi = base_candidate();
        prefers_delhi.preferred_locations = vec!["Delhi".into()];
        assert!(set.matches(&prefers_delhi, now));
    }

    #[test]
    fn relocation_willingness_is_an_include_alternative() {
        let mut criteria = MatchCriteria::default();
        criteria.include_locations = vec!["Pune".into()];
        criteria.include_willing_to_relocate = true;
        let set = build(&criteria);

        let now = Utc::now();
        let mut mover = base_candidate();
        mover.current_location = Some("Chennai".into());
        mover.willing_to_relocate = true;
        assert!(set.matches(&mover, now));

        let mut stayer = base_candidate();
        stayer.current_location = Some("Chennai".into());
        stayer.willing_to_relocate = false;
        assert!(!set.matches(&stayer, now));
    }

    #[test]
    fn salary_clause_keeps_unset_when_flag_is_on() {
        let mut criteria = MatchCriteria::default();
        criteria.salary = Some(RangeFilter {
            min: Some(10.0),
            max: Some(15.0),
        });
        criteria.include_not_mentioned_values = true;
        let set = build(&criteria);

        let now = Utc::now();
        let mut silent = base_candidate();
        silent.expected_salary = None;
        assert!(set.matches(&silent, now));

        let mut pricey = base_candidate();
        pricey.expected_salary = Some(40.0);
        assert!(!set.matches(&pricey, now));
    }

    #[test]
    fn notice_period_is_lenient_about_unset() {
        let mut criteria = MatchCriteria::default();
        criteria.notice_period_max_days = Some(30);
        let set = build(&criteria);

        let now = Utc::now();
        let mut unset = base_candidate();
        unset.notice_period_days = None;
        assert!(set.matches(&unset, now));

        let mut long_notice = base_candidate();
        long_notice.notice_period_days = Some(90);
        assert!(!set.matches(&long_notice, now));
    }

    #[test]
    fn skills_match_reaches_headline_text() {
        let mut criteria = MatchCriteria::default();
        criteria.skills = vec!["golang".into()];
        let set = build(&criteria);

        let now = Utc::now();
        let mut candidate = base_candidate();
        candidate.skills = vec![];
        candidate.headline = Some("Golang services engineer".into());
        assert!(set.matches(&candidate, now));
    }

    #[test]
    fn strong_title_substitutes_for_skill_match() {
        let mut criteria = MatchCriteria::default();
        criteria.skills = vec!["react".into()];
        criteria.title = Some("Senior React Developer".into());
        let set = build(&criteria);

        let now = Utc::now();
        let mut by_title = base_candidate();
        by_title.skills = vec![];
        by_title.designation = Some("Senior React Developer".into());
        assert!(set.matches(&by_title, now));

        let mut unrelated = base_candidate();
        unrelated.skills = vec!["java".into()];
        unrelated.designation = Some("Data Engineer".into());
        assert!(!set.matches(&unrelated, now));
    }

    #[test]
    fn excluded_skills_reject_across_all_fields() {
        let mut criteria = MatchCriteria::default();
        criteria.skills = vec!["react".into()];
        criteria.excluded_skills = vec!["php".into()];
        let set = build(&criteria);

        let now = Utc::now();
        let mut tainted = base_candidate();
        tainted.summary = Some("Occasionally maintains PHP sites".into());
        assert!(!set.matches(&tainted, now));

        assert!(set.matches(&base_candidate(), now));
    }

    #[test]
    fn base_clause_rejects_inactive_accounts() {
        let set = build(&MatchCriteria::default());
        let now = Utc::now();

        let mut suspended = base_candidate();
        suspended.account_status = Some("suspended".into());
        assert!(!set.matches(&suspended, now));

        let mut employer = base_candidate();
        employer.kind = Some("employer".into());
        assert!(!set.matches(&employer, now));
    }

    #[test]
    fn inverted_range_is_skipped_and_recorded() {
        let mut criteria = MatchCriteria::default();
        criteria.salary = Some(RangeFilter {
            min: Some(12.0),
            max: Some(6.0),
        });
        criteria.skills = vec!["react".into()];

        let set = build(&criteria);

        assert!(set.skipped.contains(&ClauseName::Salary));
        assert!(!clause_names(&set).contains(&ClauseName::Salary));
        assert!(clause_names(&set).contains(&ClauseName::Skills));
    }

    #[test]
    fn recency_window_uses_last_login() {
        let mut criteria = MatchCriteria::default();
        criteria.active_within_days = Some(30);
        let set = build(&criteria);

        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        let mut fresh = base_candidate();
        fresh.last_login_at = Some(now - Duration::days(10));
        assert!(set.matches(&fresh, now));

        let mut idle = base_candidate();
        idle.last_login_at = Some(now - Duration::days(45));
        assert!(!set.matches(&idle, now));

        let mut never = base_candidate();
        never.last_login_at = None;
        assert!(!set.matches(&never, now));
    }

    #[test]
    fn relaxed_set_keeps_only_categorical_clauses() {
        let mut criteria = MatchCriteria::default();
        criteria.skills = vec!["react".into()];
        criteria.include_locations = vec!["Bangalore".into()];
        criteria.designations = vec!["Developer".into()];
        criteria.excluded_skills = vec!["php".into()];
        criteria.experience = Some(RangeFilter {
            min: Some(2.0),
            max: Some(5.0),
        });
        criteria.notice_period_max_days = Some(15);

        let relaxed = build_relaxed(&criteria);
        let names = clause_names(&relaxed);

        assert_eq!(
            names,
            vec![
                ClauseName::Base,
                ClauseName::Skills,
                ClauseName::Location,
                ClauseName::Designation,
            ]
        );
    }

    #[test]
    fn relaxed_set_for_only_ranged_criteria_has_no_criteria_clauses() {
        let mut criteria = MatchCriteria::default();
        criteria.experience = Some(RangeFilter {
            min: Some(2.0),
            max: Some(5.0),
        });

        let relaxed = build_relaxed(&criteria);

        assert!(!relaxed.has_criteria_clauses());
    }
}
