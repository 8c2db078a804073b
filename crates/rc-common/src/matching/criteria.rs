use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::Requirement;
use crate::skills::union_preserving_case;

/// Legacy composite fields store ranges as `<number>(-<number>)?`, e.g.
/// experience "3-5" or salary "10-12". A bare "3" means min 3, max open.
static LEGACY_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(?:-\s*(\d+(?:\.\d+)?))?\s*$").unwrap());

static TITLE_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9+#.]+").unwrap());

/// Title words that carry no role signal and never count toward the
/// "title strongly suggests a role" threshold.
const TITLE_STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "for", "of", "in", "at", "on", "with", "to", "we", "is", "are",
    "urgent", "urgently", "hiring", "required", "requirement", "needed", "wanted", "immediate",
    "opening", "openings", "vacancy", "job", "jobs",
];

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RangeFilter {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeFilter {
    pub fn new(min: Option<f64>, max: Option<f64>) -> Option<Self> {
        if min.is_none() && max.is_none() {
            None
        } else {
            Some(Self { min, max })
        }
    }

    /// Parse a legacy free-text range. Unparseable input is None, never an
    /// error; the criterion simply stays unset.
    pub fn parse_legacy(raw: &str) -> Option<Self> {
        let caps = LEGACY_RANGE.captures(raw)?;
        let min = caps.get(1)?.as_str().parse::<f64>().ok()?;
        let max = caps
            .get(2)
            .and_then(|m| m.as_str().parse::<f64>().ok());
        Self::new(Some(min), max)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min.is_none_or(|min| value >= min) && self.max.is_none_or(|max| value <= max)
    }

    /// Distance to the nearest bound when the value falls outside, 0.0 when
    /// inside. Drives the partial-credit bands in scoring.
    pub fn distance_outside(&self, value: f64) -> f64 {
        if let Some(min) = self.min {
            if value < min {
                return min - value;
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return value - max;
            }
        }
        0.0
    }
}

/// Normalized, typed view of a Requirement's matching constraints. Every
/// downstream component consumes this, never raw requirement storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchCriteria {
    pub skills: Vec<String>,
    pub excluded_skills: Vec<String>,
    pub include_locations: Vec<String>,
    pub exclude_locations: Vec<String>,
    pub designations: Vec<String>,
    pub experience: Option<RangeFilter>,
    pub salary: Option<RangeFilter>,
    pub education: Option<String>,
    pub institute: Option<String>,
    pub current_company: Option<String>,
    pub notice_period_max_days: Option<i32>,
    pub remote_preference: Option<String>,
    pub genders: Vec<String>,
    pub active_within_days: Option<i32>,
    pub include_willing_to_relocate: bool,
    pub include_not_mentioned_values: bool,
    pub title: Option<String>,
    /// Caller-supplied keyword override. Never read from the requirement;
    /// the API layer sets it after normalization.
    pub keyword: Option<String>,
}

impl MatchCriteria {
    /// True when at least one positive (narrowing) criterion is set.
    /// Exclusion-only input does not count: running it would still scan the
    /// whole population minus a sliver.
    pub fn has_positive_criteria(&self) -> bool {
        !self.skills.is_empty()
            || !self.include_locations.is_empty()
            || !self.designations.is_empty()
            || self.experience.is_some()
            || self.salary.is_some()
            || self.education.is_some()
            || self.institute.is_some()
            || self.current_company.is_some()
            || self.notice_period_max_days.is_some()
            || self.remote_preference.is_some()
            || !self.genders.is_empty()
            || self.active_within_days.is_some()
            || self.keyword.is_some()
    }

    /// Categorical criteria survive relaxation; ranged ones do not.
    pub fn has_categorical_criteria(&self) -> bool {
        !self.skills.is_empty()
            || !self.include_locations.is_empty()
            || !self.designations.is_empty()
    }

    /// Count of independently specified criteria groups. The lenient title
    /// rule only engages at two or more.
    pub fn independent_criteria_count(&self) -> usize {
        [
            !self.skills.is_empty(),
            !self.include_locations.is_empty(),
            !self.designations.is_empty(),
            self.experience.is_some(),
            self.salary.is_some(),
            self.education.is_some(),
            self.institute.is_some(),
            self.current_company.is_some(),
            self.notice_period_max_days.is_some(),
            self.remote_preference.is_some(),
            !self.genders.is_empty(),
            self.active_within_days.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }

    /// Meaningful, lowercased title tokens after stop-word filtering.
    pub fn title_role_tokens(&self) -> Vec<String> {
        let Some(title) = self.title.as_deref() else {
            return Vec::new();
        };

        TITLE_TOKEN
            .find_iter(title)
            .map(|m| m.as_str().to_lowercase())
            .filter(|token| !TITLE_STOP_WORDS.contains(&token.as_str()))
            .collect()
    }

    /// A title qualifies as a skill substitute only when it carries more
    /// than two meaningful words.
    pub fn title_suggests_role(&self) -> bool {
        self.title_role_tokens().len() > 2
    }
}

fn meta_value<'a>(metadata: Option<&'a Value>, key: &str) -> Option<&'a Value> {
    metadata?.as_object()?.get(key)
}

fn meta_text(metadata: Option<&Value>, key: &str) -> Option<String> {
    meta_value(metadata, key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn meta_number(metadata: Option<&Value>, key: &str) -> Option<f64> {
    match meta_value(metadata, key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn meta_integer(metadata: Option<&Value>, key: &str) -> Option<i32> {
    meta_number(metadata, key).map(|v| v.round() as i32)
}

fn meta_flag(metadata: Option<&Value>, key: &str) -> Option<bool> {
    match meta_value(metadata, key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_i64().map(|v| v != 0),
        _ => None,
    }
}

fn meta_list(metadata: Option<&Value>, key: &str) -> Vec<String> {
    match meta_value(metadata, key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| item.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        // Legacy bags stored lists as comma-joined strings.
        Some(Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Metadata key spellings for one ranged criterion, oldest forms last.
struct RangeKeys {
    current_min: &'static str,
    legacy_min: &'static str,
    current_max: &'static str,
    legacy_max: &'static str,
    current_text: &'static str,
    legacy_text: &'static str,
}

const EXPERIENCE_KEYS: RangeKeys = RangeKeys {
    current_min: "experienceMin",
    legacy_min: "exp_min",
    current_max: "experienceMax",
    legacy_max: "exp_max",
    current_text: "experience",
    legacy_text: "exp_range",
};

const SALARY_KEYS: RangeKeys = RangeKeys {
    current_min: "salaryMin",
    legacy_min: "ctc_min",
    current_max: "salaryMax",
    legacy_max: "ctc_max",
    current_text: "salary",
    legacy_text: "ctc",
};

/// Per-criterion resolution in one place: typed attribute, then the current
/// metadata key, then the legacy key, then (for ranges) legacy free text.
struct Resolver<'a> {
    metadata: Option<&'a Value>,
}

impl<'a> Resolver<'a> {
    fn text(&self, typed: Option<&str>, current: &str, legacy: &str) -> Option<String> {
        typed
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| meta_text(self.metadata, current))
            .or_else(|| meta_text(self.metadata, legacy))
    }

    fn list(&self, typed: &[String], current: &str, legacy: &str) -> Vec<String> {
        let cleaned: Vec<String> = typed
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if !cleaned.is_empty() {
            return cleaned;
        }

        let from_current = meta_list(self.metadata, current);
        if !from_current.is_empty() {
            return from_current;
        }

        meta_list(self.metadata, legacy)
    }

    fn integer(&self, typed: Option<i32>, current: &str, legacy: &str) -> Option<i32> {
        typed
            .or_else(|| meta_integer(self.metadata, current))
            .or_else(|| meta_integer(self.metadata, legacy))
    }

    // A typed false is indistinguishable from unset, so metadata may still
    // turn the flag on.
    fn flag(&self, typed: bool, current: &str, legacy: &str) -> bool {
        if typed {
            return true;
        }
        meta_flag(self.metadata, current)
            .or_else(|| meta_flag(self.metadata, legacy))
            .unwrap_or(false)
    }

    fn range(
        &self,
        typed_min: Option<f64>,
        typed_max: Option<f64>,
        keys: &RangeKeys,
    ) -> Option<RangeFilter> {
        if typed_min.is_some() || typed_max.is_some() {
            return RangeFilter::new(typed_min, typed_max);
        }

        let min = meta_number(self.metadata, keys.current_min)
            .or_else(|| meta_number(self.metadata, keys.legacy_min));
        let max = meta_number(self.metadata, keys.current_max)
            .or_else(|| meta_number(self.metadata, keys.legacy_max));
        if min.is_some() || max.is_some() {
            return RangeFilter::new(min, max);
        }

        meta_text(self.metadata, keys.current_text)
            .or_else(|| meta_text(self.metadata, keys.legacy_text))
            .and_then(|raw| RangeFilter::parse_legacy(&raw))
    }
}

/// Canonical criteria for one requirement.
///
/// Total function contract:
/// 1. never fails; malformed or unknown-shaped values degrade to unset
/// 2. pure over stored state, so re-normalizing is idempotent
/// 3. primary and additional skills are unioned, deduplicated
///    case-insensitively, first-seen spelling kept
pub fn normalize(requirement: &Requirement) -> MatchCriteria {
    let resolver = Resolver {
        metadata: requirement.metadata.as_ref(),
    };

    let skills = union_preserving_case(&[
        &resolver.list(&requirement.required_skills, "requiredSkills", "skills"),
        &resolver.list(&requirement.additional_skills, "additionalSkills", "key_skills"),
    ]);

    let excluded_skills = union_preserving_case(&[&resolver.list(
        &requirement.excluded_skills,
        "excludedSkills",
        "skills_excluded",
    )]);

    MatchCriteria {
        skills,
        excluded_skills,
        include_locations: resolver.list(&requirement.include_locations, "locations", "cities"),
        exclude_locations: resolver.list(
            &requirement.exclude_locations,
            "excludedLocations",
            "cities_excluded",
        ),
        designations: resolver.list(&requirement.designations, "designations", "roles"),
        experience: resolver.range(
            requirement.experience_min,
            requirement.experience_max,
            &EXPERIENCE_KEYS,
        ),
        salary: resolver.range(requirement.salary_min, requirement.salary_max, &SALARY_KEYS),
        education: resolver.text(requirement.education.as_deref(), "education", "qualification"),
        institute: resolver.text(requirement.institute.as_deref(), "institute", "college"),
        current_company: resolver.text(
            requirement.current_company.as_deref(),
            "currentCompany",
            "company",
        ),
        notice_period_max_days: resolver.integer(
            requirement.notice_period_max_days,
            "noticePeriodDays",
            "notice_period",
        ),
        remote_preference: resolver.text(
            requirement.remote_preference.as_deref(),
            "remotePreference",
            "work_mode",
        ),
        genders: resolver.list(&requirement.gender_preferences, "genderPreferences", "diversity"),
        active_within_days: resolver.integer(
            requirement.active_within_days,
            "activeWithinDays",
            "last_active_days",
        ),
        include_willing_to_relocate: resolver.flag(
            requirement.include_willing_to_relocate,
            "includeWillingToRelocate",
            "relocate_ok",
        ),
        include_not_mentioned_values: resolver.flag(
            requirement.include_not_mentioned_values,
            "includeNotMentionedValues",
            "include_unspecified",
        ),
        title: requirement
            .title
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        keyword: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base_requirement() -> Requirement {
        Requirement {
            id: 41,
            title: Some("Senior React Developer".into()),
            ..Requirement::default()
        }
    }

    #[test]
    fn typed_attribute_wins_over_metadata() {
        let mut requirement = base_requirement();
        requirement.experience_min = Some(4.0);
        requirement.experience_max = Some(8.0);
        requirement.metadata = Some(json!({"experienceMin": 1, "experienceMax": 2}));

        let criteria = normalize(&requirement);

        assert_eq!(
            criteria.experience,
            Some(RangeFilter {
                min: Some(4.0),
                max: Some(8.0)
            })
        );
    }

    #[test]
    fn current_metadata_key_wins_over_legacy() {
        let mut requirement = base_requirement();
        requirement.metadata = Some(json!({
            "salaryMin": 12,
            "ctc_min": 3,
            "ctc_max": 6,
        }));

        let criteria = normalize(&requirement);

        assert_eq!(
            criteria.salary,
            Some(RangeFilter {
                min: Some(12.0),
                max: Some(6.0)
            })
        );
    }

    #[test]
    fn legacy_free_text_range_is_last_resort() {
        let mut requirement = base_requirement();
        requirement.metadata = Some(json!({"experience": "3-5"}));

        let criteria = normalize(&requirement);

        assert_eq!(
            criteria.experience,
            Some(RangeFilter {
                min: Some(3.0),
                max: Some(5.0)
            })
        );
    }

    #[test]
    fn bare_number_leaves_max_open() {
        assert_eq!(
            RangeFilter::parse_legacy("3"),
            Some(RangeFilter {
                min: Some(3.0),
                max: None
            })
        );
        assert_eq!(RangeFilter::parse_legacy(" 10 - 12 ").unwrap().max, Some(12.0));
    }

    #[test]
    fn malformed_range_degrades_to_unset() {
        let mut requirement = base_requirement();
        requirement.metadata = Some(json!({"experience": "three to five", "salary": {"weird": 1}}));

        let criteria = normalize(&requirement);

        assert_eq!(criteria.experience, None);
        assert_eq!(criteria.salary, None);
    }

    #[test]
    fn skills_union_dedupes_case_insensitively() {
        let mut requirement = base_requirement();
        requirement.required_skills = vec!["React".into(), "Node".into()];
        requirement.additional_skills = vec!["react".into(), "AWS".into()];

        let criteria = normalize(&requirement);

        assert_eq!(criteria.skills, vec!["React", "Node", "AWS"]);
    }

    #[test]
    fn legacy_comma_joined_lists_split() {
        let mut requirement = base_requirement();
        requirement.metadata = Some(json!({"cities": "Bangalore, Pune , "}));

        let criteria = normalize(&requirement);

        assert_eq!(criteria.include_locations, vec!["Bangalore", "Pune"]);
    }

    #[test]
    fn flags_resolve_from_metadata_when_typed_unset() {
        let mut requirement = base_requirement();
        requirement.metadata = Some(json!({"relocate_ok": "yes", "includeNotMentionedValues": 1}));

        let criteria = normalize(&requirement);

        assert!(criteria.include_willing_to_relocate);
        assert!(criteria.include_not_mentioned_values);
    }

    #[test]
    fn normalization_is_idempotent_after_persisting_typed_fields() {
        let mut stored = base_requirement();
        stored.metadata = Some(json!({
            "experience": "2-5",
            "cities": "Bangalore",
            "requiredSkills": ["React"],
        }));

        let first = normalize(&stored);

        // Simulate writing the normalized values back into typed columns.
        let mut persisted = stored.clone();
        persisted.required_skills = first.skills.clone();
        persisted.include_locations = first.include_locations.clone();
        persisted.experience_min = first.experience.and_then(|r| r.min);
        persisted.experience_max = first.experience.and_then(|r| r.max);

        let second = normalize(&persisted);

        assert_eq!(first, second);
    }

    #[test]
    fn title_tokens_filter_stop_words() {
        let mut requirement = base_requirement();
        requirement.title = Some("Urgent hiring for Senior React Developer".into());

        let criteria = normalize(&requirement);

        assert_eq!(criteria.title_role_tokens(), vec!["senior", "react", "developer"]);
        assert!(criteria.title_suggests_role());
    }

    #[test]
    fn short_titles_do_not_suggest_roles() {
        let mut requirement = base_requirement();
        requirement.title = Some("Urgent opening".into());

        let criteria = normalize(&requirement);

        assert!(!criteria.title_suggests_role());
    }

    #[test]
    fn range_distance_outside() {
        let range = RangeFilter {
            min: Some(2.0),
            max: Some(5.0),
        };

        assert_eq!(range.distance_outside(3.0), 0.0);
        assert_eq!(range.distance_outside(7.0), 2.0);
        assert_eq!(range.distance_outside(1.0), 1.0);
        assert!(range.contains(5.0));
        assert!(!range.contains(5.1));
    }
}
