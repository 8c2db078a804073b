use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

use crate::Candidate;
use crate::matching::criteria::{MatchCriteria, RangeFilter};
use crate::matching::weights::{RELEVANCE_WEIGHTS, ScoreWeights};
use crate::skills::{canonical_skill, canonical_skill_set, text_mentions};

const STATUS_PERFECT: &str = "PERFECT_MATCH";
const STATUS_PARTIAL: &str = "PARTIAL_MATCH";
const STATUS_MISS: &str = "MISS";
const STATUS_UNKNOWN: &str = "UNKNOWN";
const STATUS_NOT_SPECIFIED: &str = "NOT_SPECIFIED";

/// Experience values this many units outside the requested range still earn
/// partial credit.
const EXPERIENCE_TOLERANCE: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CriterionScore {
    pub points: f64,
    pub max_points: f64,
    pub status: &'static str,
    pub reason: Option<String>,
}

impl CriterionScore {
    fn not_specified(max_points: f64) -> Self {
        Self {
            points: 0.0,
            max_points,
            status: STATUS_NOT_SPECIFIED,
            reason: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelevanceScore {
    /// Clamped to 0..=100 and rounded. Ties are the caller's problem.
    pub total: i32,
    pub reasons: Vec<String>,
    pub skills: CriterionScore,
    pub location: CriterionScore,
    pub experience: CriterionScore,
    pub salary: CriterionScore,
    pub education: CriterionScore,
    pub designation: CriterionScore,
    pub company: CriterionScore,
    pub notice_period: CriterionScore,
    pub profile_quality: CriterionScore,
}

pub struct RelevanceScorer {
    weights: ScoreWeights,
}

impl Default for RelevanceScorer {
    fn default() -> Self {
        Self {
            weights: RELEVANCE_WEIGHTS,
        }
    }
}

/// Scoring entry point used by the ranking pipeline.
pub fn score_candidate(
    criteria: &MatchCriteria,
    candidate: &Candidate,
    now: DateTime<Utc>,
) -> RelevanceScore {
    RelevanceScorer::default().score(criteria, candidate, now)
}

impl RelevanceScorer {
    /// Pure function of (criteria, candidate, now). Unspecified criteria
    /// contribute zero points rather than neutral credit, which keeps the
    /// ranking comparable across candidates of the same requirement.
    pub fn score(
        &self,
        criteria: &MatchCriteria,
        candidate: &Candidate,
        now: DateTime<Utc>,
    ) -> RelevanceScore {
        let skills = self.score_skills(criteria, candidate);
        let location = self.score_location(criteria, candidate);
        let experience = self.score_experience(criteria, candidate);
        let salary = self.score_salary(criteria, candidate);
        let education = self.score_education(criteria, candidate);
        let designation = self.score_designation(criteria, candidate);
        let company = self.score_company(criteria, candidate);
        let notice_period = self.score_notice_period(criteria, candidate);
        let profile_quality = self.score_profile_quality(candidate, now);

        let raw = skills.points
            + location.points
            + experience.points
            + salary.points
            + education.points
            + designation.points
            + company.points
            + notice_period.points
            + profile_quality.points;

        let total = raw.clamp(0.0, 100.0).round() as i32;

        let reasons = [
            &skills,
            &location,
            &experience,
            &salary,
            &education,
            &designation,
            &company,
            &notice_period,
            &profile_quality,
        ]
        .into_iter()
        .filter(|criterion| criterion.points > 0.0)
        .filter_map(|criterion| criterion.reason.clone())
        .collect();

        RelevanceScore {
            total,
            reasons,
            skills,
            location,
            experience,
            salary,
            education,
            designation,
            company,
            notice_period,
            profile_quality,
        }
    }

    fn score_skills(&self, criteria: &MatchCriteria, candidate: &Candidate) -> CriterionScore {
        let max = self.weights.skills;
        if criteria.skills.is_empty() {
            return CriterionScore::not_specified(max);
        }

        let mut candidate_set: HashSet<String> = canonical_skill_set(&candidate.skills);
        candidate_set.extend(canonical_skill_set(&candidate.key_skills));
        let free_text = free_text_of(candidate);

        let matched: Vec<&str> = criteria
            .skills
            .iter()
            .filter(|skill| {
                candidate_set.contains(&canonical_skill(skill)) || text_mentions(&free_text, skill)
            })
            .map(String::as_str)
            .collect();

        let ratio = matched.len() as f64 / criteria.skills.len() as f64;
        let status = if ratio >= 1.0 {
            STATUS_PERFECT
        } else if ratio > 0.0 {
            STATUS_PARTIAL
        } else {
            STATUS_MISS
        };

        let reason = if matched.is_empty() {
            Some(format!("no overlap with {} required skills", criteria.skills.len()))
        } else {
            Some(format!(
                "{}/{} required skills matched: {}",
                matched.len(),
                criteria.skills.len(),
                matched.join(", ")
            ))
        };

        CriterionScore {
            points: ratio * max,
            max_points: max,
            status,
            reason,
        }
    }

    fn score_location(&self, criteria: &MatchCriteria, candidate: &Candidate) -> CriterionScore {
        let max = self.weights.location;
        if criteria.include_locations.is_empty() {
            return CriterionScore::not_specified(max);
        }

        let matched = criteria.include_locations.iter().find(|location| {
            candidate
                .current_location
                .as_deref()
                .is_some_and(|current| text_mentions(current, location))
                || candidate
                    .preferred_locations
                    .iter()
                    .any(|preferred| text_mentions(preferred, location))
        });

        if let Some(location) = matched {
            return CriterionScore {
                points: max,
                max_points: max,
                status: STATUS_PERFECT,
                reason: Some(format!("location matches {location}")),
            };
        }

        if criteria.include_willing_to_relocate && candidate.willing_to_relocate {
            return CriterionScore {
                points: max * 0.5,
                max_points: max,
                status: STATUS_PARTIAL,
                reason: Some("willing to relocate".into()),
            };
        }

        CriterionScore {
            points: 0.0,
            max_points: max,
            status: STATUS_MISS,
            reason: Some("no location overlap".into()),
        }
    }

    fn score_experience(&self, criteria: &MatchCriteria, candidate: &Candidate) -> CriterionScore {
        let max = self.weights.experience;
        let Some(range) = criteria.experience else {
            return CriterionScore::not_specified(max);
        };

        let Some(years) = candidate.experience_years else {
            return CriterionScore {
                points: 0.0,
                max_points: max,
                status: STATUS_UNKNOWN,
                reason: Some("experience not stated".into()),
            };
        };

        if range.contains(years) {
            return CriterionScore {
                points: max,
                max_points: max,
                status: STATUS_PERFECT,
                reason: Some(format!(
                    "{years:.0} years experience within {}",
                    format_range(&range)
                )),
            };
        }

        if range.distance_outside(years) <= EXPERIENCE_TOLERANCE {
            return CriterionScore {
                points: max * 0.5,
                max_points: max,
                status: STATUS_PARTIAL,
                reason: Some(format!(
                    "{years:.0} years experience close to {}",
                    format_range(&range)
                )),
            };
        }

        CriterionScore {
            points: 0.0,
            max_points: max,
            status: STATUS_MISS,
            reason: Some(format!(
                "{years:.0} years experience outside {}",
                format_range(&range)
            )),
        }
    }

    fn score_salary(&self, criteria: &MatchCriteria, candidate: &Candidate) -> CriterionScore {
        let max = self.weights.salary;
        let Some(range) = criteria.salary else {
            return CriterionScore::not_specified(max);
        };

        let Some(expected) = candidate.expected_salary else {
            return CriterionScore {
                points: 0.0,
                max_points: max,
                status: STATUS_UNKNOWN,
                reason: Some("expected salary not stated".into()),
            };
        };

        if range.contains(expected) {
            CriterionScore {
                points: max,
                max_points: max,
                status: STATUS_PERFECT,
                reason: Some("expected salary within budget".into()),
            }
        } else {
            CriterionScore {
                points: max * 0.5,
                max_points: max,
                status: STATUS_PARTIAL,
                reason: Some("expected salary outside budget".into()),
            }
        }
    }

    fn score_education(&self, criteria: &MatchCriteria, candidate: &Candidate) -> CriterionScore {
        let max = self.weights.education;
        let slots = [
            (criteria.education.as_deref(), candidate.education.as_deref()),
            (criteria.institute.as_deref(), candidate.institute.as_deref()),
        ];

        let specified = slots.iter().filter(|(wanted, _)| wanted.is_some()).count();
        if specified == 0 {
            return CriterionScore::not_specified(max);
        }

        let per_slot = max / specified as f64;
        let hits = slots
            .iter()
            .filter(|(wanted, actual)| match (wanted, actual) {
                (Some(wanted), Some(actual)) => text_mentions(actual, wanted),
                _ => false,
            })
            .count();

        let status = if hits == specified {
            STATUS_PERFECT
        } else if hits > 0 {
            STATUS_PARTIAL
        } else {
            STATUS_MISS
        };

        CriterionScore {
            points: hits as f64 * per_slot,
            max_points: max,
            status,
            reason: Some(match hits {
                0 => "education does not match".into(),
                _ => "education matches".into(),
            }),
        }
    }

    fn score_designation(&self, criteria: &MatchCriteria, candidate: &Candidate) -> CriterionScore {
        let max = self.weights.designation;
        if criteria.designations.is_empty() {
            return CriterionScore::not_specified(max);
        }

        let matched = criteria.designations.iter().find(|designation| {
            candidate
                .designation
                .as_deref()
                .is_some_and(|current| text_mentions(current, designation))
                || candidate
                    .headline
                    .as_deref()
                    .is_some_and(|headline| text_mentions(headline, designation))
        });

        match matched {
            Some(designation) => CriterionScore {
                points: max,
                max_points: max,
                status: STATUS_PERFECT,
                reason: Some(format!("designation matches {designation}")),
            },
            None => CriterionScore {
                points: 0.0,
                max_points: max,
                status: STATUS_MISS,
                reason: Some("designation does not match".into()),
            },
        }
    }

    fn score_company(&self, criteria: &MatchCriteria, candidate: &Candidate) -> CriterionScore {
        let max = self.weights.company;
        let Some(company) = criteria.current_company.as_deref() else {
            return CriterionScore::not_specified(max);
        };

        if text_mentions(&free_text_of(candidate), company) {
            CriterionScore {
                points: max,
                max_points: max,
                status: STATUS_PERFECT,
                reason: Some(format!("profile mentions {company}")),
            }
        } else {
            CriterionScore {
                points: 0.0,
                max_points: max,
                status: STATUS_MISS,
                reason: Some("target company not mentioned".into()),
            }
        }
    }

    fn score_notice_period(
        &self,
        criteria: &MatchCriteria,
        candidate: &Candidate,
    ) -> CriterionScore {
        let max = self.weights.notice_period;
        let Some(ceiling) = criteria.notice_period_max_days else {
            return CriterionScore::not_specified(max);
        };

        match candidate.notice_period_days {
            Some(days) if days <= ceiling => CriterionScore {
                points: max,
                max_points: max,
                status: STATUS_PERFECT,
                reason: Some(format!("notice period {days} days within {ceiling}")),
            },
            Some(days) => CriterionScore {
                points: 0.0,
                max_points: max,
                status: STATUS_MISS,
                reason: Some(format!("notice period {days} days exceeds {ceiling}")),
            },
            None => CriterionScore {
                points: max * 0.5,
                max_points: max,
                status: STATUS_UNKNOWN,
                reason: Some("notice period not stated".into()),
            },
        }
    }

    fn score_profile_quality(&self, candidate: &Candidate, now: DateTime<Utc>) -> CriterionScore {
        let max = self.weights.profile_quality;
        let mut points = 0.0;
        let mut notes: Vec<String> = Vec::new();

        if let Some(completion) = candidate.profile_completion {
            let completion = f64::from(completion.clamp(0, 100));
            points += completion / 100.0 * 3.0;
            if completion >= 80.0 {
                notes.push(format!("profile {completion:.0}% complete"));
            }
        }

        if candidate.email_verified {
            points += 1.0;
        }
        if candidate.phone_verified {
            points += 1.0;
        }
        if candidate.email_verified && candidate.phone_verified {
            notes.push("verified contact details".into());
        }

        if candidate
            .last_login_at
            .is_some_and(|at| at >= now - Duration::days(30))
        {
            points += 2.0;
            notes.push("active in the last 30 days".into());
        }

        if candidate
            .profile_updated_at
            .is_some_and(|at| at >= now - Duration::days(90))
        {
            points += 1.0;
            notes.push("profile recently updated".into());
        }

        let status = if points >= max * 0.75 {
            STATUS_PERFECT
        } else if points > 0.0 {
            STATUS_PARTIAL
        } else {
            STATUS_MISS
        };

        CriterionScore {
            points,
            max_points: max,
            status,
            reason: if notes.is_empty() {
                None
            } else {
                Some(notes.join("; "))
            },
        }
    }
}

fn free_text_of(candidate: &Candidate) -> String {
    let mut text = String::new();
    if let Some(headline) = candidate.headline.as_deref() {
        text.push_str(headline);
    }
    if let Some(summary) = candidate.summary.as_deref() {
        if !text.is_empty() {
            text.push(' ');
        }
        text.push_str(summary);
    }
    text
}

fn format_range(range: &RangeFilter) -> String {
    match (range.min, range.max) {
        (Some(min), Some(max)) => format!("{min:.0}-{max:.0}"),
        (Some(min), None) => format!("{min:.0}+"),
        (None, Some(max)) => format!("up to {max:.0}"),
        (None, None) => "any".into(),
    }
}
