use std::collections::HashMap;

use crate::matching::criteria::MatchCriteria;
use crate::skills::{canonical_skill, canonical_skill_set, text_mentions};
use crate::{Candidate, WorkHistoryEntry};

/// Why the validator dropped a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    ExcludedSkill,
    DesignationMismatch,
    CompanyMismatch,
    TitleMismatch,
}

/// Final safety pass over matched candidates, run with per-candidate
/// work-history rows the primary predicate cannot reach. A candidate with no
/// work-history rows is kept: absence of data is not evidence of mismatch.
pub struct PostFilter<'a> {
    criteria: &'a MatchCriteria,
    /// Lowercased role tokens from the requirement title. Empty whenever the
    /// lenient title rule is off: skills outrank title, and a single lonely
    /// criterion is too weak a base to narrow further on title.
    title_tokens: Vec<String>,
}

impl<'a> PostFilter<'a> {
    pub fn new(criteria: &'a MatchCriteria) -> Self {
        let title_tokens =
            if criteria.skills.is_empty() && criteria.independent_criteria_count() >= 2 {
                criteria.title_role_tokens()
            } else {
                Vec::new()
            };

        Self {
            criteria,
            title_tokens,
        }
    }

    /// Work-history rows are only worth fetching when a designation or
    /// current-company criterion needs resolving against them.
    pub fn needs_work_history(&self) -> bool {
        !self.criteria.designations.is_empty() || self.criteria.current_company.is_some()
    }

    /// Verdict for one candidate given its work-history rows.
    pub fn check(
        &self,
        candidate: &Candidate,
        history: &[WorkHistoryEntry],
    ) -> Result<(), DropReason> {
        if self.has_excluded_skill(candidate) {
            return Err(DropReason::ExcludedSkill);
        }

        let resolved = resolve_current_entry(history);
        if !self.designation_holds(resolved) {
            return Err(DropReason::DesignationMismatch);
        }
        if !self.company_holds(resolved) {
            return Err(DropReason::CompanyMismatch);
        }
        if !self.title_holds(candidate, resolved) {
            return Err(DropReason::TitleMismatch);
        }

        Ok(())
    }

    /// Sweep over a fetched page or id-resolved row set. Used by both the
    /// ranked fetch path and the count path so the two stay consistent.
    pub fn sweep(
        &self,
        candidates: Vec<Candidate>,
        histories: &HashMap<i64, Vec<WorkHistoryEntry>>,
    ) -> Vec<Candidate> {
        candidates
            .into_iter()
            .filter(|candidate| {
                let history = histories
                    .get(&candidate.id)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                match self.check(candidate, history) {
                    Ok(()) => true,
                    Err(reason) => {
                        tracing::debug!(
                            candidate_id = candidate.id,
                            ?reason,
                            "post-filter dropped candidate"
                        );
                        false
                    }
                }
            })
            .collect()
    }

    fn has_excluded_skill(&self, candidate: &Candidate) -> bool {
        if self.criteria.excluded_skills.is_empty() {
            return false;
        }

        let mut skill_set = canonical_skill_set(&candidate.skills);
        skill_set.extend(canonical_skill_set(&candidate.key_skills));

        let mut free_text = String::new();
        for field in [candidate.headline.as_deref(), candidate.summary.as_deref()] {
            if let Some(text) = field {
                free_text.push_str(text);
                free_text.push(' ');
            }
        }

        self.criteria.excluded_skills.iter().any(|skill| {
            skill_set.contains(&canonical_skill(skill)) || text_mentions(&free_text, skill)
        })
    }

    fn designation_holds(&self, resolved: Option<&WorkHistoryEntry>) -> bool {
        if self.criteria.designations.is_empty() {
            return true;
        }

        let Some(title) = resolved
            .and_then(|entry| entry.title.as_deref())
            .map(str::trim)
            .filter(|title| !title.is_empty())
        else {
            return true;
        };

        self.criteria
            .designations
            .iter()
            .any(|designation| text_mentions(title, designation))
    }

    fn company_holds(&self, resolved: Option<&WorkHistoryEntry>) -> bool {
        let Some(target) = self.criteria.current_company.as_deref() else {
            return true;
        };

        let Some(company) = resolved
            .and_then(|entry| entry.company.as_deref())
            .map(str::trim)
            .filter(|company| !company.is_empty())
        else {
            return true;
        };

        text_mentions(company, target)
    }

    fn title_holds(&self, candidate: &Candidate, resolved: Option<&WorkHistoryEntry>) -> bool {
        if self.title_tokens.is_empty() {
            return true;
        }

        let mut haystack = String::new();
        for field in [
            resolved.and_then(|entry| entry.title.as_deref()),
            candidate.designation.as_deref(),
            candidate.headline.as_deref(),
        ] {
            if let Some(text) = field {
                haystack.push_str(text);
                haystack.push(' ');
            }
        }

        if haystack.trim().is_empty() {
            return true;
        }

        self.title_tokens
            .iter()
            .any(|token| text_mentions(&haystack, token))
    }
}

/// The entry flagged current wins; otherwise the most recently started one.
fn resolve_current_entry(history: &[WorkHistoryEntry]) -> Option<&WorkHistoryEntry> {
    history
        .iter()
        .find(|entry| entry.is_current)
        .or_else(|| history.iter().max_by_key(|entry| entry.started_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::criteria::RangeFilter;
    use chrono::NaiveDate;

    fn entry(
        title: &str,
        company: &str,
        started: Option<(i32, u32)>,
        current: bool,
    ) -> WorkHistoryEntry {
        WorkHistoryEntry {
            candidate_id: 1,
            company: Some(company.into()),
            title: Some(title.into()),
            started_at: started.and_then(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1)),
            ended_at: None,
            is_current: current,
        }
    }

    fn designation_criteria() -> MatchCriteria {
        MatchCriteria {
            designations: vec!["Engineer".into()],
            ..MatchCriteria::default()
        }
    }

    #[test]
    fn excluded_skill_in_free_text_drops_the_candidate() {
        let criteria = MatchCriteria {
            excluded_skills: vec!["React".into()],
            ..MatchCriteria::default()
        };
        let candidate = Candidate {
            id: 1,
            skills: vec!["python".into()],
            summary: Some("Shipped several React dashboards".into()),
            ..Candidate::default()
        };

        let filter = PostFilter::new(&criteria);
        assert_eq!(
            filter.check(&candidate, &[]),
            Err(DropReason::ExcludedSkill)
        );
    }

    #[test]
    fn excluded_skill_matches_through_aliases() {
        let criteria = MatchCriteria {
            excluded_skills: vec!["JavaScript".into()],
            ..MatchCriteria::default()
        };
        let candidate = Candidate {
            id: 1,
            skills: vec!["JS".into()],
            ..Candidate::default()
        };

        let filter = PostFilter::new(&criteria);
        assert_eq!(
            filter.check(&candidate, &[]),
            Err(DropReason::ExcludedSkill)
        );
    }

    #[test]
    fn current_flag_outranks_a_later_start_date() {
        let criteria = designation_criteria();
        let history = vec![
            entry("Sous Chef", "Bistro", Some((2024, 1)), false),
            entry("Support Engineer", "Acme", Some((2019, 6)), true),
        ];

        let filter = PostFilter::new(&criteria);
        assert_eq!(filter.check(&Candidate::default(), &history), Ok(()));
    }

    #[test]
    fn falls_back_to_most_recently_started_entry() {
        let criteria = designation_criteria();
        let history = vec![
            entry("Software Engineer", "Acme", Some((2018, 3)), false),
            entry("Accounts Manager", "Globex", Some((2023, 7)), false),
        ];

        let filter = PostFilter::new(&criteria);
        assert_eq!(
            filter.check(&Candidate::default(), &history),
            Err(DropReason::DesignationMismatch)
        );
    }

    #[test]
    fn candidate_without_history_rows_is_kept() {
        let criteria = designation_criteria();
        let filter = PostFilter::new(&criteria);

        assert_eq!(filter.check(&Candidate::default(), &[]), Ok(()));
    }

    #[test]
    fn company_mismatch_on_resolved_entry_drops() {
        let criteria = MatchCriteria {
            current_company: Some("Acme".into()),
            ..MatchCriteria::default()
        };
        let history = vec![entry("Engineer", "Globex", Some((2022, 1)), true)];

        let filter = PostFilter::new(&criteria);
        assert_eq!(
            filter.check(&Candidate::default(), &history),
            Err(DropReason::CompanyMismatch)
        );
    }

    #[test]
    fn blank_resolved_fields_count_as_absent_data() {
        let criteria = MatchCriteria {
            designations: vec!["Engineer".into()],
            current_company: Some("Acme".into()),
            ..MatchCriteria::default()
        };
        let mut blank = entry("", "", Some((2022, 1)), true);
        blank.title = Some("  ".into());
        blank.company = None;

        let filter = PostFilter::new(&criteria);
        assert_eq!(filter.check(&Candidate::default(), &[blank]), Ok(()));
    }

    #[test]
    fn title_rule_waits_for_two_independent_criteria() {
        let criteria = MatchCriteria {
            title: Some("Senior Backend Developer".into()),
            include_locations: vec!["Pune".into()],
            ..MatchCriteria::default()
        };
        let candidate = Candidate {
            id: 1,
            designation: Some("Accounts Manager".into()),
            ..Candidate::default()
        };

        let filter = PostFilter::new(&criteria);
        assert_eq!(filter.check(&candidate, &[]), Ok(()));
    }

    #[test]
    fn skills_criterion_disables_the_title_rule() {
        let criteria = MatchCriteria {
            title: Some("Senior Backend Developer".into()),
            skills: vec!["Python".into()],
            include_locations: vec!["Pune".into()],
            ..MatchCriteria::default()
        };
        let candidate = Candidate {
            id: 1,
            skills: vec!["python".into()],
            designation: Some("Accounts Manager".into()),
            ..Candidate::default()
        };

        let filter = PostFilter::new(&criteria);
        assert_eq!(filter.check(&candidate, &[]), Ok(()));
    }

    #[test]
    fn title_rule_drops_unrelated_designations() {
        let criteria = MatchCriteria {
            title: Some("Senior Backend Developer".into()),
            include_locations: vec!["Pune".into()],
            experience: Some(RangeFilter {
                min: Some(3.0),
                max: None,
            }),
            ..MatchCriteria::default()
        };
        let candidate = Candidate {
            id: 1,
            designation: Some("Accounts Manager".into()),
            ..Candidate::default()
        };

        let filter = PostFilter::new(&criteria);
        assert_eq!(filter.check(&candidate, &[]), Err(DropReason::TitleMismatch));

        let matching = Candidate {
            id: 2,
            designation: Some("Backend Developer".into()),
            ..Candidate::default()
        };
        assert_eq!(filter.check(&matching, &[]), Ok(()));
    }

    #[test]
    fn title_rule_keeps_candidates_without_designation_data() {
        let criteria = MatchCriteria {
            title: Some("Senior Backend Developer".into()),
            include_locations: vec!["Pune".into()],
            experience: Some(RangeFilter {
                min: Some(3.0),
                max: None,
            }),
            ..MatchCriteria::default()
        };

        let filter = PostFilter::new(&criteria);
        assert_eq!(filter.check(&Candidate::default(), &[]), Ok(()));
    }

    #[test]
    fn sweep_reads_history_by_candidate_id() {
        let criteria = designation_criteria();
        let filter = PostFilter::new(&criteria);

        let candidates = vec![
            Candidate {
                id: 1,
                ..Candidate::default()
            },
            Candidate {
                id: 2,
                ..Candidate::default()
            },
        ];
        let mut histories = HashMap::new();
        histories.insert(2, vec![entry("Pastry Chef", "Bistro", Some((2024, 2)), true)]);

        let kept = filter.sweep(candidates, &histories);
        let ids: Vec<i64> = kept.iter().map(|candidate| candidate.id).collect();

        assert_eq!(ids, vec![1]);
    }
}
