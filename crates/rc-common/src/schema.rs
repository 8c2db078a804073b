/// Candidate profiles as the matcher reads them. Owned by the profile
/// service; this engine only ever selects from it.
pub const CANDIDATES_DDL: &str = r#"
CREATE TABLE hire.candidates (
    id BIGSERIAL PRIMARY KEY,
    full_name TEXT,
    kind VARCHAR(20) NOT NULL DEFAULT 'jobseeker',
    account_status VARCHAR(20) NOT NULL DEFAULT 'active',
    profile_active BOOLEAN NOT NULL DEFAULT true,

    current_location TEXT,
    preferred_locations JSONB,
    willing_to_relocate BOOLEAN NOT NULL DEFAULT false,

    skills JSONB,
    key_skills JSONB,
    headline TEXT,
    summary TEXT,
    designation TEXT,
    education TEXT,
    institute TEXT,
    preferred_work_mode VARCHAR(20),

    experience_years DOUBLE PRECISION,
    current_salary DOUBLE PRECISION,
    expected_salary DOUBLE PRECISION,
    notice_period_days INTEGER,
    gender VARCHAR(20),

    profile_completion INTEGER,
    email_verified BOOLEAN NOT NULL DEFAULT false,
    phone_verified BOOLEAN NOT NULL DEFAULT false,
    last_login_at TIMESTAMPTZ,
    profile_updated_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    CONSTRAINT chk_candidate_kind CHECK (kind IN ('jobseeker', 'employer', 'agency')),
    CONSTRAINT chk_account_status CHECK (account_status IN ('active', 'suspended', 'deleted')),
    CONSTRAINT chk_profile_completion CHECK (
        profile_completion IS NULL OR (profile_completion >= 0 AND profile_completion <= 100)
    )
);

CREATE INDEX idx_candidates_base ON hire.candidates(kind, account_status) WHERE profile_active;
CREATE INDEX idx_candidates_last_login ON hire.candidates(last_login_at DESC NULLS LAST);
CREATE INDEX idx_candidates_experience ON hire.candidates(experience_years);
CREATE INDEX idx_candidates_location ON hire.candidates(current_location);
CREATE INDEX idx_candidates_skills_gin ON hire.candidates USING GIN (skills jsonb_path_ops);
CREATE INDEX idx_candidates_key_skills_gin ON hire.candidates USING GIN (key_skills jsonb_path_ops);
"#;

/// Employer requirements. Typed criteria columns plus the legacy metadata
/// bag the normalizer falls back to.
pub const REQUIREMENTS_DDL: &str = r#"
CREATE TABLE hire.requirements (
    id BIGSERIAL PRIMARY KEY,
    employer_id BIGINT,
    title TEXT,
    description TEXT,

    required_skills JSONB,
    additional_skills JSONB,
    excluded_skills JSONB,
    include_locations JSONB,
    exclude_locations JSONB,
    designations JSONB,

    experience_min DOUBLE PRECISION,
    experience_max DOUBLE PRECISION,
    salary_min DOUBLE PRECISION,
    salary_max DOUBLE PRECISION,
    currency VARCHAR(10),

    education TEXT,
    institute TEXT,
    current_company TEXT,
    notice_period_max_days INTEGER,
    remote_preference VARCHAR(20),
    gender_preferences JSONB,
    active_within_days INTEGER,
    include_willing_to_relocate BOOLEAN NOT NULL DEFAULT false,
    include_not_mentioned_values BOOLEAN NOT NULL DEFAULT false,

    -- Search payloads that predate the typed columns.
    metadata JSONB,

    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_requirements_employer ON hire.requirements(employer_id, created_at DESC);
"#;

/// Employment records per candidate, resolved by the post-filter when
/// designation or company criteria are in play.
pub const WORK_HISTORY_DDL: &str = r#"
CREATE TABLE hire.work_history (
    id BIGSERIAL PRIMARY KEY,
    candidate_id BIGINT NOT NULL REFERENCES hire.candidates(id),
    company TEXT,
    title TEXT,
    started_at DATE,
    ended_at DATE,
    is_current BOOLEAN NOT NULL DEFAULT false
);

CREATE INDEX idx_work_history_candidate
    ON hire.work_history(candidate_id, is_current DESC, started_at DESC);
"#;

/// One row per (viewer, candidate); the requirement-id set only ever grows.
/// Viewing the same candidate from two requirements yields one record with
/// both ids, not two records.
pub const REQUIREMENT_VIEWS_DDL: &str = r#"
CREATE TABLE hire.requirement_views (
    viewer_id BIGINT NOT NULL,
    candidate_id BIGINT NOT NULL,
    requirement_ids JSONB NOT NULL DEFAULT '[]'::jsonb,
    first_viewed_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    last_viewed_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    PRIMARY KEY (viewer_id, candidate_id)
);

CREATE INDEX idx_requirement_views_candidate ON hire.requirement_views(candidate_id);
CREATE INDEX idx_requirement_views_requirements_gin
    ON hire.requirement_views USING GIN (requirement_ids jsonb_path_ops);
"#;

/// Compatibility scores, one per (requirement, candidate). Writers upsert,
/// so duplicate or late worker results are harmless.
pub const ATS_SCORES_DDL: &str = r#"
CREATE TABLE hire.ats_scores (
    requirement_id BIGINT NOT NULL,
    candidate_id BIGINT NOT NULL,
    score DOUBLE PRECISION NOT NULL,
    details JSONB,
    computed_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),

    PRIMARY KEY (requirement_id, candidate_id),
    CONSTRAINT chk_ats_score_range CHECK (score >= 0.0 AND score <= 100.0)
);

CREATE INDEX idx_ats_scores_candidate ON hire.ats_scores(candidate_id);
"#;

/// Per-viewer quota counters plus the fire-and-forget activity log.
pub const ENGAGEMENT_DDL: &str = r#"
CREATE TABLE hire.view_quotas (
    viewer_id BIGINT PRIMARY KEY,
    used INTEGER NOT NULL DEFAULT 0,
    allowance INTEGER NOT NULL DEFAULT 100,
    period_start DATE NOT NULL DEFAULT CURRENT_DATE,

    CONSTRAINT chk_quota_counts CHECK (used >= 0 AND allowance >= 0)
);

CREATE TABLE hire.activity_log (
    id BIGSERIAL PRIMARY KEY,
    actor_id BIGINT,
    action VARCHAR(50) NOT NULL,
    subject_type VARCHAR(30),
    subject_id BIGINT,
    details JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_activity_log_actor ON hire.activity_log(actor_id, created_at DESC);
CREATE INDEX idx_activity_log_action ON hire.activity_log(action, created_at DESC);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_schema_covers_matcher_columns() {
        for required in [
            "kind",
            "account_status",
            "profile_active",
            "preferred_locations JSONB",
            "skills JSONB",
            "key_skills JSONB",
            "preferred_work_mode",
            "experience_years",
            "expected_salary",
            "notice_period_days",
            "last_login_at",
            "chk_candidate_kind",
            "chk_profile_completion",
            "idx_candidates_base",
            "idx_candidates_skills_gin",
        ] {
            assert!(CANDIDATES_DDL.contains(required), "missing: {required}");
        }
    }

    #[test]
    fn requirements_schema_keeps_typed_columns_and_metadata() {
        for required in [
            "required_skills JSONB",
            "excluded_skills JSONB",
            "include_locations JSONB",
            "exclude_locations JSONB",
            "experience_min",
            "salary_max",
            "notice_period_max_days",
            "include_willing_to_relocate",
            "include_not_mentioned_values",
            "metadata JSONB",
            "idx_requirements_employer",
        ] {
            assert!(REQUIREMENTS_DDL.contains(required), "missing: {required}");
        }
    }

    #[test]
    fn work_history_schema_supports_current_entry_resolution() {
        for required in [
            "candidate_id BIGINT NOT NULL",
            "is_current",
            "started_at DATE",
            "idx_work_history_candidate",
        ] {
            assert!(WORK_HISTORY_DDL.contains(required), "missing: {required}");
        }
    }

    #[test]
    fn requirement_views_schema_keys_on_viewer_and_candidate() {
        for required in [
            "requirement_ids JSONB NOT NULL DEFAULT '[]'::jsonb",
            "first_viewed_at",
            "last_viewed_at",
            "PRIMARY KEY (viewer_id, candidate_id)",
            "idx_requirement_views_candidate",
        ] {
            assert!(REQUIREMENT_VIEWS_DDL.contains(required), "missing: {required}");
        }
    }

    #[test]
    fn ats_scores_schema_enforces_one_score_per_pair() {
        for required in [
            "PRIMARY KEY (requirement_id, candidate_id)",
            "chk_ats_score_range",
            "details JSONB",
            "idx_ats_scores_candidate",
        ] {
            assert!(ATS_SCORES_DDL.contains(required), "missing: {required}");
        }
    }

    #[test]
    fn engagement_schema_covers_quotas_and_activity() {
        for required in [
            "view_quotas",
            "allowance",
            "chk_quota_counts",
            "activity_log",
            "idx_activity_log_actor",
        ] {
            assert!(ENGAGEMENT_DDL.contains(required), "missing: {required}");
        }
    }
}
