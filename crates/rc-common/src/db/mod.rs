pub mod ats_scores;
pub mod candidates;
pub mod engagement;
pub mod migrations;
pub mod pool;
pub mod requirements;
pub mod util;
pub mod views;
pub mod work_history;

// Keep re-exports unique so downstream crates see a single symbol per helper.
pub use ats_scores::{
    AtsScoreStorageError, AtsScoreUpsert, fetch_scores_for_requirement, upsert_ats_score,
};
pub use candidates::{
    CandidateFetchError, fetch_by_ids, fetch_matching, fetch_matching_slim, render_where,
};
pub use engagement::{EngagementError, QuotaStatus, consume_view_unit, log_activity, quota_status};
pub use migrations::{MigrationError, run_migrations};
pub use pool::{DbPoolError, PgPool, create_pool_from_url, create_pool_from_url_checked};
pub use requirements::{RequirementFetchError, fetch_requirement};
pub use views::{
    ViewRecord, ViewStorageError, count_viewed_for_requirement, fetch_viewed_map, record_view,
};
pub use work_history::{WorkHistoryFetchError, fetch_work_histories};
