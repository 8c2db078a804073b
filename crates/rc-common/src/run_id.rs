//! Process-level run ID plus fresh ULIDs for batch handles.
//!
//! Each process gets one ULID at startup; batch submissions mint their own.
//! ULIDs sort lexicographically by creation time, which makes batch listings
//! and log greps read in submission order.

use once_cell::sync::Lazy;
use ulid::Ulid;

/// Process-level run ID, generated once at first access.
static RUN_ID: Lazy<String> = Lazy::new(|| Ulid::new().to_string());

/// Returns the process-level run ID (26 chars, URL-safe, stable for the
/// process lifetime).
#[inline]
pub fn get() -> &'static str {
    &RUN_ID
}

/// Generates a fresh ULID, used for compatibility-score batch handles.
#[inline]
pub fn generate() -> String {
    Ulid::new().to_string()
}
