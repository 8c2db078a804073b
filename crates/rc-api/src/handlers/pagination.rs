use crate::error::ApiError;

pub const MAX_PAGE_SIZE: u32 = 100;
const MAX_PAGE: u32 = 10_000;

/// Validate a 1-based page window. Callers pass serde defaults through, so
/// a bare request is always valid.
pub fn validate_page(page: u32, page_size: u32) -> Result<(u32, u32), ApiError> {
    if !(1..=MAX_PAGE).contains(&page) {
        return Err(ApiError::BadRequest(format!(
            "page must be between 1 and {MAX_PAGE}"
        )));
    }

    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(ApiError::BadRequest(format!(
            "page_size must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    Ok((page, page_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_the_default_window() {
        assert!(validate_page(1, 20).is_ok());
    }

    #[test]
    fn rejects_zero_and_oversized_values() {
        assert!(validate_page(0, 20).is_err());
        assert!(validate_page(1, 0).is_err());
        assert!(validate_page(1, MAX_PAGE_SIZE + 1).is_err());
        assert!(validate_page(10_001, 20).is_err());
    }
}
