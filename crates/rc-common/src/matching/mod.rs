pub mod criteria;
pub mod engine;
pub mod post_filter;
pub mod predicate;
pub mod scoring;
pub mod weights;
