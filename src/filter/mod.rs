//! Incremental subsequence filter for the building selectors.

mod selector;
mod subsequence;

pub use selector::{failed_options, render_options, FilterState, RouteSelectors, LOAD_FAILED_PLACEHOLDER};
pub use subsequence::{filter, is_subsequence};
