//! Shared helpers for the integration tests.

pub mod mock_view;

pub use mock_view::MockView;
