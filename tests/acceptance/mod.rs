//! Acceptance scenarios grouped by concern.

mod common;
mod composite_test;
mod concurrency_test;
mod config_test;
mod scenario_test;
