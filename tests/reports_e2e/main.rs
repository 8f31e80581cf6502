//! Report server E2E test suite.
//!
//! Runs against an in-memory SQLite database, the in-memory artifact store
//! and recording doubles for the job queue and the mail notifier.
//!
//! Run with: cargo test --test reports_e2e

mod test_helpers;

mod test_api;
mod test_prerender;
mod test_render;
