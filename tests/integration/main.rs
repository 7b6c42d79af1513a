//! Integration test binary: every integration suite consolidated into a
//! single binary to keep link times down.
//!
//! See the matklad pattern: <https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html>

// Allow unwrap/expect in test code
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod helpers;

mod background_jobs;
mod calendar_expiration;
mod fallback_chain;
mod file_store;
mod http_pipeline;
mod notification_scheduling;
