//! Integration tests for Trellis.
//!
//! Fixture and SQLite tests always run. PostgreSQL tests need a running
//! server: set the DATABASE_URL environment variable to run them.
//!
//! Run with: `cargo test --test integration_tests`

mod integration;
