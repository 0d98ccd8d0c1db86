//! Integration tests for Trellis.

pub mod cache_test;
pub mod dispatch_test;
pub mod navigation_test;
pub mod persistence_test;
pub mod postgres_test;
pub mod sqlite_test;
