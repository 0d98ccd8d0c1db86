//! Trellis - a terminal database navigator.
//!
//! This library exposes the core modules for the `trellis` binary and for
//! integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod connection;
pub mod db;
pub mod error;
pub mod logging;
pub mod navigation;
pub mod output;
pub mod persistence;
pub mod query;
