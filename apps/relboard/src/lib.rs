//! # relboard
//!
//! Server and CLI for the release-tracking dashboard. The binary in
//! `main.rs` is a thin entry point over these modules so integration tests
//! can build the router directly.

pub mod api;
pub mod cli;
pub mod config;
