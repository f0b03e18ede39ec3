//! Gauntlet runner library.
//!
//! Exposes the orchestration stages for integration testing.
//! In production, the `gauntlet` binary (main.rs) drives a single run.

pub mod builder;
pub mod logging;
pub mod orchestrator;
pub mod process;
pub mod readiness;
pub mod scenario;
