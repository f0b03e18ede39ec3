//! E2E test scenarios.
//!
//! Each module covers one slice of the run lifecycle.

mod happy_path;
mod interrupt;
mod scenario_flow;
