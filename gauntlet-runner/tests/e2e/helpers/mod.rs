//! Shared E2E test helpers.
//!
//! Provides the temp-dir test bed, the HTTP service double and small
//! assertions about process and file state.

pub mod service_double;
