//! Command implementations for the gatekeeper binary, exposed as a library
//! so integration tests can drive the pipeline orchestrator directly.

pub mod commands;
