//! # gatekeeper-core
//!
//! Core library for gatekeeper, a git pre-commit quality-gate engine.
//!
//! Gatekeeper reads a declarative configuration of validation "gates",
//! isolates the staged snapshot of the repository, runs each gate inside a
//! pooled Docker container (or against an LLM reviewer), normalizes the
//! heterogeneous tool output into a uniform diagnostic format, and returns a
//! blocking/non-blocking verdict to the pre-commit hook.
//!
//! ## Architecture
//!
//! Every I/O boundary is a port trait with one production implementor and one
//! test implementor:
//!
//! - [`sandbox::ContainerRuntime`]: container lifecycle and exec
//! - [`vcs::GitService`]: stash, staged files/diffs, hooks
//! - [`llm::ReviewClient`]: semantic review of staged diffs
//!
//! The execution engine ([`engine::Engine`]) is the sole concurrency
//! producer: it fans out one task per gate under a cancellable token and
//! collects results back in configuration order. Everything else is
//! sequential.

pub mod config;
pub mod engine;
pub mod error;
pub mod filter;
pub mod format;
pub mod gate;
pub mod llm;
pub mod parser;
pub mod report;
pub mod sandbox;
pub mod vcs;

pub use error::PipelineError;
pub use report::{Diagnostic, GateResult, RunResult, Severity};
