//! # PTX Common
//!
//! Shared types and error taxonomy for the PTX benchmark-matrix orchestrator.
//!
//! This crate provides:
//! - The matrix vocabulary: search types, limits, cells, outcomes, reports
//! - The error taxonomy used across all orchestrator phases

pub mod errors;
pub mod types;

pub use errors::{
    AggregationError, InvocationError, MutationError, PrerequisiteError,
};
pub use types::{
    CellOutcome, MatrixCell, MatrixReport, RunProfile, SearchType, LIMITS,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
