//! Error taxonomy for the benchmark-matrix orchestrator.
//!
//! Each phase of a run has its own error domain with a distinct escalation
//! policy:
//! - [`PrerequisiteError`] aborts the run before any cell executes.
//! - [`MutationError`] is fatal to a single cell; the matrix continues.
//! - [`InvocationError`] covers spawn failures of the load tool; recorded
//!   per cell, never aborts the matrix.
//! - [`AggregationError`] is surfaced after the matrix completes; the cell
//!   results stand regardless.

use thiserror::Error;

/// Errors that prevent the matrix from starting at all.
#[derive(Debug, Error)]
pub enum PrerequisiteError {
    /// The corpus generator exited non-zero (or its output never appeared).
    #[error("Corpus generation failed for type '{corpus_type}': {reason}")]
    CorpusGenerationFailed {
        corpus_type: String,
        reason: String,
    },

    /// The corpus generator could not be launched at all.
    #[error("Failed to launch corpus generator '{command}': {source}")]
    GeneratorSpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The run profile could not be built (bad environment override).
    #[error("Invalid run profile: {reason}")]
    InvalidProfile { reason: String },

    /// Another orchestrator already holds the run lock.
    #[error("Run lock already held: {path} (holder pid {holder_pid:?})")]
    AlreadyLocked {
        path: String,
        holder_pid: Option<u32>,
    },

    /// I/O error while checking or locking.
    #[error("I/O error during prerequisite check: {0}")]
    Io(#[from] std::io::Error),
}

impl PrerequisiteError {
    pub fn corpus_generation_failed(
        corpus_type: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::CorpusGenerationFailed {
            corpus_type: corpus_type.into(),
            reason: reason.into(),
        }
    }
}

/// Errors from rewriting a target-configuration artifact.
///
/// Any of these indicates configuration drift that needs operator attention;
/// they must never degrade into a silent no-op, since a stale parameter would
/// poison an entire cell's measurements undetected.
#[derive(Debug, Error)]
pub enum MutationError {
    /// The recognized field is absent from the target configuration.
    #[error("Field '{field}' not found in target configuration {path}")]
    FieldNotFound { path: String, field: String },

    /// The target configuration is not a JSON object.
    #[error("Target configuration {path} is not a JSON object")]
    NotAnObject { path: String },

    /// The target configuration could not be parsed.
    #[error("Failed to parse target configuration {path}: {source}")]
    Unparseable {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The replacement value is not acceptable for the field.
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// I/O error reading or writing the artifact.
    #[error("I/O error on target configuration {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl MutationError {
    pub fn field_not_found(path: impl Into<String>, field: impl Into<String>) -> Self {
        Self::FieldNotFound {
            path: path.into(),
            field: field.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors launching the load-generation tool for one cell.
///
/// A non-zero exit of the tool is *not* an `InvocationError` - that is a
/// recorded [`CellOutcome::Failed`](crate::types::CellOutcome). This type is
/// reserved for failures to run the tool at all.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("Failed to spawn load tool '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create output directory {path}: {source}")]
    OutputDirFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed waiting for load tool '{command}': {source}")]
    WaitFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from the report-aggregation collaborator.
#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("Aggregator '{command}' exited with code {code}")]
    NonZeroExit { command: String, code: i32 },

    #[error("Aggregator '{command}' terminated by signal")]
    Terminated { command: String },

    #[error("Failed to launch aggregator '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },
}
