//! # PTX Matrix
//!
//! Orchestration engine for the benchmark matrix.
//!
//! This crate provides:
//! - `corpus` - prerequisite checking and corpus generation
//! - `target` - typed mutation of target-configuration artifacts
//! - `invoker` - load-tool invocation for one matrix cell
//! - `scheduler` - the matrix state machine driving all cells
//! - `report` - triggering the report aggregator
//! - `summary` - operator-facing run narration
//! - `lock` - advisory run lock (single orchestrator per artifact set)
//! - `pipeline` - the full run: lock, corpus check, matrix, aggregation
//! - `config` - orchestrator configuration (YAML + environment)
//!
//! Execution is strictly sequential: exactly one collaborator child process
//! runs at any time. The load tool is the thing under measurement and must
//! not compete with sibling invocations for host resources.

pub mod config;
pub mod corpus;
pub mod exec;
pub mod invoker;
pub mod lock;
pub mod pipeline;
pub mod report;
pub mod scheduler;
pub mod summary;
pub mod target;

pub use config::OrchestratorConfig;
pub use corpus::PrerequisiteChecker;
pub use invoker::{CellInvoker, LoadRunInvoker};
pub use lock::RunLock;
pub use pipeline::{run_pipeline, RunOutcome};
pub use report::ReportTrigger;
pub use scheduler::{MatrixPhase, MatrixScheduler};
pub use summary::RunSummaryReporter;
pub use target::ConfigMutator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
