//! Matrix scheduling.
//!
//! The scheduler exclusively owns cell enumeration and sequencing: limits in
//! the outer loop, search types in the inner loop, one load run per cell,
//! no retries. A failed cell never aborts the matrix; only a prerequisite
//! failure (handled before the scheduler starts) prevents it from running.

use crate::invoker::CellInvoker;
use crate::summary::RunSummaryReporter;
use crate::target::{ConfigMutator, TargetConfigs};
use ptx_common::{CellOutcome, MatrixCell, MatrixReport, RunProfile, SearchType};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error};

/// Phase of a matrix run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixPhase {
    /// No run in progress.
    Idle,
    /// Verifying the corpus exists (before any cell).
    CheckingPrerequisites,
    /// Executing one cell's load run.
    RunningCell {
        limit: u32,
        search_type: SearchType,
    },
    /// Settling between limit groups.
    BetweenLimits { completed_limit: u32 },
    /// All cells executed; the report is final.
    Done,
}

impl MatrixPhase {
    /// Check if a transition from this phase to the target phase is valid.
    pub fn can_transition_to(&self, target: MatrixPhase) -> bool {
        use MatrixPhase::*;
        match (*self, target) {
            (Idle, CheckingPrerequisites) => true,
            (CheckingPrerequisites, RunningCell { .. }) => true,
            // An empty matrix finishes immediately.
            (CheckingPrerequisites, Done) => true,
            (RunningCell { .. }, RunningCell { .. }) => true,
            (RunningCell { .. }, BetweenLimits { .. }) => true,
            (RunningCell { .. }, Done) => true,
            (BetweenLimits { .. }, RunningCell { .. }) => true,
            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatrixPhase::Done)
    }
}

impl fmt::Display for MatrixPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatrixPhase::Idle => write!(f, "idle"),
            MatrixPhase::CheckingPrerequisites => write!(f, "checking_prerequisites"),
            MatrixPhase::RunningCell { limit, search_type } => {
                write!(f, "running_cell({}, {})", limit, search_type)
            }
            MatrixPhase::BetweenLimits { completed_limit } => {
                write!(f, "between_limits({})", completed_limit)
            }
            MatrixPhase::Done => write!(f, "done"),
        }
    }
}

/// Drives the full (limit x search-type) matrix.
pub struct MatrixScheduler {
    limits: Vec<u32>,
    search_types: Vec<SearchType>,
    targets: TargetConfigs,
    reports_root: PathBuf,
    limit_settle: Duration,
    reporter: RunSummaryReporter,
    phase: MatrixPhase,
}

impl MatrixScheduler {
    pub fn new(
        limits: Vec<u32>,
        search_types: Vec<SearchType>,
        configs_dir: impl Into<PathBuf>,
        reports_root: impl Into<PathBuf>,
        limit_settle: Duration,
    ) -> Self {
        Self {
            limits,
            search_types,
            targets: TargetConfigs::new(configs_dir),
            reports_root: reports_root.into(),
            limit_settle,
            reporter: RunSummaryReporter::new(),
            phase: MatrixPhase::Idle,
        }
    }

    /// The full matrix with the default dimensions.
    pub fn standard(
        configs_dir: impl Into<PathBuf>,
        reports_root: impl Into<PathBuf>,
        limit_settle: Duration,
    ) -> Self {
        Self::new(
            ptx_common::LIMITS.to_vec(),
            SearchType::ALL.to_vec(),
            configs_dir,
            reports_root,
            limit_settle,
        )
    }

    pub fn phase(&self) -> MatrixPhase {
        self.phase
    }

    pub fn total_cells(&self) -> usize {
        self.limits.len() * self.search_types.len()
    }

    fn enter_phase(&mut self, next: MatrixPhase) {
        // Transitions are driven only by this state machine; validity is a
        // structural invariant checked in tests via can_transition_to.
        debug!("Matrix phase: {} -> {}", self.phase, next);
        self.phase = next;
    }

    /// Enter the prerequisite-checking phase.
    ///
    /// Called by the orchestrator before `ensure_corpus`; a prerequisite
    /// failure means `run_all` is never called and the machine stays here.
    pub fn begin_prerequisite_check(&mut self) {
        self.enter_phase(MatrixPhase::CheckingPrerequisites);
    }

    /// Execute every cell in fixed nested order and return the accumulated
    /// report. Never aborts on individual cell failure.
    pub async fn run_all(
        &mut self,
        invoker: &dyn CellInvoker,
        profile: &RunProfile,
    ) -> MatrixReport {
        if self.phase == MatrixPhase::Idle {
            self.enter_phase(MatrixPhase::CheckingPrerequisites);
        }

        let mut report = MatrixReport::new();
        let total = self.total_cells();
        let mut index = 0usize;

        self.reporter.run_starting(profile, total);

        let limits = self.limits.clone();
        let search_types = self.search_types.clone();
        let limit_count = limits.len();

        for (limit_pos, &limit) in limits.iter().enumerate() {
            self.reporter
                .limit_group_starting(limit, limit_pos + 1, limit_count);

            let output_dir = self.reports_root.join(format!("reports_{}", limit));
            // Created lazily on the first cell touching this limit, never
            // deleted by the orchestrator.
            let dir_error = std::fs::create_dir_all(&output_dir)
                .err()
                .map(|e| format!("cannot create {}: {}", output_dir.display(), e));

            for &search_type in &search_types {
                let cell = MatrixCell::new(limit, search_type);
                index += 1;
                self.enter_phase(MatrixPhase::RunningCell { limit, search_type });
                self.reporter.cell_starting(&cell, index, total);

                let outcome = if let Some(reason) = &dir_error {
                    CellOutcome::Skipped {
                        reason: reason.clone(),
                    }
                } else {
                    self.execute_cell(&cell, invoker, profile, &output_dir).await
                };

                self.reporter.cell_finished(&cell, &outcome);
                report.record(cell, outcome);
            }

            let is_last = limit_pos + 1 == limit_count;
            if !is_last {
                self.enter_phase(MatrixPhase::BetweenLimits {
                    completed_limit: limit,
                });
                if !self.limit_settle.is_zero() {
                    self.reporter
                        .settling(&format!("limit group {}", limit), self.limit_settle);
                    tokio::time::sleep(self.limit_settle).await;
                }
            }
        }

        self.enter_phase(MatrixPhase::Done);
        report.finish();
        report
    }

    /// Mutate the cell's target configuration, then invoke the load tool.
    ///
    /// Mutation failure marks the cell `Skipped` (configuration drift - the
    /// cell must not run against a stale parameter); invocation failure and
    /// non-zero tool exits are recorded, and the matrix moves on.
    async fn execute_cell(
        &self,
        cell: &MatrixCell,
        invoker: &dyn CellInvoker,
        profile: &RunProfile,
        output_dir: &std::path::Path,
    ) -> CellOutcome {
        let target = self.targets.path_for(cell.search_type);

        let mutation = match cell.search_type.query_file_name(cell.limit) {
            Some(query_file) => ConfigMutator::apply_query_file(&target, &query_file),
            None => ConfigMutator::apply_limit(&target, cell.limit),
        };

        if let Err(e) = mutation {
            error!("Cell {}: target configuration drift: {}", cell, e);
            return CellOutcome::Skipped {
                reason: e.to_string(),
            };
        }

        match invoker.run_cell(cell, profile, output_dir).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Cell {}: load tool could not be run: {}", cell, e);
                CellOutcome::Failed { code: -1 }
            }
        }
    }
}
