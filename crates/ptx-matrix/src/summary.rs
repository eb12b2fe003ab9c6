//! Operator-facing run narration.
//!
//! Every phase of a run is narrated through `tracing` so an operator tailing
//! the orchestrator can follow progress: corpus check, each cell's begin and
//! outcome, limit-group boundaries, aggregation, and a final summary that
//! enumerates any failed or skipped cells.

use ptx_common::{CellOutcome, MatrixCell, MatrixReport, RunProfile};
use std::time::Duration;
use tracing::{error, info, warn};

/// Narrates run progress and emits the final summary.
#[derive(Debug, Clone, Default)]
pub struct RunSummaryReporter;

impl RunSummaryReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn run_starting(&self, profile: &RunProfile, total_cells: usize) {
        info!(
            "Matrix run starting: {} cells, {} users, spawn rate {}, {}s per cell, rf={}",
            total_cells,
            profile.user_count,
            profile.spawn_rate,
            profile.run_duration.as_secs(),
            profile.rf_value
        );
    }

    pub fn checking_prerequisites(&self, corpus_type: &str) {
        info!("Checking corpus prerequisites (type: {})", corpus_type);
    }

    pub fn limit_group_starting(&self, limit: u32, position: usize, total: usize) {
        info!(
            "=== Limit {} ({}/{}) ===",
            limit,
            position,
            total
        );
    }

    pub fn cell_starting(&self, cell: &MatrixCell, index: usize, total: usize) {
        info!("Cell {}/{}: {} starting", index, total, cell);
    }

    pub fn cell_finished(&self, cell: &MatrixCell, outcome: &CellOutcome) {
        match outcome {
            CellOutcome::Success => info!("Cell {}: {}", cell, outcome),
            CellOutcome::Failed { .. } => warn!("Cell {}: {}", cell, outcome),
            CellOutcome::Skipped { .. } => {
                // Configuration drift: needs operator attention.
                error!("Cell {}: {}", cell, outcome)
            }
        }
    }

    pub fn settling(&self, what: &str, delay: Duration) {
        info!("Settling after {} for {:?}", what, delay);
    }

    pub fn aggregation_starting(&self) {
        info!("Matrix complete, triggering report aggregation");
    }

    pub fn aggregation_finished(&self, result: &Result<(), ptx_common::AggregationError>) {
        match result {
            Ok(()) => info!("Combined report written"),
            // Partial aggregation beats discarding a full matrix of results.
            Err(e) => warn!("Report aggregation failed: {}", e),
        }
    }

    /// Final summary: overall counts plus every non-successful cell.
    pub fn final_summary(&self, report: &MatrixReport) {
        let failed = report.failed_cells();
        info!(
            "Run finished: {}/{} cells succeeded",
            report.len() - failed.len(),
            report.len()
        );
        for (cell, outcome) in &failed {
            warn!("  {} -> {}", cell, outcome);
        }
        if failed.is_empty() {
            info!("All cells completed successfully");
        }
    }
}
