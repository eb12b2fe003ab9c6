//! Report aggregation trigger.
//!
//! Invoked once, after every cell has run, no matter how many failed: a
//! combined report over the surviving cells is worth more than discarding
//! the run. The aggregator discovers the `reports_<limit>/` tree itself and
//! takes no arguments.

use crate::exec;
use ptx_common::AggregationError;
use std::path::PathBuf;
use tracing::info;

/// Launches the aggregation collaborator after the matrix completes.
pub struct ReportTrigger {
    aggregator: String,
    /// Directory the aggregator scans (the reports root).
    working_dir: PathBuf,
}

impl ReportTrigger {
    pub fn new(aggregator: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            aggregator: aggregator.into(),
            working_dir: working_dir.into(),
        }
    }

    /// Run the aggregator to completion.
    pub async fn aggregate(&self) -> Result<(), AggregationError> {
        info!("Running aggregator: {}", self.aggregator);

        let status = exec::run_tool(&self.aggregator, &[], Some(&self.working_dir))
            .await
            .map_err(|e| AggregationError::SpawnFailed {
                command: self.aggregator.clone(),
                source: e,
            })?;

        if status.success() {
            Ok(())
        } else {
            match status.code() {
                Some(code) => Err(AggregationError::NonZeroExit {
                    command: self.aggregator.clone(),
                    code,
                }),
                None => Err(AggregationError::Terminated {
                    command: self.aggregator.clone(),
                }),
            }
        }
    }
}
