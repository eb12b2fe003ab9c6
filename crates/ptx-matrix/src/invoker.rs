//! Load-tool invocation for one matrix cell.
//!
//! The invoker reports *process* success, not *test* success: a load run
//! that recorded failed requests but exited 0 is a `Success` whose failure
//! rate is read in the report, not a pipeline error.

use crate::exec;
use async_trait::async_trait;
use ptx_common::{CellOutcome, InvocationError, MatrixCell, RunProfile};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Seam between the scheduler and the external load tool.
///
/// The production implementation is [`LoadRunInvoker`]; tests substitute a
/// recording stub.
#[async_trait]
pub trait CellInvoker: Send + Sync {
    /// Run the load tool for one cell and block until it exits.
    ///
    /// `output_dir` must already exist; the cell's HTML report and CSV
    /// statistics land there under the search type's artifact prefix.
    async fn run_cell(
        &self,
        cell: &MatrixCell,
        profile: &RunProfile,
        output_dir: &Path,
    ) -> Result<CellOutcome, InvocationError>;
}

/// Invokes the external load-generation tool.
pub struct LoadRunInvoker {
    load_tool: String,
    configs_dir: PathBuf,
    /// Post-run settling delay, applied after every cell (success or not).
    cell_settle: Duration,
}

impl LoadRunInvoker {
    pub fn new(
        load_tool: impl Into<String>,
        configs_dir: impl Into<PathBuf>,
        cell_settle: Duration,
    ) -> Self {
        Self {
            load_tool: load_tool.into(),
            configs_dir: configs_dir.into(),
            cell_settle,
        }
    }

    /// Command-line arguments for one cell's load run.
    fn build_args(&self, cell: &MatrixCell, profile: &RunProfile, output_dir: &Path) -> Vec<String> {
        let prefix = cell.search_type.artifact_prefix();
        let target = self.configs_dir.join(cell.search_type.target_config_name());
        let html_path = output_dir.join(format!("{}_report.html", prefix));
        let csv_prefix = output_dir.join(prefix);

        vec![
            "-f".to_string(),
            target.display().to_string(),
            "--users".to_string(),
            profile.user_count.to_string(),
            "--spawn-rate".to_string(),
            profile.spawn_rate.to_string(),
            "--run-time".to_string(),
            format!("{}s", profile.run_duration.as_secs()),
            "--headless".to_string(),
            "--html".to_string(),
            html_path.display().to_string(),
            "--csv".to_string(),
            csv_prefix.display().to_string(),
        ]
    }
}

#[async_trait]
impl CellInvoker for LoadRunInvoker {
    async fn run_cell(
        &self,
        cell: &MatrixCell,
        profile: &RunProfile,
        output_dir: &Path,
    ) -> Result<CellOutcome, InvocationError> {
        let args = self.build_args(cell, profile, output_dir);
        info!(
            "Cell {}: launching {} ({} users, spawn rate {}, {}s)",
            cell,
            self.load_tool,
            profile.user_count,
            profile.spawn_rate,
            profile.run_duration.as_secs()
        );

        let status = exec::run_tool(&self.load_tool, &args, None)
            .await
            .map_err(|e| InvocationError::SpawnFailed {
                command: self.load_tool.clone(),
                source: e,
            })?;

        let outcome = if status.success() {
            CellOutcome::Success
        } else {
            let code = exec::exit_code(status);
            warn!("Cell {}: load tool exited with code {}", cell, code);
            CellOutcome::Failed { code }
        };

        // Let the target drain connections and caches before the next burst.
        if !self.cell_settle.is_zero() {
            debug!("Cell {}: settling for {:?}", cell, self.cell_settle);
            tokio::time::sleep(self.cell_settle).await;
        }

        Ok(outcome)
    }
}
