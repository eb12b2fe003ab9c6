//! Full run pipeline: lock -> corpus check -> matrix -> aggregation.
//!
//! Escalation policy: only a prerequisite failure (lock contention, corpus
//! generation) aborts before the matrix. Cell failures are recorded in the
//! report; an aggregation failure is carried alongside the report so the
//! caller can surface it in the exit code without discarding the results.

use crate::config::OrchestratorConfig;
use crate::corpus::PrerequisiteChecker;
use crate::invoker::CellInvoker;
use crate::lock::RunLock;
use crate::report::ReportTrigger;
use crate::scheduler::MatrixScheduler;
use crate::summary::RunSummaryReporter;
use ptx_common::{AggregationError, MatrixReport, PrerequisiteError, RunProfile};

/// Everything a completed run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: MatrixReport,
    pub aggregation: Result<(), AggregationError>,
}

impl RunOutcome {
    /// Exit-code policy: zero only when prerequisites held (implied by this
    /// value existing) and aggregation succeeded. Individual cell failures
    /// do not change the exit code; they live in the report.
    pub fn exit_code(&self) -> i32 {
        if self.aggregation.is_ok() {
            0
        } else {
            1
        }
    }
}

/// Run the whole pipeline with the given cell invoker.
///
/// The run lock is held for the entire pipeline and released when this
/// function returns, by any path.
pub async fn run_pipeline(
    config: &OrchestratorConfig,
    corpus_type: &str,
    invoker: &dyn CellInvoker,
) -> Result<RunOutcome, PrerequisiteError> {
    let profile: RunProfile = config
        .run_profile()
        .map_err(|e| PrerequisiteError::InvalidProfile {
            reason: e.to_string(),
        })?;

    let _lock = RunLock::acquire(&config.paths.lock_file)?;

    let reporter = RunSummaryReporter::new();
    let mut scheduler = MatrixScheduler::standard(
        config.paths.configs_dir.clone(),
        config.paths.reports_root.clone(),
        config.pacing.limit_settle,
    );

    scheduler.begin_prerequisite_check();
    reporter.checking_prerequisites(corpus_type);
    let checker = PrerequisiteChecker::new(
        config.paths.corpus_dir.clone(),
        config.tools.corpus_generator.clone(),
    );
    checker.ensure_corpus(corpus_type).await?;

    let report = scheduler.run_all(invoker, &profile).await;

    reporter.aggregation_starting();
    let trigger = ReportTrigger::new(
        config.tools.aggregator.clone(),
        config.paths.reports_root.clone(),
    );
    let aggregation = trigger.aggregate().await;
    reporter.aggregation_finished(&aggregation);

    reporter.final_summary(&report);
    Ok(RunOutcome {
        report,
        aggregation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoker::LoadRunInvoker;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn write_script(dir: &Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.display().to_string()
    }

    #[cfg(unix)]
    fn test_config(root: &Path, generator: &str, aggregator: &str) -> OrchestratorConfig {
        let mut config = OrchestratorConfig::default();
        config.paths.corpus_dir = root.join("corpus");
        config.paths.configs_dir = root.join("configs");
        config.paths.reports_root = root.join("out");
        config.paths.lock_file = root.join("run.lock");
        config.tools.corpus_generator = generator.to_string();
        config.tools.aggregator = aggregator.to_string();
        config.pacing.cell_settle = Duration::ZERO;
        config.pacing.limit_settle = Duration::ZERO;
        std::fs::create_dir_all(&config.paths.corpus_dir).unwrap();
        std::fs::create_dir_all(&config.paths.configs_dir).unwrap();
        std::fs::create_dir_all(&config.paths.reports_root).unwrap();
        config
    }

    #[cfg(unix)]
    fn seed_targets(configs_dir: &Path) {
        use ptx_common::SearchType;
        for search_type in SearchType::ALL {
            let content = match search_type {
                SearchType::Vector => r#"{"limit": 10}"#.to_string(),
                _ => format!(r#"{{"query_file": "queries_{}_10.json"}}"#, search_type.tag()),
            };
            std::fs::write(configs_dir.join(search_type.target_config_name()), content).unwrap();
        }
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_failed_generator_aborts_before_matrix() {
        let dir = TempDir::new().unwrap();
        let generator = write_script(dir.path(), "gen.sh", "exit 1");
        let config = test_config(dir.path(), &generator, "true");
        seed_targets(&config.paths.configs_dir);

        let invoker =
            LoadRunInvoker::new("ptx-never-called", &config.paths.configs_dir, Duration::ZERO);
        let err = run_pipeline(&config, "multi", &invoker).await.unwrap_err();

        assert!(matches!(
            err,
            PrerequisiteError::CorpusGenerationFailed { .. }
        ));
        // No cell ran: no reports directory appeared.
        assert!(!config.paths.reports_root.join("reports_10").exists());
        // Lock released on the error path.
        assert!(!config.paths.lock_file.exists());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_end_to_end_with_stub_tool() {
        let dir = TempDir::new().unwrap();
        // Stub load tool: writes the HTML artifact it was pointed at.
        let tool = write_script(
            dir.path(),
            "loadtool.sh",
            "while [ $# -gt 0 ]; do\n  if [ \"$1\" = \"--html\" ]; then echo '<html/>' > \"$2\"; fi\n  shift\ndone",
        );
        let config = test_config(dir.path(), "true", "true");
        seed_targets(&config.paths.configs_dir);
        // Corpus marker present: generator must not be needed.
        std::fs::write(
            config.paths.corpus_dir.join("queries_bm25_10.json"),
            "[]",
        )
        .unwrap();

        std::env::set_var(crate::config::ENV_USER_COUNT, "50");
        let invoker = LoadRunInvoker::new(&tool, &config.paths.configs_dir, Duration::ZERO);
        let outcome = run_pipeline(&config, "multi", &invoker).await.unwrap();
        std::env::remove_var(crate::config::ENV_USER_COUNT);

        assert_eq!(outcome.report.len(), 25);
        assert!(outcome.report.all_succeeded());
        assert!(outcome.aggregation.is_ok());
        assert_eq!(outcome.exit_code(), 0);
        assert!(config
            .paths
            .reports_root
            .join("reports_10")
            .join("bm25_report.html")
            .exists());
        assert!(!config.paths.lock_file.exists());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_aggregation_failure_sets_exit_code() {
        let dir = TempDir::new().unwrap();
        let tool = write_script(dir.path(), "loadtool.sh", "exit 0");
        let aggregator = write_script(dir.path(), "agg.sh", "exit 2");
        let config = test_config(dir.path(), "true", &aggregator);
        seed_targets(&config.paths.configs_dir);
        std::fs::write(
            config.paths.corpus_dir.join("queries_bm25_10.json"),
            "[]",
        )
        .unwrap();

        let invoker = LoadRunInvoker::new(&tool, &config.paths.configs_dir, Duration::ZERO);
        let outcome = run_pipeline(&config, "multi", &invoker).await.unwrap();

        // Matrix results stand; only the exit code reflects the failure.
        assert_eq!(outcome.report.len(), 25);
        assert!(outcome.aggregation.is_err());
        assert_eq!(outcome.exit_code(), 1);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_lock_contention_aborts() {
        let dir = TempDir::new().unwrap();
        let config = test_config(dir.path(), "true", "true");
        seed_targets(&config.paths.configs_dir);

        let _held = RunLock::acquire(&config.paths.lock_file).unwrap();
        let invoker =
            LoadRunInvoker::new("ptx-never-called", &config.paths.configs_dir, Duration::ZERO);
        let err = run_pipeline(&config, "multi", &invoker).await.unwrap_err();
        assert!(matches!(err, PrerequisiteError::AlreadyLocked { .. }));
    }
}
