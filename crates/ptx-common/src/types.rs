//! Core matrix vocabulary: search types, limits, cells, outcomes, reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The fixed, exhaustive sequence of result limits. Every run executes all
/// five, in this order (outer loop of the matrix).
pub const LIMITS: [u32; 5] = [10, 50, 100, 150, 200];

/// Search strategy under test - the inner dimension of the matrix.
///
/// The declaration order is the execution order within each limit group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchType {
    Bm25,
    HybridLowAlpha,
    HybridHighAlpha,
    Vector,
    Mixed,
}

impl SearchType {
    /// All search types in execution order.
    pub const ALL: [SearchType; 5] = [
        SearchType::Bm25,
        SearchType::HybridLowAlpha,
        SearchType::HybridHighAlpha,
        SearchType::Vector,
        SearchType::Mixed,
    ];

    /// Short tag used in file names (corpus files, target configs).
    pub fn tag(&self) -> &'static str {
        match self {
            SearchType::Bm25 => "bm25",
            SearchType::HybridLowAlpha => "hybrid_low",
            SearchType::HybridHighAlpha => "hybrid_high",
            SearchType::Vector => "vector",
            SearchType::Mixed => "mixed",
        }
    }

    /// Prefix for the per-cell HTML/CSV artifacts.
    pub fn artifact_prefix(&self) -> &'static str {
        self.tag()
    }

    /// File name of this search type's target-configuration artifact.
    pub fn target_config_name(&self) -> String {
        format!("{}.json", self.tag())
    }

    /// Corpus query file for this search type at the given limit.
    ///
    /// `Vector` carries no query file - it is parameterized only by the
    /// `limit` field inside its target configuration.
    pub fn query_file_name(&self, limit: u32) -> Option<String> {
        match self {
            SearchType::Vector => None,
            _ => Some(format!("queries_{}_{}.json", self.tag(), limit)),
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// One (limit, search-type) combination: exactly one load-test execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatrixCell {
    pub limit: u32,
    pub search_type: SearchType,
}

impl MatrixCell {
    pub fn new(limit: u32, search_type: SearchType) -> Self {
        Self { limit, search_type }
    }

    /// Name of the per-limit output directory this cell writes into.
    pub fn reports_dir_name(&self) -> String {
        format!("reports_{}", self.limit)
    }
}

impl fmt::Display for MatrixCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.limit, self.search_type)
    }
}

/// Result of one cell's load run.
///
/// `Success` means *process* success: the load tool exited zero. Failed
/// requests inside the load test are a metric to read in the report, not a
/// pipeline error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellOutcome {
    Success,
    /// The load tool exited non-zero (or died to a signal, reported as -1).
    Failed { code: i32 },
    /// The cell never ran - its target configuration could not be rewritten.
    Skipped { reason: String },
}

impl CellOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CellOutcome::Success)
    }
}

impl fmt::Display for CellOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellOutcome::Success => write!(f, "success"),
            CellOutcome::Failed { code } => write!(f, "failed (exit code {})", code),
            CellOutcome::Skipped { reason } => write!(f, "skipped ({})", reason),
        }
    }
}

/// Load profile for the whole run. Built once at startup, immutable after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunProfile {
    pub user_count: u32,
    pub spawn_rate: u32,
    pub run_duration: Duration,
    /// Opaque label carried through narration and the final report.
    pub rf_value: String,
}

impl Default for RunProfile {
    fn default() -> Self {
        Self {
            user_count: 100,
            spawn_rate: 10,
            run_duration: Duration::from_secs(60),
            rf_value: "current".to_string(),
        }
    }
}

/// Accumulated outcome of a full matrix run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcomes: Vec<(MatrixCell, CellOutcome)>,
}

impl MatrixReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, cell: MatrixCell, outcome: CellOutcome) {
        self.outcomes.push((cell, outcome));
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Cells that did not complete successfully, in execution order.
    pub fn failed_cells(&self) -> Vec<(&MatrixCell, &CellOutcome)> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| !outcome.is_success())
            .map(|(cell, outcome)| (cell, outcome))
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|(_, outcome)| outcome.is_success())
    }
}

impl Default for MatrixReport {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_type_order() {
        let tags: Vec<&str> = SearchType::ALL.iter().map(|t| t.tag()).collect();
        assert_eq!(
            tags,
            vec!["bm25", "hybrid_low", "hybrid_high", "vector", "mixed"]
        );
    }

    #[test]
    fn test_query_file_names() {
        assert_eq!(
            SearchType::Bm25.query_file_name(50),
            Some("queries_bm25_50.json".to_string())
        );
        assert_eq!(
            SearchType::HybridLowAlpha.query_file_name(200),
            Some("queries_hybrid_low_200.json".to_string())
        );
        assert_eq!(SearchType::Vector.query_file_name(150), None);
    }

    #[test]
    fn test_target_config_names() {
        assert_eq!(SearchType::Mixed.target_config_name(), "mixed.json");
        assert_eq!(SearchType::Vector.target_config_name(), "vector.json");
    }

    #[test]
    fn test_cell_reports_dir() {
        let cell = MatrixCell::new(100, SearchType::Vector);
        assert_eq!(cell.reports_dir_name(), "reports_100");
    }

    #[test]
    fn test_limits_fixed_and_ordered() {
        assert_eq!(LIMITS, [10, 50, 100, 150, 200]);
    }

    #[test]
    fn test_report_accumulation() {
        let mut report = MatrixReport::new();
        report.record(MatrixCell::new(10, SearchType::Bm25), CellOutcome::Success);
        report.record(
            MatrixCell::new(10, SearchType::Vector),
            CellOutcome::Failed { code: 2 },
        );
        report.finish();

        assert_eq!(report.len(), 2);
        assert!(!report.all_succeeded());
        assert_eq!(report.failed_cells().len(), 1);
        assert!(report.finished_at.is_some());
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(CellOutcome::Success.to_string(), "success");
        assert_eq!(
            CellOutcome::Failed { code: 3 }.to_string(),
            "failed (exit code 3)"
        );
    }
}
