//! Corpus prerequisite checking.
//!
//! The load tool consumes a fixed set of pre-generated query files. The
//! corpus generator is atomic with respect to this checker's visibility, so
//! the set is treated as complete-or-absent: presence of one canonical
//! marker file means the whole set exists. No content validation and no
//! mid-run regeneration.

use crate::exec;
use ptx_common::{PrerequisiteError, SearchType, LIMITS};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Verifies the query corpus exists, generating it if absent.
pub struct PrerequisiteChecker {
    corpus_dir: PathBuf,
    generator: String,
}

impl PrerequisiteChecker {
    pub fn new(corpus_dir: impl Into<PathBuf>, generator: impl Into<String>) -> Self {
        Self {
            corpus_dir: corpus_dir.into(),
            generator: generator.into(),
        }
    }

    /// Canonical marker file: the first cell's query file.
    pub fn marker_path(&self) -> PathBuf {
        let name = SearchType::Bm25
            .query_file_name(LIMITS[0])
            .expect("bm25 always has a query file");
        self.corpus_dir.join(name)
    }

    /// Ensure the corpus for `corpus_type` exists.
    ///
    /// A no-op when the marker file is present. Otherwise runs
    /// `<generator> --type <corpus_type>` and re-verifies; a non-zero exit
    /// or a still-missing marker aborts the run before any cell executes.
    pub async fn ensure_corpus(&self, corpus_type: &str) -> Result<(), PrerequisiteError> {
        let marker = self.marker_path();
        if marker.exists() {
            info!("Corpus present (marker: {})", marker.display());
            return Ok(());
        }

        warn!(
            "Corpus marker {} missing, generating corpus (type: {})",
            marker.display(),
            corpus_type
        );

        let args = vec!["--type".to_string(), corpus_type.to_string()];
        let status = exec::run_tool(&self.generator, &args, None)
            .await
            .map_err(|e| PrerequisiteError::GeneratorSpawnFailed {
                command: self.generator.clone(),
                source: e,
            })?;

        if !status.success() {
            return Err(PrerequisiteError::corpus_generation_failed(
                corpus_type,
                format!("generator exited with {}", exec::exit_code(status)),
            ));
        }

        if !marker.exists() {
            return Err(PrerequisiteError::corpus_generation_failed(
                corpus_type,
                format!(
                    "generator exited 0 but marker {} still missing",
                    marker.display()
                ),
            ));
        }

        info!("Corpus generated (type: {})", corpus_type);
        Ok(())
    }

    /// Expected corpus files for the full matrix, in execution order.
    ///
    /// Vector has no query file, so the set holds 4 types x 5 limits.
    pub fn expected_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for limit in LIMITS {
            for search_type in SearchType::ALL {
                if let Some(name) = search_type.query_file_name(limit) {
                    files.push(self.corpus_dir.join(name));
                }
            }
        }
        files
    }

    pub fn corpus_dir(&self) -> &Path {
        &self.corpus_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, b"[]").unwrap();
    }

    #[test]
    fn test_marker_is_first_cell_query_file() {
        let checker = PrerequisiteChecker::new("corpus", "gen");
        assert_eq!(
            checker.marker_path(),
            PathBuf::from("corpus/queries_bm25_10.json")
        );
    }

    #[test]
    fn test_expected_files_count() {
        let checker = PrerequisiteChecker::new("corpus", "gen");
        // 4 query-file-bearing types x 5 limits
        assert_eq!(checker.expected_files().len(), 20);
    }

    #[tokio::test]
    async fn test_noop_when_marker_present() {
        let dir = TempDir::new().unwrap();
        let checker = PrerequisiteChecker::new(dir.path(), "ptx-no-such-generator");
        touch(&checker.marker_path());

        // Generator is unrunnable, so success proves the existence short-circuit.
        checker.ensure_corpus("multi").await.unwrap();
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_generator_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("gen.sh");
        std::fs::write(&script, "#!/bin/sh\nexit 1\n").unwrap();
        make_executable(&script);

        let checker = PrerequisiteChecker::new(dir.path(), script.to_str().unwrap());
        let err = checker.ensure_corpus("multi").await.unwrap_err();
        assert!(matches!(
            err,
            PrerequisiteError::CorpusGenerationFailed { .. }
        ));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_generator_produces_marker() {
        let dir = TempDir::new().unwrap();
        let checker = PrerequisiteChecker::new(dir.path(), "");
        let marker = checker.marker_path();

        let script = dir.path().join("gen.sh");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho '[]' > '{}'\n", marker.display()),
        )
        .unwrap();
        make_executable(&script);

        let checker = PrerequisiteChecker::new(dir.path(), script.to_str().unwrap());
        checker.ensure_corpus("multi").await.unwrap();
        assert!(marker.exists());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_generator_lying_about_success() {
        // Exit 0 without producing the marker must still fail.
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("gen.sh");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();
        make_executable(&script);

        let checker = PrerequisiteChecker::new(dir.path(), script.to_str().unwrap());
        let err = checker.ensure_corpus("multi").await.unwrap_err();
        assert!(matches!(
            err,
            PrerequisiteError::CorpusGenerationFailed { .. }
        ));
    }

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).unwrap();
    }
}
