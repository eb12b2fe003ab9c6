//! Target-configuration mutation.
//!
//! Each search type has one JSON target configuration that the load tool
//! reads at startup. The orchestrator rewrites the *same* artifact before
//! every cell - no new files - so the previous cell's parameter must be
//! fully overwritten, never merged.
//!
//! Mutation is a typed read-modify-write through `serde_json::Value`:
//! exactly the recognized field is replaced, every other field is preserved
//! verbatim. A missing field is configuration drift and fails loudly; a
//! silent no-op would reuse a stale parameter for an entire cell undetected.
//!
//! The write is flushed (`sync_all`) before returning, so the configuration
//! is durably on disk before the load tool launches.

use ptx_common::MutationError;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Field holding the query-corpus file name.
pub const QUERY_FILE_FIELD: &str = "query_file";
/// Field holding the numeric result limit.
pub const LIMIT_FIELD: &str = "limit";

/// Rewrites target-configuration artifacts in place.
///
/// The sole owner of these artifacts for the run's duration; no other
/// component is permitted to write them.
pub struct ConfigMutator;

impl ConfigMutator {
    /// Replace the `query_file` field with `new_file_name`.
    ///
    /// The new name must match the `queries_*.json` corpus naming pattern.
    pub fn apply_query_file(
        target_config: &Path,
        new_file_name: &str,
    ) -> Result<(), MutationError> {
        if !is_query_file_name(new_file_name) {
            return Err(MutationError::invalid_value(
                QUERY_FILE_FIELD,
                format!(
                    "'{}' does not match the queries_*.json naming pattern",
                    new_file_name
                ),
            ));
        }

        Self::replace_field(
            target_config,
            QUERY_FILE_FIELD,
            Value::String(new_file_name.to_string()),
        )
    }

    /// Replace the integer `limit` field with `new_limit`.
    pub fn apply_limit(target_config: &Path, new_limit: u32) -> Result<(), MutationError> {
        Self::replace_field(target_config, LIMIT_FIELD, Value::from(new_limit))
    }

    /// Read the current value of a field (test and diagnostics helper).
    pub fn read_field(target_config: &Path, field: &str) -> Result<Value, MutationError> {
        let root = Self::load(target_config)?;
        let object = root
            .as_object()
            .ok_or_else(|| MutationError::NotAnObject {
                path: display(target_config),
            })?;
        object
            .get(field)
            .cloned()
            .ok_or_else(|| MutationError::field_not_found(display(target_config), field))
    }

    fn replace_field(
        target_config: &Path,
        field: &str,
        new_value: Value,
    ) -> Result<(), MutationError> {
        let mut root = Self::load(target_config)?;
        let object = root
            .as_object_mut()
            .ok_or_else(|| MutationError::NotAnObject {
                path: display(target_config),
            })?;

        let slot = object
            .get_mut(field)
            .ok_or_else(|| MutationError::field_not_found(display(target_config), field))?;

        debug!(
            "Rewriting {}: {} = {} (was {})",
            target_config.display(),
            field,
            new_value,
            slot
        );
        *slot = new_value;

        Self::store(target_config, &root)
    }

    fn load(target_config: &Path) -> Result<Value, MutationError> {
        let content = std::fs::read_to_string(target_config)
            .map_err(|e| MutationError::io(display(target_config), e))?;
        serde_json::from_str(&content).map_err(|e| MutationError::Unparseable {
            path: display(target_config),
            source: e,
        })
    }

    fn store(target_config: &Path, root: &Value) -> Result<(), MutationError> {
        let rendered = serde_json::to_string_pretty(root)
            .map_err(|e| MutationError::Unparseable {
                path: display(target_config),
                source: e,
            })?;

        let mut file = std::fs::File::create(target_config)
            .map_err(|e| MutationError::io(display(target_config), e))?;
        file.write_all(rendered.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .map_err(|e| MutationError::io(display(target_config), e))?;
        // Happens-before edge with the load-tool launch.
        file.sync_all()
            .map_err(|e| MutationError::io(display(target_config), e))
    }
}

/// Does the name follow the corpus `queries_*.json` convention?
fn is_query_file_name(name: &str) -> bool {
    name.starts_with("queries_") && name.ends_with(".json") && name.len() > "queries_.json".len()
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Convenience wrapper binding a mutator to a configs directory.
pub struct TargetConfigs {
    configs_dir: PathBuf,
}

impl TargetConfigs {
    pub fn new(configs_dir: impl Into<PathBuf>) -> Self {
        Self {
            configs_dir: configs_dir.into(),
        }
    }

    pub fn path_for(&self, search_type: ptx_common::SearchType) -> PathBuf {
        self.configs_dir.join(search_type.target_config_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_apply_query_file_replaces_only_recognized_field() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "bm25.json",
            r#"{"host": "http://localhost:8080", "query_file": "queries_bm25_10.json", "wait_min": 1}"#,
        );

        ConfigMutator::apply_query_file(&path, "queries_bm25_50.json").unwrap();

        let value = ConfigMutator::read_field(&path, QUERY_FILE_FIELD).unwrap();
        assert_eq!(value, Value::String("queries_bm25_50.json".to_string()));
        // Other fields untouched
        assert_eq!(
            ConfigMutator::read_field(&path, "host").unwrap(),
            Value::String("http://localhost:8080".to_string())
        );
        assert_eq!(
            ConfigMutator::read_field(&path, "wait_min").unwrap(),
            Value::from(1)
        );
    }

    #[test]
    fn test_apply_query_file_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "bm25.json",
            r#"{"query_file": "queries_bm25_10.json"}"#,
        );

        ConfigMutator::apply_query_file(&path, "queries_bm25_50.json").unwrap();
        let first = std::fs::read(&path).unwrap();
        ConfigMutator::apply_query_file(&path, "queries_bm25_50.json").unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_apply_limit_reapply_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "vector.json",
            r#"{"host": "http://localhost:8080", "limit": 10, "certainty": 0.7}"#,
        );

        ConfigMutator::apply_limit(&path, 150).unwrap();
        let first = std::fs::read(&path).unwrap();
        ConfigMutator::apply_limit(&path, 150).unwrap();
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            ConfigMutator::read_field(&path, LIMIT_FIELD).unwrap(),
            Value::from(150)
        );
        assert_eq!(
            ConfigMutator::read_field(&path, "certainty").unwrap(),
            Value::from(0.7)
        );
    }

    #[test]
    fn test_missing_field_fails_loudly() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "drifted.json", r#"{"host": "http://x"}"#);

        let err = ConfigMutator::apply_query_file(&path, "queries_bm25_10.json").unwrap_err();
        assert!(matches!(err, MutationError::FieldNotFound { .. }));

        let err = ConfigMutator::apply_limit(&path, 10).unwrap_err();
        assert!(matches!(err, MutationError::FieldNotFound { .. }));

        // Drift must not have altered the artifact.
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            r#"{"host": "http://x"}"#
        );
    }

    #[test]
    fn test_rejects_non_corpus_file_names() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "bm25.json", r#"{"query_file": "queries_bm25_10.json"}"#);

        let err = ConfigMutator::apply_query_file(&path, "not_a_corpus_file.txt").unwrap_err();
        assert!(matches!(err, MutationError::InvalidValue { .. }));
    }

    #[test]
    fn test_non_object_config_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "weird.json", r#"[1, 2, 3]"#);

        let err = ConfigMutator::apply_limit(&path, 10).unwrap_err();
        assert!(matches!(err, MutationError::NotAnObject { .. }));
    }

    #[test]
    fn test_unparseable_config_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "broken.json", "{not json");

        let err = ConfigMutator::apply_limit(&path, 10).unwrap_err();
        assert!(matches!(err, MutationError::Unparseable { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");

        let err = ConfigMutator::apply_limit(&path, 10).unwrap_err();
        assert!(matches!(err, MutationError::Io { .. }));
    }

    #[test]
    fn test_target_configs_paths() {
        let targets = TargetConfigs::new("configs");
        assert_eq!(
            targets.path_for(ptx_common::SearchType::HybridHighAlpha),
            PathBuf::from("configs/hybrid_high.json")
        );
    }
}
