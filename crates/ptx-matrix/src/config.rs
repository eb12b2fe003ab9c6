//! Orchestrator configuration.
//!
//! Every field is defaulted, so running without a configuration file uses
//! the stock matrix layout. The two documented environment variables
//! (`PT_USER_COUNT`, `PT_RF_VALUE`) are applied after parsing and win over
//! the file.

use anyhow::{Context, Result};
use ptx_common::RunProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the load profile's user count.
pub const ENV_USER_COUNT: &str = "PT_USER_COUNT";
/// Environment variable overriding the run's replication-factor label.
pub const ENV_RF_VALUE: &str = "PT_RF_VALUE";

/// Top-level configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub pacing: PacingConfig,
    #[serde(default)]
    pub profile: ProfileConfig,
}

/// On-disk layout the orchestrator reads and writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory holding the pre-generated query corpus.
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,
    /// Directory holding the per-search-type target configurations.
    #[serde(default = "default_configs_dir")]
    pub configs_dir: PathBuf,
    /// Directory under which `reports_<limit>/` directories are created.
    #[serde(default = "default_reports_root")]
    pub reports_root: PathBuf,
    /// Advisory lock file guarding the target configurations for the run.
    #[serde(default = "default_lock_file")]
    pub lock_file: PathBuf,
}

/// Collaborator command lines (program names resolved via PATH unless given
/// as explicit paths).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_load_tool")]
    pub load_tool: String,
    #[serde(default = "default_corpus_generator")]
    pub corpus_generator: String,
    #[serde(default = "default_aggregator")]
    pub aggregator: String,
}

/// Settling delays between load bursts. These drain connections and caches
/// on the target between cells; they are pacing, not synchronization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Delay after every cell's load run.
    #[serde(default = "default_cell_settle", with = "duration_serde")]
    pub cell_settle: Duration,
    /// Longer delay between limit groups (skipped after the final limit).
    #[serde(default = "default_limit_settle", with = "duration_serde")]
    pub limit_settle: Duration,
}

/// Load profile section; becomes a [`RunProfile`] after env overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    #[serde(default = "default_user_count")]
    pub user_count: u32,
    #[serde(default = "default_spawn_rate")]
    pub spawn_rate: u32,
    #[serde(default = "default_run_duration", with = "duration_serde")]
    pub run_duration: Duration,
    #[serde(default = "default_rf_value")]
    pub rf_value: String,
}

impl OrchestratorConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_string(&content)
    }

    /// Load configuration from a YAML string
    pub fn load_from_string(content: &str) -> Result<Self> {
        let config: OrchestratorConfig =
            serde_yaml::from_str(content).context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.profile.user_count == 0 {
            anyhow::bail!("profile.user_count must be positive");
        }
        if self.profile.spawn_rate == 0 {
            anyhow::bail!("profile.spawn_rate must be positive");
        }
        if self.profile.run_duration.is_zero() {
            anyhow::bail!("profile.run_duration must be positive");
        }
        if self.tools.load_tool.is_empty()
            || self.tools.corpus_generator.is_empty()
            || self.tools.aggregator.is_empty()
        {
            anyhow::bail!("tools entries must not be empty");
        }
        Ok(())
    }

    /// Build the immutable run profile, applying environment overrides.
    pub fn run_profile(&self) -> Result<RunProfile> {
        let mut profile = RunProfile {
            user_count: self.profile.user_count,
            spawn_rate: self.profile.spawn_rate,
            run_duration: self.profile.run_duration,
            rf_value: self.profile.rf_value.clone(),
        };

        if let Ok(value) = std::env::var(ENV_USER_COUNT) {
            profile.user_count = value
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| format!("{} must be a positive integer, got '{}'", ENV_USER_COUNT, value))?;
        }
        if let Ok(value) = std::env::var(ENV_RF_VALUE) {
            profile.rf_value = value;
        }

        Ok(profile)
    }

    /// Target-configuration artifact path for a search type.
    pub fn target_config_path(&self, search_type: ptx_common::SearchType) -> PathBuf {
        self.paths.configs_dir.join(search_type.target_config_name())
    }

    /// Per-limit output directory path.
    pub fn reports_dir(&self, limit: u32) -> PathBuf {
        self.paths.reports_root.join(format!("reports_{}", limit))
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            tools: ToolsConfig::default(),
            pacing: PacingConfig::default(),
            profile: ProfileConfig::default(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            corpus_dir: default_corpus_dir(),
            configs_dir: default_configs_dir(),
            reports_root: default_reports_root(),
            lock_file: default_lock_file(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            load_tool: default_load_tool(),
            corpus_generator: default_corpus_generator(),
            aggregator: default_aggregator(),
        }
    }
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            cell_settle: default_cell_settle(),
            limit_settle: default_limit_settle(),
        }
    }
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            user_count: default_user_count(),
            spawn_rate: default_spawn_rate(),
            run_duration: default_run_duration(),
            rf_value: default_rf_value(),
        }
    }
}

// Default value functions
fn default_corpus_dir() -> PathBuf {
    PathBuf::from("corpus")
}

fn default_configs_dir() -> PathBuf {
    PathBuf::from("configs")
}

fn default_reports_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_lock_file() -> PathBuf {
    PathBuf::from(".ptx-run.lock")
}

fn default_load_tool() -> String {
    "locust".to_string()
}

fn default_corpus_generator() -> String {
    "generate-queries".to_string()
}

fn default_aggregator() -> String {
    "aggregate-reports".to_string()
}

fn default_cell_settle() -> Duration {
    Duration::from_secs(5)
}

fn default_limit_settle() -> Duration {
    Duration::from_secs(30)
}

fn default_user_count() -> u32 {
    100
}

fn default_spawn_rate() -> u32 {
    10
}

fn default_run_duration() -> Duration {
    Duration::from_secs(60)
}

fn default_rf_value() -> String {
    "current".to_string()
}

// Custom serialization for Duration
pub(crate) mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() > 0 {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        } else {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub(crate) fn parse_duration(s: &str) -> Result<Duration, String> {
        // Check for "ms" BEFORE "s" since "ms" ends with 's'
        if s.ends_with("ms") {
            let num_str = &s[..s.len() - 2];
            let millis: u64 = num_str
                .parse()
                .map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_millis(millis))
        } else if s.ends_with('s') {
            let num_str = &s[..s.len() - 1];
            let secs: u64 = num_str
                .parse()
                .map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(secs))
        } else if s.ends_with('m') {
            let num_str = &s[..s.len() - 1];
            let mins: u64 = num_str
                .parse()
                .map_err(|_| format!("Invalid duration: {}", s))?;
            Ok(Duration::from_secs(mins * 60))
        } else {
            Err(format!("Duration must end with 's', 'ms', or 'm': {}", s))
        }
    }
}
