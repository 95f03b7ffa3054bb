//! Project configuration stored in `golings.toml` at the project root.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::marker::DEFAULT_MARKER;
use crate::core::types::VerifyMode;
use crate::error::ConfigError;

pub const CONFIG_FILE: &str = "golings.toml";

/// Engine configuration (TOML).
///
/// Every field is optional in the file; missing fields fall back to defaults
/// suited to Go exercises.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GolingsConfig {
    /// Exercise manifest, relative to the project root.
    pub info_file: PathBuf,

    /// Progress record, relative to the project root.
    pub progress_file: PathBuf,

    /// Quiet interval that collapses bursts of saves into one verification.
    pub debounce_ms: u64,

    /// Filesystem poll interval for the watcher.
    pub poll_interval_ms: u64,

    /// Hard wall-clock limit for a single verification.
    pub verify_timeout_secs: u64,

    /// Truncate captured verification output beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Comment text that blocks verification while present.
    pub marker: String,

    pub commands: CommandsConfig,
}

/// Verification commands per mode.
///
/// `{path}` expands to the exercise path and `{dir}` to its package directory
/// (`./exercises/foo`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CommandsConfig {
    pub compile: Vec<String>,
    pub test: Vec<String>,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            compile: vec!["go".to_string(), "run".to_string(), "{path}".to_string()],
            test: vec![
                "go".to_string(),
                "test".to_string(),
                "-v".to_string(),
                "{dir}".to_string(),
            ],
        }
    }
}

impl CommandsConfig {
    pub fn for_mode(&self, mode: VerifyMode) -> &[String] {
        match mode {
            VerifyMode::Compile => &self.compile,
            VerifyMode::Test => &self.test,
        }
    }
}

impl Default for GolingsConfig {
    fn default() -> Self {
        Self {
            info_file: PathBuf::from("info.toml"),
            progress_file: PathBuf::from(".golings").join("progress.json"),
            debounce_ms: 300,
            poll_interval_ms: 200,
            verify_timeout_secs: 60,
            output_limit_bytes: 100_000,
            marker: DEFAULT_MARKER.to_string(),
            commands: CommandsConfig::default(),
        }
    }
}

impl GolingsConfig {
    /// Collect every invalid field instead of stopping at the first.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.info_file.as_os_str().is_empty() {
            problems.push("info_file must not be empty".to_string());
        }
        if self.progress_file.as_os_str().is_empty() {
            problems.push("progress_file must not be empty".to_string());
        }
        if self.debounce_ms == 0 {
            problems.push("debounce_ms must be > 0".to_string());
        }
        if self.poll_interval_ms == 0 {
            problems.push("poll_interval_ms must be > 0".to_string());
        }
        if self.verify_timeout_secs == 0 {
            problems.push("verify_timeout_secs must be > 0".to_string());
        }
        if self.output_limit_bytes == 0 {
            problems.push("output_limit_bytes must be > 0".to_string());
        }
        if self.marker.trim().is_empty() {
            problems.push("marker must not be empty".to_string());
        }
        for (mode, command) in [
            ("compile", &self.commands.compile),
            ("test", &self.commands.test),
        ] {
            if command.is_empty() || command[0].trim().is_empty() {
                problems.push(format!("commands.{mode} must be a non-empty array"));
            }
        }
        problems
    }

    pub fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let problems = self.problems();
        if problems.is_empty() {
            return Ok(());
        }
        Err(ConfigError::Invalid {
            path: path.to_path_buf(),
            problems,
        })
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn verify_timeout(&self) -> Duration {
        Duration::from_secs(self.verify_timeout_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `GolingsConfig::default()`.
pub fn load_config(path: &Path) -> Result<GolingsConfig, ConfigError> {
    if !path.exists() {
        let cfg = GolingsConfig::default();
        cfg.validate(path)?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg: GolingsConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    cfg.validate(path)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, GolingsConfig::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_other_fields() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "debounce_ms = 50\n\n[commands]\ncompile = [\"sh\", \"-c\", \"true\"]\n",
        )
        .expect("write");

        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.debounce(), Duration::from_millis(50));
        assert_eq!(cfg.commands.compile, vec!["sh", "-c", "true"]);
        assert_eq!(cfg.commands.test, CommandsConfig::default().test);
        assert_eq!(cfg.marker, DEFAULT_MARKER);
    }

    #[test]
    fn invalid_values_are_all_reported() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "verify_timeout_secs = 0\nmarker = \"  \"\n\n[commands]\ntest = []\n",
        )
        .expect("write");

        let err = load_config(&path).expect_err("invalid config");
        let problems = match err {
            ConfigError::Invalid { problems, .. } => problems,
            other => panic!("expected invalid config, got {other}"),
        };
        assert_eq!(problems.len(), 3);
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(CONFIG_FILE);
        fs::write(&path, "debounce_ms = [").expect("write");

        assert!(matches!(
            load_config(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
