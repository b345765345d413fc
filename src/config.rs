// src/config.rs
// =============================================================================
// Runtime settings.
//
// Layers, later ones win:
//   1. built-in defaults
//   2. a TOML file (--config PATH, or ./exam-converter.toml if present)
//   3. EXAM_CONVERTER_* environment variables
//   4. command-line flags (applied by main)
//
// Example exam-converter.toml:
//
//   [probe]
//   max_concurrent = 20
//   timeout_secs = 5
//
//   [export]
//   output_dir = "out"
// =============================================================================

use crate::error::{ConvertError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_FILE: &str = "exam-converter.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub probe: ProbeSettings,
    pub export: ExportSettings,
}

/// How image links are checked
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProbeSettings {
    /// Probes in flight at once; 0 = no limit
    pub max_concurrent: usize,
    /// Per-probe timeout
    pub timeout_secs: u64,
    pub max_redirects: usize,
    pub user_agent: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 50,
            timeout_secs: 10,
            max_redirects: 5,
            user_agent: concat!("exam-converter/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Where the converted file goes
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSettings {
    pub output_dir: PathBuf,
    pub file_name: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            file_name: crate::export::EXPORT_FILE_NAME.to_string(),
        }
    }
}

impl Config {
    /// Loads defaults, then the config file, then environment overrides.
    ///
    /// An explicit `path` must exist. Without one, `exam-converter.toml` in
    /// the working directory is used only if it is there.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConvertError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        debug!("loaded configuration from {}", path.display());
        Self::from_toml(&content)
            .map_err(|e| ConvertError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    // `lookup` is std::env::var outside of tests
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = parse_env(&lookup, "EXAM_CONVERTER_MAX_CONCURRENT") {
            self.probe.max_concurrent = v;
        }
        if let Some(v) = parse_env(&lookup, "EXAM_CONVERTER_PROBE_TIMEOUT_SECS") {
            self.probe.timeout_secs = v;
        }
        if let Some(dir) = lookup("EXAM_CONVERTER_OUTPUT_DIR") {
            self.export.output_dir = PathBuf::from(dir);
        }
    }
}

fn parse_env<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("ignoring {}={:?}: not a valid number", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.probe.max_concurrent, 50);
        assert_eq!(config.probe.timeout_secs, 10);
        assert_eq!(config.export.file_name, "converted_exams.json");
        assert!(config.probe.user_agent.starts_with("exam-converter/"));
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = Config::from_toml("[probe]\ntimeout_secs = 3\n").unwrap();
        assert_eq!(config.probe.timeout_secs, 3);
        assert_eq!(config.probe.max_concurrent, 50);
        assert_eq!(config.export, ExportSettings::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_toml("[probe]\ntimeout = 3\n").is_err());
    }

    #[test]
    fn env_overrides_and_bad_values_are_ignored() {
        let env: HashMap<&str, &str> = [
            ("EXAM_CONVERTER_MAX_CONCURRENT", "8"),
            ("EXAM_CONVERTER_PROBE_TIMEOUT_SECS", "soon"),
            ("EXAM_CONVERTER_OUTPUT_DIR", "/tmp/out"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.probe.max_concurrent, 8);
        assert_eq!(config.probe.timeout_secs, 10);
        assert_eq!(config.export.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(dir.path().join("missing.toml").as_path())).unwrap_err();
        assert!(matches!(err, ConvertError::Config(_)));
    }

    #[test]
    fn reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exam-converter.toml");
        std::fs::write(&path, "[export]\nfile_name = \"out.json\"\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.export.file_name, "out.json");
    }
}
