//! Pipeline configuration.
//!
//! A TOML file names the three persisted artifacts and may override any
//! decision threshold:
//!
//! ```toml
//! classifier_path = "models/classifier.json"
//! regressor_path = "models/regressor.json"
//! scaler_path = "models/scaler.json"
//!
//! [thresholds]
//! low_prob = 0.4
//! ```
//!
//! `BBBP_CLASSIFIER`, `BBBP_REGRESSOR` and `BBBP_SCALER` override the paths.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::decision::DecisionThresholds;
use crate::error::Result;

/// Environment variable overriding [`PipelineConfig::classifier_path`].
pub const ENV_CLASSIFIER: &str = "BBBP_CLASSIFIER";
/// Environment variable overriding [`PipelineConfig::regressor_path`].
pub const ENV_REGRESSOR: &str = "BBBP_REGRESSOR";
/// Environment variable overriding [`PipelineConfig::scaler_path`].
pub const ENV_SCALER: &str = "BBBP_SCALER";

/// Where the frozen models live and how verdicts are cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Classifier network (JSON).
    pub classifier_path: PathBuf,
    /// Regressor network (JSON).
    pub regressor_path: PathBuf,
    /// Fitted scaler (JSON).
    pub scaler_path: PathBuf,
    /// Decision cascade boundaries.
    pub thresholds: DecisionThresholds,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            classifier_path: PathBuf::from("models/classifier.json"),
            regressor_path: PathBuf::from("models/regressor.json"),
            scaler_path: PathBuf::from("models/scaler.json"),
            thresholds: DecisionThresholds::default(),
        }
    }
}

impl PipelineConfig {
    /// Read a TOML file. Relative artifact paths are resolved against the
    /// file's directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        if let Some(dir) = path.parent() {
            for p in [
                &mut config.classifier_path,
                &mut config.regressor_path,
                &mut config.scaler_path,
            ] {
                if p.is_relative() {
                    *p = dir.join(&*p);
                }
            }
        }
        debug!(path = %path.display(), "read configuration");
        Ok(config)
    }

    /// Replace paths with any `BBBP_*` environment variables that are set.
    #[must_use]
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var_os(key).map(PathBuf::from))
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<PathBuf>) -> Self {
        if let Some(p) = lookup(ENV_CLASSIFIER) {
            self.classifier_path = p;
        }
        if let Some(p) = lookup(ENV_REGRESSOR) {
            self.regressor_path = p;
        }
        if let Some(p) = lookup(ENV_SCALER) {
            self.scaler_path = p;
        }
        self
    }

    /// Set the classifier path.
    pub fn with_classifier(mut self, path: impl Into<PathBuf>) -> Self {
        self.classifier_path = path.into();
        self
    }

    /// Set the regressor path.
    pub fn with_regressor(mut self, path: impl Into<PathBuf>) -> Self {
        self.regressor_path = path.into();
        self
    }

    /// Set the scaler path.
    pub fn with_scaler(mut self, path: impl Into<PathBuf>) -> Self {
        self.scaler_path = path.into();
        self
    }

    /// Set the decision thresholds.
    pub fn with_thresholds(mut self, thresholds: DecisionThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = PipelineConfig::default();
        assert_eq!(c.scaler_path, PathBuf::from("models/scaler.json"));
        assert_eq!(c.thresholds, DecisionThresholds::default());
    }

    #[test]
    fn file_paths_are_relative_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bbbp.toml");
        fs::write(
            &path,
            "classifier_path = \"clf.json\"\nscaler_path = \"/abs/scaler.json\"\n\n[thresholds]\nveto_prob = 0.1\n",
        )
        .unwrap();
        let c = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(c.classifier_path, dir.path().join("clf.json"));
        assert_eq!(c.regressor_path, dir.path().join("models/regressor.json"));
        assert_eq!(c.scaler_path, PathBuf::from("/abs/scaler.json"));
        assert_eq!(c.thresholds.veto_prob, 0.1);
        assert_eq!(c.thresholds.high_prob, 0.85);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "classifier_path = [").unwrap();
        assert!(PipelineConfig::from_file(&path).is_err());
        assert!(PipelineConfig::from_file(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn overrides_replace_only_what_is_set() {
        let c = PipelineConfig::default().apply_overrides(|key| {
            (key == ENV_REGRESSOR).then(|| PathBuf::from("/tmp/reg.json"))
        });
        assert_eq!(c.regressor_path, PathBuf::from("/tmp/reg.json"));
        assert_eq!(c.classifier_path, PathBuf::from("models/classifier.json"));
    }

    #[test]
    fn builders() {
        let c = PipelineConfig::default()
            .with_classifier("a.json")
            .with_regressor("b.json")
            .with_scaler("c.json");
        assert_eq!(c.classifier_path, PathBuf::from("a.json"));
        assert_eq!(c.regressor_path, PathBuf::from("b.json"));
        assert_eq!(c.scaler_path, PathBuf::from("c.json"));
    }
}
