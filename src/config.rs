//! Ranking configuration
//!
//! Everything tunable about one computation: solver parameters and matrix
//! construction options. Loadable from YAML or JSON; missing keys take their
//! defaults.

use crate::solver::SolverConfig;
use crate::transition::TransitionConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration of one ranking computation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RankConfig {
    pub solver: SolverConfig,
    pub transition: TransitionConfig,
}

impl RankConfig {
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.yaml`/`.yml` or JSON file
    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let config: Self = load_document(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.solver
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// Read a serde document, picking the format from the file extension
pub fn load_document<T: DeserializeOwned>(path: impl AsRef<Path>) -> ConfigResult<T> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        Ok(serde_yaml::from_str(&text)?)
    } else {
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transition::BlendMode;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_defaults() {
        let config = RankConfig::default();
        assert_eq!(config.solver.gamma, 0.9);
        assert_eq!(config.solver.theta, 0.005);
        assert_eq!(config.solver.max_iterations, 10_000);
        assert_eq!(config.transition.blend_mode, BlendMode::Probability);
        assert!(config.transition.link_records);
    }

    #[test]
    fn test_partial_yaml() {
        let config = RankConfig::from_yaml_str(
            "solver:\n  gamma: 0.95\ntransition:\n  blend_mode: blended\n",
        )
        .unwrap();
        assert_eq!(config.solver.gamma, 0.95);
        assert_eq!(config.solver.theta, 0.005);
        assert_eq!(config.transition.blend_mode, BlendMode::Blended);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = RankConfig::from_json_str(r#"{"solver": {"gamma": 0.0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_from_path_by_extension() {
        let mut yaml = Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(yaml, "solver:\n  theta: 0.001").unwrap();
        assert_eq!(RankConfig::from_path(yaml.path()).unwrap().solver.theta, 0.001);

        let mut json = Builder::new().suffix(".json").tempfile().unwrap();
        write!(json, r#"{{"transition": {{"link_records": false}}}}"#).unwrap();
        assert!(!RankConfig::from_path(json.path()).unwrap().transition.link_records);
    }
}
