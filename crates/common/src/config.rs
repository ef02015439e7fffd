use crate::error::TwinTreeError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Vector store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Fixed vector dimension
    pub dimension: usize,

    /// Reference vector (empty means all zeros)
    #[serde(default)]
    pub reference: Vec<f32>,

    /// Per-k slope of the top-k search radius estimate
    pub radius_slope: f64,

    /// Constant bias of the top-k search radius estimate
    pub radius_bias: f64,

    /// Metric used when a query does not name one
    pub default_metric: String,

    /// Log level
    pub log_level: String,

    /// Log directory (console only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dimension: 8,
            reference: Vec::new(),
            radius_slope: 0.05,
            radius_bias: 1e-9,
            default_metric: "cosine".to_string(),
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl StoreConfig {
    /// Load configuration from environment variables and .env file
    pub fn from_env() -> Result<Self, TwinTreeError> {
        // Load .env file (ignore if not exists)
        let _ = dotenv::dotenv();

        let defaults = Self::default();
        let config = Self {
            dimension: Self::parse_env("TWINTREE_DIMENSION")?.unwrap_or(defaults.dimension),
            reference: match std::env::var("TWINTREE_REFERENCE") {
                Ok(raw) => parse_vector(&raw)?,
                Err(_) => defaults.reference,
            },
            radius_slope: Self::parse_env("TWINTREE_RADIUS_SLOPE")?
                .unwrap_or(defaults.radius_slope),
            radius_bias: Self::parse_env("TWINTREE_RADIUS_BIAS")?
                .unwrap_or(defaults.radius_bias),
            default_metric: std::env::var("TWINTREE_METRIC")
                .unwrap_or(defaults.default_metric),
            log_level: std::env::var("TWINTREE_LOG_LEVEL")
                .unwrap_or(defaults.log_level),
            log_dir: std::env::var("TWINTREE_LOG_DIR").ok().map(PathBuf::from),
        };

        config.validate()?;
        Ok(config)
    }

    /// Parse an optional typed value from an environment variable
    fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>, TwinTreeError> {
        match std::env::var(key) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| TwinTreeError::config(format!("{} has invalid value '{}'", key, raw))),
            Err(_) => Ok(None),
        }
    }

    /// Reference vector resolved against the dimension
    pub fn reference_or_origin(&self) -> Vec<f32> {
        if self.reference.is_empty() {
            vec![0.0; self.dimension]
        } else {
            self.reference.clone()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), TwinTreeError> {
        if self.dimension == 0 {
            return Err(TwinTreeError::config("Dimension must be positive"));
        }

        if !self.reference.is_empty() && self.reference.len() != self.dimension {
            return Err(TwinTreeError::config(format!(
                "Reference vector has {} components, dimension is {}",
                self.reference.len(),
                self.dimension
            )));
        }

        for (name, value) in [("radius_slope", self.radius_slope), ("radius_bias", self.radius_bias)] {
            if !value.is_finite() || value < 0.0 {
                return Err(TwinTreeError::config(format!(
                    "{} must be a finite non-negative number",
                    name
                )));
            }
        }

        Ok(())
    }
}

/// Parse a comma-separated list of floats, e.g. `"0.5, 1, -2"`
pub fn parse_vector(raw: &str) -> Result<Vec<f32>, TwinTreeError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f32>()
                .map_err(|_| TwinTreeError::config(format!("'{}' is not a number", s)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.dimension, 8);
        assert_eq!(config.default_metric, "cosine");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reference_or_origin() {
        let mut config = StoreConfig::default();
        config.dimension = 3;
        assert_eq!(config.reference_or_origin(), vec![0.0, 0.0, 0.0]);

        config.reference = vec![1.0, 2.0, 3.0];
        assert_eq!(config.reference_or_origin(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_validate() {
        let mut config = StoreConfig::default();
        config.dimension = 0;
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.reference = vec![1.0, 2.0];
        assert!(config.validate().is_err());

        let mut config = StoreConfig::default();
        config.radius_slope = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_vector() {
        assert_eq!(parse_vector("0.5, 1,-2").unwrap(), vec![0.5, 1.0, -2.0]);
        assert_eq!(parse_vector("").unwrap(), Vec::<f32>::new());
        assert!(parse_vector("1,x").is_err());
    }
}
