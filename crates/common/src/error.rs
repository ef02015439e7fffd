/// TwinTree error types
#[derive(Debug, thiserror::Error)]
pub enum TwinTreeError {
    /// Positional index outside `[0, len)`
    #[error("Invalid index: {index} (store holds {len} records)")]
    InvalidIndex { index: usize, len: usize },

    /// Unrecognized metric name
    #[error("Invalid metric: {0}")]
    InvalidMetric(String),

    /// Top-k request with `k == 0` or `k > len`
    #[error("Invalid k: {k} (store holds {len} records)")]
    InvalidK { k: usize, len: usize },

    /// Vector length differs from the store dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General error (anyhow integration)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TwinTreeError {
    /// Create invalid index error
    pub fn invalid_index(index: usize, len: usize) -> Self {
        Self::InvalidIndex { index, len }
    }

    /// Create invalid metric error
    pub fn invalid_metric<S: Into<String>>(name: S) -> Self {
        Self::InvalidMetric(name.into())
    }

    /// Create invalid k error
    pub fn invalid_k(k: usize, len: usize) -> Self {
        Self::InvalidK { k, len }
    }

    /// Create dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }

    /// Create config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }
}

impl TwinTreeError {
    /// Short, stable code for the error class
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidIndex { .. } => "invalid_index",
            Self::InvalidMetric(_) => "invalid_metric",
            Self::InvalidK { .. } => "invalid_k",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::Config(_) => "config",
            Self::InvalidInput(_) => "invalid_input",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
            Self::Other(_) => "other",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TwinTreeError::invalid_index(4, 3);
        assert_eq!(err.to_string(), "Invalid index: 4 (store holds 3 records)");

        let err = TwinTreeError::invalid_metric("hamming");
        assert_eq!(err.to_string(), "Invalid metric: hamming");
    }

    #[test]
    fn test_kind() {
        assert_eq!(TwinTreeError::invalid_k(0, 2).kind(), "invalid_k");
        assert_eq!(TwinTreeError::dimension_mismatch(2, 3).kind(), "dimension_mismatch");
        assert_eq!(TwinTreeError::config("bad").kind(), "config");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: TwinTreeError = io.into();
        assert_eq!(err.kind(), "io");
    }
}
