//! Error types for the prediction pipeline.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, BbbError>;

/// Everything that can go wrong between a SMILES string and a verdict.
#[derive(Error, Debug)]
pub enum BbbError {
    /// One input could not be processed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A model or the scaler is missing or malformed.
    #[error("model unavailable: {0}")]
    ResourceUnavailable(String),

    /// The scaler was used before being fitted or loaded.
    #[error("scaling error: {0}")]
    Scaling(String),

    /// A vector or matrix had the wrong width.
    #[error("shape mismatch: {0}")]
    Shape(String),

    /// Fitting a model failed.
    #[error("training error: {0}")]
    Training(String),

    /// Filesystem failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON model or scaler file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed CSV input.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Malformed configuration file.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl BbbError {
    /// Whether the error means the models or scaler cannot be used at all,
    /// as opposed to a problem with one input.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, BbbError::ResourceUnavailable(_) | BbbError::Scaling(_))
    }
}

impl From<ndarray::ShapeError> for BbbError {
    fn from(e: ndarray::ShapeError) -> Self {
        BbbError::Shape(e.to_string())
    }
}

impl From<linfa_linear::LinearError<f64>> for BbbError {
    fn from(e: linfa_linear::LinearError<f64>) -> Self {
        BbbError::Training(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_resource_errors_are_unavailable() {
        assert!(BbbError::ResourceUnavailable("x".into()).is_unavailable());
        assert!(BbbError::Scaling("x".into()).is_unavailable());
        assert!(!BbbError::Shape("x".into()).is_unavailable());
        assert!(!BbbError::InvalidInput("x".into()).is_unavailable());
    }
}
