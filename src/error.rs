//! Error handling for Neura
//!
//! Every error is a load-time error: a model that constructed successfully
//! is guaranteed to accept any input of the declared width, so `forward()`
//! and `reset()` have no failure path at all.

use thiserror::Error;

/// Result type alias for Neura operations
pub type Result<T> = std::result::Result<T, ModelLoadError>;

/// Errors raised while parsing a model document or constructing a model
///
/// Loading is all-or-nothing: on any of these, no partially-built model is
/// returned to the caller.
#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("unknown layer kind '{kind}' at layer {index}")]
    UnknownLayerKind { index: usize, kind: String },

    #[error("shape mismatch at layer {index} ({kind}): {field} expected {expected}, got {actual}")]
    ShapeMismatch {
        index: usize,
        kind: &'static str,
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("malformed weight data at layer {index}: {reason}")]
    MalformedWeightData { index: usize, reason: String },

    #[error("topology mismatch at layer {index}: expected {expected}, got {actual}")]
    TopologyMismatch {
        index: usize,
        expected: String,
        actual: String,
    },

    #[error("malformed model document: {0}")]
    Document(#[from] serde_json::Error),
}

impl ModelLoadError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ModelLoadError::UnknownLayerKind { .. } => "UNKNOWN_LAYER_KIND",
            ModelLoadError::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            ModelLoadError::MalformedWeightData { .. } => "MALFORMED_WEIGHT_DATA",
            ModelLoadError::TopologyMismatch { .. } => "TOPOLOGY_MISMATCH",
            ModelLoadError::Document(_) => "MALFORMED_DOCUMENT",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = ModelLoadError::UnknownLayerKind {
            index: 2,
            kind: "lstm".to_string(),
        };
        assert_eq!(err.error_code(), "UNKNOWN_LAYER_KIND");
        assert!(err.to_string().contains("lstm"));
        assert!(err.to_string().contains("layer 2"));
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = ModelLoadError::ShapeMismatch {
            index: 0,
            kind: "dense",
            field: "bias",
            expected: 8,
            actual: 4,
        };
        assert_eq!(err.error_code(), "SHAPE_MISMATCH");
        assert!(err.to_string().contains("expected 8, got 4"));
    }
}
