//! Risk model port: Trait for the pre-trained multi-output classifier.
//!
//! The classifier is an opaque artifact. The pipeline only relies on the
//! input layout (12 features, see `FEATURE_NAMES`) and on the output shape
//! (5 labels in 0..=2), which it validates itself.

use crate::domain::FeatureVector;

/// Errors raised by a classifier implementation.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Model artifact invalid: {0}")]
    InvalidArtifact(String),

    #[error("Model artifact failed integrity check: {0}")]
    Integrity(String),

    #[error("Model traversal failed: {0}")]
    Traversal(String),

    #[error("Model not loaded: {0}")]
    NotLoaded(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for risk classifiers.
///
/// Implementations are loaded once and shared read-only across requests.
pub trait RiskModel: Send + Sync {
    /// Predict one label per output slot.
    ///
    /// The returned sequence is checked by the caller; implementations should
    /// not clamp or coerce labels.
    ///
    /// # Errors
    /// Returns `ModelError` if the model cannot evaluate the features.
    fn predict(&self, features: &FeatureVector) -> Result<Vec<i64>, ModelError>;

    /// Short identifier for logs (e.g. artifact digest).
    fn describe(&self) -> String {
        "risk-model".to_string()
    }
}

impl<M: RiskModel + ?Sized> RiskModel for std::sync::Arc<M> {
    fn predict(&self, features: &FeatureVector) -> Result<Vec<i64>, ModelError> {
        (**self).predict(features)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
