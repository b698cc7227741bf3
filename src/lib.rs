//! # MediPredict
//!
//! Multi-disease risk assessment from self-reported vitals and lifestyle
//! attributes, with an append-only per-user prediction history.
//!
//! This crate provides:
//! - Feature encoding and decoding around a pre-trained multi-output classifier
//! - Deterministic advisory texts per disease and risk level
//! - Immutable prediction records and their storage
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core business types (inputs, features, assessments, records)
//! - `ports`: Trait definitions for the classifier and the history store
//! - `adapters`: Concrete implementations (tree ensemble, SQLite, log sanitizing)
//! - `application`: The assessment use case orchestrating domain and ports
//! - `config`: Environment-driven settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{PredictionRecord, RawHealthInput, RiskAssessment, RiskLevel};

/// Result type for MediPredict operations
pub type Result<T> = std::result::Result<T, MedipredictError>;

/// Main error type for MediPredict
#[derive(Debug, thiserror::Error)]
pub enum MedipredictError {
    #[error("Risk model failed: {0}")]
    Model(#[from] ports::ModelError),

    #[error("Risk model contract violated: {0}")]
    Contract(#[from] domain::ContractViolation),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("Recommendation lookup failed: {0}")]
    Advice(#[from] domain::UnknownAdvice),

    #[error("Invalid assessment request: {0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
