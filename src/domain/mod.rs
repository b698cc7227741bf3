//! Domain layer: Core business types and logic.
//!
//! Pure Rust types with no I/O. The assessment pipeline is
//! encode → (model) → decode → recommend → assemble.

mod assessment;
mod features;
mod health;
mod recommendation;
mod record;

pub use assessment::{
    ContractViolation, Disease, PredictionLabels, RiskAssessment, RiskLevel, LABEL_COUNT,
};
pub use features::{EncodedFeatures, FeatureEncoder, FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use health::{
    bmi, gender_code, BloodPressure, BmiCategory, CategoricalField, Defaulted, InputDiagnostic,
    RawHealthInput,
};
pub use recommendation::{recommend, recommend_named, AdviceTopic, Recommendations, UnknownAdvice};
pub use record::{PredictionRecord, RecordAssembler, RecordedInputs};
