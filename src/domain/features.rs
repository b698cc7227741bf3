//! Feature encoding for the risk classifier.
//!
//! The vector layout is the contract with the model artifact: changing the
//! order or length requires a re-exported model.

use serde::{Deserialize, Serialize};

use super::health::{
    bmi, gender_code, BloodPressure, BmiCategory, CategoricalField, Defaulted, InputDiagnostic,
    RawHealthInput,
};

/// Number of features the classifier consumes.
pub const FEATURE_COUNT: usize = 12;

/// Feature names in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "gender",
    "bmi",
    "bmi_category",
    "cholesterol_level",
    "blood_sugar",
    "smoking",
    "alcohol",
    "exercise",
    "sleep_hrs",
    "systolic",
    "diastolic",
];

/// Fixed-order numeric encoding of one assessment request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Value at a schema position, `None` past the end.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<f64> {
        self.0.get(index).copied()
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }
}

/// Output of [`FeatureEncoder::encode`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures {
    pub vector: FeatureVector,
    pub bmi: f64,
    pub bmi_category: BmiCategory,
    pub blood_pressure: BloodPressure,
    /// Defaults substituted while encoding, in field order.
    pub diagnostics: Vec<InputDiagnostic>,
}

/// Turns raw inputs into the classifier's feature vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureEncoder;

impl FeatureEncoder {
    /// Encode an input. Never fails; see `EncodedFeatures::diagnostics`.
    ///
    /// Numeric inputs are passed through without range checks.
    #[must_use]
    pub fn encode(input: &RawHealthInput) -> EncodedFeatures {
        let mut diagnostics = Vec::new();
        let mut take = |parsed: Defaulted<f64>| {
            diagnostics.extend(parsed.diagnostic);
            parsed.value
        };

        let body_mass = bmi(input.weight_kg, input.height_cm);
        let bmi_category = BmiCategory::from_bmi(body_mass);

        let cholesterol = take(CategoricalField::Cholesterol.encode(&input.cholesterol_level));
        let blood_sugar = take(CategoricalField::BloodSugar.encode(&input.blood_sugar));
        let smoking = take(CategoricalField::Smoking.encode(&input.smoking));
        let alcohol = take(CategoricalField::Alcohol.encode(&input.alcohol));
        let exercise = take(CategoricalField::Exercise.encode(&input.exercise));

        let Defaulted {
            value: blood_pressure,
            diagnostic,
        } = BloodPressure::parse(&input.blood_pressure);
        diagnostics.extend(diagnostic);

        let vector = FeatureVector([
            input.age,
            gender_code(&input.gender),
            body_mass,
            bmi_category.code(),
            cholesterol,
            blood_sugar,
            smoking,
            alcohol,
            exercise,
            input.sleep_hrs,
            blood_pressure.systolic,
            blood_pressure.diastolic,
        ]);

        EncodedFeatures {
            vector,
            bmi: body_mass,
            bmi_category,
            blood_pressure,
            diagnostics,
        }
    }
}
