//! Self-reported health inputs and the derived body metrics.
//!
//! Categorical fields keep the submitted text verbatim. Unrecognised values are
//! tolerated everywhere: parsing returns a [`Defaulted`] value that carries the
//! substituted default together with an [`InputDiagnostic`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::MedipredictError;

/// Raw assessment request as submitted by the user.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct RawHealthInput {
    pub name: String,
    pub age: f64,
    pub gender: String,
    #[serde(alias = "height")]
    pub height_cm: f64,
    #[serde(alias = "weight")]
    pub weight_kg: f64,
    /// `systolic/diastolic`, e.g. `120/80`
    pub blood_pressure: String,
    pub cholesterol_level: String,
    pub blood_sugar: String,
    pub sleep_hrs: f64,
    pub exercise: String,
    pub smoking: String,
    pub alcohol: String,
}

// Name is PII; keep it out of `{:?}` log lines.
impl std::fmt::Debug for RawHealthInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawHealthInput")
            .field("name", &"[REDACTED]")
            .field("age", &self.age)
            .field("gender", &self.gender)
            .field("height_cm", &self.height_cm)
            .field("weight_kg", &self.weight_kg)
            .field("blood_pressure", &self.blood_pressure)
            .field("cholesterol_level", &self.cholesterol_level)
            .field("blood_sugar", &self.blood_sugar)
            .field("sleep_hrs", &self.sleep_hrs)
            .field("exercise", &self.exercise)
            .field("smoking", &self.smoking)
            .field("alcohol", &self.alcohol)
            .finish()
    }
}

impl RawHealthInput {
    /// Build an input from flat form fields (all values as text).
    ///
    /// `height`/`weight` are accepted as aliases of `height_cm`/`weight_kg`.
    ///
    /// # Errors
    /// Returns `MedipredictError::Validation` if a field is missing or a
    /// numeric field is not a number.
    pub fn from_form(form: &HashMap<String, String>) -> Result<Self, MedipredictError> {
        let text = |keys: &[&str]| -> Result<String, MedipredictError> {
            keys.iter()
                .find_map(|k| form.get(*k))
                .cloned()
                .ok_or_else(|| MedipredictError::Validation(format!("missing field `{}`", keys[0])))
        };
        let number = |keys: &[&str]| -> Result<f64, MedipredictError> {
            let raw = text(keys)?;
            raw.trim().parse::<f64>().map_err(|_| {
                MedipredictError::Validation(format!("field `{}` is not a number: {raw:?}", keys[0]))
            })
        };

        Ok(Self {
            name: text(&["name"])?,
            age: number(&["age"])?,
            gender: text(&["gender"])?,
            height_cm: number(&["height_cm", "height"])?,
            weight_kg: number(&["weight_kg", "weight"])?,
            blood_pressure: text(&["blood_pressure"])?,
            cholesterol_level: text(&["cholesterol_level"])?,
            blood_sugar: text(&["blood_sugar"])?,
            sleep_hrs: number(&["sleep_hrs"])?,
            exercise: text(&["exercise"])?,
            smoking: text(&["smoking"])?,
            alcohol: text(&["alcohol"])?,
        })
    }
}

/// Note that a tolerant parse substituted a default value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputDiagnostic {
    /// Blood pressure was not `number/number`; both readings became 0.0.
    MalformedBloodPressure { raw: String },
    /// A categorical value is outside its table; code 0 was used.
    UnrecognizedCategory { field: String, value: String },
}

impl std::fmt::Display for InputDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedBloodPressure { raw } => {
                write!(f, "malformed blood pressure {raw:?}, using 0/0")
            }
            Self::UnrecognizedCategory { field, value } => {
                write!(f, "unrecognized {field} value {value:?}, using code 0")
            }
        }
    }
}

/// Value produced by a best-effort parse.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaulted<T> {
    pub value: T,
    pub diagnostic: Option<InputDiagnostic>,
}

impl<T> Defaulted<T> {
    #[must_use]
    pub fn parsed(value: T) -> Self {
        Self {
            value,
            diagnostic: None,
        }
    }

    #[must_use]
    pub fn fallback(value: T, diagnostic: InputDiagnostic) -> Self {
        Self {
            value,
            diagnostic: Some(diagnostic),
        }
    }
}

/// Systolic/diastolic reading in mmHg.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BloodPressure {
    pub systolic: f64,
    pub diastolic: f64,
}

impl BloodPressure {
    /// Parse `systolic/diastolic`. Anything else yields `0.0/0.0`.
    #[must_use]
    pub fn parse(raw: &str) -> Defaulted<Self> {
        let mut parts = raw.split('/');
        let parsed = match (parts.next(), parts.next(), parts.next()) {
            (Some(sys), Some(dia), None) => sys
                .trim()
                .parse::<f64>()
                .ok()
                .zip(dia.trim().parse::<f64>().ok()),
            _ => None,
        };

        match parsed {
            Some((systolic, diastolic)) => Defaulted::parsed(Self {
                systolic,
                diastolic,
            }),
            None => Defaulted::fallback(
                Self::default(),
                InputDiagnostic::MalformedBloodPressure {
                    raw: raw.to_string(),
                },
            ),
        }
    }
}

/// Body-mass-index band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

impl BmiCategory {
    /// Classify a BMI value. Lower bounds are inclusive.
    #[must_use]
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            Self::Underweight
        } else if bmi < 25.0 {
            Self::Normal
        } else if bmi < 30.0 {
            Self::Overweight
        } else {
            Self::Obese
        }
    }

    #[must_use]
    pub fn code(self) -> f64 {
        match self {
            Self::Underweight => 0.0,
            Self::Normal => 1.0,
            Self::Overweight => 2.0,
            Self::Obese => 3.0,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::Normal => "Normal",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        }
    }
}

impl std::fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// BMI from weight (kg) and height (cm). Non-positive height gives 0.0.
#[must_use]
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    if height_cm > 0.0 {
        let height_m = height_cm / 100.0;
        weight_kg / (height_m * height_m)
    } else {
        0.0
    }
}

/// `male` maps to 1; every other value is the baseline 0 and is not reported.
#[must_use]
pub fn gender_code(gender: &str) -> f64 {
    if gender == "male" {
        1.0
    } else {
        0.0
    }
}

/// A categorical form field with a fixed code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoricalField {
    Cholesterol,
    BloodSugar,
    Smoking,
    Alcohol,
    Exercise,
}

impl CategoricalField {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Cholesterol => "cholesterol_level",
            Self::BloodSugar => "blood_sugar",
            Self::Smoking => "smoking",
            Self::Alcohol => "alcohol",
            Self::Exercise => "exercise",
        }
    }

    fn lookup(self, value: &str) -> Option<f64> {
        let code = match (self, value) {
            // Cholesterol codes follow the encoding the model was trained on.
            (Self::Cholesterol, "normal") => 2.0,
            (Self::Cholesterol, "borderline") => 0.0,
            (Self::Cholesterol, "high") => 1.0,
            (Self::BloodSugar, "normal") => 0.0,
            (Self::BloodSugar, "prediabetic") => 3.0,
            (Self::BloodSugar, "diabetic") => 6.0,
            (Self::Smoking | Self::Alcohol, "no") => 0.0,
            (Self::Smoking | Self::Alcohol, "occasionally") => 1.0,
            (Self::Smoking | Self::Alcohol, "yes") => 2.0,
            (Self::Exercise, "none") => 0.0,
            (Self::Exercise, "moderate") => 1.0,
            (Self::Exercise, "high") => 2.0,
            _ => return None,
        };
        Some(code)
    }

    /// Encode a submitted value. Unknown values fall back to code 0.
    #[must_use]
    pub fn encode(self, value: &str) -> Defaulted<f64> {
        match self.lookup(value) {
            Some(code) => Defaulted::parsed(code),
            None => Defaulted::fallback(
                0.0,
                InputDiagnostic::UnrecognizedCategory {
                    field: self.name().to_string(),
                    value: value.to_string(),
                },
            ),
        }
    }
}
