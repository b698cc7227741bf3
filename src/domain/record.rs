//! Immutable prediction snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::assessment::RiskAssessment;
use super::features::EncodedFeatures;
use super::health::{BmiCategory, RawHealthInput};
use super::recommendation::Recommendations;

/// Inputs as submitted, plus derived body metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedInputs {
    #[serde(flatten)]
    pub raw: RawHealthInput,
    /// BMI rounded to two decimals.
    #[serde(rename = "BMI")]
    pub bmi: f64,
    #[serde(rename = "BMI_Category")]
    pub bmi_category: BmiCategory,
}

/// One assessment, as appended to a user's history.
///
/// Fields are private: a record is never changed after assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    id: String,
    timestamp: DateTime<Utc>,
    inputs: RecordedInputs,
    predictions: RiskAssessment,
    recommendations: Recommendations,
}

impl PredictionRecord {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Creation time (UTC).
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn inputs(&self) -> &RecordedInputs {
        &self.inputs
    }

    #[must_use]
    pub fn predictions(&self) -> &RiskAssessment {
        &self.predictions
    }

    #[must_use]
    pub fn recommendations(&self) -> &Recommendations {
        &self.recommendations
    }
}

/// Builds [`PredictionRecord`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordAssembler;

impl RecordAssembler {
    /// Assemble a record stamped with the current UTC time.
    #[must_use]
    pub fn assemble(
        input: RawHealthInput,
        encoded: &EncodedFeatures,
        assessment: RiskAssessment,
        recommendations: Recommendations,
    ) -> PredictionRecord {
        Self::assemble_at(input, encoded, assessment, recommendations, Utc::now())
    }

    #[must_use]
    pub fn assemble_at(
        input: RawHealthInput,
        encoded: &EncodedFeatures,
        assessment: RiskAssessment,
        recommendations: Recommendations,
        timestamp: DateTime<Utc>,
    ) -> PredictionRecord {
        PredictionRecord {
            id: uuid_v4(),
            timestamp,
            inputs: RecordedInputs {
                raw: input,
                bmi: round2(encoded.bmi),
                bmi_category: encoded.bmi_category,
            },
            predictions: assessment,
            recommendations,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Random UUID v4 from a CSPRNG seeded by the OS.
fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let bytes: [u8; 16] = rng.gen();

    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3],
        bytes[4], bytes[5],
        (bytes[6] & 0x0f) | 0x40, bytes[7],
        (bytes[8] & 0x3f) | 0x80, bytes[9],
        bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::assessment::PredictionLabels;
    use crate::domain::features::tests::scenario_input;
    use crate::domain::features::FeatureEncoder;

    /// A scenario record with the given labels and timestamp.
    pub(crate) fn record_at(labels: [i64; 5], timestamp: DateTime<Utc>) -> PredictionRecord {
        let input = scenario_input();
        let encoded = FeatureEncoder::encode(&input);
        let labels = PredictionLabels::try_from(labels.to_vec()).expect("Valid labels");
        let assessment = RiskAssessment::decode(&labels);
        let recs = Recommendations::for_assessment(&assessment);
        RecordAssembler::assemble_at(input, &encoded, assessment, recs, timestamp)
    }

    #[test]
    fn test_assemble_scenario() {
        let ts = DateTime::parse_from_rfc3339("2024-03-01T10:00:00Z")
            .expect("timestamp")
            .with_timezone(&Utc);
        let record = record_at([0, 2, 2, 2, 1], ts);

        assert_eq!(record.timestamp(), ts);
        assert_eq!(record.inputs().bmi, 31.14);
        assert_eq!(record.inputs().bmi_category, BmiCategory::Obese);
        assert_eq!(record.inputs().raw.blood_pressure, "140/95");
        assert_eq!(record.predictions().overall_health_percent, 12);
        assert_eq!(record.id().len(), 36);
    }

    #[test]
    fn test_record_ids_are_unique() {
        let now = Utc::now();
        assert_ne!(record_at([0; 5], now).id(), record_at([0; 5], now).id());
    }

    #[test]
    fn test_document_shape() {
        let record = record_at([0, 1, 0, 0, 0], Utc::now());
        let doc = serde_json::to_value(&record).expect("serialize");

        assert_eq!(doc["inputs"]["BMI_Category"], "Obese");
        assert_eq!(doc["inputs"]["height_cm"], 170.0);
        assert_eq!(doc["predictions"]["encoded"], serde_json::json!([0, 1, 0, 0, 0]));
        assert_eq!(doc["predictions"]["avg_risk_percent"], 12);
        assert!(doc["recommendations"]["overall"].is_string());

        let back: PredictionRecord = serde_json::from_value(doc).expect("deserialize");
        assert_eq!(back.id(), record.id());
        assert_eq!(back.timestamp(), record.timestamp());
        assert_eq!(back.predictions(), record.predictions());
        assert_eq!(back.recommendations(), record.recommendations());
    }
}
