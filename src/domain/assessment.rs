//! Classifier labels and the risk assessment decoded from them.

use serde::{Deserialize, Serialize};

/// Number of labels the classifier emits per request.
pub const LABEL_COUNT: usize = 5;

/// Risk level classification for a single disease.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Low chance of the disease
    #[serde(rename = "Low Chance", alias = "Low")]
    Low,
    /// Medium chance, lifestyle correction advised
    #[serde(rename = "Medium Chance", alias = "Medium")]
    Medium,
    /// High chance, medical consultation advised
    #[serde(rename = "High Chance", alias = "High")]
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];

    /// Decode a validated label.
    fn from_label(label: u8) -> Self {
        match label {
            0 => Self::Low,
            1 => Self::Medium,
            _ => Self::High,
        }
    }

    #[must_use]
    pub fn index(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }

    /// Linear score used for aggregation.
    #[must_use]
    pub fn percent(self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 50,
            Self::High => 100,
        }
    }

    /// Human-readable label shown with results.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low Chance",
            Self::Medium => "Medium Chance",
            Self::High => "High Chance",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" | "Low Chance" => Ok(Self::Low),
            "Medium" | "Medium Chance" => Ok(Self::Medium),
            "High" | "High Chance" => Ok(Self::High),
            other => Err(format!("unknown risk level {other:?}")),
        }
    }
}

/// Diseases tracked by the classifier, in label order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Disease {
    /// Chronic respiratory disease
    Crd,
    Heart,
    Diabetes,
    Liver,
}

impl Disease {
    pub const ALL: [Disease; 4] = [Disease::Crd, Disease::Heart, Disease::Diabetes, Disease::Liver];

    /// Position of this disease in the label sequence.
    #[must_use]
    pub fn label_index(self) -> usize {
        match self {
            Self::Crd => 1,
            Self::Heart => 2,
            Self::Diabetes => 3,
            Self::Liver => 4,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Crd => "CRD",
            Self::Heart => "Heart",
            Self::Diabetes => "Diabetes",
            Self::Liver => "Liver",
        }
    }
}

impl std::fmt::Display for Disease {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The classifier broke its output contract.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("expected {LABEL_COUNT} labels, got {0}")]
    LabelCount(usize),

    #[error("label {value} at position {index} is outside 0..=2")]
    LabelOutOfRange { index: usize, value: i64 },
}

/// Validated classifier output: five labels, each 0, 1 or 2.
///
/// Position 0 is reserved and ignored downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i64>", into = "Vec<i64>")]
pub struct PredictionLabels([u8; LABEL_COUNT]);

impl PredictionLabels {
    #[must_use]
    pub fn as_array(&self) -> [u8; LABEL_COUNT] {
        self.0
    }

    #[must_use]
    pub fn level(&self, disease: Disease) -> RiskLevel {
        RiskLevel::from_label(self.0[disease.label_index()])
    }
}

impl TryFrom<Vec<i64>> for PredictionLabels {
    type Error = ContractViolation;

    fn try_from(raw: Vec<i64>) -> Result<Self, Self::Error> {
        if raw.len() != LABEL_COUNT {
            return Err(ContractViolation::LabelCount(raw.len()));
        }
        let mut labels = [0u8; LABEL_COUNT];
        for (index, (slot, &value)) in labels.iter_mut().zip(raw.iter()).enumerate() {
            *slot = match value {
                0..=2 => value as u8,
                _ => return Err(ContractViolation::LabelOutOfRange { index, value }),
            };
        }
        Ok(Self(labels))
    }
}

impl From<PredictionLabels> for Vec<i64> {
    fn from(labels: PredictionLabels) -> Self {
        labels.0.iter().map(|&l| i64::from(l)).collect()
    }
}

/// Decoded multi-disease risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Raw classifier output, reserved slot included.
    pub encoded: PredictionLabels,
    pub overall_risk: RiskLevel,
    pub crd_risk: RiskLevel,
    pub heart_risk: RiskLevel,
    pub diabetes_risk: RiskLevel,
    pub liver_risk: RiskLevel,
    /// Labels 1..=4 (CRD, Heart, Diabetes, Liver).
    pub risk_values: [u8; 4],
    pub avg_risk_percent: u8,
    pub overall_health_percent: u8,
    pub overall_risk_index: u8,
}

impl RiskAssessment {
    /// Decode classifier labels into levels and aggregate scores.
    #[must_use]
    pub fn decode(labels: &PredictionLabels) -> Self {
        let levels = Disease::ALL.map(|d| labels.level(d));

        let overall_risk = levels.iter().copied().max().unwrap_or(RiskLevel::Low);

        let percent_sum: u32 = levels.iter().map(|l| u32::from(l.percent())).sum();
        // Sum is a multiple of 50, so the mean is exact in f64. Ties go to even.
        let avg = (f64::from(percent_sum) / Disease::ALL.len() as f64).round_ties_even();
        let avg_risk_percent = avg.clamp(0.0, 100.0) as u8;
        let overall_health_percent = 100u8.saturating_sub(avg_risk_percent);

        Self {
            encoded: *labels,
            overall_risk,
            crd_risk: levels[0],
            heart_risk: levels[1],
            diabetes_risk: levels[2],
            liver_risk: levels[3],
            risk_values: levels.map(RiskLevel::index),
            avg_risk_percent,
            overall_health_percent,
            overall_risk_index: overall_risk.index(),
        }
    }

    #[must_use]
    pub fn level(&self, disease: Disease) -> RiskLevel {
        match disease {
            Disease::Crd => self.crd_risk,
            Disease::Heart => self.heart_risk,
            Disease::Diabetes => self.diabetes_risk,
            Disease::Liver => self.liver_risk,
        }
    }

    /// Per-disease percentages in label order.
    #[must_use]
    pub fn percents(&self) -> [u8; 4] {
        Disease::ALL.map(|d| self.level(d).percent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(raw: [i64; 5]) -> PredictionLabels {
        PredictionLabels::try_from(raw.to_vec()).expect("Valid labels")
    }

    #[test]
    fn test_decode_scenario() {
        let assessment = RiskAssessment::decode(&labels([0, 2, 2, 2, 1]));

        assert_eq!(assessment.crd_risk, RiskLevel::High);
        assert_eq!(assessment.heart_risk, RiskLevel::High);
        assert_eq!(assessment.diabetes_risk, RiskLevel::High);
        assert_eq!(assessment.liver_risk, RiskLevel::Medium);
        assert_eq!(assessment.overall_risk, RiskLevel::High);
        assert_eq!(assessment.overall_risk_index, 2);
        assert_eq!(assessment.percents(), [100, 100, 100, 50]);
        assert_eq!(assessment.avg_risk_percent, 88);
        assert_eq!(assessment.overall_health_percent, 12);
        assert_eq!(assessment.risk_values, [2, 2, 2, 1]);
    }

    #[test]
    fn test_reserved_slot_is_ignored() {
        let a = RiskAssessment::decode(&labels([0, 0, 1, 0, 0]));
        let b = RiskAssessment::decode(&labels([2, 0, 1, 0, 0]));
        assert_eq!(a.overall_risk, b.overall_risk);
        assert_eq!(a.avg_risk_percent, b.avg_risk_percent);
        assert_eq!(b.overall_risk, RiskLevel::Medium);
    }

    #[test]
    fn test_overall_is_max_and_scores_hold_for_all_labels() {
        for a in 0..3 {
            for b in 0..3 {
                for c in 0..3 {
                    for d in 0..3 {
                        let decoded = RiskAssessment::decode(&labels([0, a, b, c, d]));
                        let max = *[a, b, c, d].iter().max().expect("non-empty");
                        assert_eq!(i64::from(decoded.overall_risk_index), max);
                        assert_eq!(i64::from(decoded.overall_risk.index()), max);

                        let mean = [a, b, c, d].iter().map(|l| l * 50).sum::<i64>() as f64 / 4.0;
                        assert_eq!(f64::from(decoded.avg_risk_percent), mean.round_ties_even());
                        assert_eq!(
                            decoded.overall_health_percent,
                            100 - decoded.avg_risk_percent
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_average_rounds_half_to_even() {
        // One Medium: 12.5 -> 12
        assert_eq!(RiskAssessment::decode(&labels([0, 1, 0, 0, 0])).avg_risk_percent, 12);
        // 37.5 -> 38
        assert_eq!(RiskAssessment::decode(&labels([0, 1, 1, 1, 0])).avg_risk_percent, 38);
        // 62.5 -> 62
        assert_eq!(RiskAssessment::decode(&labels([0, 2, 2, 1, 0])).avg_risk_percent, 62);
        let all_high = RiskAssessment::decode(&labels([0, 2, 2, 2, 2]));
        assert_eq!(all_high.avg_risk_percent, 100);
        assert_eq!(all_high.overall_health_percent, 0);
    }

    #[test]
    fn test_labels_contract_violations() {
        assert_eq!(
            PredictionLabels::try_from(vec![0, 1, 2, 0]),
            Err(ContractViolation::LabelCount(4))
        );
        assert_eq!(
            PredictionLabels::try_from(vec![0, 1, 3, 0, 0]),
            Err(ContractViolation::LabelOutOfRange { index: 2, value: 3 })
        );
        assert_eq!(
            PredictionLabels::try_from(vec![0, -1, 0, 0, 0]),
            Err(ContractViolation::LabelOutOfRange { index: 1, value: -1 })
        );
    }

    #[test]
    fn test_labels_serde_validates() {
        let json = serde_json::to_string(&labels([0, 1, 2, 0, 1])).expect("serialize");
        assert_eq!(json, "[0,1,2,0,1]");
        assert!(serde_json::from_str::<PredictionLabels>("[0,1,5,0,1]").is_err());
    }

    #[test]
    fn test_risk_level_parse() {
        assert_eq!("High Chance".parse::<RiskLevel>(), Ok(RiskLevel::High));
        assert_eq!("Low".parse::<RiskLevel>(), Ok(RiskLevel::Low));
        assert!("Severe".parse::<RiskLevel>().is_err());
    }

    #[test]
    fn test_stored_levels_use_display_labels() {
        let doc = serde_json::to_value(RiskAssessment::decode(&labels([0, 2, 2, 2, 1])))
            .expect("serialize");
        assert_eq!(doc["overall_risk"], "High Chance");
        assert_eq!(doc["liver_risk"], "Medium Chance");

        let back: RiskLevel = serde_json::from_str("\"Low\"").expect("short name still reads");
        assert_eq!(back, RiskLevel::Low);
        assert_eq!(
            serde_json::to_string(&RiskLevel::Low).expect("serialize"),
            "\"Low Chance\""
        );
    }
}
