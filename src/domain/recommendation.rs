//! Advisory texts keyed by topic and risk level.
//!
//! The table is fixed: four diseases plus the overall profile, three levels
//! each. Lookups are an exhaustive `match`, so no pair can be unmapped.

use serde::{Deserialize, Serialize};

use super::assessment::{Disease, RiskAssessment, RiskLevel};

/// What a recommendation is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdviceTopic {
    Crd,
    Heart,
    Diabetes,
    Liver,
    Overall,
}

impl AdviceTopic {
    pub const ALL: [AdviceTopic; 5] = [
        AdviceTopic::Crd,
        AdviceTopic::Heart,
        AdviceTopic::Diabetes,
        AdviceTopic::Liver,
        AdviceTopic::Overall,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Crd => "CRD",
            Self::Heart => "Heart",
            Self::Diabetes => "Diabetes",
            Self::Liver => "Liver",
            Self::Overall => "Overall",
        }
    }
}

impl From<Disease> for AdviceTopic {
    fn from(disease: Disease) -> Self {
        match disease {
            Disease::Crd => Self::Crd,
            Disease::Heart => Self::Heart,
            Disease::Diabetes => Self::Diabetes,
            Disease::Liver => Self::Liver,
        }
    }
}

/// A name-based lookup asked for a pair outside the table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no recommendation for topic {topic:?} at level {level:?}")]
pub struct UnknownAdvice {
    pub topic: String,
    pub level: String,
}

/// Advisory text for a topic at a given level.
#[must_use]
pub fn recommend(topic: AdviceTopic, level: RiskLevel) -> &'static str {
    use AdviceTopic as T;
    use RiskLevel as L;

    match (topic, level) {
        (T::Crd, L::High) => "Your lungs are at serious risk due to your smoking/activity profile. QUIT nicotine immediately, avoid pollution exposure, use mask outside and schedule Pulmonologist check-up within 2 weeks.",
        (T::Crd, L::Medium) => "Respiratory health is sliding. Reduce smoking frequency, start daily 25 minute brisk walk, add steam inhalation and deep breathing exercises.",
        (T::Crd, L::Low) => "Your lungs are performing in safe zone. Continue regular aerobic exercise to maintain lung elasticity and oxygen exchange efficiency.",

        (T::Heart, L::High) => "Heart risk extremely high. Your BP/Cholestrol pattern is dangerous. Shift to low-salt, low-saturated fat diet, avoid deep fried food, start immediate cardiology consultation.",
        (T::Heart, L::Medium) => "Heart strain exists. Monitor BP weekly, take 30 minute brisk walk 5 days/week, reduce processed sugar and sodium intake.",
        (T::Heart, L::Low) => "Your cardiac risk is under control. Maintain balanced diet, remain physically active and continue routine health checks every 6 months.",

        (T::Diabetes, L::High) => "Very high glycemic stress detected. Switch to complex carbs only, avoid sugary drinks, include fiber rich food and mandatory morning walk daily. Consult endocrinologist soon.",
        (T::Diabetes, L::Medium) => "Borderline diabetic pattern forming. Focus on weight reduction 5-10%, cut night eating and limit sweet/snacks intake.",
        (T::Diabetes, L::Low) => "Blood sugar behaviour stable. Maintain consistent meals timing and avoid over-refined foods.",

        (T::Liver, L::High) => "Severe liver burden suspected. Stop alcohol immediately, reduce fatty/oily food, increase hydration and consult gastro/hepatologist urgently.",
        (T::Liver, L::Medium) => "Liver stress developing. Reduce weekly alcohol units, include antioxidant rich fruits (blueberry, pomegranate) and avoid heavy fried food.",
        (T::Liver, L::Low) => "Liver functioning within safe zone. Maintain hydration, keep balanced diet and avoid unnecessary medication load.",

        (T::Overall, L::High) => "Multiple system risks detected together. Immediate lifestyle correction required across smoking, diet, sugar and alcohol domains. Doctor evaluation required soon.",
        (T::Overall, L::Medium) => "Few risk areas are rising. Prioritize early correction to prevent chronic disease formation.",
        (T::Overall, L::Low) => "Overall body risk profile healthy. Maintain consistency.",
    }
}

/// Name-based lookup, e.g. `("Heart", "High Chance")`.
///
/// # Errors
/// Returns `UnknownAdvice` when either name is outside the table.
pub fn recommend_named(topic: &str, level: &str) -> Result<&'static str, UnknownAdvice> {
    let unknown = || UnknownAdvice {
        topic: topic.to_string(),
        level: level.to_string(),
    };
    let topic_key = AdviceTopic::ALL
        .into_iter()
        .find(|t| t.name() == topic)
        .ok_or_else(unknown)?;
    let level_key = level.parse::<RiskLevel>().map_err(|_| unknown())?;
    Ok(recommend(topic_key, level_key))
}

/// The five texts attached to one assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendations {
    pub overall: String,
    pub crd: String,
    pub heart: String,
    pub diabetes: String,
    pub liver: String,
}

impl Recommendations {
    #[must_use]
    pub fn for_assessment(assessment: &RiskAssessment) -> Self {
        let text = |d: Disease| recommend(d.into(), assessment.level(d)).to_string();
        Self {
            overall: recommend(AdviceTopic::Overall, assessment.overall_risk).to_string(),
            crd: text(Disease::Crd),
            heart: text(Disease::Heart),
            diabetes: text(Disease::Diabetes),
            liver: text(Disease::Liver),
        }
    }
}
