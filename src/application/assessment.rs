//! Assessment service: Orchestrates the risk pipeline.
//!
//! This service coordinates:
//! - Feature encoding (with best-effort defaulting)
//! - Classifier inference and contract checks
//! - Risk decoding and recommendations
//! - Record assembly and history persistence

use std::sync::Arc;

use serde::Serialize;

use crate::config::{AssessmentConfig, FallbackReporting};
use crate::domain::{
    FeatureEncoder, InputDiagnostic, PredictionLabels, PredictionRecord, RawHealthInput,
    RecordAssembler, Recommendations, RiskAssessment,
};
use crate::ports::{HistoryStore, RiskModel};
use crate::MedipredictError;

use super::history::{HistoryEntry, HistoryView};

/// A record produced without touching the history store.
#[derive(Debug, Clone, Serialize)]
pub struct Evaluation {
    pub record: PredictionRecord,
    /// Defaults substituted while encoding the input.
    pub diagnostics: Vec<InputDiagnostic>,
}

/// Everything returned for one assessment request.
#[derive(Debug, Clone, Serialize)]
pub struct AssessmentOutcome {
    pub record: PredictionRecord,
    pub diagnostics: Vec<InputDiagnostic>,
    /// Whether the record reached the history store.
    pub persisted: bool,
    /// Most recent entries first, the new record included when persisted.
    pub history: Vec<HistoryEntry>,
}

/// Service for running risk assessments.
///
/// The model is loaded once by the caller and shared; nothing here is
/// mutable, so one service can serve concurrent requests.
pub struct AssessmentService<M, S>
where
    M: RiskModel,
    S: HistoryStore,
{
    model: Arc<M>,
    store: Arc<S>,
    config: AssessmentConfig,
}

impl<M, S> AssessmentService<M, S>
where
    M: RiskModel,
    S: HistoryStore,
    S::Error: Into<crate::adapters::StorageError>,
{
    /// Create a new assessment service.
    pub fn new(model: Arc<M>, store: Arc<S>, config: AssessmentConfig) -> Self {
        Self {
            model,
            store,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AssessmentConfig {
        &self.config
    }

    /// Run the pipeline up to an assembled record.
    ///
    /// # Errors
    /// Returns `MedipredictError::Model` if the classifier fails and
    /// `MedipredictError::Contract` if its output is malformed.
    pub fn evaluate(&self, input: RawHealthInput) -> Result<Evaluation, MedipredictError> {
        tracing::debug!("Step 1: Encoding features...");
        let encoded = FeatureEncoder::encode(&input);
        if self.config.fallback_reporting == FallbackReporting::Warn {
            for diagnostic in &encoded.diagnostics {
                tracing::warn!("Input fallback: {diagnostic}");
            }
        }

        tracing::debug!("Step 2: Running classifier ({})...", self.model.describe());
        let raw = self.model.predict(&encoded.vector)?;
        let labels = PredictionLabels::try_from(raw).map_err(|e| {
            tracing::error!("Classifier output rejected: {e}");
            MedipredictError::Contract(e)
        })?;

        tracing::debug!("Step 3: Decoding risks and recommendations...");
        let assessment = RiskAssessment::decode(&labels);
        let recommendations = Recommendations::for_assessment(&assessment);

        let diagnostics = encoded.diagnostics.clone();
        let record = RecordAssembler::assemble(input, &encoded, assessment, recommendations);

        Ok(Evaluation {
            record,
            diagnostics,
        })
    }

    /// Assess, append to the user's history and return recent history.
    ///
    /// Storage failures are logged and never fail the assessment.
    ///
    /// # Errors
    /// Same as [`Self::evaluate`].
    pub fn assess(
        &self,
        user_id: &str,
        input: RawHealthInput,
    ) -> Result<AssessmentOutcome, MedipredictError> {
        tracing::info!("Starting risk assessment...");
        let Evaluation {
            record,
            diagnostics,
        } = self.evaluate(input)?;

        tracing::debug!("Step 4: Appending record to history...");
        let persisted = match self.store.append(user_id, &record) {
            Ok(()) => true,
            Err(e) => {
                let e: crate::adapters::StorageError = e.into();
                tracing::warn!("Failed to save prediction to history: {e}");
                false
            }
        };

        let history = self.recent_history(user_id);

        let assessment = record.predictions();
        tracing::info!(
            "Assessment complete: overall={}, avg_risk={}%, health={}%, persisted={}",
            assessment.overall_risk,
            assessment.avg_risk_percent,
            assessment.overall_health_percent,
            persisted
        );

        Ok(AssessmentOutcome {
            record,
            diagnostics,
            persisted,
            history,
        })
    }

    /// Most recent history entries, or empty if the store is unavailable.
    #[must_use]
    pub fn recent_history(&self, user_id: &str) -> Vec<HistoryEntry> {
        match self.store.recent(user_id, self.config.history_limit) {
            Ok(records) => records
                .into_iter()
                .map(|r| HistoryEntry::from_record(r, self.config.display_offset_minutes))
                .collect(),
            Err(e) => {
                let e: crate::adapters::StorageError = e.into();
                tracing::warn!("Failed to fetch history: {e}");
                Vec::new()
            }
        }
    }

    /// Page through a user's full history.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    pub fn history_page(
        &self,
        user_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<HistoryView, MedipredictError> {
        let page = self
            .store
            .page(user_id, offset, limit)
            .map_err(|e| MedipredictError::Storage(e.into()))?;
        Ok(HistoryView::from_page(page, self.config.display_offset_minutes))
    }
}
