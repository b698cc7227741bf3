//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

mod assessment;
mod history;

pub use assessment::{AssessmentOutcome, AssessmentService, Evaluation};
pub use history::{HistoryEntry, HistoryView, DISPLAY_TIME_FORMAT};
