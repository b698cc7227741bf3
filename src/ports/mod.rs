//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the assessment pipeline and the systems it depends on
//! (the pre-trained classifier and the history store).

mod history;
mod risk_model;

pub use history::{HistoryPage, HistoryStore, DEFAULT_HISTORY_LIMIT};
pub use risk_model::{ModelError, RiskModel};
