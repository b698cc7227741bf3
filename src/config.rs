//! Runtime configuration from `MEDIPREDICT_*` environment variables.

use std::path::PathBuf;

use crate::ports::DEFAULT_HISTORY_LIMIT;
use crate::MedipredictError;

/// Minutes added to stored UTC timestamps for display (UTC+5:30).
pub const DEFAULT_DISPLAY_OFFSET_MINUTES: i64 = 330;

/// What to do when a tolerant parse substitutes a default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackReporting {
    /// Keep diagnostics in the outcome only.
    Silent,
    /// Also emit a `warn` log line per diagnostic.
    #[default]
    Warn,
}

/// Where log output goes. Stdout is reserved for command output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogMode {
    File,
    #[default]
    Stderr,
}

/// Settings consumed by `AssessmentService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentConfig {
    pub fallback_reporting: FallbackReporting,
    /// Entries returned with an assessment.
    pub history_limit: usize,
    pub display_offset_minutes: i64,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            fallback_reporting: FallbackReporting::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            display_offset_minutes: DEFAULT_DISPLAY_OFFSET_MINUTES,
        }
    }
}

/// Process-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub model_path: PathBuf,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    pub assessment: AssessmentConfig,
}

impl AppConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    /// Returns `MedipredictError::Config` for unparsable values.
    pub fn from_env() -> Result<Self, MedipredictError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup.
    ///
    /// # Errors
    /// Returns `MedipredictError::Config` for unparsable values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, MedipredictError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let log_mode = match get("MEDIPREDICT_LOG_MODE").as_deref() {
            None | Some("stderr") => LogMode::Stderr,
            Some("file") => LogMode::File,
            Some(other) => {
                return Err(MedipredictError::Config(format!(
                    "MEDIPREDICT_LOG_MODE must be `file` or `stderr`, got {other:?}"
                )))
            }
        };

        let fallback_reporting = match get("MEDIPREDICT_FALLBACK_REPORTING").as_deref() {
            None | Some("warn") => FallbackReporting::Warn,
            Some("silent") => FallbackReporting::Silent,
            Some(other) => {
                return Err(MedipredictError::Config(format!(
                    "MEDIPREDICT_FALLBACK_REPORTING must be `silent` or `warn`, got {other:?}"
                )))
            }
        };

        let history_limit = match get("MEDIPREDICT_HISTORY_LIMIT") {
            None => DEFAULT_HISTORY_LIMIT,
            Some(v) => v
                .parse::<usize>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    MedipredictError::Config(format!(
                        "MEDIPREDICT_HISTORY_LIMIT must be a positive integer, got {v:?}"
                    ))
                })?,
        };

        let display_offset_minutes = match get("MEDIPREDICT_DISPLAY_OFFSET_MINUTES") {
            None => DEFAULT_DISPLAY_OFFSET_MINUTES,
            Some(v) => v
                .parse::<i64>()
                .ok()
                .filter(|m| m.abs() < 24 * 60)
                .ok_or_else(|| {
                    MedipredictError::Config(format!(
                        "MEDIPREDICT_DISPLAY_OFFSET_MINUTES must be minutes within a day, got {v:?}"
                    ))
                })?,
        };

        Ok(Self {
            db_path: get("MEDIPREDICT_DB_PATH")
                .unwrap_or_else(|| "medipredict.db".to_string())
                .into(),
            model_path: get("MEDIPREDICT_MODEL_PATH")
                .unwrap_or_else(|| "models".to_string())
                .into(),
            log_mode,
            log_file: get("MEDIPREDICT_LOG_FILE")
                .unwrap_or_else(|| "medipredict.log".to_string())
                .into(),
            assessment: AssessmentConfig {
                fallback_reporting,
                history_limit,
                display_offset_minutes,
            },
        })
    }
}
