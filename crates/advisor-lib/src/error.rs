//! Error taxonomy for the recommendation engine
//!
//! Only caller errors and data corruption are surfaced as errors. Having
//! too little data to evaluate a rule is an abstention, not a failure, and
//! never aborts a batch.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors surfaced by the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// A requested grouping dimension is absent from every cost record
    #[error("unknown grouping dimension: {dimension}")]
    InvalidDimension { dimension: String },

    /// A metric series was rejected at ingestion
    #[error("malformed series for resource {resource_id}: {detail}")]
    MalformedSeries { resource_id: String, detail: String },
}

/// Reason an analyzer declined to evaluate a resource or service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum AbstainReason {
    /// Too few samples to evaluate a rule
    InsufficientData { needed_days: u32, observed_days: u32 },
    /// Too little spend history to size a commitment
    InsufficientHistory { needed_days: u32, observed_days: u32 },
}

impl AbstainReason {
    pub fn summary(&self) -> String {
        match self {
            AbstainReason::InsufficientData {
                needed_days,
                observed_days,
            } => format!(
                "insufficient data: {} of {} required days observed",
                observed_days, needed_days
            ),
            AbstainReason::InsufficientHistory {
                needed_days,
                observed_days,
            } => format!(
                "insufficient history: {} of {} required days observed",
                observed_days, needed_days
            ),
        }
    }
}
