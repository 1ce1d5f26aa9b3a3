//! Domain analyzers for cost-optimization recommendations
//!
//! Each analyzer is an independent pure function over the shared immutable
//! batch: no analyzer reads another's output, so they can run in parallel
//! worker tasks and converge only at the ranker.

mod commitment;
mod database;
mod idle;
mod rightsizing;
mod storage;

pub use commitment::CommitmentEstimator;
pub use database::DatabaseOptimizer;
pub use idle::IdleResourceDetector;
pub use rightsizing::RightsizingAnalyzer;
pub use storage::StorageOptimizer;

use serde::{Deserialize, Serialize};

use crate::batch::AnalysisBatch;
use crate::error::AbstainReason;
use crate::models::{Category, Recommendation};

/// A resource or service an analyzer declined to evaluate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abstention {
    /// Resource id, or service name for the commitment category
    pub subject: String,
    pub category: Category,
    pub reason: AbstainReason,
}

/// One analyzer's recommendations and abstentions for a batch
#[derive(Debug, Clone, Default)]
pub struct AnalyzerOutput {
    pub recommendations: Vec<Recommendation>,
    pub abstentions: Vec<Abstention>,
}

impl AnalyzerOutput {
    pub fn merge(outputs: Vec<AnalyzerOutput>) -> AnalyzerOutput {
        let mut merged = AnalyzerOutput::default();
        for mut output in outputs {
            merged.recommendations.append(&mut output.recommendations);
            merged.abstentions.append(&mut output.abstentions);
        }
        merged
    }
}

/// A recommendation source evaluated against a batch
pub trait Analyzer: Send + Sync {
    fn category(&self) -> Category;

    /// Evaluate the batch; must be side-effect-free over its inputs
    fn analyze(&self, batch: &AnalysisBatch) -> AnalyzerOutput;
}
