//! Cost-optimization recommendation engine
//!
//! This crate provides the core functionality for:
//! - Cost aggregation and top-N breakdowns over billing records
//! - Rightsizing, idle-resource, storage, and database analysis
//! - Commitment-plan sizing from historical spend
//! - Merged, deduplicated, deterministically ranked recommendations
//!
//! The engine is a pure in-process transformation: fetching cloud data and
//! presenting results are the embedding application's concern.

pub mod aggregator;
pub mod analyzer;
pub mod batch;
pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod pricing;
pub mod ranker;
pub mod stats;

pub use aggregator::CostAggregator;
pub use analyzer::{
    Abstention, Analyzer, AnalyzerOutput, CommitmentEstimator, DatabaseOptimizer,
    IdleResourceDetector, RightsizingAnalyzer, StorageOptimizer,
};
pub use batch::{AnalysisBatch, AnalysisInputs, SkippedResource};
pub use config::AnalysisConfig;
pub use engine::{AnalysisReport, CostEngine};
pub use error::{AbstainReason, EngineError};
pub use models::*;
pub use pricing::{PriceBook, StaticPriceBook};
pub use ranker::RecommendationRanker;
