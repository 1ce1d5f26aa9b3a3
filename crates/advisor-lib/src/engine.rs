//! Analysis run orchestration
//!
//! The engine validates inputs once, fans the analyzers out over the
//! blocking pool as independent tasks on the shared immutable batch, and
//! joins before ranking. Dropping the returned future cancels cleanly: no
//! partial state survives outside each task's own return value.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::analyzer::{
    Abstention, Analyzer, AnalyzerOutput, CommitmentEstimator, DatabaseOptimizer,
    IdleResourceDetector, RightsizingAnalyzer, StorageOptimizer,
};
use crate::batch::{AnalysisBatch, AnalysisInputs, SkippedResource};
use crate::config::AnalysisConfig;
use crate::models::{Category, Recommendation};
use crate::pricing::PriceBook;
use crate::ranker::RecommendationRanker;

/// Outcome of one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Ranked recommendations, strongest savings first
    pub recommendations: Vec<Recommendation>,
    /// Per-category count of abstained resources/services
    pub abstained: BTreeMap<Category, usize>,
    /// Individual abstentions with their reasons
    pub abstentions: Vec<Abstention>,
    /// Resources rejected at ingestion
    pub skipped: Vec<SkippedResource>,
}

/// The recommendation engine: injected config and collaborators, no
/// process-wide state
pub struct CostEngine {
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl CostEngine {
    pub fn new(config: AnalysisConfig, prices: Arc<dyn PriceBook>) -> Result<Self> {
        config.validate().context("invalid analysis configuration")?;

        let analyzers: Vec<Arc<dyn Analyzer>> = vec![
            Arc::new(RightsizingAnalyzer::new(config.clone(), Arc::clone(&prices))),
            Arc::new(IdleResourceDetector::new(config.clone(), Arc::clone(&prices))),
            Arc::new(StorageOptimizer::new(config.clone(), Arc::clone(&prices))),
            Arc::new(DatabaseOptimizer::new(config.clone(), Arc::clone(&prices))),
            Arc::new(CommitmentEstimator::new(config)),
        ];

        Ok(Self { analyzers })
    }

    /// Run all analyzers in parallel worker tasks and rank the merged output
    pub async fn analyze(&self, inputs: AnalysisInputs) -> Result<AnalysisReport> {
        let (batch, skipped) = AnalysisBatch::ingest(inputs);
        let batch = Arc::new(batch);

        let handles: Vec<_> = self
            .analyzers
            .iter()
            .map(|analyzer| {
                let analyzer = Arc::clone(analyzer);
                let batch = Arc::clone(&batch);
                tokio::task::spawn_blocking(move || analyzer.analyze(&batch))
            })
            .collect();

        let mut outputs = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(output) => outputs.push(output),
                // An analyzer panic is an internal invariant violation;
                // trap instead of swallowing it
                Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                Err(e) => return Err(e).context("analyzer task failed"),
            }
        }

        Ok(Self::assemble(&batch, outputs, skipped))
    }

    /// Sequential variant for callers without an async runtime
    pub fn analyze_blocking(&self, inputs: AnalysisInputs) -> AnalysisReport {
        let (batch, skipped) = AnalysisBatch::ingest(inputs);
        let outputs = self
            .analyzers
            .iter()
            .map(|analyzer| analyzer.analyze(&batch))
            .collect();
        Self::assemble(&batch, outputs, skipped)
    }

    fn assemble(
        batch: &AnalysisBatch,
        outputs: Vec<AnalyzerOutput>,
        skipped: Vec<SkippedResource>,
    ) -> AnalysisReport {
        let merged = AnalyzerOutput::merge(outputs);

        debug_assert!(
            merged
                .recommendations
                .iter()
                .filter(|r| r.category != Category::Commitment)
                .all(|r| batch.contains_resource(&r.resource_id)),
            "recommendation references a resource outside the batch"
        );

        let mut abstained: BTreeMap<Category, usize> = BTreeMap::new();
        for abstention in &merged.abstentions {
            *abstained.entry(abstention.category).or_insert(0) += 1;
        }

        let recommendations = RecommendationRanker::rank(merged.recommendations);
        info!(
            recommendations = recommendations.len(),
            abstentions = merged.abstentions.len(),
            skipped = skipped.len(),
            "analysis run complete"
        );

        AnalysisReport {
            recommendations,
            abstained,
            abstentions: merged.abstentions,
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        metric, tag, MetricSeries, MetricUnit, Resource, ResourceKind, Sample,
    };
    use crate::pricing::StaticPriceBook;

    const DAY: i64 = 86_400;

    fn engine() -> CostEngine {
        CostEngine::new(AnalysisConfig::default(), Arc::new(StaticPriceBook::new())).unwrap()
    }

    fn idle_compute_inputs() -> AnalysisInputs {
        AnalysisInputs {
            as_of: 30 * DAY,
            resources: vec![Resource::new("i-1", ResourceKind::Compute, "us-east-1")
                .with_tag(tag::INSTANCE_TYPE, "m5.xlarge")],
            series: vec![MetricSeries::new(
                "i-1",
                metric::CPU_UTILIZATION,
                MetricUnit::Percent,
                (0..30).map(|d| Sample::new(d * DAY, 0.3)).collect(),
            )],
            ..AnalysisInputs::default()
        }
    }

    #[tokio::test]
    async fn test_parallel_and_blocking_runs_agree() {
        let engine = engine();
        let parallel = engine.analyze(idle_compute_inputs()).await.unwrap();
        let blocking = engine.analyze_blocking(idle_compute_inputs());

        let ids = |report: &AnalysisReport| -> Vec<(String, Category)> {
            report
                .recommendations
                .iter()
                .map(|r| (r.resource_id.clone(), r.category))
                .collect()
        };
        assert_eq!(ids(&parallel), ids(&blocking));
        assert!(!parallel.recommendations.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let config = AnalysisConfig {
            idle_threshold_percent: -3.0,
            ..AnalysisConfig::default()
        };
        assert!(CostEngine::new(config, Arc::new(StaticPriceBook::new())).is_err());
    }

    #[tokio::test]
    async fn test_abstained_counts_grouped_by_category() {
        // A compute resource with no series abstains in both the
        // rightsizing and idle categories
        let inputs = AnalysisInputs {
            as_of: 30 * DAY,
            resources: vec![Resource::new("i-1", ResourceKind::Compute, "us-east-1")],
            ..AnalysisInputs::default()
        };
        let report = engine().analyze(inputs).await.unwrap();

        assert_eq!(report.abstained.get(&Category::Rightsizing), Some(&1));
        assert_eq!(report.abstained.get(&Category::Idle), Some(&1));
    }

    #[tokio::test]
    async fn test_report_serializes() {
        let report = engine().analyze(idle_compute_inputs()).await.unwrap();
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("recommendations"));
    }
}
