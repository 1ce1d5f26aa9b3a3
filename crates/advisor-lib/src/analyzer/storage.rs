//! Storage-class and lifecycle optimization
//!
//! Works from per-bucket access summaries rather than time series: object
//! populations by age bracket decide tier transitions, and a bucket with
//! aged objects but no lifecycle policy gets a structural recommendation on
//! top of any per-tier entries. Block volumes with near-zero I/O are steered
//! to the cheaper volume generation.

use std::sync::Arc;

use tracing::debug;

use super::{Analyzer, AnalyzerOutput};
use crate::batch::AnalysisBatch;
use crate::config::AnalysisConfig;
use crate::models::{
    metric, Action, BucketFacts, Category, Confidence, Rationale, Recommendation, Resource,
    ResourceKind, ThresholdBreach,
};
use crate::pricing::{storage_class, PriceBook};
use crate::stats;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Emits storage-class transition and lifecycle-policy recommendations
pub struct StorageOptimizer {
    config: AnalysisConfig,
    prices: Arc<dyn PriceBook>,
}

impl StorageOptimizer {
    pub fn new(config: AnalysisConfig, prices: Arc<dyn PriceBook>) -> Self {
        Self { config, prices }
    }

    fn transition_savings(&self, facts: &BucketFacts, bytes: u64, target: &str) -> f64 {
        let current_rate = self
            .prices
            .storage_class_gb_month(&facts.storage_class)
            .or_else(|| self.prices.storage_class_gb_month(storage_class::STANDARD))
            .unwrap_or(0.0);
        let target_rate = self.prices.storage_class_gb_month(target).unwrap_or(0.0);
        ((bytes as f64 / BYTES_PER_GB) * (current_rate - target_rate)).max(0.0)
    }

    fn evaluate_bucket(&self, facts: &BucketFacts) -> Vec<Recommendation> {
        let mut recs = Vec::new();
        let ia_age = self.config.storage_age_ia_days;
        let archive_age = self.config.storage_age_archive_days;

        let archive_brackets: Vec<_> = facts
            .age_buckets
            .iter()
            .filter(|b| b.min_age_days >= archive_age && b.object_count > 0)
            .collect();
        if !archive_brackets.is_empty() {
            let bytes: u64 = archive_brackets.iter().map(|b| b.total_bytes).sum();
            let oldest = archive_brackets
                .iter()
                .map(|b| b.min_age_days)
                .max()
                .unwrap_or(archive_age);
            let confidence = if oldest >= archive_age * 2 {
                Confidence::High
            } else {
                Confidence::Medium
            };
            recs.push(Recommendation::new(
                &facts.resource_id,
                Category::Storage,
                Action::TransitionStorageClass {
                    to: storage_class::ARCHIVE.to_string(),
                },
                self.transition_savings(facts, bytes, storage_class::ARCHIVE),
                confidence,
                Rationale::from_breaches(vec![ThresholdBreach::new(
                    "object_age_days",
                    f64::from(archive_age),
                    f64::from(oldest),
                )]),
            ));
        }

        let ia_brackets: Vec<_> = facts
            .age_buckets
            .iter()
            .filter(|b| {
                b.min_age_days >= ia_age
                    && b.min_age_days < archive_age
                    && b.object_count > 0
                    && !b.accessed_within_period
            })
            .collect();
        if !ia_brackets.is_empty() {
            let bytes: u64 = ia_brackets.iter().map(|b| b.total_bytes).sum();
            let oldest = ia_brackets
                .iter()
                .map(|b| b.min_age_days)
                .max()
                .unwrap_or(ia_age);
            recs.push(Recommendation::new(
                &facts.resource_id,
                Category::Storage,
                Action::TransitionStorageClass {
                    to: storage_class::INFREQUENT_ACCESS.to_string(),
                },
                self.transition_savings(facts, bytes, storage_class::INFREQUENT_ACCESS),
                Confidence::Medium,
                Rationale::from_breaches(vec![ThresholdBreach::new(
                    "object_age_days",
                    f64::from(ia_age),
                    f64::from(oldest),
                )]),
            ));
        }

        // Structural rule, independent of the per-tier entries above
        let has_aged_objects = facts
            .age_buckets
            .iter()
            .any(|b| b.min_age_days >= ia_age && b.object_count > 0);
        if !facts.has_lifecycle_policy && has_aged_objects {
            recs.push(Recommendation::new(
                &facts.resource_id,
                Category::Storage,
                Action::AddLifecyclePolicy,
                0.0,
                Confidence::High,
                Rationale::from_breaches(vec![ThresholdBreach::new(
                    "object_age_days",
                    f64::from(ia_age),
                    f64::from(
                        facts
                            .age_buckets
                            .iter()
                            .map(|b| b.min_age_days)
                            .max()
                            .unwrap_or(0),
                    ),
                )])
                .with_tag("missing_lifecycle_policy"),
            ));
        }

        recs
    }

    fn evaluate_volume(&self, batch: &AnalysisBatch, resource: &Resource) -> Option<Recommendation> {
        let window = batch.windowed_samples(
            &resource.id,
            metric::VOLUME_IOPS,
            self.config.lookback_days_rightsizing,
        )?;
        if window.is_empty() {
            return None;
        }

        let values: Vec<f64> = window.iter().map(|s| s.value).collect();
        let p95 = stats::percentile(&values, 95.0);
        if p95 >= self.config.volume_iops_floor {
            return None;
        }

        let from = resource.volume_type()?.to_string();
        let to = self.prices.cheaper_volume_type(&from)?;
        let size = resource.volume_size_gb().unwrap_or(0.0);
        let savings = (size
            * (self.prices.volume_gb_month(&from).unwrap_or(0.0)
                - self.prices.volume_gb_month(&to).unwrap_or(0.0)))
        .max(0.0);

        Some(Recommendation::new(
            &resource.id,
            Category::Storage,
            Action::MigrateVolumeType { from, to },
            savings,
            Confidence::Medium,
            Rationale::from_breaches(vec![ThresholdBreach::new(
                metric::VOLUME_IOPS,
                self.config.volume_iops_floor,
                p95,
            )]),
        ))
    }
}

impl Analyzer for StorageOptimizer {
    fn category(&self) -> Category {
        Category::Storage
    }

    fn analyze(&self, batch: &AnalysisBatch) -> AnalyzerOutput {
        let mut output = AnalyzerOutput::default();

        for facts in batch.bucket_facts() {
            if !batch.contains_resource(&facts.resource_id) {
                debug!(resource_id = %facts.resource_id, "bucket facts without a resource");
                continue;
            }
            output.recommendations.extend(self.evaluate_bucket(facts));
        }

        for resource in batch.resources_of_kind(ResourceKind::BlockStorage) {
            if let Some(rec) = self.evaluate_volume(batch, resource) {
                output.recommendations.push(rec);
            }
        }

        output
    }
}
