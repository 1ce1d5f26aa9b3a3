//! Compute rightsizing analysis
//!
//! Applies percentile thresholds to CPU utilization over the lookback
//! window and recommends moving one step along the instance family's size
//! ladder. Absence of a recommendation means the resource is sized about
//! right; it is not a zero-confidence entry.

use std::sync::Arc;

use tracing::debug;

use super::{Abstention, Analyzer, AnalyzerOutput};
use crate::batch::AnalysisBatch;
use crate::config::{AnalysisConfig, HOURS_PER_MONTH};
use crate::error::AbstainReason;
use crate::models::{
    metric, Action, Category, Confidence, Rationale, Recommendation, Resource, ResourceKind,
    Sample, ThresholdBreach,
};
use crate::pricing::PriceBook;
use crate::stats;

/// Emits resize recommendations for compute resources
pub struct RightsizingAnalyzer {
    config: AnalysisConfig,
    prices: Arc<dyn PriceBook>,
}

impl RightsizingAnalyzer {
    pub fn new(config: AnalysisConfig, prices: Arc<dyn PriceBook>) -> Self {
        Self { config, prices }
    }

    fn evaluate(&self, resource: &Resource, window: &[Sample]) -> Option<Recommendation> {
        let values: Vec<f64> = window.iter().map(|s| s.value).collect();
        let p95 = stats::percentile(&values, 95.0);
        let p50 = stats::percentile(&values, 50.0);
        let peaks = stats::daily_peaks(window);

        let instance_type = match resource.instance_type() {
            Some(t) => t,
            None => {
                debug!(resource_id = %resource.id, "no instance type tag, skipping rightsizing");
                return None;
            }
        };

        let high_days = stats::days_matching(&peaks, |v| v > self.config.cpu_threshold_high);
        if p95 > self.config.cpu_threshold_high && high_days >= self.config.sustained_breach_days {
            let larger = self.prices.larger_size(instance_type)?;
            let rationale = Rationale::from_breaches(vec![ThresholdBreach::new(
                metric::CPU_UTILIZATION,
                self.config.cpu_threshold_high,
                p95,
            )])
            .with_tag(format!("high_usage_days={}", high_days))
            .with_tag(format!("p50={:.1}", p50));

            // Upsizing is performance guidance, not a savings opportunity
            return Some(Recommendation::new(
                &resource.id,
                Category::Rightsizing,
                Action::Upsize {
                    from: instance_type.to_string(),
                    to: larger,
                },
                0.0,
                Confidence::High,
                rationale,
            ));
        }

        if p95 < self.config.cpu_threshold_moderate {
            let smaller = self.prices.smaller_size(instance_type)?;
            let low_streak =
                stats::longest_day_streak(&peaks, |v| v < self.config.cpu_threshold_low);

            let (threshold, confidence) = if p95 < self.config.cpu_threshold_low {
                let confidence = if low_streak >= self.config.low_usage_streak_days {
                    Confidence::High
                } else {
                    Confidence::Medium
                };
                (self.config.cpu_threshold_low, confidence)
            } else {
                (self.config.cpu_threshold_moderate, Confidence::Medium)
            };

            let current_rate = self.prices.hourly_rate(instance_type).unwrap_or(0.0);
            let target_rate = self.prices.hourly_rate(&smaller).unwrap_or(0.0);
            let savings = ((current_rate - target_rate) * HOURS_PER_MONTH).max(0.0);

            let rationale = Rationale::from_breaches(vec![ThresholdBreach::new(
                metric::CPU_UTILIZATION,
                threshold,
                p95,
            )])
            .with_tag(format!("low_usage_streak_days={}", low_streak))
            .with_tag(format!("p50={:.1}", p50));

            return Some(Recommendation::new(
                &resource.id,
                Category::Rightsizing,
                Action::Downsize {
                    from: instance_type.to_string(),
                    to: smaller,
                },
                savings,
                confidence,
                rationale,
            ));
        }

        None
    }
}

impl Analyzer for RightsizingAnalyzer {
    fn category(&self) -> Category {
        Category::Rightsizing
    }

    fn analyze(&self, batch: &AnalysisBatch) -> AnalyzerOutput {
        let mut output = AnalyzerOutput::default();

        for resource in batch.resources_of_kind(ResourceKind::Compute) {
            let window = batch
                .windowed_samples(
                    &resource.id,
                    metric::CPU_UTILIZATION,
                    self.config.lookback_days_rightsizing,
                )
                .unwrap_or(&[]);

            let observed_days = stats::distinct_days(window);
            if observed_days < self.config.min_rightsizing_days {
                output.abstentions.push(Abstention {
                    subject: resource.id.clone(),
                    category: Category::Rightsizing,
                    reason: AbstainReason::InsufficientData {
                        needed_days: self.config.min_rightsizing_days,
                        observed_days,
                    },
                });
                continue;
            }

            if let Some(rec) = self.evaluate(resource, window) {
                output.recommendations.push(rec);
            }
        }

        output
    }
}
