//! Idle-resource detection
//!
//! A resource is a termination candidate when every observed sample in the
//! lookback window sits under its kind's idle criterion: near-zero CPU for
//! compute, zero requests for load balancers, unattached for volumes,
//! unassociated for network addresses.

use std::sync::Arc;

use tracing::debug;

use super::{Abstention, Analyzer, AnalyzerOutput};
use crate::batch::AnalysisBatch;
use crate::config::AnalysisConfig;
use crate::error::AbstainReason;
use crate::models::{
    metric, Action, Category, Confidence, Rationale, Recommendation, Resource, ResourceKind,
    Sample, ThresholdBreach,
};
use crate::pricing::PriceBook;
use crate::stats;

/// Kinds the detector knows how to judge, with their series and criterion
const COVERED_KINDS: [ResourceKind; 4] = [
    ResourceKind::Compute,
    ResourceKind::LoadBalancer,
    ResourceKind::BlockStorage,
    ResourceKind::NetworkAddress,
];

/// Flags resources with sustained near-zero activity
pub struct IdleResourceDetector {
    config: AnalysisConfig,
    prices: Arc<dyn PriceBook>,
}

impl IdleResourceDetector {
    pub fn new(config: AnalysisConfig, prices: Arc<dyn PriceBook>) -> Self {
        Self { config, prices }
    }

    fn idle_metric(&self, kind: ResourceKind) -> &'static str {
        match kind {
            ResourceKind::Compute => metric::CPU_UTILIZATION,
            ResourceKind::LoadBalancer => metric::REQUEST_COUNT,
            // Attachment doubles as association for addresses
            _ => metric::ATTACHMENT_STATE,
        }
    }

    fn is_idle_sample(&self, kind: ResourceKind, value: f64) -> bool {
        match kind {
            ResourceKind::Compute => value < self.config.idle_threshold_percent,
            _ => value == 0.0,
        }
    }

    fn idle_threshold(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Compute => self.config.idle_threshold_percent,
            _ => 0.0,
        }
    }

    /// Hourly carrying cost of keeping the resource around
    fn hourly_rate(&self, resource: &Resource) -> f64 {
        match resource.kind {
            ResourceKind::BlockStorage => {
                let gb_month = resource
                    .volume_type()
                    .and_then(|t| self.prices.volume_gb_month(t))
                    .unwrap_or(0.0);
                let size = resource.volume_size_gb().unwrap_or(0.0);
                gb_month * size / crate::config::HOURS_PER_MONTH
            }
            _ => resource
                .instance_type()
                .and_then(|t| self.prices.hourly_rate(t))
                .unwrap_or(0.0),
        }
    }

    fn evaluate(&self, resource: &Resource, window: &[Sample]) -> Option<Recommendation> {
        let kind = resource.kind;
        if !window.iter().all(|s| self.is_idle_sample(kind, s.value)) {
            return None;
        }

        let peaks = stats::daily_peaks(window);
        let idle_days = peaks.len() as u32;
        let idle_streak = stats::longest_day_streak(&peaks, |v| self.is_idle_sample(kind, v));
        let idle_hours = f64::from(idle_days) * 24.0;
        let savings = self.hourly_rate(resource) * idle_hours;

        let confidence = if idle_days >= self.config.lookback_days_idle {
            Confidence::High
        } else {
            Confidence::Medium
        };

        let observed_peak = window.iter().map(|s| s.value).fold(0.0f64, f64::max);
        let rationale = Rationale::from_breaches(vec![ThresholdBreach::new(
            self.idle_metric(kind),
            self.idle_threshold(kind),
            observed_peak,
        )])
        .with_tag(format!("idle_streak_days={}", idle_streak));

        Some(Recommendation::new(
            &resource.id,
            Category::Idle,
            Action::Terminate,
            savings,
            confidence,
            rationale,
        ))
    }
}

impl Analyzer for IdleResourceDetector {
    fn category(&self) -> Category {
        Category::Idle
    }

    fn analyze(&self, batch: &AnalysisBatch) -> AnalyzerOutput {
        let mut output = AnalyzerOutput::default();
        let mut flagged: Vec<(u32, Recommendation)> = Vec::new();

        for kind in COVERED_KINDS {
            for resource in batch.resources_of_kind(kind) {
                let window = batch.windowed_samples(
                    &resource.id,
                    self.idle_metric(kind),
                    self.config.lookback_days_idle,
                );

                let window = match window {
                    Some(w) if !w.is_empty() => w,
                    _ => {
                        debug!(resource_id = %resource.id, "no activity series for idle check");
                        output.abstentions.push(Abstention {
                            subject: resource.id.clone(),
                            category: Category::Idle,
                            reason: AbstainReason::InsufficientData {
                                needed_days: 1,
                                observed_days: 0,
                            },
                        });
                        continue;
                    }
                };

                if let Some(rec) = self.evaluate(resource, window) {
                    let streak = stats::longest_day_streak(&stats::daily_peaks(window), |v| {
                        self.is_idle_sample(kind, v)
                    });
                    flagged.push((streak, rec));
                }
            }
        }

        // Longer idle streaks surface first within the category
        flagged.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.resource_id.cmp(&b.1.resource_id)));
        output.recommendations = flagged.into_iter().map(|(_, rec)| rec).collect();
        output
    }
}
