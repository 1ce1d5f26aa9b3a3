//! Commitment-plan sizing
//!
//! Sizes a reserved-capacity commitment per service from trailing daily
//! on-demand spend: the commitment level is the largest level that keeps
//! the fraction of under-committed days within the configured risk
//! tolerance, i.e. the tolerance-quantile of the sorted daily spend.

use std::collections::BTreeSet;

use tracing::debug;

use super::{Abstention, Analyzer, AnalyzerOutput};
use crate::aggregator::CostAggregator;
use crate::batch::AnalysisBatch;
use crate::config::{AnalysisConfig, DAYS_PER_MONTH};
use crate::error::AbstainReason;
use crate::models::{
    Action, Category, Confidence, Rationale, Recommendation, ThresholdBreach,
};

/// Dimension carrying the service name in cost records
const SERVICE_DIMENSION: &str = "SERVICE";

/// Sizes commitment purchases against historical spend
pub struct CommitmentEstimator {
    config: AnalysisConfig,
    /// Restrict sizing to these services; empty means every service seen
    eligible: BTreeSet<String>,
}

impl CommitmentEstimator {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            eligible: BTreeSet::new(),
        }
    }

    /// Restrict sizing to an explicit set of commitment-eligible services
    pub fn with_eligible_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.eligible = services.into_iter().map(Into::into).collect();
        self
    }

    fn is_eligible(&self, service: &str) -> bool {
        self.eligible.is_empty() || self.eligible.contains(service)
    }

    /// Largest daily commitment level within the risk tolerance
    fn commitment_level(&self, daily_spend: &[f64]) -> f64 {
        let mut sorted: Vec<f64> = daily_spend.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let tolerated_days = ((self.config.commitment_risk_tolerance / 100.0)
            * sorted.len() as f64)
            .floor() as usize;
        sorted[tolerated_days.min(sorted.len() - 1)]
    }

    fn evaluate(&self, service: &str, daily_spend: &[f64]) -> Option<Recommendation> {
        let level = self.commitment_level(daily_spend);
        if level <= 0.0 {
            debug!(service = %service, "no steady spend, nothing to commit to");
            return None;
        }

        let days = daily_spend.len() as f64;
        let total: f64 = daily_spend.iter().sum();
        let covered: f64 = daily_spend.iter().map(|d| d.min(level)).sum();
        let coverage = covered / total;

        let discount = self.config.commitment_discount_percent / 100.0;
        let monthly_savings = (covered / days) * DAYS_PER_MONTH * discount;

        // Break-even against the upfront share of the discounted term cost
        let term_cost = level
            * DAYS_PER_MONTH
            * f64::from(self.config.commitment_term_months)
            * (1.0 - discount);
        let upfront = self.config.commitment_upfront_fraction * term_cost;
        let break_even_months = if upfront > 0.0 && monthly_savings > 0.0 {
            upfront / monthly_savings
        } else {
            0.0
        };

        let confidence = if coverage >= 0.9 {
            Confidence::High
        } else if coverage >= 0.7 {
            Confidence::Medium
        } else {
            Confidence::Low
        };

        let rationale = Rationale::from_breaches(vec![ThresholdBreach::new(
            "daily_on_demand_spend",
            level,
            total / days,
        )])
        .with_tag(format!("coverage={:.2}", coverage))
        .with_tag(format!("break_even_months={:.1}", break_even_months));

        Some(Recommendation::new(
            service,
            Category::Commitment,
            Action::PurchaseCommitment {
                hourly_commitment: level / 24.0,
                term_months: self.config.commitment_term_months,
            },
            monthly_savings,
            confidence,
            rationale,
        ))
    }
}

impl Analyzer for CommitmentEstimator {
    fn category(&self) -> Category {
        Category::Commitment
    }

    fn analyze(&self, batch: &AnalysisBatch) -> AnalyzerOutput {
        let mut output = AnalyzerOutput::default();

        for service in batch.services() {
            if !self.is_eligible(&service) {
                continue;
            }

            let daily: Vec<f64> =
                CostAggregator::daily_spend_by(&batch.cost_records, SERVICE_DIMENSION, &service)
                    .into_iter()
                    .map(|(_, amount)| amount)
                    .collect();

            let observed_days = daily.len() as u32;
            if observed_days < self.config.commitment_min_history_days {
                output.abstentions.push(Abstention {
                    subject: service.clone(),
                    category: Category::Commitment,
                    reason: AbstainReason::InsufficientHistory {
                        needed_days: self.config.commitment_min_history_days,
                        observed_days,
                    },
                });
                continue;
            }

            if let Some(rec) = self.evaluate(&service, &daily) {
                output.recommendations.push(rec);
            }
        }

        output
    }
}
