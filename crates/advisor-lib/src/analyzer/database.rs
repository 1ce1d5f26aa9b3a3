//! Database instance optimization
//!
//! Combines utilization series with deployment facts: underused instances
//! get an instance-class downgrade, sustained IOPS pressure gets a
//! provisioned-IOPS upgrade, and production single-AZ deployments get an
//! availability recommendation with zero cost savings.

use std::sync::Arc;

use tracing::debug;

use super::{Abstention, Analyzer, AnalyzerOutput};
use crate::batch::AnalysisBatch;
use crate::config::{AnalysisConfig, HOURS_PER_MONTH};
use crate::error::AbstainReason;
use crate::models::{
    metric, Action, Category, Confidence, DatabaseFacts, Rationale, Recommendation, Resource,
    ResourceKind, ThresholdBreach,
};
use crate::pricing::PriceBook;
use crate::stats;

/// Breach ratio past which a downsize is considered certain
const WIDE_BREACH_RATIO: f64 = 0.5;

/// Emits instance-class, IOPS, and availability recommendations
pub struct DatabaseOptimizer {
    config: AnalysisConfig,
    prices: Arc<dyn PriceBook>,
}

impl DatabaseOptimizer {
    pub fn new(config: AnalysisConfig, prices: Arc<dyn PriceBook>) -> Self {
        Self { config, prices }
    }

    fn evaluate_downsize(
        &self,
        batch: &AnalysisBatch,
        resource: &Resource,
        facts: &DatabaseFacts,
    ) -> Result<Option<Recommendation>, Abstention> {
        let cpu_window = batch
            .windowed_samples(
                &resource.id,
                metric::CPU_UTILIZATION,
                self.config.lookback_days_rightsizing,
            )
            .unwrap_or(&[]);

        let observed_days = stats::distinct_days(cpu_window);
        if observed_days < self.config.min_rightsizing_days {
            return Err(Abstention {
                subject: resource.id.clone(),
                category: Category::Database,
                reason: AbstainReason::InsufficientData {
                    needed_days: self.config.min_rightsizing_days,
                    observed_days,
                },
            });
        }

        let conn_window = match batch.windowed_samples(
            &resource.id,
            metric::CONNECTION_COUNT,
            self.config.lookback_days_rightsizing,
        ) {
            Some(w) if !w.is_empty() => w,
            _ => {
                debug!(resource_id = %resource.id, "no connection series, skipping downsize rule");
                return Ok(None);
            }
        };

        let cpu_values: Vec<f64> = cpu_window.iter().map(|s| s.value).collect();
        let conn_values: Vec<f64> = conn_window.iter().map(|s| s.value).collect();
        let cpu_p95 = stats::percentile(&cpu_values, 95.0);
        let conn_p95 = stats::percentile(&conn_values, 95.0);
        let conn_limit =
            f64::from(facts.max_connections) * self.config.db_connection_threshold_percent / 100.0;

        if cpu_p95 >= self.config.db_cpu_threshold_percent || conn_p95 >= conn_limit {
            return Ok(None);
        }

        let smaller = match self.prices.smaller_size(&facts.instance_class) {
            Some(s) => s,
            None => return Ok(None),
        };

        let cpu_breach =
            ThresholdBreach::new(metric::CPU_UTILIZATION, self.config.db_cpu_threshold_percent, cpu_p95);
        let conn_breach = ThresholdBreach::new(metric::CONNECTION_COUNT, conn_limit, conn_p95);
        let confidence = if cpu_breach.breach_ratio() >= WIDE_BREACH_RATIO
            && conn_breach.breach_ratio() >= WIDE_BREACH_RATIO
        {
            Confidence::High
        } else {
            Confidence::Medium
        };

        let current_rate = self.prices.hourly_rate(&facts.instance_class).unwrap_or(0.0);
        let target_rate = self.prices.hourly_rate(&smaller).unwrap_or(0.0);
        let savings = ((current_rate - target_rate) * HOURS_PER_MONTH).max(0.0);

        Ok(Some(Recommendation::new(
            &resource.id,
            Category::Database,
            Action::DowngradeInstanceClass {
                from: facts.instance_class.clone(),
                to: smaller,
            },
            savings,
            confidence,
            Rationale::from_breaches(vec![cpu_breach, conn_breach]),
        )))
    }

    fn evaluate_iops(
        &self,
        batch: &AnalysisBatch,
        resource: &Resource,
        facts: &DatabaseFacts,
    ) -> Option<Recommendation> {
        if facts.provisioned_iops == 0 {
            return None;
        }
        let window = batch.windowed_samples(
            &resource.id,
            metric::IOPS,
            self.config.lookback_days_rightsizing,
        )?;
        if window.is_empty() {
            return None;
        }

        let baseline = f64::from(facts.provisioned_iops);
        let peaks = stats::daily_peaks(window);
        let breach_days = stats::days_matching(&peaks, |v| v > baseline);
        if breach_days < self.config.sustained_breach_days {
            return None;
        }

        let observed = window.iter().map(|s| s.value).fold(0.0f64, f64::max);
        Some(Recommendation::new(
            &resource.id,
            Category::Database,
            Action::IncreaseProvisionedIops {
                from: facts.provisioned_iops,
            },
            0.0,
            Confidence::High,
            Rationale::from_breaches(vec![ThresholdBreach::new(metric::IOPS, baseline, observed)])
                .with_tag(format!("breach_days={}", breach_days)),
        ))
    }

    fn evaluate_availability(
        &self,
        resource: &Resource,
        facts: &DatabaseFacts,
    ) -> Option<Recommendation> {
        if facts.multi_az || !resource.is_production() {
            return None;
        }
        Some(Recommendation::new(
            &resource.id,
            Category::Database,
            Action::EnableMultiAz,
            0.0,
            Confidence::High,
            Rationale::default().with_tag("availability"),
        ))
    }
}

impl Analyzer for DatabaseOptimizer {
    fn category(&self) -> Category {
        Category::Database
    }

    fn analyze(&self, batch: &AnalysisBatch) -> AnalyzerOutput {
        let mut output = AnalyzerOutput::default();

        for resource in batch.resources_of_kind(ResourceKind::Database) {
            let facts = match batch.database_facts_for(&resource.id) {
                Some(f) => f,
                None => {
                    debug!(resource_id = %resource.id, "database resource without facts");
                    continue;
                }
            };

            match self.evaluate_downsize(batch, resource, facts) {
                Ok(Some(rec)) => output.recommendations.push(rec),
                Ok(None) => {}
                Err(abstention) => output.abstentions.push(abstention),
            }

            if let Some(rec) = self.evaluate_iops(batch, resource, facts) {
                output.recommendations.push(rec);
            }

            if let Some(rec) = self.evaluate_availability(resource, facts) {
                output.recommendations.push(rec);
            }
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::AnalysisInputs;
    use crate::models::{tag, MetricSeries, MetricUnit, Sample};
    use crate::pricing::StaticPriceBook;

    const DAY: i64 = 86_400;

    fn optimizer() -> DatabaseOptimizer {
        DatabaseOptimizer::new(AnalysisConfig::default(), Arc::new(StaticPriceBook::new()))
    }

    fn facts(instance_class: &str, multi_az: bool) -> DatabaseFacts {
        DatabaseFacts {
            resource_id: "db-1".to_string(),
            engine: "postgres".to_string(),
            instance_class: instance_class.to_string(),
            max_connections: 500,
            provisioned_iops: 3_000,
            multi_az,
        }
    }

    fn series(metric_name: &str, unit: MetricUnit, daily: &[f64]) -> MetricSeries {
        MetricSeries::new(
            "db-1",
            metric_name,
            unit,
            daily
                .iter()
                .enumerate()
                .map(|(d, v)| Sample::new(d as i64 * DAY, *v))
                .collect(),
        )
    }

    fn batch(facts: DatabaseFacts, series: Vec<MetricSeries>, production: bool) -> AnalysisBatch {
        let mut resource = Resource::new("db-1", ResourceKind::Database, "us-east-1");
        if production {
            resource = resource.with_tag(tag::ENVIRONMENT, "production");
        }
        AnalysisBatch::ingest(AnalysisInputs {
            as_of: 30 * DAY,
            resources: vec![resource],
            series,
            database_facts: vec![facts],
            ..AnalysisInputs::default()
        })
        .0
    }

    #[test]
    fn test_underused_instance_downgrades() {
        let b = batch(
            facts("db.m5.xlarge", true),
            vec![
                series(metric::CPU_UTILIZATION, MetricUnit::Percent, &[5.0; 30]),
                series(metric::CONNECTION_COUNT, MetricUnit::Count, &[10.0; 30]),
            ],
            false,
        );
        let output = optimizer().analyze(&b);

        assert_eq!(output.recommendations.len(), 1);
        let rec = &output.recommendations[0];
        assert!(matches!(
            &rec.action,
            Action::DowngradeInstanceClass { from, to }
                if from == "db.m5.xlarge" && to == "db.m5.large"
        ));
        // cpu 5 vs 20 and conns 10 vs 50 are both wide breaches
        assert_eq!(rec.confidence, Confidence::High);
        assert!(rec.estimated_monthly_savings > 0.0);
    }

    #[test]
    fn test_narrow_breach_is_medium_confidence() {
        let b = batch(
            facts("db.m5.xlarge", true),
            vec![
                series(metric::CPU_UTILIZATION, MetricUnit::Percent, &[15.0; 30]),
                series(metric::CONNECTION_COUNT, MetricUnit::Count, &[40.0; 30]),
            ],
            false,
        );
        let output = optimizer().analyze(&b);
        assert_eq!(output.recommendations[0].confidence, Confidence::Medium);
    }

    #[test]
    fn test_busy_connections_block_downgrade() {
        let b = batch(
            facts("db.m5.xlarge", true),
            vec![
                series(metric::CPU_UTILIZATION, MetricUnit::Percent, &[5.0; 30]),
                series(metric::CONNECTION_COUNT, MetricUnit::Count, &[400.0; 30]),
            ],
            false,
        );
        let output = optimizer().analyze(&b);
        assert!(output.recommendations.is_empty());
    }

    #[test]
    fn test_sustained_iops_pressure_upgrades() {
        let b = batch(
            facts("db.m5.xlarge", true),
            vec![
                series(metric::CPU_UTILIZATION, MetricUnit::Percent, &[50.0; 30]),
                series(metric::CONNECTION_COUNT, MetricUnit::Count, &[400.0; 30]),
                series(metric::IOPS, MetricUnit::CountPerSecond, &[4_500.0; 5]),
            ],
            false,
        );
        let output = optimizer().analyze(&b);

        assert_eq!(output.recommendations.len(), 1);
        let rec = &output.recommendations[0];
        assert_eq!(rec.action, Action::IncreaseProvisionedIops { from: 3_000 });
        assert_eq!(rec.estimated_monthly_savings, 0.0);
    }

    #[test]
    fn test_brief_iops_spike_is_ignored() {
        let mut iops = vec![1_000.0; 30];
        iops[10] = 5_000.0;
        let b = batch(
            facts("db.m5.xlarge", true),
            vec![
                series(metric::CPU_UTILIZATION, MetricUnit::Percent, &[50.0; 30]),
                series(metric::CONNECTION_COUNT, MetricUnit::Count, &[400.0; 30]),
                series(metric::IOPS, MetricUnit::CountPerSecond, &iops),
            ],
            false,
        );
        let output = optimizer().analyze(&b);
        assert!(output.recommendations.is_empty());
    }

    #[test]
    fn test_production_single_az_gets_availability_recommendation() {
        let b = batch(
            facts("db.m5.xlarge", false),
            vec![
                series(metric::CPU_UTILIZATION, MetricUnit::Percent, &[50.0; 30]),
                series(metric::CONNECTION_COUNT, MetricUnit::Count, &[400.0; 30]),
            ],
            true,
        );
        let output = optimizer().analyze(&b);

        assert_eq!(output.recommendations.len(), 1);
        let rec = &output.recommendations[0];
        assert_eq!(rec.action, Action::EnableMultiAz);
        assert_eq!(rec.estimated_monthly_savings, 0.0);
        assert!(rec.rationale.tags.contains(&"availability".to_string()));
    }

    #[test]
    fn test_non_production_single_az_is_fine() {
        let b = batch(
            facts("db.m5.xlarge", false),
            vec![
                series(metric::CPU_UTILIZATION, MetricUnit::Percent, &[50.0; 30]),
                series(metric::CONNECTION_COUNT, MetricUnit::Count, &[400.0; 30]),
            ],
            false,
        );
        let output = optimizer().analyze(&b);
        assert!(output.recommendations.is_empty());
    }

    #[test]
    fn test_too_few_cpu_days_abstains() {
        let b = batch(
            facts("db.m5.xlarge", true),
            vec![
                series(metric::CPU_UTILIZATION, MetricUnit::Percent, &[5.0; 2]),
                series(metric::CONNECTION_COUNT, MetricUnit::Count, &[10.0; 2]),
            ],
            false,
        );
        let output = optimizer().analyze(&b);
        assert_eq!(output.abstentions.len(), 1);
        assert!(output.recommendations.is_empty());
    }
}
