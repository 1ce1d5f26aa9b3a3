//! Analysis batch assembly and ingestion-time validation
//!
//! Series are checked once, on admission: timestamps must be strictly
//! increasing, the unit must match the metric's expected unit, and percent
//! samples are clamped into [0, 100]. A bad series rejects only its own
//! resource; the rest of the batch is still analyzed.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::EngineError;
use crate::models::{
    metric, BucketFacts, CostRecord, DatabaseFacts, MetricSeries, MetricUnit, Resource,
    ResourceKind, Sample,
};

/// Raw, externally fetched inputs for one analysis run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisInputs {
    /// Reference time of the run, unix seconds; the engine never reads the
    /// wall clock
    pub as_of: i64,
    pub resources: Vec<Resource>,
    pub series: Vec<MetricSeries>,
    pub cost_records: Vec<CostRecord>,
    pub bucket_facts: Vec<BucketFacts>,
    pub database_facts: Vec<DatabaseFacts>,
}

/// A resource dropped at ingestion, with the offending detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedResource {
    pub resource_id: String,
    pub detail: String,
}

/// Validated, immutable inputs shared by all analyzers
#[derive(Debug)]
pub struct AnalysisBatch {
    pub as_of: i64,
    resources: BTreeMap<String, Resource>,
    series: BTreeMap<(String, String), MetricSeries>,
    pub cost_records: Vec<CostRecord>,
    bucket_facts: BTreeMap<String, BucketFacts>,
    database_facts: BTreeMap<String, DatabaseFacts>,
}

impl AnalysisBatch {
    /// Validate raw inputs into a batch, reporting rejected resources
    pub fn ingest(inputs: AnalysisInputs) -> (Self, Vec<SkippedResource>) {
        let mut rejected: BTreeMap<String, String> = BTreeMap::new();

        for series in &inputs.series {
            if rejected.contains_key(&series.resource_id) {
                continue;
            }
            if let Err(e) = validate_series(series) {
                let detail = match &e {
                    EngineError::MalformedSeries { detail, .. } => detail.clone(),
                    other => other.to_string(),
                };
                warn!(
                    resource_id = %series.resource_id,
                    metric = %series.metric_name,
                    detail = %detail,
                    "rejecting resource at ingestion"
                );
                rejected.insert(series.resource_id.clone(), detail);
            }
        }

        let skipped: Vec<SkippedResource> = rejected
            .iter()
            .map(|(id, detail)| SkippedResource {
                resource_id: id.clone(),
                detail: detail.clone(),
            })
            .collect();

        let resources: BTreeMap<String, Resource> = inputs
            .resources
            .into_iter()
            .filter(|r| !rejected.contains_key(&r.id))
            .map(|r| (r.id.clone(), r))
            .collect();

        let series: BTreeMap<(String, String), MetricSeries> = inputs
            .series
            .into_iter()
            .filter(|s| !rejected.contains_key(&s.resource_id))
            .map(|mut s| {
                clamp_percent_samples(&mut s);
                ((s.resource_id.clone(), s.metric_name.clone()), s)
            })
            .collect();

        let bucket_facts = inputs
            .bucket_facts
            .into_iter()
            .filter(|f| !rejected.contains_key(&f.resource_id))
            .map(|f| (f.resource_id.clone(), f))
            .collect();

        let database_facts = inputs
            .database_facts
            .into_iter()
            .filter(|f| !rejected.contains_key(&f.resource_id))
            .map(|f| (f.resource_id.clone(), f))
            .collect();

        let batch = Self {
            as_of: inputs.as_of,
            resources,
            series,
            cost_records: inputs.cost_records,
            bucket_facts,
            database_facts,
        };

        (batch, skipped)
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn contains_resource(&self, id: &str) -> bool {
        self.resources.contains_key(id)
    }

    pub fn resources_of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.values().filter(move |r| r.kind == kind)
    }

    pub fn series_for(&self, resource_id: &str, metric_name: &str) -> Option<&MetricSeries> {
        self.series
            .get(&(resource_id.to_string(), metric_name.to_string()))
    }

    /// Samples of a series that fall inside the trailing lookback window
    pub fn windowed_samples(
        &self,
        resource_id: &str,
        metric_name: &str,
        lookback_days: u32,
    ) -> Option<&[Sample]> {
        let series = self.series_for(resource_id, metric_name)?;
        let window_start = self.as_of - i64::from(lookback_days) * 86_400;
        let start_idx = series
            .samples
            .partition_point(|s| s.timestamp < window_start);
        Some(&series.samples[start_idx..])
    }

    pub fn bucket_facts(&self) -> impl Iterator<Item = &BucketFacts> {
        self.bucket_facts.values()
    }

    pub fn database_facts_for(&self, resource_id: &str) -> Option<&DatabaseFacts> {
        self.database_facts.get(resource_id)
    }

    /// All services named by the SERVICE dimension of the cost records
    pub fn services(&self) -> BTreeSet<String> {
        self.cost_records
            .iter()
            .filter_map(|r| r.dimensions.get("SERVICE").cloned())
            .collect()
    }
}

/// Expected unit per well-known metric, `None` when the metric is free-form
fn expected_unit(metric_name: &str) -> Option<MetricUnit> {
    match metric_name {
        metric::CPU_UTILIZATION => Some(MetricUnit::Percent),
        metric::REQUEST_COUNT | metric::CONNECTION_COUNT => Some(MetricUnit::Count),
        metric::ATTACHMENT_STATE => Some(MetricUnit::Boolean),
        metric::IOPS | metric::VOLUME_IOPS => Some(MetricUnit::CountPerSecond),
        _ => None,
    }
}

fn validate_series(series: &MetricSeries) -> Result<(), EngineError> {
    if let Some(expected) = expected_unit(&series.metric_name) {
        if series.unit != expected {
            return Err(EngineError::MalformedSeries {
                resource_id: series.resource_id.clone(),
                detail: format!(
                    "unit mismatch for {}: expected {:?}, got {:?}",
                    series.metric_name, expected, series.unit
                ),
            });
        }
    }

    for pair in series.samples.windows(2) {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(EngineError::MalformedSeries {
                resource_id: series.resource_id.clone(),
                detail: format!(
                    "non-monotonic timestamps in {}: {} then {}",
                    series.metric_name, pair[0].timestamp, pair[1].timestamp
                ),
            });
        }
    }

    if let Some(bad) = series.samples.iter().find(|s| !s.value.is_finite()) {
        return Err(EngineError::MalformedSeries {
            resource_id: series.resource_id.clone(),
            detail: format!(
                "non-finite sample value in {} at {}",
                series.metric_name, bad.timestamp
            ),
        });
    }

    Ok(())
}

/// Clamp percent-unit samples into [0, 100]
///
/// A negative value surviving the clamp indicates upstream corruption and
/// traps rather than flowing into the rules.
fn clamp_percent_samples(series: &mut MetricSeries) {
    if series.unit != MetricUnit::Percent {
        return;
    }
    for sample in &mut series.samples {
        sample.value = sample.value.clamp(0.0, 100.0);
        assert!(
            (0.0..=100.0).contains(&sample.value),
            "utilization out of range after clamping"
        );
    }
}
