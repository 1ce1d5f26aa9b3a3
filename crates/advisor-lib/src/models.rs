//! Core data models for the recommendation engine

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Well-known metric names understood by the analyzers
pub mod metric {
    /// CPU utilization in percent of capacity
    pub const CPU_UTILIZATION: &str = "cpu_utilization";
    /// Request count per sample interval (load balancers)
    pub const REQUEST_COUNT: &str = "request_count";
    /// Attachment/association state, 1 = attached, 0 = detached
    pub const ATTACHMENT_STATE: &str = "attachment_state";
    /// Open connection count (databases)
    pub const CONNECTION_COUNT: &str = "connection_count";
    /// I/O operations per second (databases)
    pub const IOPS: &str = "iops";
    /// I/O operations per second (block volumes)
    pub const VOLUME_IOPS: &str = "volume_iops";
}

/// Well-known resource tag keys
pub mod tag {
    pub const INSTANCE_TYPE: &str = "instance_type";
    pub const VOLUME_TYPE: &str = "volume_type";
    pub const VOLUME_SIZE_GB: &str = "volume_size_gb";
    pub const ENVIRONMENT: &str = "environment";
}

/// Kind of cloud resource under analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    Compute,
    BlockStorage,
    ObjectStorage,
    Database,
    LoadBalancer,
    NetworkAddress,
}

/// A cloud resource, identity fixed once fetched
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub kind: ResourceKind,
    pub region: String,
    pub tags: BTreeMap<String, String>,
}

impl Resource {
    pub fn new(id: impl Into<String>, kind: ResourceKind, region: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            region: region.into(),
            tags: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Instance size class from the well-known tag, if present
    pub fn instance_type(&self) -> Option<&str> {
        self.tags.get(tag::INSTANCE_TYPE).map(String::as_str)
    }

    /// Volume type from the well-known tag, if present
    pub fn volume_type(&self) -> Option<&str> {
        self.tags.get(tag::VOLUME_TYPE).map(String::as_str)
    }

    /// Provisioned volume size in GB from the well-known tag
    pub fn volume_size_gb(&self) -> Option<f64> {
        self.tags.get(tag::VOLUME_SIZE_GB)?.parse().ok()
    }

    /// Whether the resource carries a production environment tag
    pub fn is_production(&self) -> bool {
        self.tags
            .get(tag::ENVIRONMENT)
            .map(|v| v.eq_ignore_ascii_case("production") || v.eq_ignore_ascii_case("prod"))
            .unwrap_or(false)
    }
}

/// Unit of a metric series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    Percent,
    Count,
    Bytes,
    CountPerSecond,
    /// 0/1 state series (attachment, association)
    Boolean,
}

/// A single time-stamped metric sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Unix timestamp in seconds
    pub timestamp: i64,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Ordered time series for one resource/metric pair
///
/// Samples are time-ascending with strictly increasing timestamps; this is
/// enforced when the series is admitted into an analysis batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSeries {
    pub resource_id: String,
    pub metric_name: String,
    pub unit: MetricUnit,
    pub samples: Vec<Sample>,
}

impl MetricSeries {
    pub fn new(
        resource_id: impl Into<String>,
        metric_name: impl Into<String>,
        unit: MetricUnit,
        samples: Vec<Sample>,
    ) -> Self {
        Self {
            resource_id: resource_id.into(),
            metric_name: metric_name.into(),
            unit,
            samples,
        }
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Granularity of a cost record period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Granularity {
    Daily,
    Monthly,
}

/// One billed period for one combination of dimension values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostRecord {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub granularity: Granularity,
    pub amount: f64,
    pub currency: String,
    pub dimensions: BTreeMap<String, String>,
}

impl CostRecord {
    pub fn daily(
        period_start: NaiveDate,
        amount: f64,
        dimensions: BTreeMap<String, String>,
    ) -> Self {
        Self {
            period_start,
            period_end: period_start.succ_opt().unwrap_or(period_start),
            granularity: Granularity::Daily,
            amount,
            currency: "USD".to_string(),
            dimensions,
        }
    }
}

/// Object population of one age bracket within a storage bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectAgeBucket {
    /// Minimum object age in days for this bracket
    pub min_age_days: u32,
    pub object_count: u64,
    pub total_bytes: u64,
    /// Whether any object in the bracket was accessed within its age period
    pub accessed_within_period: bool,
}

/// Access-pattern summary for one object-storage bucket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketFacts {
    pub resource_id: String,
    pub age_buckets: Vec<ObjectAgeBucket>,
    pub has_lifecycle_policy: bool,
    pub storage_class: String,
}

/// Deployment facts for one database instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseFacts {
    pub resource_id: String,
    pub engine: String,
    pub instance_class: String,
    pub max_connections: u32,
    /// Provisioned IOPS baseline; 0 when storage is not IOPS-provisioned
    pub provisioned_iops: u32,
    pub multi_az: bool,
}

/// Recommendation category, one per analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Rightsizing,
    Idle,
    Storage,
    Database,
    Commitment,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Rightsizing => "rightsizing",
            Category::Idle => "idle",
            Category::Storage => "storage",
            Category::Database => "database",
            Category::Commitment => "commitment",
        };
        f.write_str(s)
    }
}

/// Confidence level, ordered for tie-breaking
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Fixed catalog of recommended actions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Downsize { from: String, to: String },
    Upsize { from: String, to: String },
    Terminate,
    TransitionStorageClass { to: String },
    AddLifecyclePolicy,
    MigrateVolumeType { from: String, to: String },
    DowngradeInstanceClass { from: String, to: String },
    IncreaseProvisionedIops { from: u32 },
    EnableMultiAz,
    PurchaseCommitment { hourly_commitment: f64, term_months: u32 },
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Downsize { from, to } => write!(f, "downsize {} to {}", from, to),
            Action::Upsize { from, to } => write!(f, "upsize {} to {}", from, to),
            Action::Terminate => f.write_str("terminate"),
            Action::TransitionStorageClass { to } => {
                write!(f, "transition objects to {}", to)
            }
            Action::AddLifecyclePolicy => f.write_str("add lifecycle policy"),
            Action::MigrateVolumeType { from, to } => {
                write!(f, "migrate volume from {} to {}", from, to)
            }
            Action::DowngradeInstanceClass { from, to } => {
                write!(f, "downgrade instance class {} to {}", from, to)
            }
            Action::IncreaseProvisionedIops { from } => {
                write!(f, "increase provisioned IOPS above {}", from)
            }
            Action::EnableMultiAz => f.write_str("enable multi-AZ deployment"),
            Action::PurchaseCommitment {
                hourly_commitment,
                term_months,
            } => write!(
                f,
                "purchase {}-month commitment at ${:.2}/hour",
                term_months, hourly_commitment
            ),
        }
    }
}

/// One threshold crossing backing a recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBreach {
    pub metric: String,
    pub threshold: f64,
    pub observed: f64,
}

impl ThresholdBreach {
    pub fn new(metric: impl Into<String>, threshold: f64, observed: f64) -> Self {
        Self {
            metric: metric.into(),
            threshold,
            observed,
        }
    }

    /// How far the observation cleared the threshold, as a ratio of it
    pub fn breach_ratio(&self) -> f64 {
        if self.threshold.abs() < f64::EPSILON {
            return 0.0;
        }
        (self.observed - self.threshold).abs() / self.threshold
    }
}

/// Structured justification: which thresholds were crossed and by how much
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rationale {
    pub breaches: Vec<ThresholdBreach>,
    pub tags: Vec<String>,
}

impl Rationale {
    pub fn from_breaches(breaches: Vec<ThresholdBreach>) -> Self {
        Self {
            breaches,
            tags: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

/// A single cost-optimization recommendation
///
/// Produced fresh on each analysis pass; never mutated, only superseded.
/// For the commitment category, `resource_id` names the commitment-eligible
/// service rather than an individual resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub resource_id: String,
    pub category: Category,
    pub action: Action,
    pub estimated_monthly_savings: f64,
    pub confidence: Confidence,
    pub rationale: Rationale,
}

impl Recommendation {
    pub fn new(
        resource_id: impl Into<String>,
        category: Category,
        action: Action,
        estimated_monthly_savings: f64,
        confidence: Confidence,
        rationale: Rationale,
    ) -> Self {
        debug_assert!(
            estimated_monthly_savings >= 0.0,
            "estimated savings must be non-negative"
        );
        Self {
            resource_id: resource_id.into(),
            category,
            action,
            estimated_monthly_savings: estimated_monthly_savings.max(0.0),
            confidence,
            rationale,
        }
    }
}
