//! Analysis configuration
//!
//! All tunable thresholds consolidated in one structure with documented
//! defaults. Percentages are validated into [0, 100] and age thresholds
//! must be ordered before the config is accepted.

use anyhow::{bail, Result};
use serde::Deserialize;

/// Hours in an average billing month
pub const HOURS_PER_MONTH: f64 = 730.0;

/// Days in an average billing month
pub const DAYS_PER_MONTH: f64 = 30.44;

/// Tunable thresholds for all analyzers
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisConfig {
    /// Rightsizing lookback window in days
    #[serde(default = "default_lookback_rightsizing")]
    pub lookback_days_rightsizing: u32,

    /// Idle-detection lookback window in days
    #[serde(default = "default_lookback_idle")]
    pub lookback_days_idle: u32,

    /// p95 CPU below this recommends downsizing one tier
    #[serde(default = "default_cpu_low")]
    pub cpu_threshold_low: f64,

    /// p95 CPU below this still qualifies for downsizing when the family
    /// has a smaller size
    #[serde(default = "default_cpu_moderate")]
    pub cpu_threshold_moderate: f64,

    /// p95 CPU above this on enough distinct days recommends upsizing
    #[serde(default = "default_cpu_high")]
    pub cpu_threshold_high: f64,

    /// Compute utilization below this counts as idle
    #[serde(default = "default_idle_threshold")]
    pub idle_threshold_percent: f64,

    /// Low-usage day streak that upgrades downsize confidence to high
    #[serde(default = "default_low_usage_streak")]
    pub low_usage_streak_days: u32,

    /// Distinct days of sustained breach required for upsize/IOPS rules
    #[serde(default = "default_sustained_days")]
    pub sustained_breach_days: u32,

    /// Minimum distinct days of samples before rightsizing will evaluate
    #[serde(default = "default_min_rightsizing_days")]
    pub min_rightsizing_days: u32,

    /// Object age for infrequent-access transition, days
    #[serde(default = "default_storage_age_ia")]
    pub storage_age_ia_days: u32,

    /// Object age for archival transition, days
    #[serde(default = "default_storage_age_archive")]
    pub storage_age_archive_days: u32,

    /// Volume IOPS p95 below this recommends a cheaper volume type
    #[serde(default = "default_volume_iops_floor")]
    pub volume_iops_floor: f64,

    /// Database CPU p95 below this qualifies for downsizing
    #[serde(default = "default_db_cpu")]
    pub db_cpu_threshold_percent: f64,

    /// Database connection p95 below this percent of max qualifies
    #[serde(default = "default_db_connections")]
    pub db_connection_threshold_percent: f64,

    /// Acceptable fraction of days below the commitment level, percent
    #[serde(default = "default_commitment_risk")]
    pub commitment_risk_tolerance: f64,

    /// Minimum days of spend history before sizing a commitment
    #[serde(default = "default_commitment_min_history")]
    pub commitment_min_history_days: u32,

    /// Commitment discount against on-demand, percent
    #[serde(default = "default_commitment_discount")]
    pub commitment_discount_percent: f64,

    /// Commitment term length in months
    #[serde(default = "default_commitment_term")]
    pub commitment_term_months: u32,

    /// Fraction of total commitment cost paid upfront
    #[serde(default)]
    pub commitment_upfront_fraction: f64,
}

fn default_lookback_rightsizing() -> u32 {
    30
}

fn default_lookback_idle() -> u32 {
    7
}

fn default_cpu_low() -> f64 {
    10.0
}

fn default_cpu_moderate() -> f64 {
    40.0
}

fn default_cpu_high() -> f64 {
    80.0
}

fn default_idle_threshold() -> f64 {
    1.0
}

fn default_low_usage_streak() -> u32 {
    14
}

fn default_sustained_days() -> u32 {
    3
}

fn default_min_rightsizing_days() -> u32 {
    3
}

fn default_storage_age_ia() -> u32 {
    30
}

fn default_storage_age_archive() -> u32 {
    90
}

fn default_volume_iops_floor() -> f64 {
    100.0
}

fn default_db_cpu() -> f64 {
    20.0
}

fn default_db_connections() -> f64 {
    10.0
}

fn default_commitment_risk() -> f64 {
    5.0
}

fn default_commitment_min_history() -> u32 {
    14
}

fn default_commitment_discount() -> f64 {
    27.0
}

fn default_commitment_term() -> u32 {
    12
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            lookback_days_rightsizing: default_lookback_rightsizing(),
            lookback_days_idle: default_lookback_idle(),
            cpu_threshold_low: default_cpu_low(),
            cpu_threshold_moderate: default_cpu_moderate(),
            cpu_threshold_high: default_cpu_high(),
            idle_threshold_percent: default_idle_threshold(),
            low_usage_streak_days: default_low_usage_streak(),
            sustained_breach_days: default_sustained_days(),
            min_rightsizing_days: default_min_rightsizing_days(),
            storage_age_ia_days: default_storage_age_ia(),
            storage_age_archive_days: default_storage_age_archive(),
            volume_iops_floor: default_volume_iops_floor(),
            db_cpu_threshold_percent: default_db_cpu(),
            db_connection_threshold_percent: default_db_connections(),
            commitment_risk_tolerance: default_commitment_risk(),
            commitment_min_history_days: default_commitment_min_history(),
            commitment_discount_percent: default_commitment_discount(),
            commitment_term_months: default_commitment_term(),
            commitment_upfront_fraction: 0.0,
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from `ADVISOR_*` environment variables, falling
    /// back to the documented defaults
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("ADVISOR"))
            .build()?;

        let loaded: AnalysisConfig = config
            .try_deserialize()
            .unwrap_or_else(|_| AnalysisConfig::default());
        loaded.validate()?;
        Ok(loaded)
    }

    /// Check all thresholds against their documented ranges
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("cpu_threshold_low", self.cpu_threshold_low),
            ("cpu_threshold_moderate", self.cpu_threshold_moderate),
            ("cpu_threshold_high", self.cpu_threshold_high),
            ("idle_threshold_percent", self.idle_threshold_percent),
            ("db_cpu_threshold_percent", self.db_cpu_threshold_percent),
            (
                "db_connection_threshold_percent",
                self.db_connection_threshold_percent,
            ),
            (
                "commitment_risk_tolerance",
                self.commitment_risk_tolerance,
            ),
            (
                "commitment_discount_percent",
                self.commitment_discount_percent,
            ),
        ] {
            if !(0.0..=100.0).contains(&value) {
                bail!("{} must be within [0, 100], got {}", name, value);
            }
        }

        if self.cpu_threshold_low >= self.cpu_threshold_moderate
            || self.cpu_threshold_moderate >= self.cpu_threshold_high
        {
            bail!(
                "CPU thresholds must be ordered low < moderate < high, got {} / {} / {}",
                self.cpu_threshold_low,
                self.cpu_threshold_moderate,
                self.cpu_threshold_high
            );
        }

        if self.storage_age_ia_days >= self.storage_age_archive_days {
            bail!(
                "storage_age_ia_days ({}) must be below storage_age_archive_days ({})",
                self.storage_age_ia_days,
                self.storage_age_archive_days
            );
        }

        for (name, days) in [
            ("lookback_days_rightsizing", self.lookback_days_rightsizing),
            ("lookback_days_idle", self.lookback_days_idle),
            ("commitment_term_months", self.commitment_term_months),
        ] {
            if days == 0 {
                bail!("{} must be at least 1", name);
            }
        }

        if !(0.0..=1.0).contains(&self.commitment_upfront_fraction) {
            bail!(
                "commitment_upfront_fraction must be within [0, 1], got {}",
                self.commitment_upfront_fraction
            );
        }

        Ok(())
    }
}
