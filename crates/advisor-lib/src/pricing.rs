//! Pricing and sizing information behind an injectable trait
//!
//! Analyzers never hard-code rates. `StaticPriceBook` carries a small
//! representative on-demand table; embedders inject their own book for
//! real pricing feeds.

use std::collections::BTreeMap;

/// Storage class names used by the storage optimizer
pub mod storage_class {
    pub const STANDARD: &str = "standard";
    pub const INFREQUENT_ACCESS: &str = "infrequent-access";
    pub const ARCHIVE: &str = "archive";
}

/// Pricing and size-ladder lookups required by the analyzers
pub trait PriceBook: Send + Sync {
    /// On-demand hourly rate for a compute or database instance class
    fn hourly_rate(&self, instance_type: &str) -> Option<f64>;

    /// Next size down in the same family, if one exists
    fn smaller_size(&self, instance_type: &str) -> Option<String>;

    /// Next size up in the same family, if one exists
    fn larger_size(&self, instance_type: &str) -> Option<String>;

    /// Monthly per-GB rate for a block volume type
    fn volume_gb_month(&self, volume_type: &str) -> Option<f64>;

    /// Cheaper equivalent volume type, if one exists
    fn cheaper_volume_type(&self, volume_type: &str) -> Option<String>;

    /// Monthly per-GB rate for an object storage class
    fn storage_class_gb_month(&self, class: &str) -> Option<f64>;
}

/// Built-in price book with representative on-demand rates
///
/// Families are ordered ladders; position determines what "one tier down"
/// means for rightsizing.
pub struct StaticPriceBook {
    families: Vec<Vec<&'static str>>,
    hourly: BTreeMap<&'static str, f64>,
    volume_gb_month: BTreeMap<&'static str, f64>,
    cheaper_volume: BTreeMap<&'static str, &'static str>,
    storage_gb_month: BTreeMap<&'static str, f64>,
}

impl StaticPriceBook {
    pub fn new() -> Self {
        let families = vec![
            vec!["t3.micro", "t3.small", "t3.medium", "t3.large", "t3.xlarge"],
            vec!["m5.large", "m5.xlarge", "m5.2xlarge", "m5.4xlarge"],
            vec!["c5.large", "c5.xlarge", "c5.2xlarge", "c5.4xlarge"],
            vec!["r5.large", "r5.xlarge", "r5.2xlarge"],
            vec!["db.t3.small", "db.t3.medium", "db.t3.large"],
            vec!["db.m5.large", "db.m5.xlarge", "db.m5.2xlarge"],
            vec!["db.r5.large", "db.r5.xlarge", "db.r5.2xlarge"],
        ];

        let hourly = BTreeMap::from([
            ("t3.micro", 0.0104),
            ("t3.small", 0.0208),
            ("t3.medium", 0.0416),
            ("t3.large", 0.0832),
            ("t3.xlarge", 0.1664),
            ("m5.large", 0.096),
            ("m5.xlarge", 0.192),
            ("m5.2xlarge", 0.384),
            ("m5.4xlarge", 0.768),
            ("c5.large", 0.085),
            ("c5.xlarge", 0.17),
            ("c5.2xlarge", 0.34),
            ("c5.4xlarge", 0.68),
            ("r5.large", 0.126),
            ("r5.xlarge", 0.252),
            ("r5.2xlarge", 0.504),
            ("db.t3.small", 0.034),
            ("db.t3.medium", 0.068),
            ("db.t3.large", 0.136),
            ("db.m5.large", 0.171),
            ("db.m5.xlarge", 0.342),
            ("db.m5.2xlarge", 0.684),
            ("db.r5.large", 0.24),
            ("db.r5.xlarge", 0.48),
            ("db.r5.2xlarge", 0.96),
        ]);

        let volume_gb_month = BTreeMap::from([("gp2", 0.10), ("gp3", 0.08), ("io1", 0.125)]);
        let cheaper_volume = BTreeMap::from([("gp2", "gp3"), ("io1", "gp3")]);

        let storage_gb_month = BTreeMap::from([
            (storage_class::STANDARD, 0.023),
            (storage_class::INFREQUENT_ACCESS, 0.0125),
            (storage_class::ARCHIVE, 0.0036),
        ]);

        Self {
            families,
            hourly,
            volume_gb_month,
            cheaper_volume,
            storage_gb_month,
        }
    }

    fn family_position(&self, instance_type: &str) -> Option<(usize, usize)> {
        for (f, ladder) in self.families.iter().enumerate() {
            if let Some(pos) = ladder.iter().position(|t| *t == instance_type) {
                return Some((f, pos));
            }
        }
        None
    }
}

impl Default for StaticPriceBook {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceBook for StaticPriceBook {
    fn hourly_rate(&self, instance_type: &str) -> Option<f64> {
        self.hourly.get(instance_type).copied()
    }

    fn smaller_size(&self, instance_type: &str) -> Option<String> {
        let (family, pos) = self.family_position(instance_type)?;
        if pos == 0 {
            return None;
        }
        Some(self.families[family][pos - 1].to_string())
    }

    fn larger_size(&self, instance_type: &str) -> Option<String> {
        let (family, pos) = self.family_position(instance_type)?;
        self.families[family].get(pos + 1).map(|t| t.to_string())
    }

    fn volume_gb_month(&self, volume_type: &str) -> Option<f64> {
        self.volume_gb_month.get(volume_type).copied()
    }

    fn cheaper_volume_type(&self, volume_type: &str) -> Option<String> {
        self.cheaper_volume
            .get(volume_type)
            .map(|t| (*t).to_string())
    }

    fn storage_class_gb_month(&self, class: &str) -> Option<f64> {
        self.storage_gb_month.get(class).copied()
    }
}
