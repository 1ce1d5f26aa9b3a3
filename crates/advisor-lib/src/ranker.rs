//! Recommendation merging and ranking
//!
//! The single convergence point for all analyzers. Duplicate findings for
//! the same resource, category, and action kind collapse to the strongest
//! one; the survivors sort by savings, then confidence, then resource id,
//! so repeated runs over the same inputs produce identical orderings.

use std::collections::BTreeMap;

use crate::models::{Action, Category, Recommendation};

/// Discriminates action kinds for deduplication
fn action_kind(action: &Action) -> &'static str {
    match action {
        Action::Downsize { .. } => "downsize",
        Action::Upsize { .. } => "upsize",
        Action::Terminate => "terminate",
        Action::TransitionStorageClass { .. } => "transition_storage_class",
        Action::AddLifecyclePolicy => "add_lifecycle_policy",
        Action::MigrateVolumeType { .. } => "migrate_volume_type",
        Action::DowngradeInstanceClass { .. } => "downgrade_instance_class",
        Action::IncreaseProvisionedIops { .. } => "increase_provisioned_iops",
        Action::EnableMultiAz => "enable_multi_az",
        Action::PurchaseCommitment { .. } => "purchase_commitment",
    }
}

/// Orders and deduplicates merged analyzer output
pub struct RecommendationRanker;

impl RecommendationRanker {
    /// Rank recommendations by estimated savings, confidence, resource id
    ///
    /// Idempotent: ranking an already-ranked sequence returns it unchanged.
    pub fn rank(recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
        let mut best: BTreeMap<(String, Category, &'static str), Recommendation> = BTreeMap::new();

        for rec in recommendations {
            let key = (rec.resource_id.clone(), rec.category, action_kind(&rec.action));
            let stronger = match best.get(&key) {
                Some(existing) => {
                    (rec.confidence, rec.estimated_monthly_savings)
                        > (existing.confidence, existing.estimated_monthly_savings)
                }
                None => true,
            };
            if stronger {
                best.insert(key, rec);
            }
        }

        let mut ranked: Vec<Recommendation> = best.into_values().collect();
        ranked.sort_by(|a, b| {
            b.estimated_monthly_savings
                .partial_cmp(&a.estimated_monthly_savings)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.confidence.cmp(&a.confidence))
                .then_with(|| a.resource_id.cmp(&b.resource_id))
                .then_with(|| a.category.cmp(&b.category))
        });
        ranked
    }
}
