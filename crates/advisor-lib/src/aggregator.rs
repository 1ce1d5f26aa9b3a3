//! Cost aggregation over raw billing records
//!
//! Pure functions over their inputs: the same records and grouping always
//! produce the same buckets, and every input amount lands in exactly one
//! bucket.

use std::collections::BTreeMap;

use crate::error::EngineError;
use crate::models::CostRecord;

/// Groups cost records by requested dimensions
pub struct CostAggregator;

impl CostAggregator {
    /// Bucket record amounts by the values of the requested dimensions
    ///
    /// A record that lacks one of the dimensions contributes under an empty
    /// value for it. Fails with `InvalidDimension` when a requested
    /// dimension appears in no record at all.
    pub fn aggregate(
        records: &[CostRecord],
        group_by: &[&str],
    ) -> Result<BTreeMap<Vec<String>, f64>, EngineError> {
        for dimension in group_by {
            let known = records.iter().any(|r| r.dimensions.contains_key(*dimension));
            if !known {
                return Err(EngineError::InvalidDimension {
                    dimension: (*dimension).to_string(),
                });
            }
        }

        let mut buckets: BTreeMap<Vec<String>, f64> = BTreeMap::new();
        for record in records {
            let key: Vec<String> = group_by
                .iter()
                .map(|d| record.dimensions.get(*d).cloned().unwrap_or_default())
                .collect();
            *buckets.entry(key).or_insert(0.0) += record.amount;
        }

        Ok(buckets)
    }

    /// Top-N buckets by total amount, descending; ties broken by lexical
    /// order of the dimension tuple
    pub fn top_n(
        records: &[CostRecord],
        group_by: &[&str],
        n: usize,
    ) -> Result<Vec<(Vec<String>, f64)>, EngineError> {
        let buckets = Self::aggregate(records, group_by)?;
        let mut ranked: Vec<(Vec<String>, f64)> = buckets.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(n);
        Ok(ranked)
    }

    /// Daily spend per value of one dimension, ordered by day
    ///
    /// Only DAILY-granularity records participate; the commitment estimator
    /// builds its per-service history from this.
    pub fn daily_spend_by(
        records: &[CostRecord],
        dimension: &str,
        value: &str,
    ) -> Vec<(chrono::NaiveDate, f64)> {
        let mut by_day: BTreeMap<chrono::NaiveDate, f64> = BTreeMap::new();
        for record in records {
            if record.granularity != crate::models::Granularity::Daily {
                continue;
            }
            if record.dimensions.get(dimension).map(String::as_str) != Some(value) {
                continue;
            }
            *by_day.entry(record.period_start).or_insert(0.0) += record.amount;
        }
        by_day.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::BTreeMap as Map;

    fn record(day: u32, service: &str, amount: f64) -> CostRecord {
        CostRecord::daily(
            NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            amount,
            Map::from([("SERVICE".to_string(), service.to_string())]),
        )
    }

    #[test]
    fn test_aggregate_by_service() {
        let records = vec![record(1, "EC2", 10.0), record(1, "S3", 2.0)];
        let buckets = CostAggregator::aggregate(&records, &["SERVICE"]).unwrap();

        assert_eq!(buckets.get(&vec!["EC2".to_string()]), Some(&10.0));
        assert_eq!(buckets.get(&vec!["S3".to_string()]), Some(&2.0));
    }

    #[test]
    fn test_top_n_orders_and_truncates() {
        let records = vec![record(1, "EC2", 10.0), record(1, "S3", 2.0)];
        let top = CostAggregator::top_n(&records, &["SERVICE"], 1).unwrap();
        assert_eq!(top, vec![(vec!["EC2".to_string()], 10.0)]);
    }

    #[test]
    fn test_top_n_ties_break_lexically() {
        let records = vec![
            record(1, "S3", 5.0),
            record(1, "EC2", 5.0),
            record(1, "RDS", 5.0),
        ];
        let top = CostAggregator::top_n(&records, &["SERVICE"], 3).unwrap();
        let names: Vec<&str> = top.iter().map(|(k, _)| k[0].as_str()).collect();
        assert_eq!(names, vec!["EC2", "RDS", "S3"]);
    }

    #[test]
    fn test_invalid_dimension() {
        let records = vec![record(1, "EC2", 10.0)];
        let err = CostAggregator::aggregate(&records, &["TEAM"]).unwrap_err();
        assert!(matches!(err, EngineError::InvalidDimension { dimension } if dimension == "TEAM"));
    }

    #[test]
    fn test_conservation_of_totals() {
        let records: Vec<CostRecord> = (1..=28)
            .flat_map(|d| {
                vec![
                    record(d, "EC2", 10.25),
                    record(d, "S3", 3.5),
                    record(d, "RDS", 7.75),
                ]
            })
            .collect();

        let input_total: f64 = records.iter().map(|r| r.amount).sum();
        let buckets = CostAggregator::aggregate(&records, &["SERVICE"]).unwrap();
        let bucket_total: f64 = buckets.values().sum();

        assert_eq!(bucket_total, input_total);
    }

    #[test]
    fn test_missing_dimension_on_some_records_buckets_empty() {
        let mut records = vec![record(1, "EC2", 10.0)];
        records.push(CostRecord::daily(
            NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
            4.0,
            Map::from([("REGION".to_string(), "us-east-1".to_string())]),
        ));

        let buckets = CostAggregator::aggregate(&records, &["SERVICE"]).unwrap();
        assert_eq!(buckets.get(&vec![String::new()]), Some(&4.0));
    }

    #[test]
    fn test_daily_spend_by_service() {
        let records = vec![
            record(1, "EC2", 10.0),
            record(2, "EC2", 12.0),
            record(1, "S3", 2.0),
        ];
        let spend = CostAggregator::daily_spend_by(&records, "SERVICE", "EC2");
        assert_eq!(spend.len(), 2);
        assert_eq!(spend[0].1, 10.0);
        assert_eq!(spend[1].1, 12.0);
    }
}
