//! End-to-end analysis scenarios through the public engine API

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;

use advisor_lib::pricing::storage_class;
use advisor_lib::{
    metric, tag, Action, AnalysisConfig, AnalysisInputs, BucketFacts, Category, Confidence,
    CostAggregator, CostEngine, CostRecord, MetricSeries, MetricUnit, ObjectAgeBucket, Resource,
    ResourceKind, Sample, StaticPriceBook,
};

const DAY: i64 = 86_400;

fn engine() -> CostEngine {
    CostEngine::new(AnalysisConfig::default(), Arc::new(StaticPriceBook::new())).unwrap()
}

fn daily_cpu(id: &str, daily: &[f64]) -> MetricSeries {
    MetricSeries::new(
        id,
        metric::CPU_UTILIZATION,
        MetricUnit::Percent,
        daily
            .iter()
            .enumerate()
            .map(|(d, v)| Sample::new(d as i64 * DAY, *v))
            .collect(),
    )
}

fn service_record(day: u32, service: &str, amount: f64) -> CostRecord {
    CostRecord::daily(
        NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
        amount,
        BTreeMap::from([("SERVICE".to_string(), service.to_string())]),
    )
}

#[tokio::test]
async fn thirty_days_at_three_percent_downsizes_with_high_confidence() {
    let inputs = AnalysisInputs {
        as_of: 30 * DAY,
        resources: vec![Resource::new("i-quiet", ResourceKind::Compute, "us-east-1")
            .with_tag(tag::INSTANCE_TYPE, "m5.xlarge")],
        series: vec![daily_cpu("i-quiet", &[3.0; 30])],
        ..AnalysisInputs::default()
    };
    let report = engine().analyze(inputs).await.unwrap();

    let downsize: Vec<_> = report
        .recommendations
        .iter()
        .filter(|r| r.category == Category::Rightsizing)
        .collect();
    assert_eq!(downsize.len(), 1);
    assert_eq!(downsize[0].confidence, Confidence::High);
    assert!(matches!(&downsize[0].action, Action::Downsize { .. }));
}

#[tokio::test]
async fn aged_bucket_without_lifecycle_yields_exactly_two_recommendations() {
    let inputs = AnalysisInputs {
        as_of: 0,
        resources: vec![Resource::new(
            "bkt-logs",
            ResourceKind::ObjectStorage,
            "us-east-1",
        )],
        bucket_facts: vec![BucketFacts {
            resource_id: "bkt-logs".to_string(),
            age_buckets: vec![ObjectAgeBucket {
                min_age_days: 120,
                object_count: 1_000,
                total_bytes: 10 * 1024 * 1024 * 1024,
                accessed_within_period: false,
            }],
            has_lifecycle_policy: false,
            storage_class: storage_class::STANDARD.to_string(),
        }],
        ..AnalysisInputs::default()
    };
    let report = engine().analyze(inputs).await.unwrap();

    let storage: Vec<_> = report
        .recommendations
        .iter()
        .filter(|r| r.category == Category::Storage)
        .collect();
    assert_eq!(storage.len(), 2);
    assert_eq!(
        storage
            .iter()
            .filter(|r| r.action == Action::AddLifecyclePolicy)
            .count(),
        1
    );
    assert_eq!(
        storage
            .iter()
            .filter(|r| matches!(
                &r.action,
                Action::TransitionStorageClass { to } if to == storage_class::ARCHIVE
            ))
            .count(),
        1
    );
}

#[test]
fn aggregate_and_top_n_scenario() {
    let records = vec![
        service_record(1, "EC2", 10.0),
        service_record(1, "S3", 2.0),
    ];

    let buckets = CostAggregator::aggregate(&records, &["SERVICE"]).unwrap();
    assert_eq!(buckets.get(&vec!["EC2".to_string()]), Some(&10.0));
    assert_eq!(buckets.get(&vec!["S3".to_string()]), Some(&2.0));

    let top = CostAggregator::top_n(&records, &["SERVICE"], 1).unwrap();
    assert_eq!(top, vec![(vec!["EC2".to_string()], 10.0)]);
}

#[tokio::test]
async fn short_spend_history_abstains_for_every_service() {
    let mut records = Vec::new();
    for day in 1..=10 {
        records.push(service_record(day, "EC2", 100.0));
        records.push(service_record(day, "RDS", 40.0));
    }
    let inputs = AnalysisInputs {
        cost_records: records,
        ..AnalysisInputs::default()
    };
    let report = engine().analyze(inputs).await.unwrap();

    assert!(report
        .recommendations
        .iter()
        .all(|r| r.category != Category::Commitment));
    assert_eq!(report.abstained.get(&Category::Commitment), Some(&2));
}

#[tokio::test]
async fn malformed_series_skips_one_resource_and_analyzes_the_rest() {
    let mut bad = daily_cpu("i-bad", &[3.0; 30]);
    bad.samples.reverse();

    let inputs = AnalysisInputs {
        as_of: 30 * DAY,
        resources: vec![
            Resource::new("i-bad", ResourceKind::Compute, "us-east-1")
                .with_tag(tag::INSTANCE_TYPE, "m5.xlarge"),
            Resource::new("i-good", ResourceKind::Compute, "us-east-1")
                .with_tag(tag::INSTANCE_TYPE, "m5.xlarge"),
        ],
        series: vec![bad, daily_cpu("i-good", &[3.0; 30])],
        ..AnalysisInputs::default()
    };
    let report = engine().analyze(inputs).await.unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].resource_id, "i-bad");
    assert!(report
        .recommendations
        .iter()
        .any(|r| r.resource_id == "i-good"));
    assert!(report
        .recommendations
        .iter()
        .all(|r| r.resource_id != "i-bad"));
}

#[tokio::test]
async fn ranked_output_is_descending_and_stable_across_runs() {
    let mut resources = Vec::new();
    let mut series = Vec::new();
    for (i, instance_type) in ["t3.large", "m5.xlarge", "c5.2xlarge"].iter().enumerate() {
        let id = format!("i-{}", i);
        resources.push(
            Resource::new(&id, ResourceKind::Compute, "us-east-1")
                .with_tag(tag::INSTANCE_TYPE, *instance_type),
        );
        series.push(daily_cpu(&id, &[0.4; 30]));
    }
    let inputs = AnalysisInputs {
        as_of: 30 * DAY,
        resources,
        series,
        ..AnalysisInputs::default()
    };

    let first = engine().analyze(inputs.clone()).await.unwrap();
    let second = engine().analyze(inputs).await.unwrap();

    for pair in first.recommendations.windows(2) {
        assert!(pair[0].estimated_monthly_savings >= pair[1].estimated_monthly_savings);
    }

    let order = |report: &advisor_lib::AnalysisReport| -> Vec<(String, Category)> {
        report
            .recommendations
            .iter()
            .map(|r| (r.resource_id.clone(), r.category))
            .collect()
    };
    assert_eq!(order(&first), order(&second));
}

#[tokio::test]
async fn savings_are_never_negative() {
    // Mix of savings-bearing and zero-savings guidance recommendations
    let inputs = AnalysisInputs {
        as_of: 30 * DAY,
        resources: vec![
            Resource::new("i-hot", ResourceKind::Compute, "us-east-1")
                .with_tag(tag::INSTANCE_TYPE, "m5.xlarge"),
            Resource::new("i-cold", ResourceKind::Compute, "us-east-1")
                .with_tag(tag::INSTANCE_TYPE, "m5.xlarge"),
        ],
        series: vec![daily_cpu("i-hot", &[95.0; 30]), daily_cpu("i-cold", &[0.2; 30])],
        ..AnalysisInputs::default()
    };
    let report = engine().analyze(inputs).await.unwrap();

    assert!(!report.recommendations.is_empty());
    for rec in &report.recommendations {
        assert!(rec.estimated_monthly_savings >= 0.0);
    }
}
