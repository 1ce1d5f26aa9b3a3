//! Sample statistics shared by the analyzers
//!
//! Percentiles use linear interpolation on the sorted sample set, so the
//! result is independent of input order. Day bucketing is UTC.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};

use crate::models::Sample;

/// Percentile via linear interpolation on the sorted sample set
///
/// `p` is in [0, 100]. Returns 0.0 for an empty slice.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let frac = rank - lower as f64;
    sorted[lower] + frac * (sorted[upper] - sorted[lower])
}

/// UTC calendar day of a unix-second timestamp
pub fn day_of(timestamp: i64) -> NaiveDate {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.date_naive())
        .unwrap_or(NaiveDate::MIN)
}

/// Peak sample value per UTC day, ordered by day
pub fn daily_peaks(samples: &[Sample]) -> BTreeMap<NaiveDate, f64> {
    let mut peaks: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for s in samples {
        let day = day_of(s.timestamp);
        peaks
            .entry(day)
            .and_modify(|peak| *peak = peak.max(s.value))
            .or_insert(s.value);
    }
    peaks
}

/// Number of distinct UTC days covered by the samples
pub fn distinct_days(samples: &[Sample]) -> u32 {
    daily_peaks(samples).len() as u32
}

/// Longest run of consecutive calendar days whose peak satisfies `pred`
pub fn longest_day_streak<F>(peaks: &BTreeMap<NaiveDate, f64>, pred: F) -> u32
where
    F: Fn(f64) -> bool,
{
    let mut longest = 0u32;
    let mut current = 0u32;
    let mut prev_day: Option<NaiveDate> = None;

    for (day, peak) in peaks {
        if pred(*peak) {
            let consecutive = prev_day
                .and_then(|p| p.succ_opt())
                .map(|next| next == *day)
                .unwrap_or(false);
            current = if consecutive && current > 0 {
                current + 1
            } else {
                1
            };
            longest = longest.max(current);
            prev_day = Some(*day);
        } else {
            current = 0;
            prev_day = Some(*day);
        }
    }

    longest
}

/// Count of days whose peak satisfies `pred`
pub fn days_matching<F>(peaks: &BTreeMap<NaiveDate, f64>, pred: F) -> u32
where
    F: Fn(f64) -> bool,
{
    peaks.values().filter(|peak| pred(**peak)).count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: i64 = 86_400;

    #[test]
    fn test_percentile_interpolates() {
        let values = vec![1.0, 2.0, 3.0, 4.0];
        // rank = 0.5 * 3 = 1.5, halfway between 2.0 and 3.0
        assert!((percentile(&values, 50.0) - 2.5).abs() < 1e-9);
        assert!((percentile(&values, 0.0) - 1.0).abs() < 1e-9);
        assert!((percentile(&values, 100.0) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_percentile_order_independent() {
        let sorted: Vec<f64> = (1..=100).map(|i| i as f64).collect();
        let mut shuffled = sorted.clone();
        shuffled.reverse();
        shuffled.swap(3, 57);
        shuffled.swap(12, 90);

        for p in [0.0, 25.0, 50.0, 95.0, 99.0, 100.0] {
            assert_eq!(percentile(&sorted, p), percentile(&shuffled, p));
        }
    }

    #[test]
    fn test_percentile_single_and_empty() {
        assert_eq!(percentile(&[], 95.0), 0.0);
        assert_eq!(percentile(&[42.0], 95.0), 42.0);
    }

    #[test]
    fn test_daily_peaks() {
        let samples = vec![
            Sample::new(0, 5.0),
            Sample::new(3600, 9.0),
            Sample::new(DAY, 2.0),
            Sample::new(DAY + 60, 1.0),
        ];
        let peaks = daily_peaks(&samples);
        assert_eq!(peaks.len(), 2);
        let values: Vec<f64> = peaks.values().copied().collect();
        assert_eq!(values, vec![9.0, 2.0]);
        assert_eq!(distinct_days(&samples), 2);
    }

    #[test]
    fn test_longest_streak_counts_consecutive_days_only() {
        // Days 0,1,2 low; day 3 high; days 4,5 low
        let samples: Vec<Sample> = (0..6)
            .map(|d| Sample::new(d * DAY, if d == 3 { 50.0 } else { 2.0 }))
            .collect();
        let peaks = daily_peaks(&samples);
        assert_eq!(longest_day_streak(&peaks, |v| v < 10.0), 3);
    }

    #[test]
    fn test_streak_broken_by_gap() {
        // Low on days 0,1 then a two-day gap then low on day 4
        let samples = vec![
            Sample::new(0, 1.0),
            Sample::new(DAY, 1.0),
            Sample::new(4 * DAY, 1.0),
        ];
        let peaks = daily_peaks(&samples);
        assert_eq!(longest_day_streak(&peaks, |v| v < 10.0), 2);
    }

    #[test]
    fn test_days_matching() {
        let samples: Vec<Sample> = (0..5)
            .map(|d| Sample::new(d * DAY, if d % 2 == 0 { 90.0 } else { 10.0 }))
            .collect();
        let peaks = daily_peaks(&samples);
        assert_eq!(days_matching(&peaks, |v| v > 80.0), 3);
    }
}
