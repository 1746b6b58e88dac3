use canopy_watch::classify::{
    AlertSeverity, DatasetStats, HealthCategory, alerts, classify, classify_point,
};
use canopy_watch::model::{Coordinates, MonitoredPoint};
use proptest::prelude::*;

/// Health order from worst to best; no-data sits outside it.
fn rank(category: HealthCategory) -> Option<u8> {
    match category {
        HealthCategory::NoData => None,
        HealthCategory::CriticalDecrease => Some(0),
        HealthCategory::Decrease => Some(1),
        HealthCategory::Stable => Some(2),
        HealthCategory::StrongIncrease => Some(3),
    }
}

fn point(id: &str, delta: Option<f64>) -> MonitoredPoint {
    MonitoredPoint {
        ndvi_delta: delta,
        ..MonitoredPoint::placeholder(id, Coordinates::new(35.0, 139.0))
    }
}

#[test]
fn threshold_table() {
    let cases = [
        (Some(0.25), HealthCategory::StrongIncrease),
        (Some(0.10), HealthCategory::StrongIncrease),
        (Some(0.0), HealthCategory::Stable),
        (Some(-0.10), HealthCategory::Stable),
        (Some(-0.1001), HealthCategory::Decrease),
        (Some(-0.50), HealthCategory::Decrease),
        (Some(-0.5001), HealthCategory::CriticalDecrease),
        (Some(-3.0), HealthCategory::CriticalDecrease),
        (None, HealthCategory::NoData),
        (Some(f64::NAN), HealthCategory::NoData),
    ];
    for (delta, expected) in cases {
        assert_eq!(classify(delta).category, expected, "delta {delta:?}");
        assert_eq!(classify(delta).color, expected.color());
    }
}

#[test]
fn stats_use_the_same_boundaries() {
    let points = [
        point("a", Some(0.2)),
        point("b", Some(0.0)),
        point("c", Some(-0.3)),
        point("d", Some(-0.7)),
        point("e", None),
    ];
    let stats = DatasetStats::from_points(&points);
    assert_eq!(stats.total_points, 5);
    assert_eq!(stats.processed_points, 4);
    assert_eq!(stats.increase_count, 1);
    assert_eq!(stats.stable_count, 1);
    assert_eq!(stats.decrease_count, 2);
    assert_eq!(stats.critical_count, 1);
    assert_eq!(stats.no_data_count, 1);
    assert_eq!(stats.count(HealthCategory::Decrease), 1);
    let mean = stats.mean_delta.expect("mean");
    assert!((mean - (-0.2)).abs() < 1e-12);
}

#[test]
fn critical_and_missing_delta_pair() {
    let points = [point("red", Some(-0.6)), point("gray", None)];
    assert_eq!(classify_point(&points[0]).category, HealthCategory::CriticalDecrease);
    assert_eq!(classify_point(&points[0]).color, palette::Srgb::new(213, 0, 0));
    assert_eq!(classify_point(&points[1]).category, HealthCategory::NoData);

    let stats = DatasetStats::from_points(&points);
    assert_eq!(stats.decrease_count, 1);
    assert_eq!(stats.processed_points, 1);
    assert_eq!(stats.total_points, 2);
}

#[test]
fn empty_dataset_has_no_mean() {
    let stats = DatasetStats::from_points(std::iter::empty());
    assert_eq!(stats, DatasetStats::default());
}

#[test]
fn alerts_are_worst_first_with_severity() {
    let points = [
        point("mild", Some(-0.12)),
        point("ok", Some(-0.05)),
        point("bad", Some(-0.4)),
        point("none", None),
    ];
    let list = alerts(&points, -0.1);
    let ids: Vec<&str> = list.iter().map(|a| a.point_id.as_str()).collect();
    assert_eq!(ids, ["bad", "mild"]);
    assert_eq!(list[0].severity, AlertSeverity::High);
    assert_eq!(list[1].severity, AlertSeverity::Medium);
}

proptest! {
    #[test]
    fn classify_is_total(delta in proptest::option::of(proptest::num::f64::ANY)) {
        let category = classify(delta).category;
        let no_data = delta.is_none_or(f64::is_nan);
        prop_assert_eq!(category == HealthCategory::NoData, no_data);
    }

    #[test]
    fn classify_is_monotonic(a in -2.0f64..2.0, b in -2.0f64..2.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(rank(classify(Some(lo)).category) <= rank(classify(Some(hi)).category));
    }

    #[test]
    fn stats_partition_the_dataset(deltas in proptest::collection::vec(proptest::option::of(-1.0f64..1.0), 0..40)) {
        let points: Vec<MonitoredPoint> = deltas
            .iter()
            .enumerate()
            .map(|(i, d)| point(&i.to_string(), *d))
            .collect();
        let stats = DatasetStats::from_points(&points);
        let by_category: usize = HealthCategory::ALL.iter().map(|c| stats.count(*c)).sum();
        prop_assert_eq!(by_category, stats.total_points);
        prop_assert_eq!(stats.processed_points + stats.no_data_count, stats.total_points);
    }
}
