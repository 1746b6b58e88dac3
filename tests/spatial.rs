use std::sync::Arc;

use canopy_watch::model::{Coordinates, MonitoredPoint};
use canopy_watch::spatial::{Navigator, build_neighbors};
use proptest::prelude::*;

fn point(id: &str, lat: f64, lon: f64) -> Arc<MonitoredPoint> {
    Arc::new(MonitoredPoint::placeholder(id, Coordinates::new(lat, lon)))
}

fn ids(state: &canopy_watch::spatial::NavigationState) -> Vec<String> {
    state.neighbors().iter().map(|n| n.point.id.clone()).collect()
}

#[test]
fn stepping_visits_neighbors_by_distance_then_wraps() {
    let p = point("P", 35.0, 139.0);
    let dataset = vec![
        point("far", 35.0, 139.4),
        Arc::clone(&p),
        point("near", 35.0, 139.1),
        point("mid", 35.2, 139.0),
        point("farther", 35.5, 139.0),
    ];

    let mut nav = build_neighbors(&dataset, &p);
    assert_eq!(ids(&nav), ["P", "near", "mid", "far", "farther"]);
    assert_eq!(nav.current().map(|n| n.point.id.as_str()), Some("P"));

    let visited: Vec<String> = (0..4)
        .filter_map(|_| nav.next().map(|n| n.point.id.clone()))
        .collect();
    assert_eq!(visited, ["near", "mid", "far", "farther"]);
    assert_eq!(nav.next().map(|n| n.point.id.as_str()), Some("P"));
    assert_eq!(nav.previous().map(|n| n.point.id.as_str()), Some("farther"));
}

#[test]
fn missing_reference_is_inserted_first() {
    let ghost = point("ghost", 35.05, 139.05);
    let dataset = vec![point("a", 35.0, 139.0), point("b", 35.3, 139.0)];

    let nav = build_neighbors(&dataset, &ghost);
    assert!(nav.is_synthetic_reference());
    assert_eq!(nav.len(), 3);
    assert_eq!(ids(&nav)[0], "ghost");
    assert_eq!(nav.cursor(), 0);
}

#[test]
fn empty_dataset_yields_only_the_reference() {
    let ghost = point("ghost", 0.0, 0.0);
    let mut nav = build_neighbors(&[], &ghost);
    assert_eq!(nav.len(), 1);
    assert_eq!(nav.next().map(|n| n.point.id.as_str()), Some("ghost"));
}

#[test]
fn ties_keep_input_order() {
    let p = point("P", 0.0, 0.0);
    let dataset = vec![
        Arc::clone(&p),
        point("east", 0.0, 1.0),
        point("north", 1.0, 0.0),
        point("west", 0.0, -1.0),
    ];
    let nav = build_neighbors(&dataset, &p);
    assert_eq!(ids(&nav), ["P", "east", "north", "west"]);
}

#[test]
fn stepping_is_ignored_while_rebuilding() {
    let a = point("a", 0.0, 0.0);
    let dataset = vec![Arc::clone(&a), point("b", 0.0, 1.0)];
    let mut navigator = Navigator::new();
    navigator.rebuild_now(&dataset, &a);

    let ticket = navigator.begin_rebuild("a");
    assert!(navigator.is_rebuilding());
    assert!(navigator.next().is_none());
    assert_eq!(navigator.current().map(|n| n.point.id.as_str()), Some("a"));

    assert!(navigator.finish_rebuild(&ticket, build_neighbors(&dataset, &a)));
    assert_eq!(navigator.next().map(|n| n.point.id.as_str()), Some("b"));
}

fn dataset_strategy() -> impl Strategy<Value = (Vec<Arc<MonitoredPoint>>, usize)> {
    proptest::collection::vec((-60.0f64..60.0, -170.0f64..170.0), 1..30).prop_flat_map(|coords| {
        let len = coords.len();
        let points: Vec<Arc<MonitoredPoint>> = coords
            .into_iter()
            .enumerate()
            .map(|(i, (lat, lon))| point(&format!("p{i}"), lat, lon))
            .collect();
        (Just(points), 0..len)
    })
}

proptest! {
    #[test]
    fn ordering_is_a_sorted_permutation((dataset, pick) in dataset_strategy()) {
        let reference = Arc::clone(&dataset[pick]);
        let nav = build_neighbors(&dataset, &reference);

        prop_assert_eq!(nav.len(), dataset.len());
        prop_assert!(!nav.is_synthetic_reference());
        let distances: Vec<f64> = nav.neighbors().iter().map(|n| n.distance).collect();
        prop_assert!(distances.windows(2).all(|w| w[0] <= w[1]));

        let mut seen = ids(&nav);
        seen.sort();
        let mut expected: Vec<String> = dataset.iter().map(|p| p.id.clone()).collect();
        expected.sort();
        prop_assert_eq!(seen, expected);

        prop_assert_eq!(nav.current().map(|n| n.point.id.clone()), Some(reference.id.clone()));
    }

    #[test]
    fn full_cycle_returns_to_start((dataset, pick) in dataset_strategy(), steps in 0usize..5) {
        let reference = Arc::clone(&dataset[pick]);
        let mut nav = build_neighbors(&dataset, &reference);
        let start = nav.cursor();

        for _ in 0..nav.len() {
            nav.next();
        }
        prop_assert_eq!(nav.cursor(), start);

        for _ in 0..steps {
            nav.next();
        }
        for _ in 0..steps {
            nav.previous();
        }
        prop_assert_eq!(nav.cursor(), start);
    }
}
