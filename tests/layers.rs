use std::sync::Arc;

use canopy_watch::layers::{
    GeoBounds, LayerManager, LayerName, MapSurface, MapView, Marker, OverlayId, PickedLocation,
};
use canopy_watch::model::{CitizenReport, Coordinates, MonitoredPoint, ReportStatus};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Add(LayerName, OverlayId, usize),
    Remove(OverlayId),
    Fit(GeoBounds),
}

/// Surface that only records what the manager asked of it.
#[derive(Debug, Default)]
struct RecordingSurface {
    calls: Vec<Call>,
    live: Vec<(OverlayId, LayerName)>,
    next_id: u64,
}

impl RecordingSurface {
    fn live_for(&self, layer: LayerName) -> usize {
        self.live.iter().filter(|(_, l)| *l == layer).count()
    }

    fn fits(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, Call::Fit(_))).count()
    }
}

impl MapSurface for RecordingSurface {
    fn add_overlay(&mut self, layer: LayerName, markers: Vec<Marker>) -> OverlayId {
        self.next_id += 1;
        let id = OverlayId(self.next_id);
        self.calls.push(Call::Add(layer, id, markers.len()));
        self.live.push((id, layer));
        id
    }

    fn remove_overlay(&mut self, id: OverlayId) -> bool {
        self.calls.push(Call::Remove(id));
        let before = self.live.len();
        self.live.retain(|(live, _)| *live != id);
        self.live.len() != before
    }

    fn fit_bounds(&mut self, bounds: GeoBounds, _padding: f64) {
        self.calls.push(Call::Fit(bounds));
    }
}

fn point(id: &str, lat: f64, lon: f64) -> Arc<MonitoredPoint> {
    Arc::new(MonitoredPoint::placeholder(id, Coordinates::new(lat, lon)))
}

fn report(id: &str, coordinates: Option<Coordinates>) -> CitizenReport {
    CitizenReport {
        id: id.to_string(),
        tree_id: None,
        coordinates,
        severity: 4,
        description: None,
        image_ref: None,
        report_type: None,
        status: ReportStatus::Submitted,
        timestamp: None,
        ai_prediction: None,
        ai_confidence: None,
        health_score: None,
        health_status: None,
    }
}

#[test]
fn replacing_a_layer_removes_the_old_overlay_first() {
    let mut layers = LayerManager::new(RecordingSurface::default());
    let first = layers.set_layer(LayerName::Points, [point("a", 1.0, 1.0), point("b", 2.0, 2.0)]);
    let second = layers.set_layer(LayerName::Points, [point("c", 3.0, 3.0), point("d", 4.0, 5.0)]);

    let calls = &layers.surface().calls;
    let remove_at = calls
        .iter()
        .position(|c| *c == Call::Remove(first.overlay))
        .expect("old overlay removed");
    let add_at = calls
        .iter()
        .position(|c| matches!(c, Call::Add(_, id, _) if *id == second.overlay))
        .expect("new overlay added");
    assert!(remove_at < add_at);
    assert_eq!(layers.surface().live_for(LayerName::Points), 1);
    assert_eq!(layers.handle(LayerName::Points), Some(&second));
}

#[test]
fn layers_with_different_names_coexist() {
    let mut layers = LayerManager::new(RecordingSurface::default());
    layers.set_layer(LayerName::Points, [point("a", 1.0, 1.0)]);
    layers.set_layer(LayerName::Reports, [report("r1", Some(Coordinates::new(1.5, 1.5)))]);
    layers.set_layer(LayerName::Reports, [report("r2", Some(Coordinates::new(1.6, 1.6)))]);

    assert_eq!(layers.surface().live_for(LayerName::Points), 1);
    assert_eq!(layers.surface().live_for(LayerName::Reports), 1);

    assert!(layers.teardown(LayerName::Reports));
    assert!(!layers.teardown(LayerName::Reports));
    assert_eq!(layers.surface().live_for(LayerName::Reports), 0);
}

#[test]
fn point_layer_fits_viewport_unless_degenerate() {
    let mut layers = LayerManager::new(RecordingSurface::default());

    layers.set_layer(LayerName::Points, [point("only", 35.0, 139.0)]);
    assert_eq!(layers.surface().fits(), 0);

    layers.set_layer(LayerName::Points, Vec::<Arc<MonitoredPoint>>::new());
    assert_eq!(layers.surface().fits(), 0);

    layers.set_layer(LayerName::Points, [point("a", 35.0, 139.0), point("b", 35.2, 139.3)]);
    let expected = GeoBounds::new(Coordinates::new(35.0, 139.0), Coordinates::new(35.2, 139.3));
    assert_eq!(layers.surface().calls.last(), Some(&Call::Fit(expected)));
}

#[test]
fn report_layer_never_moves_the_viewport() {
    let mut layers = LayerManager::new(RecordingSurface::default());
    layers.set_layer(
        LayerName::Reports,
        [
            report("r1", Some(Coordinates::new(35.0, 139.0))),
            report("r2", Some(Coordinates::new(36.0, 140.0))),
        ],
    );
    assert_eq!(layers.surface().fits(), 0);
}

#[test]
fn reports_without_position_are_skipped() {
    let mut layers = LayerManager::new(RecordingSurface::default());
    let handle = layers.set_layer(
        LayerName::Reports,
        [
            report("placed", Some(Coordinates::new(35.0, 139.0))),
            report("follow-up", None),
            report("broken", Some(Coordinates::new(f64::NAN, 139.0))),
        ],
    );
    assert_eq!(handle.marker_count, 1);
    assert_eq!(
        layers.surface().calls.first(),
        Some(&Call::Add(LayerName::Reports, handle.overlay, 1))
    );
}

#[test]
fn picker_marker_is_replaced_not_stacked() {
    let mut picker = LayerManager::new(MapView::new(Coordinates::new(35.68, 139.76)));
    picker.set_layer(LayerName::LocationPicker, [PickedLocation(Coordinates::new(35.6, 139.7))]);
    picker.set_layer(LayerName::LocationPicker, [PickedLocation(Coordinates::new(35.7, 139.8))]);

    assert_eq!(picker.surface().overlay_count(LayerName::LocationPicker), 1);
    let markers: Vec<&Marker> = picker.surface().visible_markers(LayerName::LocationPicker).collect();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].position, Coordinates::new(35.7, 139.8));
    assert!(!picker.surface().is_fit());
}

#[test]
fn teardown_all_clears_every_layer() {
    let mut layers = LayerManager::new(RecordingSurface::default());
    layers.set_layer(LayerName::Points, [point("a", 1.0, 1.0)]);
    layers.set_layer(LayerName::Reports, [report("r", Some(Coordinates::new(1.0, 1.0)))]);
    layers.teardown_all();
    assert!(layers.surface().live.is_empty());
    assert!(layers.handle(LayerName::Points).is_none());
}
