//! In-process map widget model: a planar viewport plus the overlays installed on it.
//!
//! Projection is equirectangular around `center` with a uniform
//! pixels-per-degree `scale`, matching the planar distance used elsewhere.

use tracing::debug;

use super::{GeoBounds, LayerName, MapSurface, Marker, OverlayId};
use crate::model::Coordinates;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
}

impl ScreenPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenSize {
    pub width: f32,
    pub height: f32,
}

impl ScreenSize {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    fn is_usable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Debug, Clone)]
pub struct Overlay {
    pub id: OverlayId,
    pub layer: LayerName,
    pub markers: Vec<Marker>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ZoomMode {
    /// Re-fit on every viewport resize.
    Fit { bounds: GeoBounds, padding: f64 },
    Custom,
}

#[derive(Debug, Clone)]
pub struct MapView {
    center: Coordinates,
    /// Pixels per degree.
    scale: f64,
    viewport: ScreenSize,
    zoom_mode: ZoomMode,
    overlays: Vec<Overlay>,
    next_overlay: u64,
}

impl MapView {
    pub const DEFAULT_SCALE: f64 = 3_000.0;
    pub const MIN_SCALE: f64 = 20.0;
    pub const MAX_SCALE: f64 = 4_000_000.0;
    /// Extra pick tolerance around a marker, in pixels.
    const HIT_SLOP: f32 = 3.0;

    pub fn new(center: Coordinates) -> Self {
        Self::with_scale(center, Self::DEFAULT_SCALE)
    }

    pub fn with_scale(center: Coordinates, scale: f64) -> Self {
        Self {
            center,
            scale: scale.clamp(Self::MIN_SCALE, Self::MAX_SCALE),
            viewport: ScreenSize::default(),
            zoom_mode: ZoomMode::Custom,
            overlays: Vec::new(),
            next_overlay: 0,
        }
    }

    pub fn center(&self) -> Coordinates {
        self.center
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn viewport(&self) -> ScreenSize {
        self.viewport
    }

    pub fn is_fit(&self) -> bool {
        matches!(self.zoom_mode, ZoomMode::Fit { .. })
    }

    pub fn overlays(&self) -> &[Overlay] {
        &self.overlays
    }

    pub fn overlay_count(&self, layer: LayerName) -> usize {
        self.overlays.iter().filter(|o| o.layer == layer).count()
    }

    /// Every marker currently drawn for `layer`, across all its overlays.
    pub fn visible_markers(&self, layer: LayerName) -> impl Iterator<Item = &Marker> {
        self.overlays
            .iter()
            .filter(move |o| o.layer == layer)
            .flat_map(|o| o.markers.iter())
    }

    /// Tracks the widget size. Returns whether it changed.
    pub fn resize(&mut self, size: ScreenSize) -> bool {
        let changed = (self.viewport.width - size.width).abs() > f32::EPSILON
            || (self.viewport.height - size.height).abs() > f32::EPSILON;
        if !changed {
            return false;
        }
        self.viewport = size;
        if let ZoomMode::Fit { bounds, padding } = self.zoom_mode {
            self.apply_fit(bounds, padding);
        }
        true
    }

    pub fn project(&self, position: Coordinates) -> ScreenPoint {
        let x = self.viewport.width as f64 / 2.0 + (position.lon - self.center.lon) * self.scale;
        let y = self.viewport.height as f64 / 2.0 - (position.lat - self.center.lat) * self.scale;
        ScreenPoint::new(x as f32, y as f32)
    }

    pub fn unproject(&self, point: ScreenPoint) -> Coordinates {
        let lon = self.center.lon + (point.x as f64 - self.viewport.width as f64 / 2.0) / self.scale;
        let lat = self.center.lat - (point.y as f64 - self.viewport.height as f64 / 2.0) / self.scale;
        Coordinates::new(lat, lon)
    }

    /// Zooms by `factor` keeping the location under `cursor` fixed.
    pub fn zoom_at(&mut self, factor: f64, cursor: ScreenPoint) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let anchor = self.unproject(cursor);
        let new_scale = (self.scale * factor).clamp(Self::MIN_SCALE, Self::MAX_SCALE);
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return;
        }
        self.scale = new_scale;
        self.center = Coordinates::new(
            anchor.lat + (cursor.y as f64 - self.viewport.height as f64 / 2.0) / new_scale,
            anchor.lon - (cursor.x as f64 - self.viewport.width as f64 / 2.0) / new_scale,
        );
        self.zoom_mode = ZoomMode::Custom;
    }

    /// Drags the map content by a screen-space displacement.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.center = Coordinates::new(
            self.center.lat + dy as f64 / self.scale,
            self.center.lon - dx as f64 / self.scale,
        );
        self.zoom_mode = ZoomMode::Custom;
    }

    pub fn recenter(&mut self, center: Coordinates) {
        self.center = center;
        self.zoom_mode = ZoomMode::Custom;
    }

    /// Topmost marker under `point`, latest overlay first.
    pub fn marker_at(&self, point: ScreenPoint) -> Option<&Marker> {
        self.overlays.iter().rev().find_map(|overlay| {
            overlay.markers.iter().rev().find(|m| {
                let p = self.project(m.position);
                let reach = m.radius + Self::HIT_SLOP;
                let (dx, dy) = (p.x - point.x, p.y - point.y);
                dx * dx + dy * dy <= reach * reach
            })
        })
    }

    fn apply_fit(&mut self, bounds: GeoBounds, padding: f64) {
        let padded = bounds.padded(padding);
        self.center = padded.center();
        if !self.viewport.is_usable() {
            return;
        }
        let scale_x = self.viewport.width as f64 / padded.lon_span();
        let scale_y = self.viewport.height as f64 / padded.lat_span();
        self.scale = scale_x.min(scale_y).clamp(Self::MIN_SCALE, Self::MAX_SCALE);
    }
}

impl MapSurface for MapView {
    fn add_overlay(&mut self, layer: LayerName, markers: Vec<Marker>) -> OverlayId {
        self.next_overlay += 1;
        let id = OverlayId(self.next_overlay);
        self.overlays.push(Overlay { id, layer, markers });
        id
    }

    fn remove_overlay(&mut self, id: OverlayId) -> bool {
        let before = self.overlays.len();
        self.overlays.retain(|o| o.id != id);
        before != self.overlays.len()
    }

    fn fit_bounds(&mut self, bounds: GeoBounds, padding: f64) {
        debug!(?bounds, padding, "fitting map viewport");
        self.zoom_mode = ZoomMode::Fit { bounds, padding };
        self.apply_fit(bounds, padding);
    }
}
