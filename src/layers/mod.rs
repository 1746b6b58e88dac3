//! Named marker layers with at most one live overlay per name.
//!
//! `set_layer` tears the previous overlay down before installing the new one,
//! inside a single call, so a name can never show two overlays at once.

pub mod map_view;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use palette::Srgb;
use tracing::{debug, trace};

use crate::classify::classify_point;
use crate::model::{CitizenReport, Coordinates, MonitoredPoint, ReportStatus};

pub use map_view::{MapView, Overlay, ScreenPoint, ScreenSize};

/// Padding fraction applied on each side when fitting to a layer.
pub const DEFAULT_FIT_PADDING: f64 = 0.1;

const POINT_RADIUS: f32 = 6.0;
const PICKER_RADIUS: f32 = 8.0;
const COLOR_REPORT_SUBMITTED: Srgb<u8> = Srgb::new(33, 150, 243);
const COLOR_REPORT_ANALYZING: Srgb<u8> = Srgb::new(156, 39, 176);
const COLOR_REPORT_COMPLETED: Srgb<u8> = Srgb::new(0, 150, 136);
const COLOR_PICKER: Srgb<u8> = Srgb::new(25, 118, 210);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerName {
    Points,
    Reports,
    LocationPicker,
}

impl LayerName {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerName::Points => "points",
            LayerName::Reports => "reports",
            LayerName::LocationPicker => "locationPicker",
        }
    }

    /// Only the monitored-point layer moves the viewport when replaced.
    pub fn fits_viewport(&self) -> bool {
        matches!(self, LayerName::Points)
    }
}

impl fmt::Display for LayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    MonitoredPoint,
    CitizenReport,
    PickedLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: String,
    pub kind: MarkerKind,
    pub position: Coordinates,
    pub color: Srgb<u8>,
    pub radius: f32,
}

/// Axis-aligned box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub south_west: Coordinates,
    pub north_east: Coordinates,
}

impl GeoBounds {
    pub fn new(south_west: Coordinates, north_east: Coordinates) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    pub fn enclosing<'a, I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Coordinates>,
    {
        positions.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => GeoBounds::new(*p, *p),
                Some(b) => GeoBounds::new(
                    Coordinates::new(b.south_west.lat.min(p.lat), b.south_west.lon.min(p.lon)),
                    Coordinates::new(b.north_east.lat.max(p.lat), b.north_east.lon.max(p.lon)),
                ),
            })
        })
    }

    pub fn lat_span(&self) -> f64 {
        self.north_east.lat - self.south_west.lat
    }

    pub fn lon_span(&self) -> f64 {
        self.north_east.lon - self.south_west.lon
    }

    /// Zero-area boxes (a single point, or points on one line) cannot be fitted.
    pub fn is_degenerate(&self) -> bool {
        !(self.lat_span() > f64::EPSILON && self.lon_span() > f64::EPSILON)
    }

    pub fn center(&self) -> Coordinates {
        Coordinates::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lon + self.north_east.lon) / 2.0,
        )
    }

    /// Grows each side by `fraction` of the span on that axis.
    pub fn padded(&self, fraction: f64) -> Self {
        let dlat = self.lat_span() * fraction;
        let dlon = self.lon_span() * fraction;
        GeoBounds::new(
            Coordinates::new(self.south_west.lat - dlat, self.south_west.lon - dlon),
            Coordinates::new(self.north_east.lat + dlat, self.north_east.lon + dlon),
        )
    }
}

/// The map widget boundary a [`LayerManager`] drives.
pub trait MapSurface {
    fn add_overlay(&mut self, layer: LayerName, markers: Vec<Marker>) -> OverlayId;
    fn remove_overlay(&mut self, id: OverlayId) -> bool;
    fn fit_bounds(&mut self, bounds: GeoBounds, padding: f64);
}

/// Something that can be drawn as a marker. `None` means it has no position.
pub trait ToMarker {
    fn to_marker(&self) -> Option<Marker>;
}

impl ToMarker for MonitoredPoint {
    fn to_marker(&self) -> Option<Marker> {
        if !self.coordinates.is_finite() {
            return None;
        }
        Some(Marker {
            id: self.id.clone(),
            kind: MarkerKind::MonitoredPoint,
            position: self.coordinates,
            color: classify_point(self).color,
            radius: POINT_RADIUS,
        })
    }
}

impl ToMarker for CitizenReport {
    fn to_marker(&self) -> Option<Marker> {
        let position = self.coordinates.filter(Coordinates::is_finite)?;
        let color = match self.status {
            ReportStatus::Submitted => COLOR_REPORT_SUBMITTED,
            ReportStatus::Analyzing => COLOR_REPORT_ANALYZING,
            ReportStatus::Completed => COLOR_REPORT_COMPLETED,
        };
        Some(Marker {
            id: self.id.clone(),
            kind: MarkerKind::CitizenReport,
            position,
            color,
            radius: 3.0 + self.severity.clamp(1, 5) as f32,
        })
    }
}

/// The location chosen on the picker sub-map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PickedLocation(pub Coordinates);

impl ToMarker for PickedLocation {
    fn to_marker(&self) -> Option<Marker> {
        Some(Marker {
            id: "picked-location".to_string(),
            kind: MarkerKind::PickedLocation,
            position: self.0,
            color: COLOR_PICKER,
            radius: PICKER_RADIUS,
        })
    }
}

impl<T: ToMarker + ?Sized> ToMarker for &T {
    fn to_marker(&self) -> Option<Marker> {
        (**self).to_marker()
    }
}

impl<T: ToMarker + ?Sized> ToMarker for Arc<T> {
    fn to_marker(&self) -> Option<Marker> {
        (**self).to_marker()
    }
}

/// Registration of one installed layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerHandle {
    pub name: LayerName,
    pub overlay: OverlayId,
    pub marker_count: usize,
    pub bounds: Option<GeoBounds>,
}

#[derive(Debug)]
pub struct LayerManager<S: MapSurface = MapView> {
    surface: S,
    handles: HashMap<LayerName, LayerHandle>,
    fit_padding: f64,
}

impl<S: MapSurface> LayerManager<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            handles: HashMap::new(),
            fit_padding: DEFAULT_FIT_PADDING,
        }
    }

    pub fn with_fit_padding(mut self, padding: f64) -> Self {
        self.fit_padding = padding.max(0.0);
        self
    }

    /// Replaces the layer registered under `name` with one built from `features`.
    ///
    /// Features without a usable position are skipped. After a non-empty
    /// point layer the viewport is fitted, unless its bounds are degenerate.
    pub fn set_layer<I>(&mut self, name: LayerName, features: I) -> LayerHandle
    where
        I: IntoIterator,
        I::Item: ToMarker,
    {
        self.teardown(name);

        let markers: Vec<Marker> = features
            .into_iter()
            .filter_map(|f| {
                let marker = f.to_marker();
                if marker.is_none() {
                    trace!(layer = %name, "feature without position skipped");
                }
                marker
            })
            .collect();
        let bounds = GeoBounds::enclosing(markers.iter().map(|m| &m.position));
        let marker_count = markers.len();

        let overlay = self.surface.add_overlay(name, markers);
        let handle = LayerHandle {
            name,
            overlay,
            marker_count,
            bounds,
        };
        self.handles.insert(name, handle);
        debug!(layer = %name, markers = marker_count, "layer installed");

        if name.fits_viewport()
            && let Some(bounds) = bounds.filter(|b| !b.is_degenerate())
        {
            self.surface.fit_bounds(bounds, self.fit_padding);
        }

        handle
    }

    /// Removes and forgets the layer under `name`. Returns whether one existed.
    pub fn teardown(&mut self, name: LayerName) -> bool {
        match self.handles.remove(&name) {
            Some(previous) => {
                self.surface.remove_overlay(previous.overlay);
                debug!(layer = %name, "layer removed");
                true
            }
            None => false,
        }
    }

    pub fn teardown_all(&mut self) {
        let names: Vec<LayerName> = self.handles.keys().copied().collect();
        for name in names {
            self.teardown(name);
        }
    }

    pub fn handle(&self, name: LayerName) -> Option<&LayerHandle> {
        self.handles.get(&name)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}
