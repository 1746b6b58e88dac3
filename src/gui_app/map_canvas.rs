//! Canvas program drawing a [`MapView`] and turning pointer input into map events.

use iced::mouse::{self, Cursor};
use iced::widget::canvas::{self, Frame, Geometry, Path, Program, Stroke};
use iced::{Color, Point, Rectangle, Renderer, Size, Theme, Vector};
use palette::Srgb;

use crate::layers::{MapView, Marker, MarkerKind, ScreenPoint, ScreenSize};

#[derive(Debug, Clone, Copy)]
pub enum MapEvent {
    Resized(Size),
    Pan { dx: f32, dy: f32, bounds: Size },
    Zoom { factor: f64, cursor: Point, bounds: Size },
    Click { cursor: Point, bounds: Size },
}

/// Applies an event to `view`. Returns the click position for clicks.
pub fn apply(view: &mut MapView, event: MapEvent) -> Option<ScreenPoint> {
    match event {
        MapEvent::Resized(bounds) => {
            view.resize(screen_size(bounds));
            None
        }
        MapEvent::Pan { dx, dy, bounds } => {
            view.resize(screen_size(bounds));
            view.pan_by(dx, dy);
            None
        }
        MapEvent::Zoom {
            factor,
            cursor,
            bounds,
        } => {
            view.resize(screen_size(bounds));
            view.zoom_at(factor, ScreenPoint::new(cursor.x, cursor.y));
            None
        }
        MapEvent::Click { cursor, bounds } => {
            view.resize(screen_size(bounds));
            Some(ScreenPoint::new(cursor.x, cursor.y))
        }
    }
}

fn screen_size(size: Size) -> ScreenSize {
    ScreenSize::new(size.width, size.height)
}

pub struct MapCanvas<'a, Message> {
    pub view: &'a MapView,
    /// Marker id to ring.
    pub highlighted: Option<&'a str>,
    pub on_event: fn(MapEvent) -> Message,
}

#[derive(Default)]
pub struct InteractionState {
    press_origin: Option<Point>,
    last_drag: Option<Point>,
    dragged: bool,
}

impl InteractionState {
    /// Movement beyond this many pixels turns a press into a drag.
    const CLICK_SLOP: f32 = 4.0;
}

impl<Message> Program<Message> for MapCanvas<'_, Message> {
    type State = InteractionState;

    fn update(
        &self,
        state: &mut Self::State,
        event: &canvas::Event,
        bounds: Rectangle,
        cursor: Cursor,
    ) -> Option<canvas::Action<Message>> {
        let publish = |event| Some(canvas::Action::publish((self.on_event)(event)).and_capture());

        let canvas::Event::Mouse(mouse_event) = event else {
            return None;
        };

        match mouse_event {
            mouse::Event::ButtonPressed(mouse::Button::Left) => {
                let position = cursor.position_in(bounds)?;
                state.press_origin = Some(position);
                state.last_drag = Some(position);
                state.dragged = false;
                Some(canvas::Action::capture())
            }
            mouse::Event::ButtonReleased(mouse::Button::Left) => {
                let origin = state.press_origin.take();
                state.last_drag = None;
                if std::mem::take(&mut state.dragged) {
                    return Some(canvas::Action::capture());
                }
                let position = cursor.position_in(bounds).unwrap_or(origin?);
                publish(MapEvent::Click {
                    cursor: position,
                    bounds: bounds.size(),
                })
            }
            mouse::Event::CursorMoved { .. } => {
                let position = cursor.position_in(bounds);

                if let (Some(origin), Some(last), Some(current)) =
                    (state.press_origin, state.last_drag, position)
                {
                    let travel = current - origin;
                    if state.dragged || travel.x.hypot(travel.y) > InteractionState::CLICK_SLOP {
                        state.dragged = true;
                        state.last_drag = Some(current);
                        let step: Vector = current - last;
                        return publish(MapEvent::Pan {
                            dx: step.x,
                            dy: step.y,
                            bounds: bounds.size(),
                        });
                    }
                    return None;
                }

                let viewport = self.view.viewport();
                let stale = (viewport.width - bounds.width).abs() > f32::EPSILON
                    || (viewport.height - bounds.height).abs() > f32::EPSILON;
                if position.is_some() && stale {
                    return publish(MapEvent::Resized(bounds.size()));
                }
                None
            }
            mouse::Event::WheelScrolled { delta } => {
                let position = cursor.position_in(bounds)?;
                let steps = match delta {
                    mouse::ScrollDelta::Lines { y, .. } => *y,
                    mouse::ScrollDelta::Pixels { y, .. } => y / 120.0,
                };
                if steps.abs() <= f32::EPSILON {
                    return None;
                }
                let factor = if steps > 0.0 { 1.2 } else { 1.0 / 1.2 };
                publish(MapEvent::Zoom {
                    factor,
                    cursor: position,
                    bounds: bounds.size(),
                })
            }
            _ => None,
        }
    }

    fn draw(
        &self,
        _state: &Self::State,
        renderer: &Renderer,
        _theme: &Theme,
        bounds: Rectangle,
        _cursor: Cursor,
    ) -> Vec<Geometry> {
        let mut frame = Frame::new(renderer, bounds.size());
        frame.fill_rectangle(Point::ORIGIN, bounds.size(), Color::from_rgb8(226, 232, 222));

        // The view is centre-anchored, so a stale viewport only shifts the picture.
        let viewport = self.view.viewport();
        let shift = Vector::new(
            (bounds.width - viewport.width) / 2.0,
            (bounds.height - viewport.height) / 2.0,
        );

        for overlay in self.view.overlays() {
            for marker in &overlay.markers {
                let p = self.view.project(marker.position);
                let center = Point::new(p.x, p.y) + shift;
                if !Rectangle::new(Point::ORIGIN, bounds.size()).contains(center) {
                    continue;
                }
                draw_marker(&mut frame, marker, center);
                if self.highlighted == Some(marker.id.as_str()) {
                    frame.stroke(
                        &Path::circle(center, marker.radius + 4.0),
                        Stroke::default().with_width(2.5).with_color(Color::BLACK),
                    );
                }
            }
        }

        frame.stroke_rectangle(
            Point::ORIGIN,
            bounds.size(),
            Stroke::default()
                .with_width(1.0)
                .with_color(Color::from_rgb8(70, 70, 70)),
        );

        vec![frame.into_geometry()]
    }

    fn mouse_interaction(&self, state: &Self::State, bounds: Rectangle, cursor: Cursor) -> mouse::Interaction {
        if state.dragged {
            mouse::Interaction::Grabbing
        } else if cursor.is_over(bounds) {
            mouse::Interaction::Crosshair
        } else {
            mouse::Interaction::default()
        }
    }
}

fn draw_marker(frame: &mut Frame, marker: &Marker, center: Point) {
    let fill = to_color(marker.color);
    let circle = Path::circle(center, marker.radius);
    match marker.kind {
        MarkerKind::MonitoredPoint => {
            frame.fill(&circle, fill);
            frame.stroke(&circle, Stroke::default().with_width(1.0).with_color(Color::WHITE));
        }
        MarkerKind::CitizenReport => {
            frame.fill(&circle, Color { a: 0.75, ..fill });
            frame.stroke(&circle, Stroke::default().with_width(1.5).with_color(Color::BLACK));
        }
        MarkerKind::PickedLocation => {
            frame.fill(&circle, fill);
            let arm = marker.radius * 2.0;
            let cross = Path::new(|b| {
                b.move_to(center - Vector::new(arm, 0.0));
                b.line_to(center + Vector::new(arm, 0.0));
                b.move_to(center - Vector::new(0.0, arm));
                b.line_to(center + Vector::new(0.0, arm));
            });
            frame.stroke(&cross, Stroke::default().with_width(2.0).with_color(Color::BLACK));
        }
    }
}

pub fn to_color(color: Srgb<u8>) -> Color {
    Color::from_rgb8(color.red, color.green, color.blue)
}
