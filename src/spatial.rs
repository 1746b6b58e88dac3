//! Distance-ordered stepping through the points around a selection.
//!
//! Distances are planar in degree space, which is adequate for a city
//! district and nothing larger.

use std::sync::Arc;

use tracing::debug;

use crate::model::MonitoredPoint;

#[derive(Debug, Clone)]
pub struct Neighbor {
    pub point: Arc<MonitoredPoint>,
    pub distance: f64,
}

/// Neighbour sequence for one selected point plus a cursor into it.
///
/// Built once per selection or dataset reload and never patched in place.
#[derive(Debug, Clone)]
pub struct NavigationState {
    reference_id: String,
    ordered: Vec<Neighbor>,
    cursor: usize,
    synthetic_reference: bool,
}

/// Orders every point in `dataset` by distance from `reference`.
///
/// The reference itself is part of the sequence (distance zero) and the
/// cursor starts on it. Ties keep input order. A reference missing from the
/// dataset is inserted at index 0.
pub fn build_neighbors(
    dataset: &[Arc<MonitoredPoint>],
    reference: &Arc<MonitoredPoint>,
) -> NavigationState {
    let origin = dataset
        .iter()
        .find(|p| p.id == reference.id)
        .map(|p| p.coordinates)
        .unwrap_or(reference.coordinates);

    let mut ordered: Vec<Neighbor> = dataset
        .iter()
        .map(|p| Neighbor {
            point: Arc::clone(p),
            distance: origin.planar_distance(&p.coordinates),
        })
        .collect();
    // `sort_by` is stable, which is what keeps ties in input order.
    ordered.sort_by(|a, b| a.distance.total_cmp(&b.distance));

    let (cursor, synthetic_reference) = match ordered.iter().position(|n| n.point.id == reference.id) {
        Some(idx) => (idx, false),
        None => {
            ordered.insert(
                0,
                Neighbor {
                    point: Arc::clone(reference),
                    distance: 0.0,
                },
            );
            (0, true)
        }
    };

    debug!(
        reference = %reference.id,
        neighbors = ordered.len(),
        synthetic = synthetic_reference,
        "built neighbor ordering"
    );

    NavigationState {
        reference_id: reference.id.clone(),
        ordered,
        cursor,
        synthetic_reference,
    }
}

impl NavigationState {
    pub fn reference_id(&self) -> &str {
        &self.reference_id
    }

    pub fn neighbors(&self) -> &[Neighbor] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_synthetic_reference(&self) -> bool {
        self.synthetic_reference
    }

    pub fn current(&self) -> Option<&Neighbor> {
        self.ordered.get(self.cursor)
    }

    /// Steps to the next-farther point, wrapping to the start. No-op for `n <= 1`.
    pub fn next(&mut self) -> Option<&Neighbor> {
        let n = self.ordered.len();
        if n > 1 {
            self.cursor = (self.cursor + 1) % n;
        }
        self.current()
    }

    /// Steps to the next-nearer point, wrapping to the end. No-op for `n <= 1`.
    pub fn previous(&mut self) -> Option<&Neighbor> {
        let n = self.ordered.len();
        if n > 1 {
            self.cursor = (self.cursor + n - 1) % n;
        }
        self.current()
    }
}

/// Ticket identifying one in-flight neighbour rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildTicket {
    seq: u64,
    reference_id: String,
}

impl RebuildTicket {
    pub fn reference_id(&self) -> &str {
        &self.reference_id
    }
}

/// Owns the live [`NavigationState`] and guards it against interleaved rebuilds.
///
/// While a rebuild is in flight, stepping is ignored. Starting a newer
/// rebuild supersedes the older one, whose result is then discarded.
#[derive(Debug, Default)]
pub struct Navigator {
    state: Option<NavigationState>,
    pending: Option<RebuildTicket>,
    next_seq: u64,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_rebuild(&mut self, reference_id: impl Into<String>) -> RebuildTicket {
        self.next_seq += 1;
        let ticket = RebuildTicket {
            seq: self.next_seq,
            reference_id: reference_id.into(),
        };
        self.pending = Some(ticket.clone());
        ticket
    }

    /// Installs `state` if `ticket` is still the newest rebuild. Returns whether it was applied.
    pub fn finish_rebuild(&mut self, ticket: &RebuildTicket, state: NavigationState) -> bool {
        if self.pending.as_ref() != Some(ticket) {
            debug!(reference = %ticket.reference_id, "discarding stale neighbor rebuild");
            return false;
        }
        self.pending = None;
        self.state = Some(state);
        true
    }

    /// Drops `ticket` if it is still pending, leaving the previous ordering in place.
    pub fn abandon_rebuild(&mut self, ticket: &RebuildTicket) -> bool {
        if self.pending.as_ref() != Some(ticket) {
            return false;
        }
        self.pending = None;
        true
    }

    /// Synchronous select: begin, build and install in one turn.
    pub fn rebuild_now(
        &mut self,
        dataset: &[Arc<MonitoredPoint>],
        reference: &Arc<MonitoredPoint>,
    ) -> &NavigationState {
        let ticket = self.begin_rebuild(reference.id.clone());
        let state = build_neighbors(dataset, reference);
        self.pending = None;
        debug_assert_eq!(ticket.reference_id, state.reference_id);
        self.state.insert(state)
    }

    pub fn is_rebuilding(&self) -> bool {
        self.pending.is_some()
    }

    pub fn state(&self) -> Option<&NavigationState> {
        self.state.as_ref()
    }

    pub fn current(&self) -> Option<&Neighbor> {
        self.state.as_ref()?.current()
    }

    pub fn next(&mut self) -> Option<&Neighbor> {
        if self.pending.is_some() {
            return None;
        }
        self.state.as_mut()?.next()
    }

    pub fn previous(&mut self) -> Option<&Neighbor> {
        if self.pending.is_some() {
            return None;
        }
        self.state.as_mut()?.previous()
    }

    pub fn clear(&mut self) {
        self.state = None;
        self.pending = None;
    }
}
