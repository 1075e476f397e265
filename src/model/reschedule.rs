use chrono::{DateTime, Duration, Utc};

use super::event::{Event, EventId, PatchSet, TimePatch};
use super::timeline::{from_millis, TimeScale};

/// Which part of an event the pointer grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    /// The whole rectangle: moves the event, keeping its duration.
    Body,
    /// The start edge.
    Start,
    /// The end edge.
    End,
}

/// The event and handle under the pointer when a drag starts.
#[derive(Debug, Clone, PartialEq)]
pub struct DragTarget {
    pub event_id: EventId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub handle: Handle,
}

impl DragTarget {
    pub fn new(event: &Event, handle: Handle) -> Self {
        Self {
            event_id: event.id.clone(),
            start_time: event.start_time,
            end_time: event.end_time,
            handle,
        }
    }
}

#[derive(Debug)]
struct Session {
    target: DragTarget,
    anchor_offset: f64,
    /// Selected events as they were when the gesture started.
    snapshot: Vec<Event>,
    modified: PatchSet,
}

/// Drag gesture state machine turning pointer positions into new times for
/// every selected event.
#[derive(Debug)]
pub struct RescheduleEvent {
    min_event_duration: Duration,
    session: Option<Session>,
}

impl RescheduleEvent {
    pub fn new(min_event_duration: Duration) -> Self {
        Self {
            min_event_duration,
            session: None,
        }
    }

    pub fn set_min_event_duration(&mut self, min_event_duration: Duration) {
        self.min_event_duration = min_event_duration;
    }

    /// True between `start` and `end`.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn target(&self) -> Option<&DragTarget> {
        self.session.as_ref().map(|session| &session.target)
    }

    /// Begin a gesture. `dragged_element_x` is the pixel x of the target's
    /// rectangle; the pointer keeps this offset from it for the whole drag.
    pub fn start(
        &mut self,
        target: DragTarget,
        pointer_x: f64,
        dragged_element_x: f64,
        selected: &[Event],
    ) {
        if self.session.is_some() {
            tracing::warn!("reschedule started while another gesture was active");
        }
        tracing::debug!(event = %target.event_id, handle = ?target.handle, "reschedule start");
        self.session = Some(Session {
            anchor_offset: pointer_x - dragged_element_x,
            target,
            snapshot: selected.to_vec(),
            modified: PatchSet::new(),
        });
    }

    /// Recompute tentative times for one pointer position and merge them into
    /// the gesture's patch set. Returns this frame's patches.
    pub fn drag(&mut self, pointer_x: f64, scale: &TimeScale) -> PatchSet {
        let Some(session) = self.session.as_mut() else {
            tracing::warn!("drag frame received without a reschedule start");
            return PatchSet::new();
        };

        // Every event moves by the same time delta: where the target's
        // start edge now sits minus where it was.
        let edge = from_millis(scale.invert_millis(pointer_x - session.anchor_offset));
        let delta = edge - session.target.start_time;
        let min = self.min_event_duration;

        let frame: PatchSet = session
            .snapshot
            .iter()
            .map(|event| {
                let patch = match session.target.handle {
                    Handle::Body => TimePatch {
                        start_time: event.start_time + delta,
                        end_time: event.end_time + delta,
                    },
                    Handle::Start => {
                        let start = event.start_time + delta;
                        TimePatch {
                            start_time: if event.end_time - start < min {
                                event.end_time - min
                            } else {
                                start
                            },
                            end_time: event.end_time,
                        }
                    }
                    Handle::End => {
                        let end = event.end_time + delta;
                        TimePatch {
                            start_time: event.start_time,
                            end_time: if end - event.start_time < min {
                                event.start_time + min
                            } else {
                                end
                            },
                        }
                    }
                };
                (event.id.clone(), patch)
            })
            .collect();

        session
            .modified
            .extend(frame.iter().map(|(id, patch)| (id.clone(), *patch)));
        frame
    }

    /// Times accumulated so far for `id` in the current gesture.
    pub fn tentative(&self, id: &EventId) -> Option<&TimePatch> {
        self.session.as_ref()?.modified.get(id)
    }

    /// Finish the gesture. Returns the patch set when anything moved.
    pub fn end(&mut self) -> Option<PatchSet> {
        let session = self.session.take()?;
        if session.modified.is_empty() {
            tracing::debug!(event = %session.target.event_id, "reschedule ended without movement");
            return None;
        }
        tracing::info!(
            event = %session.target.event_id,
            count = session.modified.len(),
            "reschedule committed"
        );
        Some(session.modified)
    }
}
