use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier of an event, stable across renders.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id for events created outside of a data source.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Visual tokens attached to an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventStyle {
    /// Fill color token, usually `#rrggbb`.
    pub bg: String,
}

impl Default for EventStyle {
    fn default() -> Self {
        Self {
            bg: "#4285f4".to_string(),
        }
    }
}

/// One `label: value` line shown when hovering an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailItem {
    pub label: String,
    pub value: String,
}

impl DetailItem {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A time-bounded event. Owned by the data source; the chart only reads it
/// and proposes new times through a [`PatchSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub style: EventStyle,
    #[serde(default)]
    pub detail_content: Vec<DetailItem>,
    /// Tags the search bar matches against to build lanes.
    #[serde(default)]
    pub lookup_tags: Vec<String>,
}

impl Event {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EventId::new(id),
            title: title.into(),
            start_time,
            end_time,
            style: EventStyle::default(),
            detail_content: Vec::new(),
            lookup_tags: Vec::new(),
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.end_time - self.start_time
    }

    /// Apply a reschedule patch in place.
    pub fn apply(&mut self, patch: &TimePatch) {
        self.start_time = patch.start_time;
        self.end_time = patch.end_time;
    }
}

/// A named horizontal grouping of events sharing a lookup tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Lane {
    pub search_value: String,
    pub events: Vec<Event>,
}

impl Lane {
    pub fn new(search_value: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            search_value: search_value.into(),
            events,
        }
    }
}

/// New times proposed for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePatch {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Every event touched by one completed reschedule gesture.
pub type PatchSet = BTreeMap<EventId, TimePatch>;

/// Earliest start and latest end over every event of every lane.
pub fn time_extent(lanes: &[Lane]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let events = || lanes.iter().flat_map(|lane| lane.events.iter());
    let min = events().map(|e| e.start_time).min()?;
    let max = events().map(|e| e.end_time).max()?;
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 14, h, m, 0).unwrap()
    }

    #[test]
    fn time_extent_spans_all_lanes() {
        let lanes = vec![
            Lane::new("a", vec![Event::new("1", "one", at(8, 0), at(9, 0))]),
            Lane::new(
                "b",
                vec![
                    Event::new("2", "two", at(7, 30), at(8, 0)),
                    Event::new("3", "three", at(9, 0), at(11, 15)),
                ],
            ),
        ];
        assert_eq!(time_extent(&lanes), Some((at(7, 30), at(11, 15))));
    }

    #[test]
    fn time_extent_of_empty_payload_is_none() {
        assert_eq!(time_extent(&[]), None);
        assert_eq!(time_extent(&[Lane::new("empty", Vec::new())]), None);
    }

    #[test]
    fn event_ids_serialize_as_plain_strings() {
        let event = Event::new("event1Id", "event1Name", at(6, 0), at(7, 0));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["id"], "event1Id");
        let back: Event = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
