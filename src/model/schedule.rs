use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::event::{DetailItem, Event, EventStyle, PatchSet};

/// The host's event store: every event the search bar can group into lanes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schedule {
    pub name: String,
    pub events: Vec<Event>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            name: "Untitled Schedule".to_string(),
            events: Vec::new(),
            created: Utc::now(),
            modified: Utc::now(),
        }
    }
}

impl Schedule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Touch the modified timestamp.
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }

    /// Merge a reschedule patch set by id. Returns how many events changed.
    pub fn apply_patches(&mut self, patches: &PatchSet) -> usize {
        let mut applied = 0;
        for event in &mut self.events {
            if let Some(patch) = patches.get(&event.id) {
                event.apply(patch);
                applied += 1;
            }
        }
        if applied > 0 {
            self.touch();
        }
        applied
    }

    /// A few events around `now` to explore the chart with.
    pub fn sample(now: DateTime<Utc>) -> Self {
        let mut schedule = Schedule::new("Sample Schedule");
        let event = |id: &str, title: &str, start: i64, end: i64, bg: &str, tags: &[&str]| {
            let mut event = Event::new(
                id,
                title,
                now + Duration::minutes(start),
                now + Duration::minutes(end),
            );
            event.style = EventStyle { bg: bg.to_string() };
            event.lookup_tags = tags.iter().map(|tag| tag.to_string()).collect();
            event.detail_content = vec![
                DetailItem::new("Title", title),
                DetailItem::new("Crew", tags.first().copied().unwrap_or("-")),
            ];
            event
        };

        schedule.events = vec![
            event(
                "event1Id",
                "event1Name",
                0,
                60,
                "#102591",
                &["Entity1name", "jobsite2name", "entity2name", "Jobsite1name"],
            ),
            event(
                "event2Id",
                "event2Name finish 21:56",
                0,
                120,
                "#ad77ff",
                &["entity2name", "Jobsite1name"],
            ),
            event(
                "event3Id",
                "event3Name finish 20:56",
                40,
                60,
                "#3568ff",
                &["entity2name", "jobsite2name"],
            ),
        ];
        schedule
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::event::{EventId, TimePatch};
    use chrono::TimeZone;

    #[test]
    fn patches_are_merged_by_id() {
        let now = Utc.with_ymd_and_hms(2020, 3, 14, 19, 56, 24).unwrap();
        let mut schedule = Schedule::sample(now);
        let patch = TimePatch {
            start_time: now + Duration::minutes(5),
            end_time: now + Duration::minutes(65),
        };
        let patches = PatchSet::from([
            (EventId::new("event1Id"), patch),
            (EventId::new("missing"), patch),
        ]);

        assert_eq!(schedule.apply_patches(&patches), 1);
        assert_eq!(schedule.events[0].start_time, patch.start_time);
        assert_eq!(schedule.events[1].start_time, now);
    }

    #[test]
    fn sample_events_are_well_formed() {
        let schedule = Schedule::sample(Utc::now());
        assert_eq!(schedule.events.len(), 3);
        assert!(schedule.events.iter().all(|e| e.start_time < e.end_time));
    }
}
