use std::collections::BTreeSet;

use super::event::{Event, Lane};

/// Search bar state: confirmed query chips plus the query being typed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchQuery {
    pub confirmed: Vec<String>,
    pub ongoing: String,
}

impl SearchQuery {
    /// Enter: the ongoing query becomes a chip.
    pub fn confirm(&mut self) {
        let value = std::mem::take(&mut self.ongoing);
        if !value.trim().is_empty() {
            self.confirmed.push(value);
        }
    }

    /// Backspace on an empty query removes the last chip.
    pub fn backspace(&mut self) -> bool {
        if self.ongoing.is_empty() {
            return self.confirmed.pop().is_some();
        }
        false
    }

    pub fn remove(&mut self, index: usize) {
        if index < self.confirmed.len() {
            self.confirmed.remove(index);
        }
    }

    fn values(&self) -> impl Iterator<Item = &str> {
        self.confirmed
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.ongoing.as_str()))
            .filter(|value| !value.is_empty())
    }

    /// Group events into lanes: every lookup tag matching any query
    /// (case-insensitive substring) becomes a lane holding all events that
    /// carry the tag. Lanes are unique and sorted case-insensitively.
    pub fn lanes(&self, events: &[Event]) -> Vec<Lane> {
        let mut tags: BTreeSet<&str> = BTreeSet::new();
        for value in self.values() {
            let needle = value.to_lowercase();
            for tag in events.iter().flat_map(|event| event.lookup_tags.iter()) {
                if tag.to_lowercase().contains(&needle) {
                    tags.insert(tag.as_str());
                }
            }
        }
        let mut tags: Vec<&str> = tags.into_iter().collect();
        tags.sort_by_key(|tag| tag.to_lowercase());

        tags.into_iter()
            .map(|tag| {
                let members = events
                    .iter()
                    .filter(|event| event.lookup_tags.iter().any(|t| t == tag))
                    .cloned()
                    .collect();
                Lane::new(tag, members)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(id: &str, tags: &[&str]) -> Event {
        let start = Utc.with_ymd_and_hms(2020, 3, 14, 6, 0, 0).unwrap();
        let mut event = Event::new(id, id, start, start + chrono::Duration::hours(1));
        event.lookup_tags = tags.iter().map(|t| t.to_string()).collect();
        event
    }

    fn events() -> Vec<Event> {
        vec![
            event("1", &["Entity1name", "jobsite2name", "entity2name", "Jobsite1name"]),
            event("2", &["entity2name", "Jobsite1name"]),
            event("3", &["entity2name", "jobsite2name"]),
        ]
    }

    fn names(lanes: &[Lane]) -> Vec<&str> {
        lanes.iter().map(|lane| lane.search_value.as_str()).collect()
    }

    #[test]
    fn empty_query_yields_no_lanes() {
        assert!(SearchQuery::default().lanes(&events()).is_empty());
    }

    #[test]
    fn matching_tags_become_sorted_lanes() {
        let query = SearchQuery {
            confirmed: vec!["JOBSITE".into()],
            ongoing: String::new(),
        };
        let lanes = query.lanes(&events());
        assert_eq!(names(&lanes), vec!["Jobsite1name", "jobsite2name"]);
        assert_eq!(lanes[0].events.len(), 2);
        assert_eq!(lanes[1].events.len(), 2);
    }

    #[test]
    fn overlapping_queries_do_not_duplicate_lanes() {
        let query = SearchQuery {
            confirmed: vec!["entity".into()],
            ongoing: "entity2".into(),
        };
        let lanes = query.lanes(&events());
        assert_eq!(names(&lanes), vec!["Entity1name", "entity2name"]);
        assert_eq!(lanes[1].events.len(), 3);
    }

    #[test]
    fn chips_are_confirmed_and_removed() {
        let mut query = SearchQuery::default();
        query.ongoing = "entity".into();
        query.confirm();
        assert_eq!(query.confirmed, vec!["entity".to_string()]);
        assert!(query.ongoing.is_empty());

        query.ongoing = "x".into();
        assert!(!query.backspace());
        query.ongoing.clear();
        assert!(query.backspace());
        assert!(query.confirmed.is_empty());
    }
}
