//! The set of selected events and the visual formatters that follow it.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::event::{Event, EventId, Lane};

/// Visual feedback hook invoked after every selection change.
///
/// `node` is whatever collection of rendered things the formatter styles;
/// the selection only partitions it by membership.
pub trait SelectionFormat {
    fn node(&self) -> Vec<EventId>;
    fn selected(&mut self, node: &[EventId]);
    fn unselected(&mut self, node: &[EventId]);
}

/// Ids currently rendered by the chart, shared by every [`NodeFormat`].
pub type SharedNode = Rc<RefCell<Vec<EventId>>>;

/// Stock formatter: writes `on` for selected nodes and `off` for the rest
/// into a shared per-id table that the painter reads.
pub struct NodeFormat<S> {
    node: SharedNode,
    table: Rc<RefCell<HashMap<EventId, S>>>,
    on: S,
    off: S,
}

impl<S: Copy> NodeFormat<S> {
    pub fn new(node: SharedNode, table: Rc<RefCell<HashMap<EventId, S>>>, on: S, off: S) -> Self {
        Self {
            node,
            table,
            on,
            off,
        }
    }

    fn write(&self, node: &[EventId], style: S) {
        let mut table = self.table.borrow_mut();
        for id in node {
            table.insert(id.clone(), style);
        }
    }
}

impl<S: Copy> SelectionFormat for NodeFormat<S> {
    fn node(&self) -> Vec<EventId> {
        self.node.borrow().clone()
    }

    fn selected(&mut self, node: &[EventId]) {
        self.write(node, self.on);
    }

    fn unselected(&mut self, node: &[EventId]) {
        self.write(node, self.off);
    }
}

/// Selected events of one chart.
#[derive(Default)]
pub struct EventSelection {
    selected: Vec<Event>,
    formats: Vec<Box<dyn SelectionFormat>>,
}

impl EventSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots of the selected events, in selection order.
    pub fn get(&self) -> &[Event] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.selected.iter().any(|event| &event.id == id)
    }

    pub fn contains_only(&self, id: &EventId) -> bool {
        self.selected.len() == 1 && self.contains(id)
    }

    pub fn add(&mut self, event: &Event) {
        if !self.contains(&event.id) {
            self.selected.push(event.clone());
        }
        self.format_selected_events();
    }

    pub fn set_only(&mut self, event: &Event) {
        self.selected = vec![event.clone()];
        self.format_selected_events();
    }

    pub fn remove(&mut self, event: &Event) {
        self.selected.retain(|selected| selected.id != event.id);
        self.format_selected_events();
    }

    pub fn reset(&mut self) {
        self.selected.clear();
        self.format_selected_events();
    }

    pub fn add_format(&mut self, format: Box<dyn SelectionFormat>) {
        self.formats.push(format);
    }

    /// Click on an event: plain clicks replace the selection (or clear it
    /// when the event was the only one selected), ctrl-clicks toggle.
    pub fn handle_click(&mut self, event: &Event, is_ctrl_key_down: bool) {
        match (is_ctrl_key_down, self.contains(&event.id)) {
            (false, _) if self.contains_only(&event.id) => self.remove(event),
            (false, _) => self.set_only(event),
            (true, true) => self.remove(event),
            (true, false) => self.add(event),
        }
    }

    /// Refresh the stored snapshots from a new payload and drop events that
    /// are no longer present.
    pub fn reconcile(&mut self, lanes: &[Lane]) {
        let mut fresh: HashMap<&EventId, &Event> = HashMap::new();
        for event in lanes.iter().flat_map(|lane| lane.events.iter()) {
            fresh.entry(&event.id).or_insert(event);
        }
        let before = self.selected.len();
        self.selected = self
            .selected
            .iter()
            .filter_map(|event| fresh.get(&event.id).map(|&e| e.clone()))
            .collect();
        let dropped = before - self.selected.len();
        if dropped > 0 {
            tracing::debug!(dropped, "dropped stale events from the selection");
        }
        self.format_selected_events();
    }

    /// Invoke every formatter once with the current partition of its node.
    pub fn format_selected_events(&mut self) {
        let ids: HashSet<&EventId> = self.selected.iter().map(|event| &event.id).collect();
        for format in &mut self.formats {
            let (selected, unselected): (Vec<EventId>, Vec<EventId>) =
                format.node().into_iter().partition(|id| ids.contains(id));
            format.selected(&selected);
            format.unselected(&unselected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn event(id: &str) -> Event {
        let start = Utc.with_ymd_and_hms(2020, 3, 14, 6, 0, 0).unwrap();
        Event::new(id, id, start, start + chrono::Duration::hours(1))
    }

    fn ids(selection: &EventSelection) -> Vec<&str> {
        selection.get().iter().map(|e| e.id.as_str()).collect()
    }

    /// Records every call it receives.
    struct Recorder {
        node: Vec<EventId>,
        calls: Rc<RefCell<Vec<(Vec<EventId>, Vec<EventId>)>>>,
        pending: Vec<EventId>,
    }

    impl SelectionFormat for Recorder {
        fn node(&self) -> Vec<EventId> {
            self.node.clone()
        }

        fn selected(&mut self, node: &[EventId]) {
            self.pending = node.to_vec();
        }

        fn unselected(&mut self, node: &[EventId]) {
            let selected = std::mem::take(&mut self.pending);
            self.calls.borrow_mut().push((selected, node.to_vec()));
        }
    }

    #[test]
    fn plain_click_twice_toggles_off() {
        let a = event("a");
        let mut selection = EventSelection::new();
        selection.handle_click(&a, false);
        assert!(selection.contains_only(&a.id));
        selection.handle_click(&a, false);
        assert!(selection.is_empty());
    }

    #[test]
    fn plain_click_replaces_selection() {
        let (a, b) = (event("a"), event("b"));
        let mut selection = EventSelection::new();
        selection.add(&a);
        selection.add(&b);
        selection.handle_click(&a, false);
        assert_eq!(ids(&selection), vec!["a"]);
    }

    #[test]
    fn ctrl_click_is_additive_and_toggles() {
        let (a, b) = (event("a"), event("b"));
        let mut selection = EventSelection::new();
        selection.set_only(&a);
        selection.handle_click(&b, true);
        assert_eq!(ids(&selection), vec!["a", "b"]);
        selection.handle_click(&a, true);
        assert_eq!(ids(&selection), vec!["b"]);
    }

    #[test]
    fn add_ignores_duplicates() {
        let a = event("a");
        let mut selection = EventSelection::new();
        selection.add(&a);
        selection.add(&a);
        assert_eq!(selection.len(), 1);
    }

    #[test]
    fn every_mutation_formats_exactly_once() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut selection = EventSelection::new();
        selection.add_format(Box::new(Recorder {
            node: vec![EventId::new("a"), EventId::new("b")],
            calls: calls.clone(),
            pending: Vec::new(),
        }));

        let (a, b) = (event("a"), event("b"));
        selection.add(&a);
        selection.add(&b);
        selection.remove(&a);
        selection.reset();

        let calls = calls.borrow();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[0], (vec![EventId::new("a")], vec![EventId::new("b")]));
        assert_eq!(calls[1].0, vec![EventId::new("a"), EventId::new("b")]);
        assert_eq!(calls[2], (vec![EventId::new("b")], vec![EventId::new("a")]));
        assert_eq!(calls[3].0, Vec::<EventId>::new());
    }

    #[test]
    fn node_formats_write_into_shared_table() {
        let node: SharedNode = Rc::new(RefCell::new(vec![EventId::new("a"), EventId::new("b")]));
        let table = Rc::new(RefCell::new(HashMap::new()));
        let mut selection = EventSelection::new();
        selection.add_format(Box::new(NodeFormat::new(node, table.clone(), true, false)));

        selection.set_only(&event("b"));
        let table = table.borrow();
        assert_eq!(table.get(&EventId::new("a")), Some(&false));
        assert_eq!(table.get(&EventId::new("b")), Some(&true));
    }

    #[test]
    fn reconcile_drops_missing_and_refreshes_present() {
        let (a, b) = (event("a"), event("b"));
        let mut selection = EventSelection::new();
        selection.add(&a);
        selection.add(&b);

        let mut moved = a.clone();
        moved.end_time = moved.end_time + chrono::Duration::minutes(30);
        selection.reconcile(&[Lane::new("tag", vec![moved.clone()])]);

        assert_eq!(ids(&selection), vec!["a"]);
        assert_eq!(selection.get()[0].end_time, moved.end_time);
    }
}
