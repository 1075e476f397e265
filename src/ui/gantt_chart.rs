use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use chrono::{DateTime, Local, Utc};
use egui::{Align2, Color32, CursorIcon, Painter, Pos2, Rect, Sense, Stroke, Ui, Vec2};

use crate::config::ChartSettings;
use crate::model::event::time_extent;
use crate::model::selection::{NodeFormat, SharedNode};
use crate::model::ticks::{full_date_time, tick_label, tick_spacing, ticks};
use crate::model::{
    DragTarget, Event, EventId, EventSelection, Handle, Lane, PatchSet, RescheduleEvent,
    ScaleManager,
};
use crate::ui::theme;

type StyleTable<S> = Rc<RefCell<HashMap<EventId, S>>>;

/// Quiet time in seconds after the last zoom or pan input before the gesture
/// counts as settled. Wheel notches arrive with idle frames in between.
const ZOOM_SETTLE_DELAY: f64 = 0.15;

/// Visual state written by the selection formatters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emphasis {
    Plain,
    Highlighted,
}

/// What the pointer is doing between `drag_started` and `drag_stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gesture {
    Idle,
    Pan,
    Reschedule,
    /// Press landed on something that doesn't drag (e.g. an unselected event).
    Ignored,
}

/// One laid-out row below the time legend. `top` is relative to the first row.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Row {
    Lane { lane: usize, top: f32 },
    Event { lane: usize, event: usize, top: f32 },
}

/// What happened inside the chart this frame that the host must act on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartInteraction {
    /// A reschedule gesture finished with at least one moved event.
    pub moved_events: Option<PatchSet>,
    /// A zoom or pan gesture settled on this visible window.
    pub boundaries: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// One interactive chart: lanes of events over a zoomable time axis.
pub struct GanttChart {
    values: Vec<Lane>,
    title_width: f32,
    total_width: f32,
    scale: ScaleManager,
    selection: EventSelection,
    reschedule: RescheduleEvent,
    node: SharedNode,
    titles: StyleTable<Emphasis>,
    rects: StyleTable<Emphasis>,
    handles: StyleTable<bool>,
    collapsed: HashSet<String>,
    zoom_extent: (f64, f64),
    /// Zoom already folded into the base scale by earlier resizes.
    baked_k: f64,
    zooming: bool,
    /// Input time of the last frame with zoom or pan input.
    last_navigation: f64,
    /// Pointer x last fed to the drag; frames without movement are skipped.
    last_drag_x: Option<f64>,
    domain_fitted: bool,
    gesture: Gesture,
}

impl GanttChart {
    pub fn new(settings: &ChartSettings) -> Self {
        let node: SharedNode = Rc::default();
        let titles: StyleTable<Emphasis> = Rc::default();
        let rects: StyleTable<Emphasis> = Rc::default();
        let handles: StyleTable<bool> = Rc::default();

        let mut selection = EventSelection::new();
        selection.add_format(Box::new(NodeFormat::new(
            node.clone(),
            titles.clone(),
            Emphasis::Highlighted,
            Emphasis::Plain,
        )));
        selection.add_format(Box::new(NodeFormat::new(
            node.clone(),
            rects.clone(),
            Emphasis::Highlighted,
            Emphasis::Plain,
        )));
        selection.add_format(Box::new(NodeFormat::new(
            node.clone(),
            handles.clone(),
            true,
            false,
        )));

        let [min_k, max_k] = settings.zoom_scale_extent;
        let mut chart = Self {
            values: Vec::new(),
            title_width: settings.title_width,
            total_width: settings.title_width + theme::MIN_SCHEDULE_WIDTH,
            scale: ScaleManager::new(),
            selection,
            reschedule: RescheduleEvent::new(settings.min_event_duration()),
            node,
            titles,
            rects,
            handles,
            collapsed: HashSet::new(),
            zoom_extent: (min_k, max_k),
            baked_k: 1.0,
            zooming: false,
            last_navigation: f64::NEG_INFINITY,
            last_drag_x: None,
            domain_fitted: false,
            gesture: Gesture::Idle,
        };
        chart.resize_schedule();
        chart
    }

    pub fn apply_settings(&mut self, settings: &ChartSettings) {
        let [min_k, max_k] = settings.zoom_scale_extent;
        self.zoom_extent = (min_k, max_k);
        self.reschedule
            .set_min_event_duration(settings.min_event_duration());
    }

    pub fn selection(&self) -> &EventSelection {
        &self.selection
    }

    pub fn title_width(&self) -> f32 {
        self.title_width
    }

    /// Visible time window of the schedule area.
    pub fn boundaries(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        self.scale.get_time_boundaries()
    }

    // ── Payload ─────────────────────────────────────────────────────────────

    /// Render a new payload. The first non-empty payload fits the time domain
    /// to its events; later ones keep the current view.
    pub fn draw(&mut self, values: Vec<Lane>) {
        if !self.domain_fitted {
            if let Some(extent) = time_extent(&values) {
                self.set_domain(extent);
                self.domain_fitted = true;
            }
        }
        self.values = values;
        self.collapsed
            .retain(|tag| self.values.iter().any(|lane| &lane.search_value == tag));

        let mut seen = HashSet::new();
        *self.node.borrow_mut() = self
            .values
            .iter()
            .flat_map(|lane| lane.events.iter())
            .filter(|event| seen.insert(event.id.clone()))
            .map(|event| event.id.clone())
            .collect();
        self.titles.borrow_mut().clear();
        self.rects.borrow_mut().clear();
        self.handles.borrow_mut().clear();

        self.resize_schedule();
        self.selection.reconcile(&self.values);
        tracing::debug!(lanes = self.values.len(), "chart drawn");
    }

    /// Fit the time domain to the events currently drawn.
    pub fn fit_to_events(&mut self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let extent = time_extent(&self.values)?;
        self.set_domain(extent);
        self.domain_fitted = true;
        self.resize_schedule();
        Some(self.boundaries())
    }

    fn set_domain(&mut self, extent: (DateTime<Utc>, DateTime<Utc>)) {
        self.scale.set_domain(extent);
        self.baked_k = 1.0;
        self.zooming = false;
    }

    fn find_event(&self, id: &EventId) -> Option<&Event> {
        self.values
            .iter()
            .flat_map(|lane| lane.events.iter())
            .find(|event| &event.id == id)
    }

    // ── Geometry ────────────────────────────────────────────────────────────

    fn schedule_width(&self) -> f32 {
        (self.total_width - self.title_width).max(1.0)
    }

    /// Window width observation.
    pub fn resize(&mut self, total_width: f32) {
        self.total_width = total_width;
        self.title_width = self.clamp_title_width(self.title_width);
        self.resize_schedule();
    }

    pub fn drag_title_handle(&mut self, dx: f32) {
        self.title_width = self.clamp_title_width(self.title_width + dx);
        self.resize_schedule();
    }

    fn clamp_title_width(&self, width: f32) -> f32 {
        let max = (self.total_width - theme::MIN_SCHEDULE_WIDTH).max(theme::MIN_TITLE_WIDTH);
        width.clamp(theme::MIN_TITLE_WIDTH, max)
    }

    fn resize_schedule(&mut self) {
        self.baked_k *= self.scale.transform().k;
        self.scale.resize((0.0, self.schedule_width() as f64));
    }

    /// Schedule-local `(x, width)` of an event, following tentative times
    /// while a reschedule gesture is in flight.
    pub fn event_span(&self, id: &EventId) -> Option<(f64, f64)> {
        let event = self.find_event(id)?;
        let (start, end) = match self.reschedule.tentative(id) {
            Some(patch) => (patch.start_time, patch.end_time),
            None => (event.start_time, event.end_time),
        };
        let scale = self.scale.get();
        let x = scale.apply(start);
        Some((x, scale.apply(end) - x))
    }

    pub fn toggle_lane(&mut self, search_value: &str) {
        if !self.collapsed.remove(search_value) {
            self.collapsed.insert(search_value.to_string());
        }
    }

    pub fn is_collapsed(&self, search_value: &str) -> bool {
        self.collapsed.contains(search_value)
    }

    fn layout(&self) -> (Vec<Row>, f32) {
        let mut rows = Vec::new();
        let mut top = 0.0;
        for (lane, values) in self.values.iter().enumerate() {
            rows.push(Row::Lane { lane, top });
            top += theme::LANE_HEADER_HEIGHT;
            if self.collapsed.contains(&values.search_value) {
                continue;
            }
            for event in 0..values.events.len() {
                rows.push(Row::Event { lane, event, top });
                top += theme::LINE_HEIGHT;
            }
        }
        (rows, top)
    }

    fn row_at(&self, y: f32) -> Option<Row> {
        let (rows, _) = self.layout();
        rows.into_iter().find(|row| match *row {
            Row::Lane { top, .. } => y >= top && y < top + theme::LANE_HEADER_HEIGHT,
            Row::Event { top, .. } => y >= top && y < top + theme::LINE_HEIGHT,
        })
    }

    /// Event and handle under a schedule-local point. `y` is measured from
    /// the top of the first row. Edge handles only exist on selected events.
    pub fn hit_test(&self, x: f64, y: f32) -> Option<(EventId, Handle)> {
        let Some(Row::Event { lane, event, top }) = self.row_at(y) else {
            return None;
        };
        let event = &self.values[lane].events[event];
        let rect_top = top + theme::LINE_PADDING;
        if y < rect_top || y > rect_top + theme::EVENT_RECT_HEIGHT {
            return None;
        }

        let (start_x, width) = self.event_span(&event.id)?;
        let end_x = start_x + width;
        if self.handles_visible(&event.id) {
            let reach = theme::HANDLE_HIT_RADIUS as f64;
            let to_start = (x - start_x).abs();
            let to_end = (x - end_x).abs();
            // On narrow events both circles overlap; the nearer one wins, the
            // end handle on a tie since it is painted on top.
            if to_end <= reach && to_end <= to_start {
                return Some((event.id.clone(), Handle::End));
            }
            if to_start <= reach {
                return Some((event.id.clone(), Handle::Start));
            }
        }
        (x >= start_x && x <= end_x).then(|| (event.id.clone(), Handle::Body))
    }

    fn handles_visible(&self, id: &EventId) -> bool {
        self.handles.borrow().get(id).copied().unwrap_or(false)
    }

    fn emphasis(table: &StyleTable<Emphasis>, id: &EventId) -> Emphasis {
        table.borrow().get(id).copied().unwrap_or(Emphasis::Plain)
    }

    // ── Zoom and pan ────────────────────────────────────────────────────────

    /// Scale the view by `factor` around the schedule-local `pointer_x`.
    pub fn zoom_by(&mut self, factor: f64, pointer_x: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let (min_k, max_k) = self.zoom_extent;
        let next = self
            .scale
            .transform()
            .scaled_around(factor, pointer_x)
            .clamp_k(min_k / self.baked_k, max_k / self.baked_k, pointer_x);
        self.scale.zoom(next);
        self.zooming = true;
    }

    pub fn zoom_centered(&mut self, factor: f64) {
        self.zoom_by(factor, self.schedule_width() as f64 / 2.0);
    }

    pub fn pan_by(&mut self, dx: f64) {
        if dx == 0.0 {
            return;
        }
        let next = self.scale.transform().translated(dx);
        self.scale.zoom(next);
        self.zooming = true;
    }

    /// Per-frame settle check at input time `now`. Returns the visible window
    /// once, after `ZOOM_SETTLE_DELAY` without navigation input.
    fn settle_after_input(
        &mut self,
        now: f64,
        navigated: bool,
    ) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if navigated {
            self.last_navigation = now;
            return None;
        }
        if now - self.last_navigation < ZOOM_SETTLE_DELAY {
            return None;
        }
        self.settle_zoom()
    }

    /// Visible window after a zoom or pan; `None` when nothing is pending.
    /// Discrete zooms (menu entries) settle right away through this.
    pub fn settle_zoom(&mut self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if !std::mem::take(&mut self.zooming) {
            return None;
        }
        let boundaries = self.boundaries();
        tracing::debug!(start = %boundaries.0, end = %boundaries.1, "zoom settled");
        Some(boundaries)
    }

    // ── Selection ───────────────────────────────────────────────────────────

    pub fn press_background(&mut self) {
        if !self.reschedule.is_active() {
            self.selection.reset();
        }
    }

    pub fn click_event(&mut self, id: &EventId, is_ctrl_key_down: bool) {
        let Some(event) = self.find_event(id).cloned() else {
            tracing::debug!(event = %id, "click on an event that is not drawn");
            return;
        };
        self.selection.handle_click(&event, is_ctrl_key_down);
    }

    pub fn key_escape(&mut self) {
        self.selection.reset();
    }

    // ── Reschedule ──────────────────────────────────────────────────────────

    /// Start dragging `handle` of `id`. Only selected events can be dragged.
    pub fn begin_reschedule(&mut self, id: &EventId, handle: Handle, pointer_x: f64) -> bool {
        if !self.selection.contains(id) {
            return false;
        }
        let Some(event) = self.find_event(id) else {
            return false;
        };
        let target = DragTarget::new(event, handle);
        let element_x = self.scale.get().apply(event.start_time);
        self.reschedule
            .start(target, pointer_x, element_x, self.selection.get());
        self.last_drag_x = Some(pointer_x);
        true
    }

    /// Feed one drag frame. A pointer that has not moved since the press or
    /// the previous frame changes nothing.
    pub fn reschedule_to(&mut self, pointer_x: f64) {
        if !self.reschedule.is_active() || self.last_drag_x == Some(pointer_x) {
            return;
        }
        self.last_drag_x = Some(pointer_x);
        self.reschedule.drag(pointer_x, &self.scale.get());
    }

    /// Finish the gesture. Moved events keep their new times in this chart
    /// until the host draws the next payload.
    pub fn finish_reschedule(&mut self) -> Option<PatchSet> {
        self.last_drag_x = None;
        let patches = self.reschedule.end()?;
        for event in self.values.iter_mut().flat_map(|lane| lane.events.iter_mut()) {
            if let Some(patch) = patches.get(&event.id) {
                event.apply(patch);
            }
        }
        self.selection.reconcile(&self.values);
        Some(patches)
    }

    // ── egui ────────────────────────────────────────────────────────────────

    pub fn show(&mut self, ui: &mut Ui) -> ChartInteraction {
        let mut interaction = ChartInteraction::default();
        let chart_rect = ui.available_rect_before_wrap();
        if (chart_rect.width() - self.total_width).abs() > 0.5 {
            self.resize(chart_rect.width());
        }

        let mut navigated = self.navigate(ui, chart_rect);

        let (legend_response, legend_painter) = ui.allocate_painter(
            Vec2::new(chart_rect.width(), theme::TIMELINE_HEIGHT),
            Sense::hover(),
        );

        if self.values.is_empty() {
            self.paint_empty(ui);
            self.paint_legend(ui, &legend_painter, legend_response.rect);
            return interaction;
        }

        let rows_output = egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .drag_to_scroll(false)
            .show(ui, |ui| self.show_rows(ui))
            .inner;
        navigated |= rows_output.panned;
        interaction.moved_events = rows_output.moved_events;

        self.paint_legend(ui, &legend_painter, legend_response.rect);

        let now = ui.input(|i| i.time);
        interaction.boundaries =
            self.settle_after_input(now, navigated || self.gesture == Gesture::Pan);
        if self.zooming {
            let wait = (self.last_navigation + ZOOM_SETTLE_DELAY - now).max(0.0);
            ui.ctx()
                .request_repaint_after(std::time::Duration::from_secs_f64(wait));
        }
        interaction
    }

    /// Ctrl+scroll / pinch zooms, horizontal scroll pans.
    fn navigate(&mut self, ui: &Ui, chart_rect: Rect) -> bool {
        let (zoom, scroll, hover) =
            ui.input(|i| (i.zoom_delta(), i.smooth_scroll_delta, i.pointer.hover_pos()));
        let Some(hover) = hover else {
            return false;
        };
        let schedule_left = chart_rect.left() + self.title_width;
        if !chart_rect.contains(hover) || hover.x < schedule_left {
            return false;
        }

        let mut navigated = false;
        if zoom != 1.0 {
            self.zoom_by(zoom as f64, (hover.x - schedule_left) as f64);
            navigated = true;
        }
        if scroll.x != 0.0 {
            self.pan_by(scroll.x as f64);
            navigated = true;
        }
        navigated
    }

    fn show_rows(&mut self, ui: &mut Ui) -> RowsOutput {
        let mut output = RowsOutput::default();
        let (_, content_height) = self.layout();
        let size = Vec2::new(
            ui.available_width(),
            content_height.max(ui.available_height()),
        );
        let (response, painter) = ui.allocate_painter(size, Sense::click_and_drag());
        let origin = response.rect.min;
        let schedule_left = origin.x + self.title_width;
        let local = |pos: Pos2| ((pos.x - schedule_left) as f64, pos.y - origin.y);

        // Title column handle.
        let handle_rect = Rect::from_x_y_ranges(
            schedule_left - 3.0..=schedule_left + 3.0,
            response.rect.y_range(),
        );
        let handle_response = ui.interact(
            handle_rect,
            ui.make_persistent_id("title-handle"),
            Sense::drag(),
        );
        if handle_response.dragged() {
            self.drag_title_handle(handle_response.drag_delta().x);
        }
        if handle_response.hovered() || handle_response.dragged() {
            ui.ctx().set_cursor_icon(CursorIcon::ResizeColumn);
        }

        // Press on the schedule background clears the selection.
        let pressed_at = ui.input(|i| {
            i.pointer
                .primary_pressed()
                .then(|| i.pointer.interact_pos())
                .flatten()
        });
        if let Some(pos) = pressed_at.filter(|pos| response.rect.contains(*pos)) {
            let (x, y) = local(pos);
            if x >= 0.0 && self.hit_test(x, y).is_none() {
                self.press_background();
            }
        }

        if response.drag_started() {
            let origin_pos = ui.input(|i| i.pointer.press_origin());
            self.gesture = match origin_pos.map(local) {
                Some((x, y)) if x >= 0.0 => match self.hit_test(x, y) {
                    Some((id, handle)) if self.begin_reschedule(&id, handle, x) => {
                        Gesture::Reschedule
                    }
                    Some(_) => Gesture::Ignored,
                    None => Gesture::Pan,
                },
                _ => Gesture::Ignored,
            };
        }

        if response.dragged() {
            match self.gesture {
                Gesture::Reschedule => {
                    if let Some(pos) = response.interact_pointer_pos() {
                        self.reschedule_to(local(pos).0);
                    }
                    let icon = match self.reschedule.target().map(|target| target.handle) {
                        Some(Handle::Body) => CursorIcon::Grabbing,
                        _ => CursorIcon::ResizeHorizontal,
                    };
                    ui.ctx().set_cursor_icon(icon);
                }
                Gesture::Pan => {
                    self.pan_by(response.drag_delta().x as f64);
                    output.panned = true;
                    ui.ctx().set_cursor_icon(CursorIcon::Grabbing);
                }
                Gesture::Idle | Gesture::Ignored => {}
            }
        }

        if response.drag_stopped() {
            if self.gesture == Gesture::Reschedule {
                output.moved_events = self.finish_reschedule();
            }
            self.gesture = Gesture::Idle;
        }

        if response.clicked() {
            if let Some(pos) = response.interact_pointer_pos() {
                let (x, y) = local(pos);
                let ctrl = ui.input(|i| i.modifiers.command || i.modifiers.ctrl);
                match self.row_at(y) {
                    Some(Row::Lane { lane, .. }) => {
                        let tag = self.values[lane].search_value.clone();
                        self.toggle_lane(&tag);
                    }
                    Some(Row::Event { .. }) if x >= 0.0 => {
                        if let Some((id, _)) = self.hit_test(x, y) {
                            self.click_event(&id, ctrl);
                        }
                    }
                    _ => {}
                }
            }
        }

        let hovered = response
            .hover_pos()
            .map(local)
            .filter(|(x, _)| *x >= 0.0)
            .and_then(|(x, y)| self.hit_test(x, y));
        if self.gesture == Gesture::Idle {
            match &hovered {
                Some((_, Handle::Start | Handle::End)) => {
                    ui.ctx().set_cursor_icon(CursorIcon::ResizeHorizontal)
                }
                Some((id, Handle::Body)) if self.selection.contains(id) => {
                    ui.ctx().set_cursor_icon(CursorIcon::Grab)
                }
                Some(_) => ui.ctx().set_cursor_icon(CursorIcon::PointingHand),
                None => {}
            }
        }

        self.paint_rows(&painter, response.rect);
        let handle_color = if handle_response.hovered() || handle_response.dragged() {
            theme::TITLE_HANDLE_ACTIVE
        } else {
            theme::TITLE_HANDLE
        };
        painter.line_segment(
            [
                Pos2::new(schedule_left, response.rect.top()),
                Pos2::new(schedule_left, response.rect.bottom()),
            ],
            Stroke::new(2.0, handle_color),
        );

        if let Some((id, _)) = hovered {
            if !self.zooming && self.gesture == Gesture::Idle {
                self.event_tooltip(ui, &id);
            }
        }
        output
    }

    // ── Painting ────────────────────────────────────────────────────────────

    fn paint_empty(&self, ui: &mut Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::hover());
        painter.rect_filled(response.rect, 0.0, theme::BG_DARK);
        painter.text(
            response.rect.center(),
            Align2::CENTER_CENTER,
            "No lanes. Type a tag in the search bar to build lanes.",
            theme::font_header(),
            theme::TEXT_DIM,
        );
    }

    fn paint_legend(&self, ui: &Ui, painter: &Painter, rect: Rect) {
        painter.rect_filled(rect, 0.0, theme::BG_HEADER);
        painter.line_segment(
            [rect.left_bottom(), rect.right_bottom()],
            Stroke::new(1.0, theme::BORDER_SUBTLE),
        );

        let schedule_left = rect.left() + self.title_width;
        let scale = self.scale.get();
        let gauge = scale.pixels_per_hour();
        let (lo, hi) = self.boundaries();
        let hover = ui.input(|i| i.pointer.hover_pos()).filter(|p| rect.contains(*p));
        let clipped = painter.with_clip_rect(Rect::from_x_y_ranges(
            schedule_left..=rect.right(),
            rect.y_range(),
        ));

        for tick in ticks(lo, hi, tick_spacing(&scale), &Local) {
            let x = schedule_left + scale.apply(tick) as f32;
            clipped.line_segment(
                [
                    Pos2::new(x, rect.bottom() - theme::TIMELINE_TICK_SIZE),
                    Pos2::new(x, rect.bottom()),
                ],
                Stroke::new(1.0, theme::TEXT_DIM),
            );

            let local_time = tick.with_timezone(&Local).naive_local();
            let label = tick_label(gauge, local_time);
            if !label.is_empty() {
                clipped.text(
                    Pos2::new(x, rect.top() + 8.0),
                    Align2::CENTER_CENTER,
                    label,
                    theme::font_sub(),
                    theme::TEXT_SECONDARY,
                );
            }

            if hover.map_or(false, |p| (p.x - x).abs() <= 4.0) {
                egui::show_tooltip_at_pointer(
                    ui.ctx(),
                    ui.layer_id(),
                    egui::Id::new("legend-tick-tip"),
                    |ui| {
                        ui.label(full_date_time(local_time));
                    },
                );
            }
        }
    }

    fn paint_rows(&self, painter: &Painter, rect: Rect) {
        painter.rect_filled(rect, 0.0, theme::BG_DARK);
        let origin = rect.min;
        let schedule_left = origin.x + self.title_width;
        let schedule_rect = Rect::from_x_y_ranges(schedule_left..=rect.right(), rect.y_range());
        let title_rect = Rect::from_x_y_ranges(rect.left()..=schedule_left, rect.y_range());
        let schedule = painter.with_clip_rect(schedule_rect);
        let titles = painter.with_clip_rect(title_rect);
        let scale = self.scale.get();

        // Grid lines
        let (lo, hi) = self.boundaries();
        for tick in ticks(lo, hi, tick_spacing(&scale), &Local) {
            let x = schedule_left + scale.apply(tick) as f32;
            schedule.line_segment(
                [Pos2::new(x, rect.top()), Pos2::new(x, rect.bottom())],
                Stroke::new(0.5, theme::GRID_LINE),
            );
        }

        let (rows, _) = self.layout();
        for (i, row) in rows.iter().enumerate() {
            match *row {
                Row::Lane { lane, top } => {
                    let values = &self.values[lane];
                    let y = origin.y + top;
                    let header = Rect::from_min_size(
                        Pos2::new(rect.left(), y),
                        Vec2::new(rect.width(), theme::LANE_HEADER_HEIGHT),
                    );
                    painter.rect_filled(header, 0.0, theme::BG_LANE_HEADER);
                    let caret = if self.is_collapsed(&values.search_value) {
                        egui_phosphor::regular::CARET_RIGHT
                    } else {
                        egui_phosphor::regular::CARET_DOWN
                    };
                    painter.text(
                        Pos2::new(rect.left() + 8.0, header.center().y),
                        Align2::LEFT_CENTER,
                        format!("{caret} {} ({})", values.search_value, values.events.len()),
                        theme::font_header(),
                        theme::TEXT_PRIMARY,
                    );
                }
                Row::Event { lane, event, top } => {
                    let event = &self.values[lane].events[event];
                    let y = origin.y + top;
                    let line = Rect::from_min_size(
                        Pos2::new(rect.left(), y),
                        Vec2::new(rect.width(), theme::LINE_HEIGHT),
                    );
                    if i % 2 == 0 {
                        painter.rect_filled(line, 0.0, theme::BG_SCHEDULE);
                    }
                    painter.line_segment(
                        [line.left_bottom(), line.right_bottom()],
                        Stroke::new(0.5, theme::BORDER_SUBTLE),
                    );
                    self.paint_title(&titles, event, line);
                    self.paint_event(&schedule, event, schedule_left, y);
                }
            }
        }
    }

    fn paint_title(&self, painter: &Painter, event: &Event, line: Rect) {
        let color = match Self::emphasis(&self.titles, &event.id) {
            Emphasis::Highlighted => {
                painter.rect_filled(
                    Rect::from_min_max(
                        line.min,
                        Pos2::new(line.left() + self.title_width, line.bottom()),
                    ),
                    0.0,
                    theme::BG_SELECTED,
                );
                theme::TEXT_PRIMARY
            }
            Emphasis::Plain => theme::TEXT_SECONDARY,
        };
        painter.text(
            Pos2::new(line.left() + theme::PADDING_LEFT_TEXT, line.center().y),
            Align2::LEFT_CENTER,
            &event.title,
            theme::font_title(),
            color,
        );
    }

    fn paint_event(&self, painter: &Painter, event: &Event, schedule_left: f32, y: f32) {
        let Some((x, width)) = self.event_span(&event.id) else {
            return;
        };
        let x = schedule_left + x as f32;
        let width = (width as f32).max(1.0);
        let rect = Rect::from_min_size(
            Pos2::new(x, y + theme::LINE_PADDING),
            Vec2::new(width, theme::EVENT_RECT_HEIGHT),
        );

        let base = theme::event_color(&event.style.bg);
        let fill = match Self::emphasis(&self.rects, &event.id) {
            Emphasis::Highlighted => theme::lighten(base, 20.0),
            Emphasis::Plain => base,
        };
        painter.rect_filled(rect, theme::RECT_ROUNDING, fill);

        if width > 30.0 {
            let text = painter.with_clip_rect(rect.intersect(painter.clip_rect()));
            text.text(
                Pos2::new(rect.left() + 6.0, rect.center().y),
                Align2::LEFT_CENTER,
                &event.title,
                theme::font_sub(),
                Color32::WHITE,
            );
        }

        if self.handles_visible(&event.id) {
            for cx in [rect.left(), rect.right()] {
                painter.circle(
                    Pos2::new(cx, rect.center().y),
                    theme::HANDLE_RADIUS,
                    Color32::WHITE,
                    Stroke::new(1.0, base),
                );
            }
        }
    }

    fn event_tooltip(&self, ui: &Ui, id: &EventId) {
        let Some(event) = self.find_event(id) else {
            return;
        };
        egui::show_tooltip_at_pointer(
            ui.ctx(),
            ui.layer_id(),
            egui::Id::new(("event-tip", id.as_str())),
            |ui| {
                ui.strong(&event.title);
                ui.label(format!(
                    "{} → {}",
                    event.start_time.with_timezone(&Local).format("%H:%M"),
                    event.end_time.with_timezone(&Local).format("%H:%M"),
                ));
                for item in &event.detail_content {
                    if item.label.is_empty() {
                        ui.label(&item.value);
                    } else {
                        ui.label(format!("{}: {}", item.label, item.value));
                    }
                }
            },
        );
    }
}

#[derive(Default)]
struct RowsOutput {
    moved_events: Option<PatchSet>,
    panned: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 3, 14, h, m, 0).unwrap()
    }

    fn close(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        (a - b).num_microseconds().map_or(false, |us| us.abs() < 1_000)
    }

    fn id(s: &str) -> EventId {
        EventId::new(s)
    }

    fn lanes() -> Vec<Lane> {
        vec![
            Lane::new("crew", vec![Event::new("a", "A", at(10, 0), at(10, 30))]),
            Lane::new("site", vec![Event::new("b", "B", at(10, 30), at(11, 0))]),
        ]
    }

    /// Title column 100, schedule 600 px over 10:00–11:00: ten pixels a minute.
    fn chart() -> GanttChart {
        let mut chart = GanttChart::new(&ChartSettings::default());
        chart.resize(700.0);
        chart.draw(lanes());
        chart
    }

    /// Vertical center of the rectangle of the n-th event row.
    fn event_row_y(chart: &GanttChart, n: usize) -> f32 {
        let (rows, _) = chart.layout();
        let top = rows
            .iter()
            .filter_map(|row| match row {
                Row::Event { top, .. } => Some(*top),
                Row::Lane { .. } => None,
            })
            .nth(n)
            .unwrap();
        top + theme::LINE_PADDING + theme::EVENT_RECT_HEIGHT / 2.0
    }

    #[test]
    fn first_payload_fits_the_domain() {
        let chart = chart();
        assert_eq!(chart.event_span(&id("a")), Some((0.0, 300.0)));
        assert_eq!(chart.event_span(&id("b")), Some((300.0, 300.0)));
        assert_eq!(chart.boundaries(), (at(10, 0), at(11, 0)));
    }

    #[test]
    fn later_payloads_keep_the_view() {
        let mut chart = chart();
        chart.draw(Vec::new());
        assert_eq!(chart.boundaries(), (at(10, 0), at(11, 0)));
        chart.draw(vec![Lane::new("x", vec![Event::new("c", "C", at(12, 0), at(14, 0))])]);
        assert_eq!(chart.boundaries(), (at(10, 0), at(11, 0)));
        assert_eq!(chart.fit_to_events(), Some((at(12, 0), at(14, 0))));
    }

    #[test]
    fn empty_first_payload_leaves_the_domain_alone() {
        let mut chart = GanttChart::new(&ChartSettings::default());
        chart.resize(700.0);
        let before = chart.boundaries();
        chart.draw(Vec::new());
        assert_eq!(chart.boundaries(), before);
        chart.draw(lanes());
        assert_eq!(chart.boundaries(), (at(10, 0), at(11, 0)));
    }

    #[test]
    fn title_handle_is_clamped_and_rescales_the_schedule() {
        let mut chart = chart();
        chart.drag_title_handle(100.0);
        assert_eq!(chart.title_width(), 200.0);
        assert_eq!(chart.event_span(&id("a")), Some((0.0, 250.0)));

        chart.drag_title_handle(-1_000.0);
        assert_eq!(chart.title_width(), theme::MIN_TITLE_WIDTH);
        chart.drag_title_handle(10_000.0);
        assert_eq!(chart.title_width(), 700.0 - theme::MIN_SCHEDULE_WIDTH);
    }

    #[test]
    fn zoom_reports_boundaries_once_when_settled() {
        let mut chart = chart();
        chart.zoom_by(2.0, 300.0);
        let (start, end) = chart.settle_zoom().unwrap();
        assert!(close(start, at(10, 15)));
        assert!(close(end, at(10, 45)));
        assert_eq!(chart.settle_zoom(), None);
    }

    #[test]
    fn zoom_is_held_inside_the_scale_extent() {
        let mut chart = chart();
        chart.zoom_by(100.0, 0.0);
        let (start, end) = chart.boundaries();
        assert!(close(start, at(10, 0)));
        assert!(close(end, at(10, 10)));
    }

    #[test]
    fn zoom_extent_survives_a_resize() {
        let mut chart = chart();
        chart.zoom_by(4.0, 0.0);
        chart.resize(700.0);
        chart.zoom_by(4.0, 0.0);
        let (start, end) = chart.boundaries();
        assert!(close(start, at(10, 0)));
        assert!(close(end, at(10, 10)));
    }

    #[test]
    fn pan_shifts_the_window() {
        let mut chart = chart();
        chart.pan_by(-60.0);
        let (start, end) = chart.settle_zoom().unwrap();
        assert!(close(start, at(10, 6)));
        assert!(close(end, at(11, 6)));
    }

    #[test]
    fn clicks_route_through_the_selection() {
        let mut chart = chart();
        chart.click_event(&id("a"), false);
        assert!(chart.selection().contains_only(&id("a")));
        chart.click_event(&id("b"), true);
        assert_eq!(chart.selection().len(), 2);
        chart.press_background();
        assert!(chart.selection().is_empty());

        chart.click_event(&id("b"), false);
        chart.key_escape();
        assert!(chart.selection().is_empty());
    }

    #[test]
    fn selection_drives_the_style_tables() {
        let mut chart = chart();
        chart.click_event(&id("a"), false);
        assert!(chart.handles_visible(&id("a")));
        assert!(!chart.handles_visible(&id("b")));
        assert_eq!(GanttChart::emphasis(&chart.rects, &id("a")), Emphasis::Highlighted);
        assert_eq!(GanttChart::emphasis(&chart.titles, &id("b")), Emphasis::Plain);
    }

    #[test]
    fn only_selected_events_can_be_rescheduled() {
        let mut chart = chart();
        assert!(!chart.begin_reschedule(&id("a"), Handle::Body, 10.0));
        assert_eq!(chart.finish_reschedule(), None);

        chart.click_event(&id("a"), false);
        assert!(chart.begin_reschedule(&id("a"), Handle::Body, 10.0));
        chart.reschedule_to(70.0);
        assert_eq!(chart.event_span(&id("a")), Some((60.0, 300.0)));

        let patches = chart.finish_reschedule().unwrap();
        assert_eq!(patches[&id("a")].start_time, at(10, 6));
        assert_eq!(patches[&id("a")].end_time, at(10, 36));
        assert_eq!(chart.event_span(&id("a")), Some((60.0, 300.0)));
        assert_eq!(chart.selection().get()[0].start_time, at(10, 6));
    }

    #[test]
    fn body_drag_moves_every_selected_event() {
        let mut chart = chart();
        chart.click_event(&id("a"), false);
        chart.click_event(&id("b"), true);
        assert!(chart.begin_reschedule(&id("b"), Handle::Body, 350.0));
        chart.reschedule_to(300.0);
        let patches = chart.finish_reschedule().unwrap();
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[&id("a")].start_time, at(9, 55));
        assert_eq!(patches[&id("b")].start_time, at(10, 25));
    }

    #[test]
    fn end_handle_respects_minimum_duration() {
        let mut chart = chart();
        chart.click_event(&id("a"), false);
        assert!(chart.begin_reschedule(&id("a"), Handle::End, 300.0));
        chart.reschedule_to(50.0);
        let patches = chart.finish_reschedule().unwrap();
        assert_eq!(patches[&id("a")].end_time, at(10, 15));
    }

    #[test]
    fn hit_test_finds_bodies_and_handles() {
        let mut chart = chart();
        let y = event_row_y(&chart, 0);
        assert_eq!(chart.hit_test(150.0, y), Some((id("a"), Handle::Body)));
        assert_eq!(chart.hit_test(450.0, y), None);
        assert_eq!(chart.hit_test(150.0, 1.0), None);

        // No handles until selected.
        assert_eq!(chart.hit_test(299.0, y), Some((id("a"), Handle::Body)));
        chart.click_event(&id("a"), false);
        assert_eq!(chart.hit_test(1.0, y), Some((id("a"), Handle::Start)));
        assert_eq!(chart.hit_test(299.0, y), Some((id("a"), Handle::End)));
    }

    #[test]
    fn collapsed_lanes_hide_their_rows() {
        let mut chart = chart();
        let (_, full) = chart.layout();
        chart.toggle_lane("crew");
        assert!(chart.is_collapsed("crew"));
        let (rows, collapsed) = chart.layout();
        assert_eq!(full - collapsed, theme::LINE_HEIGHT);
        assert_eq!(rows.len(), 3);
        chart.toggle_lane("crew");
        assert!(!chart.is_collapsed("crew"));
    }

    #[test]
    fn redraw_drops_events_no_longer_present_from_the_selection() {
        let mut chart = chart();
        chart.click_event(&id("a"), false);
        chart.click_event(&id("b"), true);
        chart.draw(vec![Lane::new("site", vec![Event::new("b", "B", at(10, 30), at(11, 0))])]);
        assert_eq!(chart.selection().len(), 1);
        assert!(chart.selection().contains(&id("b")));
        assert!(!chart.handles_visible(&id("a")));
        assert!(chart.handles_visible(&id("b")));
    }

    #[test]
    fn minimum_duration_follows_settings() {
        let mut chart = chart();
        chart.apply_settings(&ChartSettings {
            min_event_duration_minutes: 5,
            ..Default::default()
        });
        chart.click_event(&id("a"), false);
        chart.begin_reschedule(&id("a"), Handle::End, 300.0);
        chart.reschedule_to(0.0);
        let patches = chart.finish_reschedule().unwrap();
        assert_eq!(patches[&id("a")].end_time, at(10, 5));
        assert_eq!(patches[&id("a")].end_time - patches[&id("a")].start_time, Duration::minutes(5));
    }

    #[test]
    fn holding_still_on_a_selected_event_commits_nothing() {
        let mut chart = chart();
        chart.click_event(&id("a"), false);
        assert!(chart.begin_reschedule(&id("a"), Handle::Body, 120.0));
        for _ in 0..18 {
            chart.reschedule_to(120.0);
        }
        assert_eq!(chart.finish_reschedule(), None);
        assert_eq!(chart.event_span(&id("a")), Some((0.0, 300.0)));

        assert!(chart.begin_reschedule(&id("a"), Handle::Body, 120.0));
        chart.reschedule_to(150.0);
        chart.reschedule_to(150.0);
        let patches = chart.finish_reschedule().unwrap();
        assert_eq!(patches[&id("a")].start_time, at(10, 3));
    }

    #[test]
    fn one_wheel_gesture_reports_boundaries_once() {
        let mut chart = chart();
        let mut reports = Vec::new();
        for frame in 0..12 {
            let now = frame as f64 * 0.025;
            let wheel = frame % 2 == 0;
            if wheel {
                chart.zoom_by(1.1, 300.0);
            }
            reports.extend(chart.settle_after_input(now, wheel));
        }
        assert!(reports.is_empty());

        let last_input = 10.0 * 0.025;
        assert_eq!(chart.settle_after_input(last_input + 0.1, false), None);
        let settled = chart.settle_after_input(last_input + ZOOM_SETTLE_DELAY + 0.01, false);
        assert_eq!(settled, Some(chart.boundaries()));
        assert_eq!(chart.settle_after_input(last_input + 1.0, false), None);
    }

    #[test]
    fn zero_minimum_duration_still_keeps_events_non_empty() {
        let mut chart = chart();
        chart.apply_settings(&ChartSettings {
            min_event_duration_minutes: 0,
            ..Default::default()
        });
        chart.click_event(&id("a"), false);
        chart.begin_reschedule(&id("a"), Handle::End, 300.0);
        chart.reschedule_to(-500.0);
        let patch = chart.finish_reschedule().unwrap()[&id("a")];
        assert!(patch.start_time < patch.end_time);
        assert_eq!(patch.end_time, at(10, 1));
    }

    #[test]
    fn nearer_handle_wins_on_narrow_events() {
        let mut chart = GanttChart::new(&ChartSettings::default());
        chart.resize(700.0);
        chart.draw(vec![Lane::new(
            "crew",
            vec![
                Event::new("a", "A", at(10, 0), at(10, 1)),
                Event::new("z", "Z", at(11, 59), at(12, 0)),
            ],
        )]);
        // Two hours over 600 px: the one-minute event is 5 px wide.
        chart.click_event(&id("a"), false);
        let y = event_row_y(&chart, 0);
        assert_eq!(chart.hit_test(0.0, y), Some((id("a"), Handle::Start)));
        assert_eq!(chart.hit_test(4.0, y), Some((id("a"), Handle::End)));
        assert_eq!(chart.hit_test(9.0, y), Some((id("a"), Handle::End)));
    }
}
