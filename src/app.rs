use std::path::PathBuf;

use chrono::{DateTime, Local, Utc};

use crate::config::{self, ChartSettings};
use crate::model::{PatchSet, Schedule, SearchQuery};
use crate::ui;
use crate::ui::gantt_chart::GanttChart;

/// Main application state.
pub struct GanttApp {
    pub schedule: Schedule,
    pub query: SearchQuery,
    pub chart: GanttChart,
    pub settings: ChartSettings,
    pub file_path: Option<PathBuf>,

    // Dialog state
    pub show_about: bool,
    pub show_csv_help: bool,

    // Status message
    pub status_message: String,
    /// Last visible window reported by the chart.
    pub window: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

impl GanttApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Register Phosphor icon font as a fallback so icons render inline with text
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);
        ui::theme::apply_theme(&cc.egui_ctx);

        let mut query = SearchQuery::default();
        query.confirmed.push("jobsite".to_string());
        Self::with_schedule(
            Schedule::sample(Utc::now()),
            query,
            ChartSettings::load_or_default(),
        )
    }

    pub fn with_schedule(schedule: Schedule, query: SearchQuery, settings: ChartSettings) -> Self {
        let mut app = Self {
            schedule,
            query,
            chart: GanttChart::new(&settings),
            settings,
            file_path: None,
            show_about: false,
            show_csv_help: false,
            status_message: "Ready".to_string(),
            window: None,
        };
        app.rebuild_lanes();
        app
    }

    /// Regroup the store into lanes for the current query and redraw.
    pub fn rebuild_lanes(&mut self) {
        let lanes = self.query.lanes(&self.schedule.events);
        self.chart.draw(lanes);
    }

    // --- Chart callbacks ---

    /// A reschedule gesture committed new times.
    pub fn on_move_events(&mut self, patches: PatchSet) {
        let applied = self.schedule.apply_patches(&patches);
        tracing::info!(applied, "moved events");
        self.rebuild_lanes();
        self.status_message = match patches.keys().next() {
            Some(id) if applied == 1 => {
                let title = self
                    .schedule
                    .events
                    .iter()
                    .find(|event| &event.id == id)
                    .map(|event| event.title.as_str())
                    .unwrap_or("event");
                format!("Rescheduled '{title}'")
            }
            _ => format!("Rescheduled {applied} events"),
        };
    }

    /// The visible window settled after a zoom or pan.
    pub fn on_boundaries_change(&mut self, window: (DateTime<Utc>, DateTime<Utc>)) {
        tracing::info!(start = %window.0, end = %window.1, "visible window changed");
        self.window = Some(window);
    }

    // --- File operations ---

    pub fn new_schedule(&mut self) {
        self.schedule = Schedule::default();
        self.file_path = None;
        self.rebuild_lanes();
        self.status_message = "New schedule created".to_string();
    }

    pub fn open_schedule(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Lane Gantt Schedule", &["json"])
            .pick_file()
        {
            match crate::io::load_schedule(&path) {
                Ok(schedule) => {
                    tracing::info!(path = %path.display(), events = schedule.events.len(), "schedule loaded");
                    self.schedule = schedule;
                    self.file_path = Some(path);
                    self.rebuild_lanes();
                    self.fit_to_events();
                    self.status_message = "Schedule loaded".to_string();
                }
                Err(e) => {
                    tracing::warn!("Failed to load schedule: {}", e);
                    self.status_message = format!("Error loading: {}", e);
                }
            }
        }
    }

    pub fn save_schedule(&mut self) {
        if let Some(path) = self.file_path.clone() {
            self.write_schedule(&path);
        } else {
            self.save_schedule_as();
        }
    }

    pub fn save_schedule_as(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Lane Gantt Schedule", &["json"])
            .set_file_name(format!("{}.json", self.schedule.name))
            .save_file()
        {
            self.file_path = Some(path.clone());
            self.write_schedule(&path);
        }
    }

    fn write_schedule(&mut self, path: &std::path::Path) {
        self.schedule.touch();
        match crate::io::save_schedule(&self.schedule, path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "schedule saved");
                self.status_message = "Schedule saved".to_string();
            }
            Err(e) => {
                tracing::warn!("Failed to save schedule: {}", e);
                self.status_message = format!("Error saving: {}", e);
            }
        }
    }

    pub fn import_csv(&mut self) {
        // Guard: if the current schedule has events, confirm before replacing
        if !self.schedule.events.is_empty() {
            let confirm = rfd::MessageDialog::new()
                .set_title("Import CSV")
                .set_description("This will replace the current schedule. Continue?")
                .set_buttons(rfd::MessageButtons::YesNo)
                .show();
            if confirm != rfd::MessageDialogResult::Yes {
                return;
            }
        }

        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv", "txt"])
            .pick_file()
        {
            match crate::io::csv_import::import_csv(&path) {
                Ok((events, skipped)) => {
                    let name = path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("Imported Schedule")
                        .to_string();

                    let count = events.len();
                    tracing::info!(count, skipped, "imported CSV");
                    self.schedule = Schedule::new(name);
                    self.schedule.events = events;
                    self.file_path = None;
                    self.rebuild_lanes();
                    self.fit_to_events();

                    self.status_message = if skipped > 0 {
                        format!("Imported {} events ({} rows skipped)", count, skipped)
                    } else {
                        format!("Imported {} events", count)
                    };
                }
                Err(e) => {
                    tracing::warn!("CSV import failed: {}", e);
                    self.status_message = format!("CSV import failed: {}", e);
                }
            }
        }
    }

    pub fn export_csv(&mut self) {
        if self.schedule.events.is_empty() {
            self.status_message = "Nothing to export, the schedule has no events".to_string();
            return;
        }

        let default_name = format!("{}.csv", self.schedule.name);
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv"])
            .set_file_name(default_name)
            .save_file()
        {
            match crate::io::csv_export::export_csv(&self.schedule.events, &path) {
                Ok(count) => {
                    self.status_message = format!("Exported {} events to CSV", count);
                }
                Err(e) => {
                    tracing::warn!("CSV export failed: {}", e);
                    self.status_message = format!("CSV export failed: {}", e);
                }
            }
        }
    }

    // --- View ---

    pub fn zoom(&mut self, factor: f64) {
        self.chart.zoom_centered(factor);
        if let Some(window) = self.chart.settle_zoom() {
            self.on_boundaries_change(window);
        }
    }

    pub fn fit_to_events(&mut self) {
        if let Some(window) = self.chart.fit_to_events() {
            self.on_boundaries_change(window);
        }
    }

    pub fn open_settings_folder(&mut self) {
        let path = config::settings_path();
        if !path.exists() {
            // Write the defaults so there is something to edit.
            if let Err(e) = self.settings.save(&path) {
                tracing::warn!("Failed to write settings: {}", e);
            }
        }
        if let Err(e) = open::that(config::config_dir()) {
            tracing::warn!("Failed to open settings folder: {}", e);
            self.status_message = format!("Could not open settings folder: {}", e);
        }
    }

    fn dialog_open(&self) -> bool {
        self.show_about || self.show_csv_help
    }
}

impl eframe::App for GanttApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Handle keyboard shortcuts outside closures to avoid borrow issues
        let should_save = ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::S));
        let escape = ctx.input(|i| i.key_pressed(egui::Key::Escape));
        if should_save {
            self.save_schedule();
        }
        if escape && !self.dialog_open() {
            self.chart.key_escape();
        }

        // Top panel: toolbar and search bar
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui::toolbar::show_toolbar(self, ui);
        });
        egui::TopBottomPanel::top("search")
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_PANEL)
                    .inner_margin(egui::Margin::symmetric(10.0, 6.0)),
            )
            .show(ctx, |ui| {
                if ui::search_bar::show_search_bar(&mut self.query, ui) {
                    self.rebuild_lanes();
                }
            });

        // Bottom panel: status bar
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(24.0)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_HEADER)
                    .inner_margin(egui::Margin::symmetric(10.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(
                        egui::RichText::new(&self.status_message)
                            .font(ui::theme::font_status())
                            .color(ui::theme::TEXT_SECONDARY),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let dim = |text: String| {
                            egui::RichText::new(text)
                                .size(10.5)
                                .color(ui::theme::TEXT_DIM)
                        };
                        ui.label(dim(format!("Events: {}", self.schedule.events.len())));
                        ui.label(dim(" · ".to_string()));
                        ui.label(dim(format!("Selected: {}", self.chart.selection().len())));
                        if let Some((start, end)) = self.window {
                            ui.label(dim(" · ".to_string()));
                            ui.label(dim(format!(
                                "{} – {}",
                                start.with_timezone(&Local).format("%d %b %H:%M"),
                                end.with_timezone(&Local).format("%d %b %H:%M"),
                            )));
                        }
                    });
                });
            });

        // Central panel: Gantt chart
        let chart_frame = egui::Frame::default()
            .fill(ui::theme::BG_DARK)
            .inner_margin(egui::Margin::ZERO);
        let interaction = egui::CentralPanel::default()
            .frame(chart_frame)
            .show(ctx, |ui| self.chart.show(ui))
            .inner;
        if let Some(patches) = interaction.moved_events {
            self.on_move_events(patches);
        }
        if let Some(window) = interaction.boundaries {
            self.on_boundaries_change(window);
        }

        // Dialogs
        if self.show_about {
            ui::dialogs::show_about_dialog(self, ctx);
        }
        if self.show_csv_help {
            ui::dialogs::show_csv_help_dialog(self, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventId, TimePatch};
    use chrono::{Duration, TimeZone};

    fn app(query: &str) -> GanttApp {
        let now = Utc.with_ymd_and_hms(2020, 3, 14, 19, 56, 24).unwrap();
        let mut search = SearchQuery::default();
        search.ongoing = query.to_string();
        GanttApp::with_schedule(Schedule::sample(now), search, ChartSettings::default())
    }

    #[test]
    fn moved_events_are_merged_into_the_store() {
        let mut app = app("jobsite");
        let id = EventId::new("event1Id");
        let before = app.schedule.events[0].clone();
        let patch = TimePatch {
            start_time: before.start_time + Duration::minutes(30),
            end_time: before.end_time + Duration::minutes(30),
        };

        app.on_move_events(PatchSet::from([(id.clone(), patch)]));
        let after = app.schedule.events.iter().find(|e| e.id == id).unwrap();
        assert_eq!(after.start_time, patch.start_time);
        assert_eq!(after.duration(), before.duration());
        assert_eq!(app.status_message, "Rescheduled 'event1Name'");
    }

    #[test]
    fn boundaries_are_kept_for_the_status_bar() {
        let mut app = app("jobsite");
        app.zoom(2.0);
        let (start, end) = app.window.unwrap();
        assert!(start < end);
    }
}
