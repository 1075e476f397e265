use crate::app::GanttApp;
use crate::ui::theme;
use egui::{Context, RichText, Window};

/// Render the "About" dialog.
pub fn show_about_dialog(app: &mut GanttApp, ctx: &Context) {
    let mut should_close = false;
    Window::new("About")
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .fixed_size([320.0, 190.0])
        .show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(12.0);
                ui.heading(RichText::new("Lane Gantt").strong());
                ui.add_space(2.0);
                ui.label(
                    RichText::new(format!("Version {}", env!("CARGO_PKG_VERSION")))
                        .color(theme::TEXT_SECONDARY),
                );
                ui.add_space(10.0);
                ui.label("Ctrl+Scroll to zoom, drag the background to pan.");
                ui.label("Click to select, Ctrl+Click to add, drag to reschedule.");
                ui.add_space(14.0);
                if ui.add_sized([100.0, 28.0], egui::Button::new("Close")).clicked() {
                    should_close = true;
                }
            });
        });
    if should_close || ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        app.show_about = false;
    }
}

/// Render the "CSV Format" help dialog.
pub fn show_csv_help_dialog(app: &mut GanttApp, ctx: &Context) {
    let mut should_close = false;

    Window::new(RichText::new("CSV Format").strong().size(14.0))
        .resizable(true)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .default_size([560.0, 460.0])
        .show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(4.0);

                // ── Delimiters ───────────────────────────────────────────
                ui.label(RichText::new("Delimiters").strong());
                ui.label("The delimiter is auto-detected: comma (,), semicolon (;), or tab.");
                ui.add_space(8.0);

                // ── Columns ──────────────────────────────────────────────
                ui.label(RichText::new("Columns").strong());
                ui.add_space(2.0);
                egui::Grid::new("csv_columns")
                    .num_columns(3)
                    .striped(true)
                    .spacing([12.0, 4.0])
                    .show(ui, |ui| {
                        ui.label(RichText::new("Column").underline());
                        ui.label(RichText::new("Accepted headers (case-insensitive)").underline());
                        ui.label(RichText::new("Values").underline());
                        ui.end_row();

                        for (column, headers, values) in [
                            ("Title *", "Title, Name, Event, Event Name, Label, Task", "Any text"),
                            ("Start *", "Start, Start Time, Start Date, From, Begin", "Date and time"),
                            ("End *", "End, End Time, End Date, To, Finish, Due", "After start"),
                            ("Id", "Id, Event Id, Key", "Unique text, generated when missing"),
                            ("Tags", "Tags, Lookup Tags, Search Tags, Lanes", "Tag1|Tag2"),
                            ("Color", "Color, Colour, Bg, Background", "#rrggbb"),
                            ("Details", "Details, Detail, Detail Content, Notes", "Label=Value|Label=Value"),
                        ] {
                            ui.label(RichText::new(column).strong());
                            ui.label(headers);
                            ui.label(values);
                            ui.end_row();
                        }
                    });
                ui.add_space(8.0);

                // ── Time formats ─────────────────────────────────────────
                ui.label(RichText::new("Supported Time Formats").strong());
                ui.add_space(2.0);
                for fmt in &[
                    "RFC 3339           (e.g. 2020-03-14T06:00:00Z)",
                    "YYYY-MM-DD HH:MM   (e.g. 2020-03-14 06:00)",
                    "YYYY-MM-DDTHH:MM   (e.g. 2020-03-14T06:00)",
                    "DD/MM/YYYY HH:MM   (e.g. 14/03/2020 06:00)",
                    "DD.MM.YYYY HH:MM   (e.g. 14.03.2020 06:00)",
                ] {
                    ui.label(RichText::new(*fmt).monospace().size(11.0));
                }
                ui.label(RichText::new("Times without an offset are read as local time.").small());
                ui.add_space(8.0);

                // ── Example ──────────────────────────────────────────────
                ui.label(RichText::new("Example (semicolon-delimited)").strong());
                ui.add_space(2.0);
                let example = "Title;Start;End;Tags;Color;Details\n\
                               Pour slab;2020-03-14 06:00;2020-03-14 07:30;Jobsite1|Crew A;#102591;Truck=12\n\
                               Inspect;2020-03-14 08:00;2020-03-14 08:30;Jobsite1;;";
                egui::Frame::dark_canvas(ui.style()).show(ui, |ui| {
                    ui.add(
                        egui::TextEdit::multiline(&mut example.to_string())
                            .font(egui::TextStyle::Monospace)
                            .desired_width(f32::INFINITY)
                            .interactive(false),
                    );
                });
                ui.add_space(8.0);
            });

            ui.separator();
            ui.add_space(4.0);
            if ui.add_sized([80.0, 28.0], egui::Button::new("Close")).clicked() {
                should_close = true;
            }
            ui.add_space(2.0);
        });

    if should_close || ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
        app.show_csv_help = false;
    }
}
