use crate::model::SearchQuery;
use crate::ui::theme;
use egui::{Key, RichText, Ui};

/// Render the search bar: confirmed chips followed by the query being typed.
/// Returns true when the query changed and lanes must be rebuilt.
pub fn show_search_bar(query: &mut SearchQuery, ui: &mut Ui) -> bool {
    let mut changed = false;
    ui.horizontal_wrapped(|ui| {
        ui.label(
            RichText::new(egui_phosphor::regular::MAGNIFYING_GLASS)
                .size(14.0)
                .color(theme::TEXT_SECONDARY),
        );

        let mut remove: Option<usize> = None;
        for (i, value) in query.confirmed.iter().enumerate() {
            let chip = egui::Button::new(
                RichText::new(format!("{value}  {}", egui_phosphor::regular::X))
                    .font(theme::font_sub())
                    .color(theme::TEXT_PRIMARY),
            )
            .fill(theme::BG_SELECTED)
            .rounding(egui::Rounding::same(10.0));
            if ui.add(chip).on_hover_text("Remove").clicked() {
                remove = Some(i);
            }
        }
        if let Some(i) = remove {
            query.remove(i);
            changed = true;
        }

        // Sampled before the edit so the backspace that empties the
        // field doesn't also eat a chip.
        let was_empty = query.ongoing.is_empty();
        let response = ui.add(
            egui::TextEdit::singleline(&mut query.ongoing)
                .hint_text("Search tags...")
                .desired_width(220.0),
        );
        if response.changed() {
            changed = true;
        }

        if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
            query.confirm();
            changed = true;
            response.request_focus();
        }
        if response.has_focus()
            && was_empty
            && ui.input(|i| i.key_pressed(Key::Backspace))
            && query.backspace()
        {
            changed = true;
        }
    });
    changed
}
