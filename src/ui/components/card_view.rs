//! Card face: word, translation, segment chips and the read button

use crate::deck::CardRecord;
use crate::playback::PlaybackView;
use crate::ui::theme::Theme;
use egui::{Frame, RichText, Sense, WidgetInfo, WidgetType};

/// What the user asked for on this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    None,
    Read,
    Next,
    Previous,
}

/// Renders one card with its playback state
pub struct CardView<'a> {
    card: &'a CardRecord,
    view: &'a PlaybackView,
    theme: &'a Theme,
    caption: &'a str,
}

impl<'a> CardView<'a> {
    pub fn new(card: &'a CardRecord, view: &'a PlaybackView, theme: &'a Theme, caption: &'a str) -> Self {
        Self {
            card,
            view,
            theme,
            caption,
        }
    }

    /// Show the card and report the requested action
    pub fn show(self, ui: &mut egui::Ui) -> (CardAction, egui::Response) {
        let mut action = CardAction::None;

        let frame = Frame::none()
            .fill(self.theme.bg_secondary)
            .rounding(self.theme.card_rounding)
            .inner_margin(self.theme.spacing_lg);

        let inner = frame.show(ui, |ui| {
            ui.vertical_centered(|ui| {
                self.show_word(ui);
                ui.add_space(self.theme.spacing_sm);
                self.show_segments(ui);

                let hints = self.card.pronunciation_text();
                if !hints.is_empty() {
                    ui.label(RichText::new(hints).color(self.theme.text_muted));
                }

                ui.add_space(self.theme.spacing);
                if self.show_read_button(ui).clicked() {
                    action = CardAction::Read;
                }

                ui.add_space(self.theme.spacing_sm);
                ui.horizontal(|ui| {
                    if ui.button("◀").on_hover_text("Previous card").clicked() {
                        action = CardAction::Previous;
                    }
                    let caption = ui.label(RichText::new(self.caption).color(self.theme.text_muted));
                    caption.widget_info(|| WidgetInfo::labeled(WidgetType::Label, true, self.caption));
                    if ui.button("▶").on_hover_text("Next card").clicked() {
                        action = CardAction::Next;
                    }
                });
            });
        });

        // Drag anywhere on the card to swipe
        let response = ui.interact(
            inner.response.rect,
            ui.id().with(("card_drag", self.card.id().index)),
            Sense::drag(),
        );
        (action, response)
    }

    fn show_word(&self, ui: &mut egui::Ui) {
        let color = if self.card.must_learn() {
            self.theme.must_learn
        } else {
            self.theme.text_primary
        };
        let word = ui.label(RichText::new(self.card.word()).size(36.0).strong().color(color));
        let label = if self.card.must_learn() {
            format!("Must-learn word {}", self.card.word())
        } else {
            format!("Word {}", self.card.word())
        };
        word.widget_info(|| WidgetInfo::labeled(WidgetType::Label, true, &label));

        if !self.card.translation().is_empty() {
            ui.label(RichText::new(self.card.translation()).color(self.theme.text_secondary));
        }
        if !self.card.phonetic().is_empty() {
            ui.label(
                RichText::new(self.card.phonetic())
                    .family(egui::FontFamily::Monospace)
                    .color(self.theme.text_muted),
            );
        }
    }

    fn show_segments(&self, ui: &mut egui::Ui) {
        let highlight = self.view.highlight_for(self.card.id());
        ui.horizontal_wrapped(|ui| {
            for (i, segment) in self.card.segments().iter().enumerate() {
                let lit = highlight == Some(i);
                let (fill, text) = if lit {
                    (self.theme.primary, self.theme.text_primary)
                } else {
                    (self.theme.bg_tertiary, self.theme.text_secondary)
                };
                let chip = Frame::none()
                    .fill(fill)
                    .rounding(self.theme.button_rounding)
                    .inner_margin(egui::Margin::symmetric(self.theme.spacing_sm, 4.0))
                    .show(ui, |ui| ui.label(RichText::new(segment).size(20.0).color(text)));

                let label = if lit {
                    format!("Highlighted segment {}", segment)
                } else {
                    format!("Segment {}", segment)
                };
                chip.inner
                    .widget_info(|| WidgetInfo::labeled(WidgetType::Label, true, &label));
            }
        });
    }

    /// The button stays clickable while reading so a second press can stop it
    fn show_read_button(&self, ui: &mut egui::Ui) -> egui::Response {
        let trigger = self.view.trigger_for(self.card.id());
        ui.scope(|ui| {
            ui.set_opacity(trigger.opacity);
            let button = egui::Button::new(RichText::new(trigger.label).strong())
                .fill(self.theme.primary)
                .rounding(self.theme.button_rounding);
            let response = ui.add(button);
            response.widget_info(|| {
                WidgetInfo::labeled(WidgetType::Button, trigger.enabled, trigger.label)
            });
            response
        })
        .inner
    }
}
