//! Main viewer window and eframe integration

use crate::ui::components::{CardAction, CardView};
use crate::ui::state::{ReadRequest, ViewerState};
use crate::ui::theme::Theme;
use egui::{CentralPanel, Key, RichText, TopBottomPanel};
use std::time::Duration;
use tracing::{debug, info};

/// How often to repaint while a card is being read
const READING_REPAINT: Duration = Duration::from_millis(50);

/// The flashcard viewer
pub struct WordCardApp {
    state: ViewerState,
    theme: Theme,
}

impl WordCardApp {
    pub fn new(cc: &eframe::CreationContext<'_>, state: ViewerState) -> Self {
        let theme = Theme::dark();
        theme.apply(&cc.egui_ctx);
        info!("Viewer window created");
        Self { state, theme }
    }

    /// Full-window message shown instead of the cards
    fn show_error_screen(&self, ctx: &egui::Context, title: &str, message: &str) {
        CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(ui.available_height() / 3.0);
                ui.label(RichText::new(title).heading().color(self.theme.error));
                ui.add_space(self.theme.spacing_sm);
                ui.label(RichText::new(message).color(self.theme.text_secondary));
            });
        });
    }

    fn show_unit_tabs(&mut self, ctx: &egui::Context) {
        TopBottomPanel::top("unit_tabs")
            .frame(egui::Frame::none().fill(self.theme.bg_secondary).inner_margin(12.0))
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.label(RichText::new("Word Cards").size(20.0).strong());
                    ui.add_space(self.theme.spacing);
                    for unit in 1..=self.state.navigator.unit_count() {
                        let selected = self.state.navigator.unit() == unit;
                        if ui.selectable_label(selected, format!("Unit {}", unit)).clicked() && !selected {
                            self.state.switch_unit(unit);
                        }
                    }
                });
            });
    }

    fn show_card(&mut self, ctx: &egui::Context) {
        let view = self.state.view();
        CentralPanel::default().show(ctx, |ui| {
            if let Some(message) = self.state.data_error() {
                ui.vertical_centered(|ui| {
                    ui.add_space(self.theme.spacing_lg);
                    ui.label(RichText::new(message).color(self.theme.error));
                });
                return;
            }

            let caption = self.state.navigator.caption();
            let Some(card) = self.state.navigator.current().cloned() else {
                return;
            };

            ui.add_space(self.theme.spacing_lg);
            let (action, drag) = CardView::new(&card, &view, &self.theme, &caption).show(ui);

            if drag.drag_started() {
                if let Some(pos) = drag.interact_pointer_pos() {
                    self.state.begin_drag(pos.x, pos.y);
                }
            } else if drag.dragged() {
                if let Some(pos) = drag.interact_pointer_pos() {
                    self.state.drag_to(pos.x, pos.y);
                }
            }
            if drag.drag_stopped() {
                self.state.end_drag();
            }

            match action {
                CardAction::Read => {
                    let request = self.state.read_current();
                    debug!("Read request for {}: {:?}", card.id(), request);
                    if matches!(request, ReadRequest::Deferred) {
                        ui.ctx().request_repaint_after(READING_REPAINT);
                    }
                }
                CardAction::Next => {
                    self.state.next();
                }
                CardAction::Previous => {
                    self.state.previous();
                }
                CardAction::None => {}
            }
        });
    }

    fn handle_keys(&mut self, ctx: &egui::Context) {
        let (left, right, space) = ctx.input(|i| {
            (
                i.key_pressed(Key::ArrowLeft),
                i.key_pressed(Key::ArrowRight),
                i.key_pressed(Key::Space),
            )
        });
        if left {
            self.state.previous();
        }
        if right {
            self.state.next();
        }
        if space && ctx.memory(|m| m.focused().is_none()) {
            self.state.read_current();
        }
    }
}

impl eframe::App for WordCardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(message) = self.state.speech_error() {
            let message = message.to_string();
            self.show_error_screen(ctx, "Speech unavailable", &message);
            return;
        }

        self.handle_keys(ctx);
        self.show_unit_tabs(ctx);
        self.show_card(ctx);

        if self.state.is_reading() || self.state.view().is_busy() {
            ctx.request_repaint_after(READING_REPAINT);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.state.stop_reading();
        info!("Viewer closing");
    }
}
