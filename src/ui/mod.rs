//! Desktop viewer with egui/eframe

mod app;
pub mod components;
pub mod navigator;
pub mod state;
pub mod swipe;
mod theme;

pub use app::WordCardApp;
pub use components::{CardAction, CardView};
pub use navigator::Navigator;
pub use state::{ReadRequest, ViewerState};
pub use swipe::{SwipeDirection, SwipeTracker};
pub use theme::Theme;

/// Run the viewer until its window closes
pub fn run(state: ViewerState) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([720.0, 560.0])
            .with_min_inner_size([420.0, 360.0])
            .with_title("Word Cards"),
        ..Default::default()
    };

    eframe::run_native(
        "wordcard",
        options,
        Box::new(|cc| Ok(Box::new(WordCardApp::new(cc, state)))),
    )
}
