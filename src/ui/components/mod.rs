//! Reusable viewer widgets

pub mod card_view;

pub use card_view::{CardAction, CardView};
