//! Unit and card navigation
//!
//! Every navigation step stops playback before the visible card changes.

use super::swipe::{classify, SwipeDirection};
use crate::deck::{self, CardRecord};
use crate::playback::PlaybackSequencer;
use crate::Result;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Current unit, its cards and the visible card
pub struct Navigator {
    deck_path: PathBuf,
    unit_count: u32,
    unit: u32,
    cards: Vec<CardRecord>,
    index: usize,
    sequencer: Option<PlaybackSequencer>,
}

impl Navigator {
    pub fn new(deck_path: impl Into<PathBuf>, unit_count: u32) -> Self {
        Self {
            deck_path: deck_path.into(),
            unit_count,
            unit: 0,
            cards: Vec::new(),
            index: 0,
            sequencer: None,
        }
    }

    /// Stop this sequencer whenever the visible card changes
    pub fn with_sequencer(mut self, sequencer: PlaybackSequencer) -> Self {
        self.sequencer = Some(sequencer);
        self
    }

    fn stop_playback(&self) {
        if let Some(sequencer) = &self.sequencer {
            if sequencer.stop() {
                debug!("Playback stopped by navigation");
            }
        }
    }

    /// Load a unit and show its first card
    ///
    /// On failure the card list is left empty and the error returned.
    pub fn switch_unit(&mut self, unit: u32) -> Result<usize> {
        self.stop_playback();
        self.unit = unit;
        self.index = 0;
        self.cards.clear();

        match deck::load_unit(&self.deck_path, unit) {
            Ok(cards) => {
                info!("Showing unit {} with {} cards", unit, cards.len());
                self.cards = cards;
                Ok(self.cards.len())
            }
            Err(e) => {
                warn!("Failed to load unit {}: {}", unit, e);
                Err(e)
            }
        }
    }

    /// Advance one card; does nothing on the last card
    pub fn next(&mut self) -> bool {
        self.stop_playback();
        if self.index + 1 < self.cards.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    /// Go back one card; does nothing on the first card
    pub fn previous(&mut self) -> bool {
        self.stop_playback();
        if self.index > 0 {
            self.index -= 1;
            true
        } else {
            false
        }
    }

    /// Navigate by gesture travel (start minus current position)
    pub fn swipe(&mut self, dx: f32, dy: f32) -> Option<SwipeDirection> {
        let direction = classify(dx, dy)?;
        self.go(direction);
        Some(direction)
    }

    /// Apply an already classified swipe
    pub fn go(&mut self, direction: SwipeDirection) -> bool {
        match direction {
            SwipeDirection::Next => self.next(),
            SwipeDirection::Previous => self.previous(),
        }
    }

    pub fn current(&self) -> Option<&CardRecord> {
        self.cards.get(self.index)
    }

    pub fn cards(&self) -> &[CardRecord] {
        &self.cards
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn unit(&self) -> u32 {
        self.unit
    }

    pub fn unit_count(&self) -> u32 {
        self.unit_count
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// "card i of n", one-based
    pub fn caption(&self) -> String {
        if self.cards.is_empty() {
            return String::from("no cards");
        }
        format!("card {} of {}", self.index + 1, self.cards.len())
    }
}
