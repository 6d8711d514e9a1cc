//! Visual state derived from the sequencer phase

use super::session::PlaybackPhase;
use crate::deck::CardId;
use tokio::sync::watch;

/// Trigger label while idle
pub const IDLE_LABEL: &str = "Read";

/// Trigger label while a card is being read
pub const READING_LABEL: &str = "Reading...";

/// Trigger opacity while a card is being read
pub const READING_OPACITY: f32 = 0.6;

/// How the read button of a card looks
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerVisual {
    pub label: &'static str,
    pub enabled: bool,
    pub opacity: f32,
}

impl TriggerVisual {
    pub const IDLE: TriggerVisual = TriggerVisual {
        label: IDLE_LABEL,
        enabled: true,
        opacity: 1.0,
    };

    pub const READING: TriggerVisual = TriggerVisual {
        label: READING_LABEL,
        enabled: false,
        opacity: READING_OPACITY,
    };
}

/// Everything the viewer needs to draw playback state
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaybackView {
    pub phase: PlaybackPhase,
    pub trigger: TriggerVisual,
    /// Index of the single highlighted segment, if any
    pub highlight: Option<usize>,
}

impl Default for PlaybackView {
    fn default() -> Self {
        Self::idle()
    }
}

impl PlaybackView {
    pub fn idle() -> Self {
        reflect(PlaybackPhase::Idle)
    }

    pub fn is_busy(&self) -> bool {
        !self.phase.is_idle()
    }

    /// Trigger visual for a given card; only the playing card looks busy
    pub fn trigger_for(&self, card: CardId) -> TriggerVisual {
        if self.phase.card() == Some(card) {
            self.trigger
        } else {
            TriggerVisual::IDLE
        }
    }

    /// Highlighted segment for a given card
    pub fn highlight_for(&self, card: CardId) -> Option<usize> {
        if self.phase.card() == Some(card) {
            self.highlight
        } else {
            None
        }
    }
}

/// Map a phase to its visuals
pub fn reflect(phase: PlaybackPhase) -> PlaybackView {
    match phase {
        PlaybackPhase::Idle => PlaybackView {
            phase,
            trigger: TriggerVisual::IDLE,
            highlight: None,
        },
        PlaybackPhase::Speaking { phase: step, .. } => PlaybackView {
            phase,
            trigger: TriggerVisual::READING,
            highlight: step.highlight(),
        },
    }
}

/// Receives every view the sequencer publishes
pub trait ViewSink: Send + Sync {
    fn publish(&self, view: PlaybackView);
}

impl ViewSink for watch::Sender<PlaybackView> {
    fn publish(&self, view: PlaybackView) {
        self.send_replace(view);
    }
}
