//! Playback phases and per-session state

use super::interrupt::Liveness;
use crate::deck::{CardId, CardRecord};
use crate::WordCardError;
use uuid::Uuid;

/// One step of the speak-highlight-pause sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Full word, nothing highlighted
    Intro,
    /// Segment `i` highlighted and spoken
    Segment(usize),
    /// Full word again, nothing highlighted
    Outro,
}

impl Phase {
    /// Segment carrying the highlight in this phase
    pub fn highlight(&self) -> Option<usize> {
        match self {
            Phase::Segment(i) => Some(*i),
            Phase::Intro | Phase::Outro => None,
        }
    }
}

/// Sequencer state as seen from outside
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Speaking { card: CardId, phase: Phase },
}

impl PlaybackPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, PlaybackPhase::Idle)
    }

    pub fn card(&self) -> Option<CardId> {
        match self {
            PlaybackPhase::Idle => None,
            PlaybackPhase::Speaking { card, .. } => Some(*card),
        }
    }
}

/// How a session ended
#[derive(Debug, Clone)]
pub enum SessionEnd {
    /// Every phase ran
    Completed,
    /// The liveness flag was cleared
    Interrupted,
    /// The safety timer fired first
    TimedOut,
    /// A speak call failed
    Failed(WordCardError),
}

/// Mutable state of one in-flight playback, owned by its task
#[derive(Debug)]
pub(crate) struct PlaybackSession {
    pub id: Uuid,
    pub card: CardRecord,
    pub phase: Phase,
    pub liveness: Liveness,
}

impl PlaybackSession {
    pub fn new(card: CardRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            card,
            phase: Phase::Intro,
            liveness: Liveness::live(),
        }
    }

    pub fn card_id(&self) -> CardId {
        self.card.id()
    }

    pub fn view_phase(&self) -> PlaybackPhase {
        PlaybackPhase::Speaking {
            card: self.card_id(),
            phase: self.phase,
        }
    }
}

/// The sequencer's record of the session currently allowed to run
#[derive(Debug)]
pub(crate) struct ActiveSession {
    pub id: Uuid,
    pub card: CardId,
    pub liveness: Liveness,
}

impl ActiveSession {
    pub fn of(session: &PlaybackSession) -> Self {
        Self {
            id: session.id,
            card: session.card_id(),
            liveness: session.liveness.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_segments_highlight() {
        assert_eq!(Phase::Intro.highlight(), None);
        assert_eq!(Phase::Segment(2).highlight(), Some(2));
        assert_eq!(Phase::Outro.highlight(), None);
    }

    #[test]
    fn test_new_session_starts_live_in_intro() {
        let card = CardRecord::from_segment_field(CardId::new(1, 0), "cat", "cat");
        let session = PlaybackSession::new(card);
        assert_eq!(session.phase, Phase::Intro);
        assert!(session.liveness.is_live());
        assert_eq!(session.view_phase().card(), Some(CardId::new(1, 0)));

        let active = ActiveSession::of(&session);
        session.liveness.interrupt();
        assert!(!active.liveness.is_live());
    }
}
