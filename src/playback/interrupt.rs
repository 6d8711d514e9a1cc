//! Liveness flag shared between a playback session and its interrupters

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Whether a playback session should keep going
///
/// Each session owns a fresh flag. Interrupters only ever clear it; the
/// sequencer reads it at every check point, so clearing needs no further
/// signaling. A cleared flag is never set again; a new session gets a new flag.
#[derive(Clone, Debug)]
pub struct Liveness {
    live: Arc<AtomicBool>,
}

impl Liveness {
    /// A fresh, live flag. Only the sequencer creates these.
    pub(crate) fn live() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    /// Ask the session to stop at its next check point
    pub fn interrupt(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    /// Clear the flag, returning whether this call was the one that cleared it
    ///
    /// Two parties racing on the same flag see exactly one `true`.
    pub fn claim(&self) -> bool {
        self.live.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_is_visible_to_clones() {
        let flag = Liveness::live();
        let observer = flag.clone();
        assert!(observer.is_live());

        flag.interrupt();
        assert!(!observer.is_live());

        // Interrupting twice is harmless
        observer.interrupt();
        assert!(!flag.is_live());
    }

    #[test]
    fn test_claim_succeeds_once() {
        let flag = Liveness::live();
        let other = flag.clone();
        assert!(flag.claim());
        assert!(!other.claim());
        assert!(!flag.is_live());
    }

    #[test]
    fn test_fresh_flags_are_independent() {
        let old = Liveness::live();
        old.interrupt();
        let new = Liveness::live();
        assert!(new.is_live());
        assert!(!old.is_live());
    }
}
