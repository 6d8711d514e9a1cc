//! Silent speech backend with timed utterances
//!
//! Used when no audio backend is configured and by the test suite. Every
//! utterance lasts a fixed duration, honours `cancel()`, and is recorded.

use super::platform::{SpeechPlatform, Utterance, Voice};
use crate::{Result, WordCardError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::debug;

/// One utterance the simulated platform received
#[derive(Clone, Debug, PartialEq)]
pub struct SpokenRecord {
    pub text: String,
    pub voice: Option<String>,
    pub rate: f32,
    pub volume: f32,
    /// Cut off by `cancel()` or dropped before it finished
    pub cancelled: bool,
}

/// Timed, silent [`SpeechPlatform`]
pub struct SimulatedPlatform {
    utterance_duration: Duration,
    voices_tx: watch::Sender<Vec<Voice>>,
    cancel: Notify,
    speaking: AtomicUsize,
    history: Arc<Mutex<Vec<SpokenRecord>>>,
    failures: Mutex<HashSet<String>>,
    stalls: Mutex<HashSet<String>>,
}

impl SimulatedPlatform {
    /// Create a platform with an empty voice list
    pub fn new(utterance_duration: Duration) -> Self {
        let (voices_tx, _) = watch::channel(Vec::new());
        Self {
            utterance_duration,
            voices_tx,
            cancel: Notify::new(),
            speaking: AtomicUsize::new(0),
            history: Arc::new(Mutex::new(Vec::new())),
            failures: Mutex::new(HashSet::new()),
            stalls: Mutex::new(HashSet::new()),
        }
    }

    /// Voices offered when the simulated backend runs the viewer
    pub fn default_voices() -> Vec<Voice> {
        vec![
            Voice::new("Simulated Female", "en-US"),
            Voice::new("Simulated Male", "en-GB"),
        ]
    }

    /// Start with a populated voice list
    pub fn with_voices(self, voices: Vec<Voice>) -> Self {
        self.voices_tx.send_replace(voices);
        self
    }

    /// Replace the voice list, notifying subscribers
    pub fn publish_voices(&self, voices: Vec<Voice>) {
        debug!("Publishing {} simulated voices", voices.len());
        self.voices_tx.send_replace(voices);
    }

    /// Make every utterance of `text` fail with a synthesis error
    pub fn fail_on(&self, text: &str) {
        self.failures.lock().insert(text.to_string());
    }

    /// Make every utterance of `text` hang forever, ignoring `cancel()`
    pub fn stall_on(&self, text: &str) {
        self.stalls.lock().insert(text.to_string());
    }

    /// Everything spoken so far, in order
    pub fn spoken(&self) -> Vec<SpokenRecord> {
        self.history.lock().clone()
    }

    /// Texts spoken at non-zero volume, in order
    pub fn spoken_texts(&self) -> Vec<String> {
        self.history
            .lock()
            .iter()
            .filter(|r| r.volume > 0.0)
            .map(|r| r.text.clone())
            .collect()
    }
}

/// Tracks one in-flight utterance; marks it cancelled unless finished
struct InFlight<'a> {
    platform: &'a SimulatedPlatform,
    index: usize,
    finished: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.platform.speaking.fetch_sub(1, Ordering::SeqCst);
        if !self.finished {
            if let Some(record) = self.platform.history.lock().get_mut(self.index) {
                record.cancelled = true;
            }
        }
    }
}

#[async_trait]
impl SpeechPlatform for SimulatedPlatform {
    fn name(&self) -> &str {
        "simulated"
    }

    fn subscribe_voices(&self) -> watch::Receiver<Vec<Voice>> {
        self.voices_tx.subscribe()
    }

    async fn speak(&self, utterance: Utterance) -> Result<()> {
        let index = {
            let mut history = self.history.lock();
            history.push(SpokenRecord {
                text: utterance.text.clone(),
                voice: utterance.voice.as_ref().map(|v| v.name.clone()),
                rate: utterance.rate,
                volume: utterance.volume,
                cancelled: false,
            });
            history.len() - 1
        };

        if self.failures.lock().contains(&utterance.text) {
            return Err(WordCardError::SynthesisFailure(format!(
                "simulated failure for '{}'",
                utterance.text
            )));
        }
        let stall = self.stalls.lock().contains(&utterance.text);

        // Registered before sleeping so a cancel issued from here on is seen
        let cancelled = self.cancel.notified();
        self.speaking.fetch_add(1, Ordering::SeqCst);
        let mut in_flight = InFlight {
            platform: self,
            index,
            finished: false,
        };

        if stall {
            futures::future::pending::<()>().await;
        }

        tokio::select! {
            _ = tokio::time::sleep(self.utterance_duration) => {
                in_flight.finished = true;
            }
            _ = cancelled => {
                debug!("Simulated utterance '{}' cancelled", utterance.text);
            }
        }

        Ok(())
    }

    fn cancel(&self) {
        self.cancel.notify_waiters();
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst) > 0
    }
}
