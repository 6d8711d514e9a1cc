//! Voice-output capability consumed by the playback core

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// A synthesis voice offered by a platform
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Voice {
    /// Platform name of the voice
    pub name: String,

    /// BCP 47 language tag, e.g. `en-US`
    pub lang: String,
}

impl Voice {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

/// One request to turn text into audible speech
#[derive(Clone, Debug, PartialEq)]
pub struct Utterance {
    /// Text to speak
    pub text: String,

    /// Voice to use; `None` lets the platform default apply
    pub voice: Option<Voice>,

    /// Speech rate (1.0 = normal)
    pub rate: f32,

    /// Pitch (1.0 = default)
    pub pitch: f32,

    /// Volume (0.0 to 1.0)
    pub volume: f32,
}

impl Utterance {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
        }
    }

    pub fn with_voice(mut self, voice: Option<Voice>) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.clamp(0.0, 1.0);
        self
    }
}

/// A speech-output backend
///
/// `speak` resolves when the utterance finished (or was cancelled) and fails on
/// a synthesis error. `cancel` cuts off whatever is currently being spoken;
/// the cut-off `speak` call resolves `Ok`.
#[async_trait]
pub trait SpeechPlatform: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Watch the list of available voices; the list may start empty and fill later
    fn subscribe_voices(&self) -> watch::Receiver<Vec<Voice>>;

    /// Current voice list
    fn voices(&self) -> Vec<Voice> {
        self.subscribe_voices().borrow().clone()
    }

    /// Speak one utterance
    async fn speak(&self, utterance: Utterance) -> Result<()>;

    /// Stop current speech
    fn cancel(&self);

    /// Whether an utterance is currently producing sound
    fn is_speaking(&self) -> bool;
}
