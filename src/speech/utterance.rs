//! Single-utterance primitive used by the playback sequencer

use super::platform::{SpeechPlatform, Utterance};
use super::voice::VoiceSlot;
use crate::config::PlaybackConfig;
use crate::playback::interrupt::Liveness;
use crate::{Result, WordCardError};
use std::sync::Arc;
use tracing::debug;

/// Rate, pitch and volume applied to every playback utterance
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UtteranceParams {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for UtteranceParams {
    fn default() -> Self {
        Self::from(&PlaybackConfig::default())
    }
}

impl From<&PlaybackConfig> for UtteranceParams {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            rate: config.rate,
            pitch: config.pitch,
            volume: config.volume,
        }
    }
}

/// What a [`Speaker::speak`] call did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpeakOutcome {
    /// The platform spoke the text (or was cancelled while speaking)
    Spoken,
    /// Playback was no longer live, nothing was sent to the platform
    Skipped,
}

/// Speaks text with the provisioned voice
#[derive(Clone)]
pub struct Speaker {
    platform: Arc<dyn SpeechPlatform>,
    voice: VoiceSlot,
    params: UtteranceParams,
}

impl Speaker {
    pub fn new(platform: Arc<dyn SpeechPlatform>, voice: VoiceSlot, params: UtteranceParams) -> Self {
        Self {
            platform,
            voice,
            params,
        }
    }

    /// Speak `text` once, unless `liveness` has already been cleared
    ///
    /// Issues exactly one platform request per call and never retries.
    pub async fn speak(&self, text: &str, liveness: &Liveness) -> Result<SpeakOutcome> {
        if !liveness.is_live() {
            debug!("Skipping '{}': playback no longer live", text);
            return Ok(SpeakOutcome::Skipped);
        }

        let utterance = Utterance::new(text)
            .with_voice(self.voice.current())
            .with_rate(self.params.rate)
            .with_pitch(self.params.pitch)
            .with_volume(self.params.volume);

        debug!("Speaking '{}'", text);
        self.platform.speak(utterance).await.map_err(|e| match e {
            WordCardError::SynthesisFailure(_) => e,
            other => WordCardError::SynthesisFailure(other.to_string()),
        })?;

        Ok(SpeakOutcome::Spoken)
    }

    /// Cut off current speech
    pub fn cancel(&self) {
        self.platform.cancel();
    }

    pub fn params(&self) -> UtteranceParams {
        self.params
    }
}
