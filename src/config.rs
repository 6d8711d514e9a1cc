//! Application configuration
//!
//! Loaded from a TOML file. Every field has a default. The default speech
//! backend is VITS, which needs a voice catalog; without one the viewer shows
//! its speech error screen. The silent simulated backend must be chosen
//! explicitly.

use crate::{Result, WordCardError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable that overrides the config file location
pub const CONFIG_ENV_VAR: &str = "WORDCARD_CONFIG";

/// Timings and utterance parameters for segmented playback
///
/// The dwell and safety values are empirical; they are tunables, not derived
/// from actual speech duration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Pause between the full word and the first segment, and before the outro
    pub pause_ms: u64,

    /// How long a segment stays highlighted after it has been spoken
    pub segment_dwell_ms: u64,

    /// Upper bound for one whole session before it is forcibly reset
    pub safety_timeout_ms: u64,

    /// Speech rate (1.0 = normal)
    pub rate: f32,

    /// Speech pitch (1.0 = default)
    pub pitch: f32,

    /// Output volume (0.0 to 1.0)
    pub volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            pause_ms: 600,
            segment_dwell_ms: 1200,
            safety_timeout_ms: 20_000,
            rate: 0.8,
            pitch: 1.0,
            volume: 1.0,
        }
    }
}

impl PlaybackConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    pub fn segment_dwell(&self) -> Duration {
        Duration::from_millis(self.segment_dwell_ms)
    }

    pub fn safety_timeout(&self) -> Duration {
        Duration::from_millis(self.safety_timeout_ms)
    }
}

/// Voice selection preferences
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Case-insensitive name fragments that mark a preferred voice
    pub name_markers: Vec<String>,

    /// Known high-quality voice identifiers, matched as name substrings
    pub preferred_names: Vec<String>,

    /// Language tags accepted when no named voice matched
    pub preferred_langs: Vec<String>,

    /// How long to wait for the voice list to populate
    pub load_timeout_ms: u64,

    /// How long the silent probe utterance may run before it is cancelled
    pub probe_window_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            name_markers: vec!["female".to_string(), "woman".to_string()],
            preferred_names: vec!["com.apple.ttsbundle.Karen-compact".to_string()],
            preferred_langs: vec!["en-US".to_string(), "en-GB".to_string()],
            load_timeout_ms: 3000,
            probe_window_ms: 100,
        }
    }
}

impl VoiceConfig {
    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn probe_window(&self) -> Duration {
        Duration::from_millis(self.probe_window_ms)
    }
}

/// Which speech backend to drive
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechBackend {
    /// Silent, timed utterances (no audio device needed)
    Simulated,
    /// VITS neural voices through sherpa-rs
    Vits,
}

/// A VITS voice model on disk
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VitsVoiceEntry {
    /// Display name used by voice selection
    pub name: String,

    /// BCP 47 language tag
    pub lang: String,

    /// Path to the ONNX model file
    pub model: String,

    /// Path to the tokens file
    pub tokens: String,

    #[serde(default)]
    pub lexicon: Option<String>,

    #[serde(default)]
    pub data_dir: Option<String>,

    #[serde(default)]
    pub dict_dir: Option<String>,

    /// Speaker ID for multi-speaker models
    #[serde(default)]
    pub speaker_id: i32,
}

/// Speech backend configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub backend: SpeechBackend,

    /// Fixed length of every simulated utterance
    pub simulated_utterance_ms: u64,

    /// Voice catalog for the VITS backend
    pub voices: Vec<VitsVoiceEntry>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            backend: SpeechBackend::Vits,
            simulated_utterance_ms: 700,
            voices: Vec::new(),
        }
    }
}

/// Configuration for the whole application
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Spreadsheet (or JSON workbook) holding one sheet per unit
    pub deck_path: PathBuf,

    /// Unit shown at startup (1-based)
    pub initial_unit: u32,

    /// Number of unit tabs offered by the viewer
    pub unit_count: u32,

    pub playback: PlaybackConfig,

    pub voice: VoiceConfig,

    pub speech: SpeechConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            deck_path: PathBuf::from("engword.xlsx"),
            initial_unit: 1,
            unit_count: 6,
            playback: PlaybackConfig::default(),
            voice: VoiceConfig::default(),
            speech: SpeechConfig::default(),
        }
    }
}

impl AppConfig {
    /// Default config file location, honouring [`CONFIG_ENV_VAR`]
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("wordcard").join("config.toml"))
    }

    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file
    pub fn load(path: &Path) -> Result<Self> {
        info!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load the default config file, falling back to defaults when it is absent
    pub fn load_or_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            Some(path) => {
                debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Set the deck path
    pub fn with_deck(mut self, path: impl Into<PathBuf>) -> Self {
        self.deck_path = path.into();
        self
    }

    /// Set the playback timings
    pub fn with_playback(mut self, playback: PlaybackConfig) -> Self {
        self.playback = playback;
        self
    }

    /// Use the silent simulated backend with fixed-length utterances
    pub fn with_simulated_speech(mut self, utterance_ms: u64) -> Self {
        self.speech.backend = SpeechBackend::Simulated;
        self.speech.simulated_utterance_ms = utterance_ms;
        self
    }

    /// Use the VITS backend with the given voice catalog
    pub fn with_vits_voices(mut self, voices: Vec<VitsVoiceEntry>) -> Self {
        self.speech.backend = SpeechBackend::Vits;
        self.speech.voices = voices;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.unit_count == 0 {
            return Err(WordCardError::ConfigError(
                "unit_count must be at least 1".into(),
            ));
        }
        if self.initial_unit == 0 || self.initial_unit > self.unit_count {
            return Err(WordCardError::ConfigError(format!(
                "initial_unit {} is outside 1..={}",
                self.initial_unit, self.unit_count
            )));
        }
        if self.playback.rate.is_nan() || self.playback.rate <= 0.0 {
            return Err(WordCardError::ConfigError("playback.rate must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.playback.volume) {
            return Err(WordCardError::ConfigError(
                "playback.volume must be between 0.0 and 1.0".into(),
            ));
        }
        if self.playback.safety_timeout_ms == 0 {
            return Err(WordCardError::ConfigError(
                "playback.safety_timeout_ms must be non-zero".into(),
            ));
        }
        if self.speech.backend == SpeechBackend::Vits {
            for voice in &self.speech.voices {
                if voice.model.is_empty() || voice.tokens.is_empty() {
                    return Err(WordCardError::ConfigError(format!(
                        "voice '{}' needs both model and tokens paths",
                        voice.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.playback.pause_ms, 600);
        assert_eq!(config.playback.segment_dwell_ms, 1200);
        assert_eq!(config.playback.safety_timeout_ms, 20_000);
        assert_eq!(config.voice.load_timeout_ms, 3000);
        assert_eq!(config.voice.probe_window_ms, 100);
        assert!((config.playback.rate - 0.8).abs() < f32::EPSILON);
        assert_eq!(config.speech.backend, SpeechBackend::Vits);
        assert!(config.speech.voices.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            deck_path = "decks/grade3.json"

            [playback]
            segment_dwell_ms = 900
            "#,
        )
        .unwrap();

        assert_eq!(config.deck_path, PathBuf::from("decks/grade3.json"));
        assert_eq!(config.playback.segment_dwell_ms, 900);
        assert_eq!(config.playback.pause_ms, 600);
        assert_eq!(config.unit_count, 6);
    }

    #[test]
    fn test_vits_catalog_parses() {
        let config = AppConfig::from_toml_str(
            r#"
            [speech]
            backend = "vits"

            [[speech.voices]]
            name = "amy-female"
            lang = "en-US"
            model = "models/amy.onnx"
            tokens = "models/tokens.txt"
            "#,
        )
        .unwrap();

        assert_eq!(config.speech.backend, SpeechBackend::Vits);
        assert_eq!(config.speech.voices.len(), 1);
        assert_eq!(config.speech.voices[0].speaker_id, 0);
        assert!(config.speech.voices[0].lexicon.is_none());
    }

    #[test]
    fn test_invalid_initial_unit_rejected() {
        let result = AppConfig::from_toml_str("initial_unit = 9\nunit_count = 6\n");
        assert!(matches!(result, Err(WordCardError::ConfigError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "unit_count = 3\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.unit_count, 3);
    }

    #[test]
    fn test_simulated_backend_is_opt_in() {
        let config = AppConfig::from_toml_str("[speech]\nbackend = \"simulated\"\n").unwrap();
        assert_eq!(config.speech.backend, SpeechBackend::Simulated);

        let config = AppConfig::default().with_simulated_speech(100);
        assert_eq!(config.speech.backend, SpeechBackend::Simulated);
        assert_eq!(config.speech.simulated_utterance_ms, 100);
    }

    #[test]
    fn test_builder() {
        let config = AppConfig::default()
            .with_deck("other.json")
            .with_vits_voices(Vec::new());

        assert_eq!(config.deck_path, PathBuf::from("other.json"));
        assert_eq!(config.speech.backend, SpeechBackend::Vits);
    }
}
