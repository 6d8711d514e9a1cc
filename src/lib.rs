pub mod config;
pub mod deck;
pub mod playback;
pub mod speech;
pub mod ui;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum WordCardError {
    #[error("Speech provisioning failed: {0}")]
    ProvisioningFailure(String),

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailure(String),

    #[error("Card data error: {0}")]
    DataFailure(String),

    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    #[error("Model load error: {0}")]
    ModelLoadError(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl From<std::io::Error> for WordCardError {
    fn from(e: std::io::Error) -> Self {
        WordCardError::IOError(e.to_string())
    }
}

impl From<serde_json::Error> for WordCardError {
    fn from(e: serde_json::Error) -> Self {
        WordCardError::DataFailure(format!("Malformed workbook: {}", e))
    }
}

impl From<toml::de::Error> for WordCardError {
    fn from(e: toml::de::Error) -> Self {
        WordCardError::ConfigError(e.to_string())
    }
}

impl WordCardError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // No voice output at all; playback stays unavailable
            WordCardError::ProvisioningFailure(_) => false,
            // A single utterance failed, the next attempt may succeed
            WordCardError::SynthesisFailure(_) => true,
            // Another unit may still load
            WordCardError::DataFailure(_) => true,
            WordCardError::AudioDeviceError(_) => false,
            WordCardError::ModelLoadError(_) => false,
            WordCardError::IOError(_) => false,
            WordCardError::ConfigError(_) => false,
            WordCardError::ChannelError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            WordCardError::ProvisioningFailure(_) => {
                "Speech output is unavailable. Reading cards aloud is disabled.".to_string()
            }
            WordCardError::SynthesisFailure(_) => {
                "The word could not be read aloud. Please try again.".to_string()
            }
            WordCardError::DataFailure(msg) => {
                format!("Could not load the word cards: {}", msg)
            }
            WordCardError::AudioDeviceError(_) => {
                "Audio device error. Please check your speakers.".to_string()
            }
            WordCardError::ModelLoadError(_) => {
                "Failed to load voice model. Please verify model files are present.".to_string()
            }
            WordCardError::IOError(_) => "File system error occurred.".to_string(),
            WordCardError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            WordCardError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, WordCardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_failure_is_recoverable() {
        assert!(WordCardError::SynthesisFailure("boom".into()).is_recoverable());
        assert!(!WordCardError::ProvisioningFailure("none".into()).is_recoverable());
    }

    #[test]
    fn test_data_failure_message_includes_detail() {
        let err = WordCardError::DataFailure("unit 3 has no cards".into());
        assert!(err.user_message().contains("unit 3 has no cards"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: WordCardError = io.into();
        assert!(matches!(err, WordCardError::IOError(_)));
    }
}
