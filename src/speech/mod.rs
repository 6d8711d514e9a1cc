//! Speech output: platform backends, voice provisioning and the utterance primitive
//!
//! This module provides:
//! - The `SpeechPlatform` seam every backend implements
//! - A silent simulated backend and, with the `vits` feature, VITS voices
//! - Voice selection and provisioning
//! - The `Speaker` used by the playback sequencer

pub mod platform;
pub mod simulated;
pub mod utterance;
pub mod voice;
#[cfg(feature = "vits")]
pub mod vits;

pub use platform::{SpeechPlatform, Utterance, Voice};
pub use simulated::{SimulatedPlatform, SpokenRecord};
pub use utterance::{SpeakOutcome, Speaker, UtteranceParams};
pub use voice::{select_voice, VoiceProvisioner, VoiceSlot};

use crate::config::{SpeechBackend, SpeechConfig};
use crate::{Result, WordCardError};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Create the configured speech platform
///
/// Fails with [`WordCardError::ProvisioningFailure`] when the configured
/// backend cannot produce speech at all.
pub fn create_platform(config: &SpeechConfig) -> Result<Arc<dyn SpeechPlatform>> {
    let platform: Arc<dyn SpeechPlatform> = match config.backend {
        SpeechBackend::Simulated => Arc::new(
            SimulatedPlatform::new(Duration::from_millis(config.simulated_utterance_ms))
                .with_voices(SimulatedPlatform::default_voices()),
        ),
        SpeechBackend::Vits => create_vits(config)?,
    };
    info!("Speech platform '{}' initialized", platform.name());
    Ok(platform)
}

#[cfg(feature = "vits")]
fn create_vits(config: &SpeechConfig) -> Result<Arc<dyn SpeechPlatform>> {
    if config.voices.is_empty() {
        return Err(WordCardError::ProvisioningFailure(
            "no VITS voices configured".into(),
        ));
    }
    Ok(Arc::new(vits::VitsPlatform::start(config.voices.clone())?))
}

#[cfg(not(feature = "vits"))]
fn create_vits(_config: &SpeechConfig) -> Result<Arc<dyn SpeechPlatform>> {
    Err(WordCardError::ProvisioningFailure(
        "this build has no VITS support (enable the `vits` feature)".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_platform_has_voices() {
        let config = SpeechConfig {
            backend: SpeechBackend::Simulated,
            ..Default::default()
        };
        let platform = create_platform(&config).unwrap();
        assert_eq!(platform.name(), "simulated");
        assert!(!platform.voices().is_empty());
    }

    #[test]
    fn test_default_backend_without_voices_is_provisioning_failure() {
        let result = create_platform(&SpeechConfig::default());
        assert!(matches!(result, Err(WordCardError::ProvisioningFailure(_))));
    }

    #[cfg(not(feature = "vits"))]
    #[test]
    fn test_vits_without_feature_is_provisioning_failure() {
        let config = SpeechConfig {
            backend: SpeechBackend::Vits,
            ..Default::default()
        };
        let result = create_platform(&config);
        assert!(matches!(result, Err(WordCardError::ProvisioningFailure(_))));
    }
}
