//! Voice discovery, selection and the silent probe

use super::platform::{SpeechPlatform, Utterance, Voice};
use crate::config::VoiceConfig;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Text of the silent probe utterance
const PROBE_TEXT: &str = "test";

#[derive(Debug, Default)]
struct SlotState {
    provisioned: bool,
    voice: Option<Voice>,
}

/// The currently selected voice, shared between provisioner and speakers
///
/// Written once per provisioning pass; read-only for everyone else.
#[derive(Clone, Debug, Default)]
pub struct VoiceSlot {
    inner: Arc<RwLock<SlotState>>,
}

impl VoiceSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// The selected voice; `None` means the platform default applies
    pub fn current(&self) -> Option<Voice> {
        self.inner.read().voice.clone()
    }

    /// Whether a provisioning pass has completed
    pub fn is_provisioned(&self) -> bool {
        self.inner.read().provisioned
    }

    fn set(&self, voice: Option<Voice>) {
        let mut state = self.inner.write();
        state.voice = voice;
        state.provisioned = true;
    }
}

/// Pick a voice by preference
///
/// Priority, first match wins: a name marker such as "female", a known
/// high-quality voice name, a preferred language tag, then the first voice.
pub fn select_voice(voices: &[Voice], config: &VoiceConfig) -> Option<Voice> {
    let by_marker = voices.iter().find(|voice| {
        let name = voice.name.to_lowercase();
        config
            .name_markers
            .iter()
            .any(|marker| name.contains(&marker.to_lowercase()))
    });

    let by_name = || {
        voices.iter().find(|voice| {
            config
                .preferred_names
                .iter()
                .any(|preferred| voice.name.contains(preferred.as_str()))
        })
    };

    let by_lang = || {
        voices.iter().find(|voice| {
            config
                .preferred_langs
                .iter()
                .any(|lang| lang_matches(&voice.lang, lang))
        })
    };

    by_marker
        .or_else(by_name)
        .or_else(by_lang)
        .or_else(|| voices.first())
        .cloned()
}

/// Whether a voice's language tag falls under a wanted tag
///
/// Case-insensitive, treats `_` as `-`, and accepts subtags after the wanted
/// tag, so `en-US` covers `en_us` and `en-US-x-sfg` but not `en-USA`.
fn lang_matches(tag: &str, wanted: &str) -> bool {
    let normalize = |s: &str| s.replace('_', "-").to_ascii_lowercase();
    let tag = normalize(tag);
    let wanted = normalize(wanted);
    match tag.strip_prefix(wanted.as_str()) {
        Some(rest) => rest.is_empty() || rest.starts_with('-'),
        None => false,
    }
}

/// Discovers voices and fills the [`VoiceSlot`]
#[derive(Clone)]
pub struct VoiceProvisioner {
    platform: Arc<dyn SpeechPlatform>,
    config: VoiceConfig,
    slot: VoiceSlot,
    /// Held for the duration of a pass
    pass: Arc<tokio::sync::Mutex<()>>,
}

impl VoiceProvisioner {
    pub fn new(platform: Arc<dyn SpeechPlatform>, config: VoiceConfig) -> Self {
        Self {
            platform,
            config,
            slot: VoiceSlot::new(),
            pass: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Shared handle to the selected voice
    pub fn slot(&self) -> VoiceSlot {
        self.slot.clone()
    }

    /// Run one provisioning pass
    ///
    /// Waits for the voice list (bounded by the load timeout), selects a voice,
    /// probes it silently and then stores it in the slot. An empty list is not
    /// an error: the slot then holds no preference. Passes never overlap, and
    /// the slot only reports provisioned once the probe is over.
    pub async fn provision(&self) -> Option<Voice> {
        let _pass = self.pass.lock().await;
        self.run_pass().await
    }

    /// Provision unless a pass has already completed
    pub async fn ensure_provisioned(&self) -> Option<Voice> {
        let _pass = self.pass.lock().await;
        if self.slot.is_provisioned() {
            return self.slot.current();
        }
        self.run_pass().await
    }

    async fn run_pass(&self) -> Option<Voice> {
        let voices = self.wait_for_voices().await;
        let voice = select_voice(&voices, &self.config);

        match &voice {
            Some(v) => info!(
                "Selected voice '{}' ({}) from {} available on {}",
                v.name,
                v.lang,
                voices.len(),
                self.platform.name()
            ),
            None => warn!("No voices available on {}, using platform default", self.platform.name()),
        }

        self.probe(voice.clone()).await;
        self.slot.set(voice.clone());
        voice
    }

    async fn wait_for_voices(&self) -> Vec<Voice> {
        let mut voices_rx = self.platform.subscribe_voices();
        if !voices_rx.borrow_and_update().is_empty() {
            return voices_rx.borrow().clone();
        }

        debug!(
            "Voice list empty, waiting up to {}ms for voices",
            self.config.load_timeout_ms
        );
        tokio::select! {
            changed = voices_rx.changed() => {
                if changed.is_err() {
                    warn!("Voice list publisher closed before any voices arrived");
                }
            }
            _ = tokio::time::sleep(self.config.load_timeout()) => {
                warn!("Voice loading timed out, selecting from current list");
            }
        }

        let voices = voices_rx.borrow().clone();
        voices
    }

    /// Speak a zero-volume utterance and cut it off after the probe window
    ///
    /// Surfaces backend initialisation errors early. Failures are logged only.
    async fn probe(&self, voice: Option<Voice>) {
        let utterance = Utterance::new(PROBE_TEXT).with_voice(voice).with_volume(0.0);

        match tokio::time::timeout(self.config.probe_window(), self.platform.speak(utterance)).await {
            Ok(Ok(())) => debug!("Voice probe finished"),
            Ok(Err(e)) => warn!("Voice probe failed: {}", e),
            Err(_) => {
                self.platform.cancel();
                debug!("Voice probe cancelled after {}ms", self.config.probe_window_ms);
            }
        }
    }
}
