//! Viewer state
//!
//! Owns navigation and the playback stack and exposes the operations the
//! window triggers. Independent of egui so it can be driven from tests.

use super::navigator::Navigator;
use super::swipe::SwipeTracker;
use crate::config::AppConfig;
use crate::playback::{Liveness, PlaybackSequencer, PlaybackView, StartOutcome};
use crate::speech::{self, Speaker, UtteranceParams, VoiceProvisioner};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, info};

/// Everything needed to read a card aloud
struct SpeechHandles {
    sequencer: PlaybackSequencer,
    provisioner: VoiceProvisioner,
    views: watch::Receiver<PlaybackView>,
}

/// What happened to a read request
#[derive(Debug)]
pub enum ReadRequest {
    /// Passed to the sequencer
    Outcome(StartOutcome),
    /// Speech was not provisioned yet; playback starts once it is, unless
    /// the request is withdrawn by navigation or another press first
    Deferred,
    /// No speech output or no card to read
    Unavailable,
}

/// State behind the viewer window
pub struct ViewerState {
    pub navigator: Navigator,
    speech: Option<SpeechHandles>,
    speech_error: Option<String>,
    data_error: Option<String>,
    swipe: SwipeTracker,
    /// Read request waiting for provisioning to finish
    queued: Option<Liveness>,
    runtime: Handle,
}

impl ViewerState {
    /// Build the speech stack and load the initial unit
    ///
    /// Neither a missing speech backend nor bad card data is fatal here; both
    /// end up as error screens. Voice provisioning runs in the background on
    /// `runtime`.
    pub fn initialize(config: &AppConfig, runtime: Handle) -> Self {
        let mut navigator = Navigator::new(&config.deck_path, config.unit_count);

        let (speech, speech_error) = match speech::create_platform(&config.speech) {
            Ok(platform) => {
                let provisioner = VoiceProvisioner::new(platform.clone(), config.voice.clone());
                let speaker = Speaker::new(
                    platform,
                    provisioner.slot(),
                    UtteranceParams::from(&config.playback),
                );
                let (sequencer, views) =
                    PlaybackSequencer::with_watch(speaker, config.playback.clone());

                let background = provisioner.clone();
                runtime.spawn(async move {
                    background.provision().await;
                });

                navigator = navigator.with_sequencer(sequencer.clone());
                let handles = SpeechHandles {
                    sequencer,
                    provisioner,
                    views,
                };
                (Some(handles), None)
            }
            Err(e) => {
                error!("Speech unavailable: {}", e);
                (None, Some(e.user_message()))
            }
        };

        let mut state = Self {
            navigator,
            speech,
            speech_error,
            data_error: None,
            swipe: SwipeTracker::new(),
            queued: None,
            runtime,
        };
        state.switch_unit(config.initial_unit);
        state
    }

    /// Read the visible card, or stop it if it is already being read
    pub fn read_current(&mut self) -> ReadRequest {
        if self.withdraw_queued() {
            info!("Queued read withdrawn by a second press");
            return ReadRequest::Outcome(StartOutcome::Stopped);
        }
        let Some(speech) = &self.speech else {
            return ReadRequest::Unavailable;
        };
        let Some(card) = self.navigator.current().cloned() else {
            return ReadRequest::Unavailable;
        };

        if !speech.provisioner.slot().is_provisioned() {
            info!("Voice not provisioned yet, provisioning before reading {}", card.id());
            let provisioner = speech.provisioner.clone();
            let sequencer = speech.sequencer.clone();
            let request = Liveness::live();
            self.queued = Some(request.clone());
            self.runtime.spawn(async move {
                provisioner.ensure_provisioned().await;
                let outcome = sequencer.start_queued(&card, &request);
                debug!("Queued read of {}: {:?}", card.id(), outcome);
            });
            return ReadRequest::Deferred;
        }

        let _guard = self.runtime.enter();
        ReadRequest::Outcome(speech.sequencer.start(&card))
    }

    /// Drop a queued read that has not started yet
    ///
    /// Returns whether there was one to drop. A request the sequencer has
    /// already claimed is a running session and is left to `stop()`.
    fn withdraw_queued(&mut self) -> bool {
        self.queued.take().is_some_and(|request| request.claim())
    }

    /// Stop any card being read, including one still waiting for a voice
    pub fn stop_reading(&mut self) -> bool {
        let withdrawn = self.withdraw_queued();
        let stopped = self
            .speech
            .as_ref()
            .is_some_and(|speech| speech.sequencer.stop());
        withdrawn || stopped
    }

    pub fn next(&mut self) -> bool {
        self.withdraw_queued();
        self.navigator.next()
    }

    pub fn previous(&mut self) -> bool {
        self.withdraw_queued();
        self.navigator.previous()
    }

    pub fn switch_unit(&mut self, unit: u32) {
        self.withdraw_queued();
        self.data_error = self
            .navigator
            .switch_unit(unit)
            .err()
            .map(|e| e.user_message());
    }

    pub fn begin_drag(&mut self, x: f32, y: f32) {
        self.swipe.begin(x, y);
    }

    /// Feed the pointer position of an ongoing drag
    pub fn drag_to(&mut self, x: f32, y: f32) {
        if let Some(direction) = self.swipe.update(x, y) {
            debug!("Swipe {:?}", direction);
            self.withdraw_queued();
            self.navigator.go(direction);
        }
    }

    pub fn end_drag(&mut self) {
        self.swipe.end();
    }

    /// Latest playback visuals
    pub fn view(&self) -> PlaybackView {
        self.speech
            .as_ref()
            .map(|speech| *speech.views.borrow())
            .unwrap_or_default()
    }

    pub fn is_reading(&self) -> bool {
        self.speech
            .as_ref()
            .is_some_and(|speech| speech.sequencer.is_active())
    }

    pub fn is_voice_ready(&self) -> bool {
        self.speech
            .as_ref()
            .is_some_and(|speech| speech.provisioner.slot().is_provisioned())
    }

    pub fn speech_error(&self) -> Option<&str> {
        self.speech_error.as_deref()
    }

    pub fn data_error(&self) -> Option<&str> {
        self.data_error.as_deref()
    }
}
