//! Neural speech backend with sherpa-rs (VITS models) and rodio playback
//!
//! A worker thread owns the models and the output stream. Requests arrive over
//! a command channel and are answered through oneshot channels, so the async
//! side never blocks on synthesis or playback.

use super::platform::{SpeechPlatform, Utterance, Voice};
use crate::config::VitsVoiceEntry;
use crate::{Result, WordCardError};
use async_trait::async_trait;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use sherpa_rs::tts::{VitsTts, VitsTtsConfig};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, info, warn};

/// Maximum queued speak requests
const COMMAND_QUEUE_SIZE: usize = 32;

/// How often the worker checks for cancellation while audio plays
const PLAYBACK_POLL: Duration = Duration::from_millis(10);

enum VitsCommand {
    Speak {
        utterance: Utterance,
        /// Cancellation epoch when the request was issued
        epoch: u64,
        reply: oneshot::Sender<Result<()>>,
    },
    Shutdown,
}

/// A loaded voice model
struct VoiceModel {
    voice: Voice,
    tts: VitsTts,
    speaker_id: i32,
}

impl VoiceModel {
    fn load(entry: &VitsVoiceEntry) -> Result<Self> {
        for (what, path) in [("Model", &entry.model), ("Tokens file", &entry.tokens)] {
            if !Path::new(path).exists() {
                return Err(WordCardError::ModelLoadError(format!(
                    "{} not found: {}",
                    what, path
                )));
            }
        }

        info!("Loading VITS voice '{}' from: {}", entry.name, entry.model);

        let config = VitsTtsConfig {
            model: entry.model.clone(),
            tokens: entry.tokens.clone(),
            lexicon: entry.lexicon.clone().unwrap_or_default(),
            data_dir: entry.data_dir.clone().unwrap_or_default(),
            dict_dir: entry.dict_dir.clone().unwrap_or_default(),
            ..Default::default()
        };

        Ok(Self {
            voice: Voice::new(entry.name.clone(), entry.lang.clone()),
            tts: VitsTts::new(config),
            speaker_id: entry.speaker_id,
        })
    }
}

/// State shared between the platform handle and its worker
struct Shared {
    epoch: AtomicU64,
    speaking: AtomicBool,
}

/// [`SpeechPlatform`] backed by VITS models
pub struct VitsPlatform {
    command_tx: Sender<VitsCommand>,
    voices_tx: Arc<watch::Sender<Vec<Voice>>>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl VitsPlatform {
    /// Open the audio output and start loading the voice catalog
    ///
    /// Fails with [`WordCardError::ProvisioningFailure`] when no output device
    /// is available. Voices are published once their models have loaded.
    pub fn start(entries: Vec<VitsVoiceEntry>) -> Result<Self> {
        let (command_tx, command_rx) = bounded(COMMAND_QUEUE_SIZE);
        let (ready_tx, ready_rx) = bounded::<Result<()>>(1);
        let (voices_tx, _) = watch::channel(Vec::new());
        let voices_tx = Arc::new(voices_tx);
        let shared = Arc::new(Shared {
            epoch: AtomicU64::new(0),
            speaking: AtomicBool::new(false),
        });

        let worker = {
            let voices_tx = Arc::clone(&voices_tx);
            let shared = Arc::clone(&shared);
            thread::spawn(move || run_worker(entries, command_rx, ready_tx, voices_tx, shared))
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(WordCardError::ProvisioningFailure(e.to_string()));
            }
            Err(_) => {
                return Err(WordCardError::ProvisioningFailure(
                    "speech worker exited during startup".into(),
                ));
            }
        }

        Ok(Self {
            command_tx,
            voices_tx,
            shared,
            worker: Some(worker),
        })
    }
}

impl Drop for VitsPlatform {
    fn drop(&mut self) {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        let _ = self.command_tx.send(VitsCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

#[async_trait]
impl SpeechPlatform for VitsPlatform {
    fn name(&self) -> &str {
        "vits"
    }

    fn subscribe_voices(&self) -> watch::Receiver<Vec<Voice>> {
        self.voices_tx.subscribe()
    }

    async fn speak(&self, utterance: Utterance) -> Result<()> {
        let (reply, reply_rx) = oneshot::channel();
        let command = VitsCommand::Speak {
            utterance,
            epoch: self.shared.epoch.load(Ordering::SeqCst),
            reply,
        };

        self.command_tx.try_send(command).map_err(|e| match e {
            TrySendError::Full(_) => WordCardError::SynthesisFailure("speech queue is full".into()),
            TrySendError::Disconnected(_) => {
                WordCardError::ChannelError("speech worker has stopped".into())
            }
        })?;

        reply_rx
            .await
            .map_err(|_| WordCardError::ChannelError("speech worker dropped the request".into()))?
    }

    fn cancel(&self) {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
    }

    fn is_speaking(&self) -> bool {
        self.shared.speaking.load(Ordering::SeqCst)
    }
}

fn run_worker(
    entries: Vec<VitsVoiceEntry>,
    command_rx: Receiver<VitsCommand>,
    ready_tx: Sender<Result<()>>,
    voices_tx: Arc<watch::Sender<Vec<Voice>>>,
    shared: Arc<Shared>,
) {
    info!("VITS speech worker starting");

    // The output stream must stay alive for as long as the sink plays
    let (_stream, stream_handle) = match OutputStream::try_default() {
        Ok(output) => output,
        Err(e) => {
            error!("No audio output device: {}", e);
            let _ = ready_tx.send(Err(WordCardError::AudioDeviceError(e.to_string())));
            return;
        }
    };
    let sink = match Sink::try_new(&stream_handle) {
        Ok(sink) => sink,
        Err(e) => {
            error!("Failed to open audio sink: {}", e);
            let _ = ready_tx.send(Err(WordCardError::AudioDeviceError(e.to_string())));
            return;
        }
    };
    let _ = ready_tx.send(Ok(()));

    let mut models: Vec<VoiceModel> = entries
        .iter()
        .filter_map(|entry| match VoiceModel::load(entry) {
            Ok(model) => Some(model),
            Err(e) => {
                warn!("Skipping voice '{}': {}", entry.name, e);
                None
            }
        })
        .collect();

    voices_tx.send_replace(models.iter().map(|m| m.voice.clone()).collect());
    info!("VITS speech worker ready with {} voices", models.len());

    loop {
        match command_rx.recv() {
            Ok(VitsCommand::Speak {
                utterance,
                epoch,
                reply,
            }) => {
                if shared.epoch.load(Ordering::SeqCst) != epoch {
                    debug!("Dropping cancelled request '{}'", utterance.text);
                    let _ = reply.send(Ok(()));
                    continue;
                }
                let result = speak_blocking(&mut models, &sink, &utterance, epoch, &shared);
                if let Err(e) = &result {
                    warn!("VITS synthesis failed for '{}': {}", utterance.text, e);
                }
                let _ = reply.send(result);
            }
            Ok(VitsCommand::Shutdown) => {
                info!("VITS speech worker shutting down");
                break;
            }
            Err(e) => {
                error!("Command channel error: {}", e);
                break;
            }
        }
    }

    sink.stop();
    info!("VITS speech worker stopped");
}

/// Synthesize and play one utterance, returning early when cancelled
fn speak_blocking(
    models: &mut [VoiceModel],
    sink: &Sink,
    utterance: &Utterance,
    epoch: u64,
    shared: &Shared,
) -> Result<()> {
    let index = utterance
        .voice
        .as_ref()
        .and_then(|voice| models.iter().position(|m| m.voice == *voice))
        .unwrap_or(0);
    let model = models
        .get_mut(index)
        .ok_or_else(|| WordCardError::SynthesisFailure("no voice model loaded".into()))?;

    if (utterance.pitch - 1.0).abs() > f32::EPSILON {
        debug!("VITS voices have no pitch control, ignoring pitch {}", utterance.pitch);
    }

    let audio = model
        .tts
        .create(&utterance.text, model.speaker_id, utterance.rate)
        .map_err(|e| WordCardError::SynthesisFailure(format!("Synthesis failed: {}", e)))?;

    if shared.epoch.load(Ordering::SeqCst) != epoch {
        return Ok(());
    }

    let sample_rate = audio.sample_rate as u32;
    debug!(
        "Playing {} samples ({:.2}s) for '{}'",
        audio.samples.len(),
        audio.samples.len() as f32 / sample_rate.max(1) as f32,
        utterance.text
    );

    sink.set_volume(utterance.volume);
    sink.append(SamplesBuffer::new(1, sample_rate, audio.samples));
    shared.speaking.store(true, Ordering::SeqCst);

    while !sink.empty() {
        if shared.epoch.load(Ordering::SeqCst) != epoch {
            debug!("Cancelling playback of '{}'", utterance.text);
            sink.stop();
            break;
        }
        thread::sleep(PLAYBACK_POLL);
    }

    shared.speaking.store(false, Ordering::SeqCst);
    Ok(())
}
