//! Speak-highlight-pause sequencing for a single card
//!
//! One session runs at a time. The session slot is the ownership token: a
//! session task may publish visuals only while the slot still holds its id,
//! so a retired session can never repaint a newer one.

use super::interrupt::Liveness;
use super::reflector::{reflect, PlaybackView, ViewSink};
use super::session::{ActiveSession, Phase, PlaybackPhase, PlaybackSession, SessionEnd};
use crate::config::PlaybackConfig;
use crate::deck::{CardId, CardRecord};
use crate::speech::{SpeakOutcome, Speaker};
use crate::WordCardError;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Why a start request did nothing
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefuseReason {
    /// The card has no segments to step through
    NoSegments,
    /// A queued request was withdrawn before it could start
    Withdrawn,
}

/// Handle to a spawned session task
#[derive(Debug)]
pub struct SessionHandle {
    id: Uuid,
    task: JoinHandle<SessionEnd>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Wait for the session to reach idle
    pub async fn finished(self) -> SessionEnd {
        match self.task.await {
            Ok(end) => end,
            Err(e) => SessionEnd::Failed(WordCardError::ChannelError(format!(
                "session task ended abnormally: {}",
                e
            ))),
        }
    }
}

/// Result of [`PlaybackSequencer::start`]
#[derive(Debug)]
pub enum StartOutcome {
    /// A new session is running
    Started(SessionHandle),
    /// The same card was already playing; it was stopped
    Stopped,
    Refused(RefuseReason),
}

impl StartOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, StartOutcome::Started(_))
    }

    pub fn into_handle(self) -> Option<SessionHandle> {
        match self {
            StartOutcome::Started(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Early exit from the phase loop
enum Halt {
    Interrupted,
    Failed(WordCardError),
}

struct Inner {
    speaker: Speaker,
    timings: PlaybackConfig,
    slot: Mutex<Option<ActiveSession>>,
    sink: Arc<dyn ViewSink>,
}

/// Drives the playback state machine for one card at a time
#[derive(Clone)]
pub struct PlaybackSequencer {
    inner: Arc<Inner>,
}

impl PlaybackSequencer {
    pub fn new(speaker: Speaker, timings: PlaybackConfig, sink: Arc<dyn ViewSink>) -> Self {
        sink.publish(PlaybackView::idle());
        Self {
            inner: Arc::new(Inner {
                speaker,
                timings,
                slot: Mutex::new(None),
                sink,
            }),
        }
    }

    /// Sequencer publishing into a watch channel
    pub fn with_watch(
        speaker: Speaker,
        timings: PlaybackConfig,
    ) -> (Self, watch::Receiver<PlaybackView>) {
        let (tx, rx) = watch::channel(PlaybackView::idle());
        (Self::new(speaker, timings, Arc::new(tx)), rx)
    }

    /// Begin reading `card`, or stop it if it is the card already playing
    ///
    /// Any other active session is stopped first. Must be called from within
    /// a Tokio runtime.
    pub fn start(&self, card: &CardRecord) -> StartOutcome {
        self.begin(card, None)
    }

    /// Start a request that was queued earlier, unless it has been withdrawn
    ///
    /// `request` is claimed under the session slot lock, so a withdrawal
    /// either lands before the session exists or is followed by a `stop()`
    /// that sees it.
    pub fn start_queued(&self, card: &CardRecord, request: &Liveness) -> StartOutcome {
        self.begin(card, Some(request))
    }

    fn begin(&self, card: &CardRecord, request: Option<&Liveness>) -> StartOutcome {
        if card.segments().is_empty() {
            warn!("Card {} has no segments, not reading it", card.id());
            return StartOutcome::Refused(RefuseReason::NoSegments);
        }

        let session = PlaybackSession::new(card.clone());
        {
            let mut slot = self.inner.slot.lock();
            if request.is_some_and(|request| !request.claim()) {
                debug!("Queued read of {} was withdrawn", card.id());
                return StartOutcome::Refused(RefuseReason::Withdrawn);
            }
            if let Some(active) = slot.take() {
                active.liveness.interrupt();
                self.inner.speaker.cancel();
                if active.card == card.id() {
                    info!("Stopping playback of {} on request", active.card);
                    self.inner.sink.publish(PlaybackView::idle());
                    return StartOutcome::Stopped;
                }
                info!("Stopping playback of {} to read {}", active.card, card.id());
            }
            *slot = Some(ActiveSession::of(&session));
            self.inner.sink.publish(reflect(session.view_phase()));
        }

        let id = session.id;
        info!("Reading {} ('{}', {} segments)", card.id(), card.word(), card.segments().len());
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.run_session(session).await });
        StartOutcome::Started(SessionHandle { id, task })
    }

    /// Stop the active session, if any, and show idle visuals at once
    ///
    /// Returns whether a session was stopped.
    pub fn stop(&self) -> bool {
        let mut slot = self.inner.slot.lock();
        match slot.take() {
            Some(active) => {
                debug!("Stopping playback of {}", active.card);
                active.liveness.interrupt();
                self.inner.speaker.cancel();
                self.inner.sink.publish(PlaybackView::idle());
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.slot.lock().is_some()
    }

    pub fn active_card(&self) -> Option<CardId> {
        self.inner.slot.lock().as_ref().map(|active| active.card)
    }

    pub fn timings(&self) -> &PlaybackConfig {
        &self.inner.timings
    }
}

impl Inner {
    async fn run_session(&self, mut session: PlaybackSession) -> SessionEnd {
        let id = session.id;
        let card = session.card_id();
        let liveness = session.liveness.clone();
        let started = Instant::now();

        let end = tokio::select! {
            result = self.run_phases(&mut session) => match result {
                Ok(()) => SessionEnd::Completed,
                Err(Halt::Interrupted) => SessionEnd::Interrupted,
                Err(Halt::Failed(e)) => SessionEnd::Failed(e),
            },
            _ = tokio::time::sleep(self.timings.safety_timeout()) => SessionEnd::TimedOut,
        };

        match &end {
            SessionEnd::Completed => {
                info!("Finished reading {} in {:?}", card, started.elapsed())
            }
            SessionEnd::Interrupted => debug!("Reading of {} interrupted", card),
            SessionEnd::TimedOut => warn!(
                "Reading of {} did not finish within {:?}, resetting",
                card,
                self.timings.safety_timeout()
            ),
            SessionEnd::Failed(e) => warn!("Reading of {} failed: {}", card, e),
        }

        self.finish(id, &liveness, &end);
        end
    }

    /// Release the slot and restore idle visuals if this session still owns it
    fn finish(&self, id: Uuid, liveness: &Liveness, end: &SessionEnd) {
        liveness.interrupt();
        let mut slot = self.slot.lock();
        if slot.as_ref().map(|active| active.id) != Some(id) {
            return;
        }
        *slot = None;
        if !matches!(end, SessionEnd::Completed) {
            self.speaker.cancel();
        }
        self.sink.publish(PlaybackView::idle());
    }

    async fn run_phases(&self, session: &mut PlaybackSession) -> Result<(), Halt> {
        let word = session.card.spoken_word();
        let segments = session.card.segments().to_vec();

        self.enter(session, Phase::Intro)?;
        self.speak(session, &word).await?;
        self.delay(session, self.timings.pause()).await?;

        for (i, segment) in segments.iter().enumerate() {
            self.enter(session, Phase::Segment(i))?;
            self.speak(session, segment).await?;
            self.delay(session, self.timings.segment_dwell()).await?;
        }

        self.enter(session, Phase::Outro)?;
        self.delay(session, self.timings.pause()).await?;
        self.speak(session, &word).await?;
        Ok(())
    }

    fn checkpoint(&self, session: &PlaybackSession) -> Result<(), Halt> {
        if session.liveness.is_live() {
            Ok(())
        } else {
            Err(Halt::Interrupted)
        }
    }

    fn enter(&self, session: &mut PlaybackSession, phase: Phase) -> Result<(), Halt> {
        self.checkpoint(session)?;
        if session.phase != phase {
            session.phase = phase;
            self.publish_if_current(session.id, session.view_phase());
        }
        Ok(())
    }

    async fn speak(&self, session: &PlaybackSession, text: &str) -> Result<(), Halt> {
        self.checkpoint(session)?;
        match self.speaker.speak(text, &session.liveness).await {
            Ok(SpeakOutcome::Spoken) => self.checkpoint(session),
            Ok(SpeakOutcome::Skipped) => Err(Halt::Interrupted),
            Err(e) => Err(Halt::Failed(e)),
        }
    }

    async fn delay(&self, session: &PlaybackSession, duration: Duration) -> Result<(), Halt> {
        self.checkpoint(session)?;
        tokio::time::sleep(duration).await;
        Ok(())
    }

    fn publish_if_current(&self, id: Uuid, phase: PlaybackPhase) {
        let slot = self.slot.lock();
        if slot.as_ref().map(|active| active.id) == Some(id) {
            self.sink.publish(reflect(phase));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::{SimulatedPlatform, UtteranceParams, VoiceSlot};

    /// Keeps every published view in order
    #[derive(Default)]
    struct RecordingSink {
        views: Mutex<Vec<PlaybackView>>,
    }

    impl ViewSink for RecordingSink {
        fn publish(&self, view: PlaybackView) {
            self.views.lock().push(view);
        }
    }

    impl RecordingSink {
        fn highlights(&self) -> Vec<Option<usize>> {
            self.views
                .lock()
                .iter()
                .filter(|v| v.is_busy())
                .map(|v| v.highlight)
                .collect()
        }

        fn last(&self) -> Option<PlaybackView> {
            self.views.lock().last().copied()
        }
    }

    fn caterpillar() -> CardRecord {
        CardRecord::from_segment_field(CardId::new(1, 0), "caterpillar", "cat - er - pillar")
    }

    fn setup(
        utterance_ms: u64,
    ) -> (PlaybackSequencer, Arc<SimulatedPlatform>, Arc<RecordingSink>) {
        let platform = Arc::new(SimulatedPlatform::new(Duration::from_millis(utterance_ms)));
        let speaker = Speaker::new(platform.clone(), VoiceSlot::new(), UtteranceParams::default());
        let sink = Arc::new(RecordingSink::default());
        let sequencer = PlaybackSequencer::new(speaker, PlaybackConfig::default(), sink.clone());
        (sequencer, platform, sink)
    }

    #[tokio::test(start_paused = true)]
    async fn test_caterpillar_sequence() {
        let (sequencer, platform, sink) = setup(100);

        let handle = sequencer.start(&caterpillar()).into_handle().unwrap();
        let end = handle.finished().await;

        assert!(matches!(end, SessionEnd::Completed));
        assert_eq!(
            platform.spoken_texts(),
            vec!["caterpillar", "cat", "er", "pillar", "caterpillar"]
        );
        assert_eq!(sink.highlights(), vec![None, Some(0), Some(1), Some(2), None]);
        assert_eq!(sink.last(), Some(PlaybackView::idle()));
        assert!(!sequencer.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_duration_follows_timings() {
        let (sequencer, _platform, _sink) = setup(100);
        let started = Instant::now();

        let handle = sequencer.start(&caterpillar()).into_handle().unwrap();
        handle.finished().await;

        // 5 utterances, 2 pauses, 3 dwells
        let expected = Duration::from_millis(5 * 100 + 2 * 600 + 3 * 1200);
        let elapsed = started.elapsed();
        assert!(elapsed >= expected);
        assert!(elapsed < expected + Duration::from_millis(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refuses_card_without_segments() {
        let (sequencer, platform, _sink) = setup(100);
        let card = CardRecord::new(CardId::new(1, 1), "empty", Vec::new());

        let outcome = sequencer.start(&card);

        assert!(matches!(outcome, StartOutcome::Refused(RefuseReason::NoSegments)));
        assert!(!sequencer.is_active());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(platform.spoken().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_mid_segment() {
        let (sequencer, platform, sink) = setup(100);

        let handle = sequencer.start(&caterpillar()).into_handle().unwrap();
        // Segment "er" is being spoken from 2000ms to 2100ms
        tokio::time::sleep(Duration::from_millis(2050)).await;
        assert!(sequencer.stop());
        assert_eq!(sink.last(), Some(PlaybackView::idle()));

        let end = handle.finished().await;
        assert!(matches!(end, SessionEnd::Interrupted));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(platform.spoken_texts(), vec!["caterpillar", "cat", "er"]);
        assert!(platform.spoken()[2].cancelled);
        assert_eq!(sink.last(), Some(PlaybackView::idle()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_stops_same_card() {
        let (sequencer, platform, sink) = setup(100);
        let card = caterpillar();

        let handle = sequencer.start(&card).into_handle().unwrap();
        // Holding on "cat"
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(sequencer.active_card(), Some(card.id()));

        let outcome = sequencer.start(&card);
        assert!(matches!(outcome, StartOutcome::Stopped));
        assert!(!sequencer.is_active());
        assert!(matches!(handle.finished().await, SessionEnd::Interrupted));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(platform.spoken_texts(), vec!["caterpillar", "cat"]);
        assert_eq!(sink.last(), Some(PlaybackView::idle()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_double_activation() {
        let (sequencer, platform, _sink) = setup(500);
        let card = caterpillar();

        let first = sequencer.start(&card).into_handle().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = sequencer.start(&card);

        assert!(matches!(second, StartOutcome::Stopped));
        assert!(matches!(first.finished().await, SessionEnd::Interrupted));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(platform.spoken().len(), 1);
        assert!(platform.spoken()[0].cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_card_replaces_active_session() {
        let (sequencer, platform, sink) = setup(100);
        let other = CardRecord::from_segment_field(CardId::new(1, 1), "apple", "ap - ple");

        let first = sequencer.start(&caterpillar()).into_handle().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let second = sequencer.start(&other).into_handle().unwrap();

        assert!(matches!(first.finished().await, SessionEnd::Interrupted));
        assert_eq!(sequencer.active_card(), Some(other.id()));
        assert!(matches!(second.finished().await, SessionEnd::Completed));

        assert_eq!(
            platform.spoken_texts(),
            vec!["caterpillar", "apple", "ap", "ple", "apple"]
        );
        // The retired session never drew a highlight after the switch
        let views = sink.views.lock().clone();
        let switch = views
            .iter()
            .position(|v| v.phase.card() == Some(other.id()))
            .unwrap();
        assert!(views[switch..]
            .iter()
            .all(|v| v.phase.card() != Some(CardId::new(1, 0))));
        assert_eq!(sink.last(), Some(PlaybackView::idle()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_safety_timeout_fires_once() {
        let (sequencer, platform, sink) = setup(100);
        platform.stall_on("er");
        let started = Instant::now();

        let handle = sequencer.start(&caterpillar()).into_handle().unwrap();
        let end = handle.finished().await;

        assert!(matches!(end, SessionEnd::TimedOut));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(20_000));
        assert!(elapsed < Duration::from_millis(20_010));
        assert!(!sequencer.is_active());
        assert_eq!(sink.last(), Some(PlaybackView::idle()));

        let published = sink.views.lock().len();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(sink.views.lock().len(), published);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthesis_failure_returns_to_idle() {
        let (sequencer, platform, sink) = setup(100);
        platform.fail_on("er");

        let handle = sequencer.start(&caterpillar()).into_handle().unwrap();
        let end = handle.finished().await;

        assert!(matches!(end, SessionEnd::Failed(WordCardError::SynthesisFailure(_))));
        assert_eq!(platform.spoken_texts(), vec!["caterpillar", "cat", "er"]);
        assert_eq!(sink.last(), Some(PlaybackView::idle()));

        // Later attempts are still accepted
        assert!(sequencer.start(&caterpillar()).is_started());
    }

    #[tokio::test(start_paused = true)]
    async fn test_withdrawn_queued_read_never_starts() {
        let (sequencer, platform, sink) = setup(100);
        let request = Liveness::live();
        request.interrupt();

        let outcome = sequencer.start_queued(&caterpillar(), &request);

        assert!(matches!(outcome, StartOutcome::Refused(RefuseReason::Withdrawn)));
        assert!(!sequencer.is_active());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(platform.spoken().is_empty());
        assert_eq!(sink.views.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queued_read_is_claimed_once() {
        let (sequencer, _platform, _sink) = setup(100);
        let request = Liveness::live();

        let handle = sequencer.start_queued(&caterpillar(), &request).into_handle().unwrap();
        assert!(!request.is_live());
        assert_eq!(sequencer.active_card(), Some(CardId::new(1, 0)));

        // Replaying the same request must not toggle the session off
        let again = sequencer.start_queued(&caterpillar(), &request);
        assert!(matches!(again, StartOutcome::Refused(RefuseReason::Withdrawn)));
        assert!(sequencer.is_active());
        assert!(matches!(handle.finished().await, SessionEnd::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_when_idle_is_harmless() {
        let (sequencer, _platform, sink) = setup(100);
        assert!(!sequencer.stop());
        assert_eq!(sink.views.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_at_most_one_highlight() {
        let (sequencer, _platform, sink) = setup(50);
        let card = CardRecord::from_segment_field(CardId::new(2, 4), "butterfly", "but - ter - fly");

        sequencer.start(&card).into_handle().unwrap().finished().await;

        for view in sink.views.lock().iter() {
            if let Some(i) = view.highlight {
                assert!(i < card.segments().len());
                assert!(view.is_busy());
            }
        }
    }
}
