//! End-to-end playback through the public API
//!
//! Uses the simulated speech platform with a paused clock so timings are exact.

use std::sync::Arc;
use std::time::Duration;
use wordcard::config::{PlaybackConfig, VoiceConfig};
use wordcard::deck::{CardId, CardRecord};
use wordcard::playback::{PlaybackSequencer, SessionEnd, StartOutcome, IDLE_LABEL, READING_LABEL};
use wordcard::speech::{SimulatedPlatform, Speaker, SpeechPlatform, UtteranceParams, Voice, VoiceProvisioner};

struct Rig {
    platform: Arc<SimulatedPlatform>,
    sequencer: PlaybackSequencer,
    views: tokio::sync::watch::Receiver<wordcard::playback::PlaybackView>,
}

async fn rig(utterance_ms: u64, timings: PlaybackConfig) -> Rig {
    let platform = Arc::new(
        SimulatedPlatform::new(Duration::from_millis(utterance_ms)).with_voices(vec![
            Voice::new("Daniel", "en-GB"),
            Voice::new("Samantha Female", "en-US"),
        ]),
    );
    let provisioner = VoiceProvisioner::new(platform.clone(), VoiceConfig::default());
    provisioner.provision().await;

    let speaker = Speaker::new(
        platform.clone(),
        provisioner.slot(),
        UtteranceParams::from(&timings),
    );
    let (sequencer, views) = PlaybackSequencer::with_watch(speaker, timings);
    Rig {
        platform,
        sequencer,
        views,
    }
}

fn card(index: usize, word: &str, segments: &str) -> CardRecord {
    CardRecord::from_segment_field(CardId::new(1, index), word, segments)
}

#[tokio::test(start_paused = true)]
async fn test_reads_with_selected_voice() {
    let rig = rig(100, PlaybackConfig::default()).await;
    let butterfly = card(0, "butterfly", "but - ter - fly");

    let handle = rig.sequencer.start(&butterfly).into_handle().unwrap();
    assert_eq!(rig.views.borrow().trigger.label, READING_LABEL);
    assert!(matches!(handle.finished().await, SessionEnd::Completed));

    assert_eq!(
        rig.platform.spoken_texts(),
        vec!["butterfly", "but", "ter", "fly", "butterfly"]
    );
    let voiced: Vec<_> = rig
        .platform
        .spoken()
        .into_iter()
        .filter(|r| r.volume > 0.0)
        .map(|r| r.voice)
        .collect();
    assert!(voiced
        .iter()
        .all(|v| v.as_deref() == Some("Samantha Female")));
    assert_eq!(rig.views.borrow().trigger.label, IDLE_LABEL);
}

#[tokio::test(start_paused = true)]
async fn test_highlight_follows_segments() {
    let rig = rig(100, PlaybackConfig::default()).await;
    let caterpillar = card(0, "caterpillar", "cat - er - pillar");

    rig.sequencer.start(&caterpillar);

    // Intro: word spoken, then pause
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(rig.views.borrow().highlight, None);
    // Segment 0 from 700ms
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(rig.views.borrow().highlight, Some(0));
    // Segment 1 from 2000ms
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(rig.views.borrow().highlight, Some(1));
    // Segment 2 from 3300ms
    tokio::time::sleep(Duration::from_millis(1300)).await;
    assert_eq!(rig.views.borrow().highlight, Some(2));
    // Outro from 4600ms
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(rig.views.borrow().highlight, None);
    assert!(rig.views.borrow().is_busy());
    // Done at 5300ms
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(!rig.views.borrow().is_busy());
}

#[tokio::test(start_paused = true)]
async fn test_custom_timings() {
    let timings = PlaybackConfig {
        pause_ms: 100,
        segment_dwell_ms: 200,
        ..PlaybackConfig::default()
    };
    let rig = rig(50, timings).await;
    let started = tokio::time::Instant::now();

    let handle = rig.sequencer.start(&card(0, "kitten", "kit - ten")).into_handle().unwrap();
    handle.finished().await;

    let expected = Duration::from_millis(4 * 50 + 2 * 100 + 2 * 200);
    let elapsed = started.elapsed();
    assert!(elapsed >= expected);
    assert!(elapsed < expected + Duration::from_millis(20));
}

#[tokio::test(start_paused = true)]
async fn test_short_safety_timeout_cuts_long_card() {
    let timings = PlaybackConfig {
        safety_timeout_ms: 1000,
        ..PlaybackConfig::default()
    };
    let rig = rig(100, timings).await;

    let handle = rig.sequencer.start(&card(0, "caterpillar", "cat - er - pillar")).into_handle().unwrap();
    assert!(matches!(handle.finished().await, SessionEnd::TimedOut));

    assert_eq!(rig.platform.spoken_texts(), vec!["caterpillar", "cat"]);
    assert!(!rig.views.borrow().is_busy());
    assert!(!rig.platform.is_speaking());
}

#[tokio::test(start_paused = true)]
async fn test_switching_cards_mid_read() {
    let rig = rig(100, PlaybackConfig::default()).await;
    let first = card(0, "caterpillar", "cat - er - pillar");
    let second = card(1, "ant", "ant");

    let first_handle = rig.sequencer.start(&first).into_handle().unwrap();
    tokio::time::sleep(Duration::from_millis(750)).await;
    let second_handle = rig.sequencer.start(&second).into_handle().unwrap();

    assert_eq!(rig.views.borrow().phase.card(), Some(second.id()));
    assert!(matches!(first_handle.finished().await, SessionEnd::Interrupted));
    assert!(matches!(second_handle.finished().await, SessionEnd::Completed));
    assert_eq!(
        rig.platform.spoken_texts(),
        vec!["caterpillar", "cat", "ant", "ant", "ant"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop_then_restart() {
    let rig = rig(100, PlaybackConfig::default()).await;
    let ant = card(0, "ant", "ant");

    rig.sequencer.start(&ant);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(matches!(rig.sequencer.start(&ant), StartOutcome::Stopped));
    assert!(!rig.views.borrow().is_busy());

    let handle = rig.sequencer.start(&ant).into_handle().unwrap();
    assert!(matches!(handle.finished().await, SessionEnd::Completed));
    assert_eq!(rig.platform.spoken_texts(), vec!["ant", "ant", "ant", "ant"]);
}
