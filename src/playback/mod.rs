//! Card playback: sequencing, interruption and the visuals derived from it

pub mod interrupt;
pub mod reflector;
pub mod sequencer;
pub mod session;

pub use interrupt::Liveness;
pub use reflector::{reflect, PlaybackView, TriggerVisual, ViewSink, IDLE_LABEL, READING_LABEL};
pub use sequencer::{PlaybackSequencer, RefuseReason, SessionHandle, StartOutcome};
pub use session::{Phase, PlaybackPhase, SessionEnd};
