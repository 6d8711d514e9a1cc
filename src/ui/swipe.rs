//! Drag gesture to card navigation

/// Minimum horizontal travel, in points, that counts as a swipe
pub const SWIPE_THRESHOLD: f32 = 50.0;

/// Direction a swipe moves through the deck
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    /// Content dragged leftwards
    Next,
    /// Content dragged rightwards
    Previous,
}

/// Classify travel from the gesture start
///
/// `dx` and `dy` are start minus current position, so a leftward drag gives a
/// positive `dx`. Mostly-vertical motion is never a swipe.
pub fn classify(dx: f32, dy: f32) -> Option<SwipeDirection> {
    if dx.abs() > dy.abs() && dx.abs() > SWIPE_THRESHOLD {
        Some(if dx > 0.0 {
            SwipeDirection::Next
        } else {
            SwipeDirection::Previous
        })
    } else {
        None
    }
}

/// Tracks one drag and reports swipes as they happen
///
/// After each reported swipe the start point moves to the current position,
/// so one long drag can step through several cards.
#[derive(Debug, Default)]
pub struct SwipeTracker {
    start: Option<(f32, f32)>,
}

impl SwipeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, x: f32, y: f32) {
        self.start = Some((x, y));
    }

    pub fn update(&mut self, x: f32, y: f32) -> Option<SwipeDirection> {
        let (start_x, start_y) = self.start?;
        let direction = classify(start_x - x, start_y - y)?;
        self.start = Some((x, y));
        Some(direction)
    }

    pub fn end(&mut self) {
        self.start = None;
    }

    pub fn is_tracking(&self) -> bool {
        self.start.is_some()
    }
}
