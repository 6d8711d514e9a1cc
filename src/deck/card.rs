//! Card records and segment parsing

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between segments in the segment description field
pub const SEGMENT_DELIMITER: &str = " - ";

/// Separator between pronunciation hints
pub const HINT_DELIMITER: char = '/';

/// Identifier attached to a card when it is loaded
///
/// The viewer passes this with every playback request, so the sequencer never
/// has to infer which card a trigger belongs to from its on-screen position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId {
    /// Unit the card was loaded from (1-based)
    pub unit: u32,
    /// Position among the unit's valid cards (0-based)
    pub index: usize,
}

impl CardId {
    pub fn new(unit: u32, index: usize) -> Self {
        Self { unit, index }
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit{}#{}", self.unit, self.index)
    }
}

/// A vocabulary card
#[derive(Clone, Debug, PartialEq)]
pub struct CardRecord {
    id: CardId,
    word: String,
    translation: String,
    phonetic: String,
    segments: Vec<String>,
    pronunciation_hints: Vec<String>,
    must_learn: bool,
}

impl CardRecord {
    /// Create a card from a word and its already-split segments
    ///
    /// Segments are trimmed and empty ones dropped.
    pub fn new(id: CardId, word: impl Into<String>, segments: Vec<String>) -> Self {
        let segments = segments
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            id,
            word: word.into().trim().to_string(),
            translation: String::new(),
            phonetic: String::new(),
            segments,
            pronunciation_hints: Vec::new(),
            must_learn: false,
        }
    }

    /// Create a card from a segment description such as `"cat - er - pillar"`
    pub fn from_segment_field(id: CardId, word: impl Into<String>, field: &str) -> Self {
        Self::new(id, word, split_segments(field))
    }

    pub fn with_translation(mut self, translation: impl Into<String>) -> Self {
        self.translation = translation.into().trim().to_string();
        self
    }

    pub fn with_phonetic(mut self, phonetic: impl Into<String>) -> Self {
        self.phonetic = phonetic.into().trim().to_string();
        self
    }

    /// Set pronunciation hints from a `/`-separated field
    pub fn with_pronunciation(mut self, field: &str) -> Self {
        self.pronunciation_hints = split_pronunciation(field);
        self
    }

    pub fn with_must_learn(mut self, must_learn: bool) -> Self {
        self.must_learn = must_learn;
        self
    }

    pub fn id(&self) -> CardId {
        self.id
    }

    pub fn word(&self) -> &str {
        &self.word
    }

    pub fn translation(&self) -> &str {
        &self.translation
    }

    pub fn phonetic(&self) -> &str {
        &self.phonetic
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn pronunciation_hints(&self) -> &[String] {
        &self.pronunciation_hints
    }

    pub fn must_learn(&self) -> bool {
        self.must_learn
    }

    /// The text read for the full-word phases: all segments joined
    pub fn spoken_word(&self) -> String {
        self.segments.concat()
    }

    /// Pronunciation hints as display lines
    pub fn pronunciation_text(&self) -> String {
        self.pronunciation_hints.join("\n")
    }
}

/// Split a segment description on [`SEGMENT_DELIMITER`], trimming and discarding empties
pub fn split_segments(field: &str) -> Vec<String> {
    field
        .trim()
        .split(SEGMENT_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Split a pronunciation field on [`HINT_DELIMITER`]
pub fn split_pronunciation(field: &str) -> Vec<String> {
    field
        .trim()
        .split(HINT_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
