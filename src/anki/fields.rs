//! Note field schema for the vocabulary deck
//!
//! A note stores all of its fields in one text blob separated by 0x1F. The
//! deck this importer targets has eight fields in a fixed order, modelled
//! here as [`NoteField`] rather than bare indices.

use std::sync::OnceLock;

use regex::Regex;

use crate::cards::NewCard;

/// Separator between fields in `notes.flds`
pub const FIELD_SEPARATOR: char = '\u{1f}';

/// Positional fields of a vocabulary note, in deck order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteField {
    Rank,
    Word,
    PartOfSpeech,
    Definition,
    Dutch,
    English,
    Frequency,
    Audio,
}

impl NoteField {
    /// All fields in the order they appear in `flds`
    pub const ALL: [NoteField; 8] = [
        NoteField::Rank,
        NoteField::Word,
        NoteField::PartOfSpeech,
        NoteField::Definition,
        NoteField::Dutch,
        NoteField::English,
        NoteField::Frequency,
        NoteField::Audio,
    ];

    /// Number of fields the deck schema expects
    pub const COUNT: usize = Self::ALL.len();

    pub fn index(self) -> usize {
        self as usize
    }
}

/// The split fields of one note
#[derive(Debug, Clone)]
pub struct NoteFields {
    values: Vec<String>,
    /// Field count before padding/truncation
    found: usize,
}

impl NoteFields {
    /// Split a `flds` blob. Short rows are padded with empty text, extra
    /// trailing fields are dropped.
    pub fn parse(flds: &str) -> Self {
        let mut values: Vec<String> = flds.split(FIELD_SEPARATOR).map(str::to_string).collect();
        let found = values.len();
        values.resize(NoteField::COUNT, String::new());
        Self { values, found }
    }

    /// Raw text of a field (empty when the row was short)
    pub fn get(&self, field: NoteField) -> &str {
        &self.values[field.index()]
    }

    /// Field count as found in the source row
    pub fn found(&self) -> usize {
        self.found
    }

    pub fn was_padded(&self) -> bool {
        self.found < NoteField::COUNT
    }

    fn text(&self, field: NoteField) -> Option<String> {
        non_empty(self.get(field))
    }

    /// Map the note onto a card
    pub fn to_card(&self) -> NewCard {
        NewCard {
            rank: self.text(NoteField::Rank),
            word: self.text(NoteField::Word),
            pos: self.text(NoteField::PartOfSpeech),
            definition: self.text(NoteField::Definition),
            dutch: self.text(NoteField::Dutch),
            english: self.text(NoteField::English),
            freq: parse_freq(self.get(NoteField::Frequency)),
            audio: extract_audio_field(self.get(NoteField::Audio)),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn sound_regex() -> &'static Regex {
    static SOUND_RE: OnceLock<Regex> = OnceLock::new();
    SOUND_RE.get_or_init(|| Regex::new(r"\[sound:([^\]]+)\]").unwrap())
}

/// Audio filename from an audio field.
///
/// `[sound:foo.mp3]` -> `foo.mp3`; a bare `foo.MP3` is kept as is; anything
/// else has no audio.
pub fn extract_audio_field(value: &str) -> Option<String> {
    if value.is_empty() {
        return None;
    }

    if let Some(caps) = sound_regex().captures(value) {
        return caps
            .get(1)
            .map(|m| m.as_str().trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string);
    }

    let trimmed = value.trim();
    if trimmed.to_lowercase().ends_with(".mp3") {
        return Some(trimmed.to_string());
    }

    None
}

/// Frequency value, accepting a comma as decimal separator.
/// Anything unparsable is `None`.
pub fn parse_freq(value: &str) -> Option<f64> {
    let normalized = value.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok()
}
