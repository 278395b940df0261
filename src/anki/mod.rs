//! Anki deck import module
//!
//! Handles importing Anki `.apkg` exports into the card store.
//! Supports:
//! - `collection.anki21` with fallback to the legacy `collection.anki2`
//! - The eight-field vocabulary note layout
//! - Write-once extraction of the deck's mp3 files

pub mod fields;
mod import;

pub use fields::{extract_audio_field, parse_freq, NoteField, NoteFields, FIELD_SEPARATOR};
pub use import::*;
