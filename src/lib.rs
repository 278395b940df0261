//! Vocabulary flashcard backend: Anki deck import, card store, HTTP API and
//! translation backfill.

pub mod anki;
pub mod cards;
pub mod config;
pub mod server;
pub mod translation;
