//! Translation backfill for cards missing Russian or Ukrainian text
//!
//! The backfill job only talks to the [`Translator`] trait; the HTTP client
//! for OpenAI-compatible APIs is one implementation of it.

mod backfill;
mod openai;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

pub use crate::cards::Translation;
pub use backfill::{run_backfill, run_backfill_rounds, BackfillError, BackfillSummary};
pub use openai::{clean_text, parse_translations, OpenAiTranslator};

#[derive(Error, Debug)]
pub enum TranslationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No JSON array found in response: {0}")]
    NoJsonArray(String),

    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, TranslationError>;

/// Something that can translate English card text into Russian and
/// Ukrainian.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `(card_id, english)` pairs. Ids missing from the result
    /// were not translated.
    async fn translate_batch(&self, items: &[(i64, String)]) -> Result<HashMap<i64, Translation>>;
}
