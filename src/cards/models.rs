//! Data models for vocabulary cards

use serde::{Deserialize, Serialize};

/// A vocabulary card as stored in the `cards` table.
///
/// Every field except `id` is optional; imported decks routinely leave
/// translations or audio empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: i64,
    pub rank: Option<String>,
    pub word: Option<String>,
    pub pos: Option<String>,
    pub definition: Option<String>,
    pub dutch: Option<String>,
    pub english: Option<String>,
    pub ru: Option<String>,
    pub ukr: Option<String>,
    pub freq: Option<f64>,
    /// Bare filename inside the media directory
    pub audio: Option<String>,
}

/// A card that has not been persisted yet (no id assigned)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCard {
    pub rank: Option<String>,
    pub word: Option<String>,
    pub pos: Option<String>,
    pub definition: Option<String>,
    pub dutch: Option<String>,
    pub english: Option<String>,
    pub freq: Option<f64>,
    pub audio: Option<String>,
}

/// Outgoing representation of a card, with the servable audio URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardOut {
    pub id: i64,
    pub rank: Option<String>,
    pub word: Option<String>,
    pub pos: Option<String>,
    pub definition: Option<String>,
    pub dutch: Option<String>,
    pub english: Option<String>,
    pub ru: Option<String>,
    pub ukr: Option<String>,
    pub freq: Option<f64>,
    pub audio: Option<String>,
    pub audio_url: Option<String>,
}

/// URL path under which extracted audio is served
pub const MEDIA_URL_PREFIX: &str = "/media";

/// Build the servable URL for an audio filename
pub fn audio_url(audio: Option<&str>) -> Option<String> {
    match audio {
        Some(name) if !name.is_empty() => Some(format!("{}/{}", MEDIA_URL_PREFIX, name)),
        _ => None,
    }
}

impl From<Card> for CardOut {
    fn from(card: Card) -> Self {
        let audio_url = audio_url(card.audio.as_deref());
        Self {
            id: card.id,
            rank: card.rank,
            word: card.word,
            pos: card.pos,
            definition: card.definition,
            dutch: card.dutch,
            english: card.english,
            ru: card.ru,
            ukr: card.ukr,
            freq: card.freq,
            audio: card.audio,
            audio_url,
        }
    }
}

/// Largest page the list operation will return
pub const MAX_LIST_LIMIT: i64 = 500;

/// Page size used when the caller does not ask for one
pub const DEFAULT_LIST_LIMIT: i64 = 50;

/// Paging and search parameters for listing cards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub query: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            query: None,
            limit: DEFAULT_LIST_LIMIT,
            offset: 0,
        }
    }
}

impl ListParams {
    pub fn new(query: Option<String>, limit: i64, offset: i64) -> Self {
        Self { query, limit, offset }.clamped()
    }

    /// Clamp limit to `1..=MAX_LIST_LIMIT` and offset to `>= 0`.
    /// An empty query is treated as no query.
    pub fn clamped(self) -> Self {
        let query = self.query.filter(|q| !q.is_empty());
        Self {
            query,
            limit: self.limit.clamp(1, MAX_LIST_LIMIT),
            offset: self.offset.max(0),
        }
    }
}

/// Translations produced for a single card by the backfill job
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub ru: Option<String>,
    pub ukr: Option<String>,
}

impl Translation {
    pub fn is_empty(&self) -> bool {
        self.ru.is_none() && self.ukr.is_none()
    }
}
