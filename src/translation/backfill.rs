//! Batch job filling in missing `ru`/`ukr` translations

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Translator;
use crate::cards::{CardStore, CardStoreError};

#[derive(Error, Debug)]
pub enum BackfillError {
    #[error("Card store error: {0}")]
    Store(#[from] CardStoreError),
}

/// Outcome of one or more backfill batches
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillSummary {
    /// Candidate cards selected
    pub found: usize,
    /// Cards that received at least one translation
    pub updated: usize,
    /// Cards the translator returned nothing for
    pub skipped: usize,
    /// Batches run
    pub rounds: usize,
}

impl BackfillSummary {
    fn absorb(&mut self, other: &BackfillSummary) {
        self.found += other.found;
        self.updated += other.updated;
        self.skipped += other.skipped;
        self.rounds += other.rounds;
    }
}

/// Translate one batch of cards that have English text but lack `ru` or
/// `ukr`.
///
/// A failing translator does not fail the job: the error is logged and the
/// whole batch counts as skipped. Only `ru`/`ukr` are written.
pub async fn run_backfill<T>(
    store: &CardStore,
    translator: &T,
    batch_size: usize,
) -> Result<BackfillSummary, BackfillError>
where
    T: Translator + ?Sized,
{
    let cards = store.cards_missing_translations(batch_size)?;
    log::info!("Backfill: found {} cards without translations", cards.len());

    let mut summary = BackfillSummary {
        found: cards.len(),
        rounds: 1,
        ..Default::default()
    };
    if cards.is_empty() {
        return Ok(summary);
    }

    let items: Vec<(i64, String)> = cards
        .iter()
        .map(|card| (card.id, card.english.clone().unwrap_or_default()))
        .collect();

    let results = match translator.translate_batch(&items).await {
        Ok(results) => results,
        Err(e) => {
            log::error!("Backfill: translation batch failed: {}", e);
            HashMap::new()
        }
    };

    for card in &cards {
        let translation = match results.get(&card.id) {
            Some(t) if !t.is_empty() => t,
            _ => {
                log::warn!("Backfill: skip id={} en={:?}", card.id, card.english);
                summary.skipped += 1;
                continue;
            }
        };

        log::info!(
            "Backfill: card {} en={:?} ru={:?} ukr={:?}",
            card.id,
            card.english,
            translation.ru,
            translation.ukr
        );
        if store.update_translation(card.id, translation)? {
            summary.updated += 1;
        }
    }

    log::info!(
        "Backfill: batch done, updated {}/{}",
        summary.updated,
        summary.found
    );
    Ok(summary)
}

/// Run up to `max_rounds` batches, stopping once a batch finds no
/// candidates or updates nothing.
pub async fn run_backfill_rounds<T>(
    store: &CardStore,
    translator: &T,
    batch_size: usize,
    max_rounds: usize,
) -> Result<BackfillSummary, BackfillError>
where
    T: Translator + ?Sized,
{
    let mut total = BackfillSummary::default();
    for _ in 0..max_rounds {
        let round = run_backfill(store, translator, batch_size).await?;
        total.absorb(&round);
        if round.found == 0 || round.updated == 0 {
            break;
        }
    }
    Ok(total)
}
