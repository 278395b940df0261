//! Vocabulary cards for the flashcard API
//!
//! This module provides:
//! - The card data model and its outgoing JSON shape
//! - The SQLite card store (list, search, random pick, fetch by id)
//! - Atomic full-table replace used by deck imports
//! - In-place translation updates used by the backfill job

pub mod models;
pub mod storage;

pub use models::*;
pub use storage::{CardReplace, CardStore, CardStoreError, IMPORT_BATCH_SIZE};
