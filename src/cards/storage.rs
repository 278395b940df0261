//! SQLite-backed card store
//!
//! One table, `cards`. The store is opened explicitly and handed to whoever
//! needs it (import pipeline, HTTP server, backfill job); nothing here keeps
//! a global connection.

use std::path::Path;

use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension, Params, Row, Transaction};
use thiserror::Error;

use super::models::{Card, ListParams, NewCard, Translation};

#[derive(Error, Debug)]
pub enum CardStoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CardStoreError>;

/// Number of cards flushed into the replace transaction at a time
pub const IMPORT_BATCH_SIZE: usize = 1000;

const CARD_COLUMNS: &str =
    "id, rank, word, pos, definition, dutch, english, ru, ukr, freq, audio";

/// Columns added after the first release; older databases lack them
const TRANSLATION_COLUMNS: &[&str] = &["ru", "ukr"];

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    Ok(Card {
        id: row.get("id")?,
        rank: row.get("rank")?,
        word: row.get("word")?,
        pos: row.get("pos")?,
        definition: row.get("definition")?,
        dutch: row.get("dutch")?,
        english: row.get("english")?,
        ru: row.get("ru")?,
        ukr: row.get("ukr")?,
        freq: row.get("freq")?,
        audio: row.get("audio")?,
    })
}

/// Escape `%`, `_` and `\` so a user query matches literally inside LIKE
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Store handle for the `cards` table.
pub struct CardStore {
    conn: Connection,
    /// Columns added when this handle was opened
    added_columns: Vec<String>,
}

impl CardStore {
    /// Open (or create) the card database at `db_path`.
    ///
    /// The table is created when missing and the translation columns are
    /// added to databases that predate them.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(db_path)?;
        // Readers keep their snapshot while an import holds the write lock
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("Card store: journal mode {}", mode);
        Self::from_connection(conn)
    }

    /// In-memory store, mostly useful for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let mut store = Self {
            conn,
            added_columns: Vec::new(),
        };
        store.added_columns = store.migrate()?;
        Ok(store)
    }

    /// Columns the schema check added when this store was opened
    pub fn added_columns(&self) -> &[String] {
        &self.added_columns
    }

    /// Create the table if needed and add any missing translation columns.
    ///
    /// Safe to run repeatedly. Returns the columns that were added.
    pub fn migrate(&self) -> Result<Vec<String>> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                rank TEXT,
                word TEXT,
                pos TEXT,
                definition TEXT,
                dutch TEXT,
                english TEXT,
                ru TEXT,
                ukr TEXT,
                freq REAL,
                audio TEXT
            );

            CREATE INDEX IF NOT EXISTS ix_cards_word ON cards(word);
            CREATE INDEX IF NOT EXISTS ix_cards_audio ON cards(audio);
            "#,
        )?;

        let existing = self.column_names()?;
        let mut added = Vec::new();
        for column in TRANSLATION_COLUMNS {
            if !existing.iter().any(|c| c == column) {
                self.conn
                    .execute(&format!("ALTER TABLE cards ADD COLUMN {} TEXT", column), [])?;
                log::info!("Card store: added column {}", column);
                added.push(column.to_string());
            }
        }

        Ok(added)
    }

    fn column_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("PRAGMA table_info(cards)")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    // ==================== Queries ====================

    /// Fetch a single card by id
    pub fn get_card(&self, id: i64) -> Result<Option<Card>> {
        let card = self
            .conn
            .query_row(
                &format!("SELECT {} FROM cards WHERE id = ?1", CARD_COLUMNS),
                params![id],
                card_from_row,
            )
            .optional()?;
        Ok(card)
    }

    /// List cards ordered by id, optionally filtered by a case-insensitive
    /// substring match on word, dutch, english or definition.
    pub fn list_cards(&self, params: &ListParams) -> Result<Vec<Card>> {
        let params = params.clone().clamped();

        match params.query.as_deref() {
            Some(query) => {
                let pattern = format!("%{}%", escape_like(query));
                self.query_cards(
                    &format!(
                        "SELECT {} FROM cards
                         WHERE word LIKE ?1 ESCAPE '\\'
                            OR dutch LIKE ?1 ESCAPE '\\'
                            OR english LIKE ?1 ESCAPE '\\'
                            OR definition LIKE ?1 ESCAPE '\\'
                         ORDER BY id LIMIT ?2 OFFSET ?3",
                        CARD_COLUMNS
                    ),
                    params![pattern, params.limit, params.offset],
                )
            }
            None => self.query_cards(
                &format!(
                    "SELECT {} FROM cards ORDER BY id LIMIT ?1 OFFSET ?2",
                    CARD_COLUMNS
                ),
                params![params.limit, params.offset],
            ),
        }
    }

    fn query_cards<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare(sql)?;
        let cards = stmt
            .query_map(params, card_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    /// Total number of cards
    pub fn count_cards(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Pick a card uniformly at random, `None` when the store is empty
    pub fn random_card(&self) -> Result<Option<Card>> {
        // Count and pick from the same snapshot
        let tx = self.conn.unchecked_transaction()?;
        let count: i64 = tx.query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
        if count == 0 {
            return Ok(None);
        }

        let offset = rand::thread_rng().gen_range(0..count);
        let card = tx
            .query_row(
                &format!(
                    "SELECT {} FROM cards ORDER BY id LIMIT 1 OFFSET ?1",
                    CARD_COLUMNS
                ),
                params![offset],
                card_from_row,
            )
            .optional()?;
        tx.commit()?;
        Ok(card)
    }

    // ==================== Bulk replace ====================

    /// Start replacing the whole table.
    ///
    /// Existing rows are deleted inside the returned transaction. Nothing is
    /// visible to other connections until [`CardReplace::commit`]; dropping
    /// the handle rolls everything back.
    pub fn begin_replace(&mut self) -> Result<CardReplace<'_>> {
        let tx = self.conn.transaction()?;
        let deleted = tx.execute("DELETE FROM cards", [])?;
        log::debug!("Card store: cleared {} existing cards", deleted);
        Ok(CardReplace {
            tx,
            pending: Vec::with_capacity(IMPORT_BATCH_SIZE),
            inserted: 0,
        })
    }

    /// Replace all cards with `cards` in one transaction
    pub fn replace_all<I>(&mut self, cards: I) -> Result<usize>
    where
        I: IntoIterator<Item = NewCard>,
    {
        let mut replace = self.begin_replace()?;
        for card in cards {
            replace.push(card)?;
        }
        replace.commit()
    }

    // ==================== Translations ====================

    /// Cards with English text but a missing Russian or Ukrainian translation
    pub fn cards_missing_translations(&self, limit: usize) -> Result<Vec<Card>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM cards
             WHERE english IS NOT NULL AND (ru IS NULL OR ukr IS NULL)
             ORDER BY id LIMIT ?1",
            CARD_COLUMNS
        ))?;
        let cards = stmt
            .query_map(params![limit as i64], card_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(cards)
    }

    /// Write the present parts of `translation` onto card `id`.
    ///
    /// Only `ru` and `ukr` are ever touched. Returns whether a row changed.
    pub fn update_translation(&self, id: i64, translation: &Translation) -> Result<bool> {
        if translation.is_empty() {
            return Ok(false);
        }

        let changed = self.conn.execute(
            "UPDATE cards SET ru = COALESCE(?1, ru), ukr = COALESCE(?2, ukr) WHERE id = ?3",
            params![translation.ru, translation.ukr, id],
        )?;
        Ok(changed > 0)
    }
}

/// An in-progress full-table replace.
///
/// Cards are buffered and written in batches of [`IMPORT_BATCH_SIZE`]; the
/// whole replace commits once.
pub struct CardReplace<'a> {
    tx: Transaction<'a>,
    pending: Vec<NewCard>,
    inserted: usize,
}

impl CardReplace<'_> {
    /// Queue a card, flushing the batch when it is full
    pub fn push(&mut self, card: NewCard) -> Result<()> {
        self.pending.push(card);
        if self.pending.len() >= IMPORT_BATCH_SIZE {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO cards (rank, word, pos, definition, dutch, english, freq, audio)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for card in self.pending.drain(..) {
            stmt.execute(params![
                card.rank,
                card.word,
                card.pos,
                card.definition,
                card.dutch,
                card.english,
                card.freq,
                card.audio,
            ])?;
            self.inserted += 1;
        }
        log::debug!("Card store: {} cards written so far", self.inserted);
        Ok(())
    }

    /// Flush the final partial batch and commit. Returns the number of cards
    /// inserted.
    pub fn commit(mut self) -> Result<usize> {
        self.flush()?;
        let inserted = self.inserted;
        self.tx.commit()?;
        Ok(inserted)
    }
}
