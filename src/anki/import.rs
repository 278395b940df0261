//! Anki deck import implementation
//!
//! Converts an `.apkg` export into cards and extracts the deck's mp3 files.
//!
//! An `.apkg` is a ZIP archive holding:
//! - `collection.anki21` or `collection.anki2`, a SQLite database with a
//!   `notes` table (`id`, `flds`)
//! - `media`, a JSON object mapping numeric entry names to real filenames
//! - the media blobs themselves, stored under those numeric names

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};

use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

use super::fields::{NoteField, NoteFields};
use crate::cards::{CardStore, CardStoreError};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] ZipError),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Card store error: {0}")]
    Store(#[from] CardStoreError),

    #[error("Invalid deck: neither collection.anki21 nor collection.anki2 found")]
    MissingCollection,

    #[error("Invalid media manifest: {0}")]
    Manifest(serde_json::Error),

    #[error("Note {note_id} has {found} fields, expected {expected}")]
    FieldCount {
        note_id: i64,
        found: usize,
        expected: usize,
    },
}

pub type Result<T> = std::result::Result<T, ImportError>;

/// Which embedded collection file a deck provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionFormat {
    /// `collection.anki21`, written by Anki 2.1
    Anki21,
    /// `collection.anki2`, the legacy format
    Anki2,
}

impl CollectionFormat {
    /// Formats in order of preference
    const PREFERENCE: [CollectionFormat; 2] = [CollectionFormat::Anki21, CollectionFormat::Anki2];

    pub fn file_name(self) -> &'static str {
        match self {
            CollectionFormat::Anki21 => "collection.anki21",
            CollectionFormat::Anki2 => "collection.anki2",
        }
    }
}

/// Name of the media manifest entry
const MEDIA_MANIFEST: &str = "media";

/// Import behaviour switches
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Fail on any note whose field count differs from the deck schema
    /// instead of padding short rows
    pub strict_fields: bool,
    /// Where the collection is unpacked while it is read; the system temp
    /// directory when unset
    pub temp_dir: Option<PathBuf>,
}

/// Outcome of a deck import
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub collection: CollectionFormat,
    /// Notes read from the deck (one card each)
    pub notes: usize,
    /// Notes that had fewer fields than expected and were padded
    pub padded_notes: usize,
    /// mp3 files newly written to the media directory
    pub extracted_media: usize,
    /// mp3 files left alone because they already existed
    pub skipped_media: usize,
    /// Manifest entries whose blob is absent from the archive
    pub missing_media: usize,
    /// Manifest filenames refused because they are not a plain file name
    pub rejected_media: usize,
}

/// What an import would do, without touching the store or media directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckPreview {
    pub collection: CollectionFormat,
    pub note_count: usize,
    /// mp3 entries listed in the media manifest
    pub audio_count: usize,
}

#[derive(Debug, Default)]
struct MediaSummary {
    extracted: usize,
    skipped: usize,
    missing: usize,
    rejected: usize,
}

fn open_deck(apkg_path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(apkg_path)?;
    Ok(ZipArchive::new(file)?)
}

/// Pick the newest collection format present in the archive
fn select_collection<R: Read + io::Seek>(archive: &ZipArchive<R>) -> Result<CollectionFormat> {
    CollectionFormat::PREFERENCE
        .into_iter()
        .find(|format| archive.index_for_name(format.file_name()).is_some())
        .ok_or(ImportError::MissingCollection)
}

/// Copy the embedded collection to a temporary file so SQLite can open it
fn materialize_collection<R: Read + io::Seek>(
    archive: &mut ZipArchive<R>,
    format: CollectionFormat,
    temp_dir: Option<&Path>,
) -> Result<NamedTempFile> {
    let mut entry = archive.by_name(format.file_name())?;
    let mut builder = tempfile::Builder::new();
    builder.prefix("collection-").suffix(".sqlite");
    let mut temp = match temp_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };
    io::copy(&mut entry, temp.as_file_mut())?;
    temp.as_file_mut().flush()?;
    Ok(temp)
}

/// Read the media manifest. A deck without one simply has no media.
fn read_manifest<R: Read + io::Seek>(archive: &mut ZipArchive<R>) -> Result<BTreeMap<String, String>> {
    let mut entry = match archive.by_name(MEDIA_MANIFEST) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };

    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes)?;
    serde_json::from_slice(&bytes).map_err(ImportError::Manifest)
}

/// Remove the temporary collection; failure only gets logged
fn discard_collection(temp: NamedTempFile) {
    let path = temp.path().to_path_buf();
    if let Err(e) = temp.close() {
        log::warn!("Could not remove temporary collection {:?}: {}", path, e);
    }
}

fn open_collection(path: &Path) -> Result<Connection> {
    Ok(Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?)
}

fn is_mp3(filename: &str) -> bool {
    filename.to_lowercase().ends_with(".mp3")
}

/// A media filename must be a single plain path component
fn is_plain_file_name(filename: &str) -> bool {
    if filename.contains('\\') {
        return false;
    }
    let mut components = Path::new(filename).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Stream every note into a full replace of the card table.
///
/// Returns `(notes, padded_notes)`. Any error rolls the replace back.
fn import_notes(collection_path: &Path, store: &mut CardStore, options: &ImportOptions) -> Result<(usize, usize)> {
    let conn = open_collection(collection_path)?;
    let mut stmt = conn.prepare("SELECT id, flds FROM notes ORDER BY id")?;
    let mut rows = stmt.query([])?;

    let mut replace = store.begin_replace()?;
    let mut notes = 0;
    let mut padded = 0;

    while let Some(row) = rows.next()? {
        let note_id: i64 = row.get(0)?;
        let flds: Option<String> = row.get(1)?;
        let fields = NoteFields::parse(flds.as_deref().unwrap_or_default());

        if fields.found() != NoteField::COUNT {
            if options.strict_fields {
                return Err(ImportError::FieldCount {
                    note_id,
                    found: fields.found(),
                    expected: NoteField::COUNT,
                });
            }
            if fields.was_padded() {
                log::debug!(
                    "Note {} has {} fields, padding to {}",
                    note_id,
                    fields.found(),
                    NoteField::COUNT
                );
                padded += 1;
            }
        }

        replace.push(fields.to_card())?;
        notes += 1;
    }

    let inserted = replace.commit()?;
    log::info!("Imported {} cards", inserted);
    Ok((notes, padded))
}

/// Write every mp3 listed in the manifest into `media_dir`, never
/// overwriting a file that is already there.
fn extract_media<R: Read + io::Seek>(
    archive: &mut ZipArchive<R>,
    manifest: &BTreeMap<String, String>,
    media_dir: &Path,
) -> Result<MediaSummary> {
    fs::create_dir_all(media_dir)?;
    let mut summary = MediaSummary::default();

    for (key, filename) in manifest {
        if !is_mp3(filename) {
            continue;
        }

        if !is_plain_file_name(filename) {
            log::warn!("Skipping media entry {} with unsafe name {:?}", key, filename);
            summary.rejected += 1;
            continue;
        }

        let Some(index) = archive.index_for_name(key) else {
            log::debug!("Media entry {} ({}) missing from archive", key, filename);
            summary.missing += 1;
            continue;
        };

        let out_path = media_dir.join(filename);
        let mut out_file = match OpenOptions::new().write(true).create_new(true).open(&out_path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                summary.skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let mut entry = archive.by_index(index)?;
        if let Err(e) = io::copy(&mut entry, &mut out_file) {
            drop(out_file);
            let _ = fs::remove_file(&out_path);
            return Err(e.into());
        }
        summary.extracted += 1;
    }

    Ok(summary)
}

/// Import a deck, replacing every card in `store` and extracting audio into
/// `media_dir`.
///
/// The card replace is all-or-nothing: if reading the deck fails part way,
/// the previous cards stay in place. Media extraction runs after the cards
/// are committed and is safe to repeat.
pub fn import_deck(
    apkg_path: &Path,
    store: &mut CardStore,
    media_dir: &Path,
    options: &ImportOptions,
) -> Result<ImportSummary> {
    let mut archive = open_deck(apkg_path)?;
    let collection = select_collection(&archive)?;
    log::info!("Importing {:?} using {}", apkg_path, collection.file_name());

    let manifest = read_manifest(&mut archive)?;
    let temp = materialize_collection(&mut archive, collection, options.temp_dir.as_deref())?;

    let imported = import_notes(temp.path(), store, options);
    discard_collection(temp);
    let (notes, padded_notes) = imported?;

    let media = extract_media(&mut archive, &manifest, media_dir)?;
    log::info!(
        "Extracted {} mp3 files into {:?} ({} already present, {} missing)",
        media.extracted,
        media_dir,
        media.skipped,
        media.missing
    );

    Ok(ImportSummary {
        collection,
        notes,
        padded_notes,
        extracted_media: media.extracted,
        skipped_media: media.skipped,
        missing_media: media.missing,
        rejected_media: media.rejected,
    })
}

/// Inspect a deck without importing it
pub fn preview_deck(apkg_path: &Path) -> Result<DeckPreview> {
    let mut archive = open_deck(apkg_path)?;
    let collection = select_collection(&archive)?;
    let manifest = read_manifest(&mut archive)?;
    let temp = materialize_collection(&mut archive, collection, None)?;

    let counted = open_collection(temp.path()).and_then(|conn| {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM notes", [], |row| row.get(0))?;
        Ok(count)
    });
    discard_collection(temp);

    Ok(DeckPreview {
        collection,
        note_count: counted? as usize,
        audio_count: manifest.values().filter(|name| is_mp3(name)).count(),
    })
}
