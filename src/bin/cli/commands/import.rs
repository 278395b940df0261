use std::path::Path;

use anyhow::{Context, Result};

use dutchcards_lib::anki::{import_deck, preview_deck, ImportOptions};

use crate::app::App;
use crate::OutputFormat;

pub fn run(
    app: &App,
    apkg: &Path,
    db: Option<&Path>,
    media_dir: Option<&Path>,
    dry_run: bool,
    strict_fields: bool,
    format: &OutputFormat,
) -> Result<()> {
    if dry_run {
        let preview = preview_deck(apkg).with_context(|| format!("Failed to read deck {:?}", apkg))?;
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&preview)?),
            OutputFormat::Plain => {
                println!("Deck {:?}", apkg);
                println!("  collection: {}", preview.collection.file_name());
                println!("  notes:      {}", preview.note_count);
                println!("  mp3 files:  {}", preview.audio_count);
            }
        }
        return Ok(());
    }

    let db_path = match db {
        Some(path) => path.to_path_buf(),
        None => app.database_path()?,
    };
    let media_dir = media_dir.unwrap_or(&app.config.media_dir);

    let mut store = App::open_store_at(&db_path)?;
    let options = ImportOptions {
        strict_fields,
        ..Default::default()
    };
    let summary = import_deck(apkg, &mut store, media_dir, &options)
        .with_context(|| format!("Failed to import deck {:?}", apkg))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Plain => {
            println!("Imported {} notes into {:?}", summary.notes, db_path);
            println!("Extracted {} mp3 files into {:?}", summary.extracted_media, media_dir);
            if summary.skipped_media > 0 {
                println!("  {} mp3 files already present", summary.skipped_media);
            }
            if summary.missing_media > 0 {
                println!("  {} mp3 files listed but missing from the deck", summary.missing_media);
            }
            if summary.rejected_media > 0 {
                println!("  {} mp3 files refused (unsafe names)", summary.rejected_media);
            }
            if summary.padded_notes > 0 {
                println!("  {} notes had missing fields", summary.padded_notes);
            }
        }
    }

    Ok(())
}
