use anyhow::{Context, Result};

use dutchcards_lib::translation::{run_backfill_rounds, OpenAiTranslator};

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, rounds: usize, batch_size: Option<usize>, format: &OutputFormat) -> Result<()> {
    let translator = OpenAiTranslator::new(&app.config.translator)
        .context("Failed to set up the translation client")?;
    let batch_size = batch_size.unwrap_or(app.config.translator.batch_size).max(1);
    let store = app.open_store()?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let summary = runtime
        .block_on(run_backfill_rounds(&store, &translator, batch_size, rounds))
        .context("Backfill failed")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Plain => {
            println!(
                "Backfill: {} candidates, {} updated, {} skipped in {} batch(es)",
                summary.found, summary.updated, summary.skipped, summary.rounds
            );
        }
    }

    Ok(())
}
