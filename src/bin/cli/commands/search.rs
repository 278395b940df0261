use anyhow::Result;

use dutchcards_lib::cards::{CardOut, ListParams};

use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

pub fn run(
    app: &App,
    query: Option<String>,
    limit: i64,
    offset: i64,
    format: &OutputFormat,
    use_color: bool,
) -> Result<()> {
    let store = app.open_store()?;
    let params = ListParams::new(query, limit, offset);
    let cards: Vec<CardOut> = store
        .list_cards(&params)?
        .into_iter()
        .map(CardOut::from)
        .collect();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&cards)?);
        }
        OutputFormat::Plain => {
            if cards.is_empty() {
                match &params.query {
                    Some(q) => println!("No cards match '{}'.", q),
                    None => println!("No cards."),
                }
                return Ok(());
            }
            println!("{}", terminal::render_card_table(&cards, use_color));
            let total = store.count_cards()?;
            println!("\n{} of {} cards (offset {})", cards.len(), total, params.offset);
        }
    }

    Ok(())
}
