use anyhow::{bail, Result};

use dutchcards_lib::cards::{Card, CardOut};

use crate::app::App;
use crate::render::terminal;
use crate::OutputFormat;

pub fn run(app: &App, id: i64, format: &OutputFormat, use_color: bool) -> Result<()> {
    let store = app.open_store()?;
    match store.get_card(id)? {
        Some(card) => print_card(card, format, use_color),
        None => bail!("Card not found: {}", id),
    }
}

pub fn run_random(app: &App, format: &OutputFormat, use_color: bool) -> Result<()> {
    let store = app.open_store()?;
    match store.random_card()? {
        Some(card) => print_card(card, format, use_color),
        None => bail!("No cards in database"),
    }
}

fn print_card(card: Card, format: &OutputFormat, use_color: bool) -> Result<()> {
    let card = CardOut::from(card);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&card)?),
        OutputFormat::Plain => println!("{}", terminal::render_card(&card, use_color)),
    }
    Ok(())
}
