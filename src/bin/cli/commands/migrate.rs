use anyhow::Result;

use crate::app::App;
use crate::OutputFormat;

pub fn run(app: &App, format: &OutputFormat) -> Result<()> {
    // Opening the store runs the schema check
    let store = app.open_store()?;
    let added = store.added_columns();

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "added": added }));
        }
        OutputFormat::Plain => {
            if added.is_empty() {
                println!("Schema is up to date (ru, ukr present)");
            } else {
                println!("Added columns: {}", added.join(", "));
            }
        }
    }

    Ok(())
}
