//! Doc command - fetch one document by unique key.

use super::report;
use crate::app::App;

/// Run the doc command.
pub fn run(app: &App, collection: &str, uid: &str) -> anyhow::Result<()> {
    match report(app.browser.fetch_document(collection, uid))? {
        Some(Some(document)) => println!("{}", serde_json::to_string_pretty(&document)?),
        Some(None) => eprintln!("No document with {} = {}", unique_key(app, collection), uid),
        None => {}
    }

    Ok(())
}

fn unique_key<'a>(app: &'a App, collection: &str) -> &'a str {
    app.config
        .collection(collection)
        .map_or("unique key", |c| c.unique_key.as_str())
}
