//! Dump command - print every document in a collection.

use super::report;
use crate::app::App;

/// Run the dump command.
pub fn run(app: &App, collection: &str) -> anyhow::Result<()> {
    if let Some(documents) = report(app.browser.all_documents(collection))? {
        println!("{}", serde_json::to_string_pretty(&documents)?);
    }

    Ok(())
}
