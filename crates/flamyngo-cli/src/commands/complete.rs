//! Complete command - autocomplete a partial search string.

use super::report;
use crate::app::App;
use crate::OutputFormat;

/// Run the complete command.
pub fn run(app: &App, collection: &str, partial: &str, output: OutputFormat) -> anyhow::Result<()> {
    let Some(suggestions) = report(app.browser.autocomplete(collection, partial))? else {
        return Ok(());
    };

    match output {
        OutputFormat::Text => {
            for suggestion in &suggestions {
                println!("{}", suggestion);
            }
        }
        OutputFormat::Json => {
            let body = serde_json::json!({ "matching_results": suggestions });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}
