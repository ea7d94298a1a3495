//! Query command - run a summary query.

use super::report;
use crate::app::App;
use crate::OutputFormat;
use std::time::Instant;

/// Run the query command.
pub fn run(
    app: &App,
    collection: &str,
    search: &str,
    limit: usize,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let Some(results) = report(app.browser.query(collection, search))? else {
        return Ok(());
    };
    let elapsed = start.elapsed();

    match output {
        OutputFormat::Text => {
            if results.is_empty() {
                eprintln!("No results!");
                return Ok(());
            }

            let header: Vec<&str> = results.columns.iter().map(|c| c.name.as_str()).collect();
            println!("{}", header.join("\t"));

            for row in results.rows.iter().take(limit) {
                println!("{}", row.rendered().join("\t"));
            }

            eprintln!();
            eprintln!(
                "Showing {} of {} results in {:.3}ms",
                results.len().min(limit),
                results.len(),
                elapsed.as_secs_f64() * 1000.0
            );
        }
        OutputFormat::Json => {
            let rows: Vec<_> = results.to_json_rows().into_iter().take(limit).collect();
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    Ok(())
}
