//! Plot command - extract (x, y) pairs as JSON.

use super::report;
use crate::app::App;

/// Run the plot command.
pub fn run(app: &App, collection: &str, search: &str, x: &str, y: &str) -> anyhow::Result<()> {
    if let Some(points) = report(app.browser.plot_data(collection, search, x, y))? {
        let pairs: Vec<[serde_json::Value; 2]> = points.into_iter().map(|(x, y)| [x, y]).collect();
        println!("{}", serde_json::to_string(&pairs)?);
    }

    Ok(())
}
