//! Collections command - list configured collections.

use crate::app::App;

/// Run the collections command.
pub fn run(app: &App) -> anyhow::Result<()> {
    for name in app.config.names() {
        println!("{}\t{} documents", name, app.store.len(name));
    }

    Ok(())
}
