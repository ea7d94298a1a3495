//! Check command - validate settings and summarize each collection.

use flamyngo_core::ConfigStore;

/// Run the check command.
///
/// Reaching this point means the settings already passed validation.
pub fn run(config: &ConfigStore) -> anyhow::Result<()> {
    println!("Flamyngo Settings");
    println!("=================");
    println!();

    if config.is_empty() {
        println!("No collections configured.");
        return Ok(());
    }

    let general = config.general();
    println!("General:");
    println!("  Autocomplete limit:      {}", general.autocomplete_limit);
    match general.max_results {
        0 => println!("  Max results:             unlimited"),
        n => println!("  Max results:             {}", n),
    }

    for collection in config.collections() {
        println!();
        println!("Collection {}:", collection.name);

        let unique_type = collection
            .unique_key_type
            .map_or_else(|| "inferred".to_string(), |c| c.to_string());
        println!("  Unique key:     {} ({})", collection.unique_key, unique_type);
        println!("  Aliases:        {}", collection.aliases.len());
        println!("  Friendly terms: {}", collection.friendly_terms.len());
        println!("  Autocomplete:   {} keys", collection.autocomplete_keys.len());

        if let Some(ref source) = collection.source {
            println!("  Source:         {}", source.display());
        }

        println!("  Query rules:");
        for (i, rule) in collection.query_rules.iter().enumerate() {
            let converter = rule.converter.map_or("-", |c| c.name());
            println!("    {}. {} ~ /{}/ [{}]", i + 1, rule.field, rule.pattern(), converter);
        }

        println!("  Summary:");
        for column in collection.columns() {
            if column.name == column.field {
                println!("    {}", column.field);
            } else {
                println!("    {} ({})", column.name, column.field);
            }
        }
    }

    Ok(())
}
