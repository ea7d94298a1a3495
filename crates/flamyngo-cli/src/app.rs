//! Application state management.

use anyhow::Context;
use flamyngo_core::{Browser, ConfigStore, MemoryStore};
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state.
pub struct App {
    /// Validated configuration
    pub config: Arc<ConfigStore>,

    /// Documents loaded from each collection's `source`
    pub store: Arc<MemoryStore>,

    /// Request entry point over `config` and `store`
    pub browser: Browser,
}

impl App {
    /// Create a new application instance, loading every configured source.
    pub fn new(config: ConfigStore) -> anyhow::Result<Self> {
        let store = Arc::new(MemoryStore::new());

        for collection in config.collections() {
            match &collection.source {
                Some(path) => {
                    store.load_file(&collection.name, path).with_context(|| {
                        format!(
                            "failed to load collection '{}' from {}",
                            collection.name,
                            path.display()
                        )
                    })?;
                }
                None => warn!(collection = %collection.name, "No source configured"),
            }
        }

        let config = Arc::new(config);
        let browser = Browser::new(config.clone(), store.clone());

        info!(collections = config.len(), "Application initialized");

        Ok(App {
            config,
            store,
            browser,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_loads_sources_relative_to_settings() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("people.jsonl"),
            "{\"_id\": 1, \"name\": \"Ada\"}\n{\"_id\": 2, \"name\": \"Alan\"}\n",
        )
        .unwrap();
        let settings_path = temp_dir.path().join("flamyngo.toml");
        fs::write(
            &settings_path,
            r#"
[[collections]]
name = "people"
source = "people.jsonl"
query = [["name", "[A-Z]"]]
summary = ["name"]
unique_key = "_id"
unique_key_type = "int"
"#,
        )
        .unwrap();

        let app = App::new(ConfigStore::load_from(&settings_path).unwrap()).unwrap();
        assert_eq!(app.store.len("people"), 2);

        let results = app.browser.query("people", "Ad").unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_missing_source_fails() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().join("flamyngo.json");
        fs::write(
            &settings_path,
            r#"{"collections": [{"name": "people", "source": "gone.json", "unique_key": "_id"}]}"#,
        )
        .unwrap();

        let config = ConfigStore::load_from(&settings_path).unwrap();
        assert!(App::new(config).is_err());
    }
}
