//! Configuration management for Flamyngo.
//!
//! Settings are read once at startup, validated, and turned into an immutable
//! [`ConfigStore`]. Every compiler, resolver and suggester call receives the
//! relevant [`CollectionConfig`] by reference; nothing here is global.
//!
//! ## Example Settings File (flamyngo.toml)
//!
//! ```toml
//! [general]
//! autocomplete_limit = 1000
//! max_results = 0
//!
//! [[collections]]
//! name = "materials"
//! source = "materials.jsonl"
//! query = [
//!     ["task_id", "^mp-\\d+$", "str"],
//!     ["formula_pretty", "^[A-Z][a-z]?\\d*"],
//! ]
//! summary = ["task_id", ["formula_pretty", "str"], ["bandgap", "float"]]
//! autocomplete_keys = ["formula_pretty", "bandgap", "nelements"]
//! unique_key = "task_id"
//! unique_key_type = "str"
//!
//! [collections.aliases]
//! Formula = "formula_pretty"
//! "Band gap" = "bandgap"
//!
//! [collections.autocomplete_friendly_terms]
//! "direct gaps" = { "bandstructure.is_gap_direct" = true }
//! ```
//!
//! JSON settings with the same shape are accepted when the file name ends in
//! `.json`.

use crate::convert::Converter;
use crate::error::{FlamyngoError, Result};
use crate::types::Column;
use directories::ProjectDirs;
use regex::Regex;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// === Settings File Model ===

/// Raw settings as written in the settings file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// General settings
    pub general: GeneralSettings,

    /// One entry per browsable collection
    pub collections: Vec<CollectionSettings>,
}

/// General configuration options
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Maximum number of matching documents read for field-value autocomplete
    pub autocomplete_limit: usize,

    /// Maximum number of rows returned by a summary query (0 = unlimited)
    pub max_results: usize,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        GeneralSettings {
            autocomplete_limit: 1000,
            max_results: 0,
        }
    }
}

/// Settings for a single collection.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionSettings {
    /// Collection name, unique across the settings file
    pub name: String,

    /// Ordered search rules; the first matching rule wins
    #[serde(default)]
    pub query: Vec<RuleSpec>,

    /// Display name to internal field path
    #[serde(default, deserialize_with = "ordered_pairs")]
    pub aliases: Vec<(String, String)>,

    /// Literal search phrases expanding to pre-built criteria
    #[serde(default)]
    pub autocomplete_friendly_terms: Map<String, Value>,

    /// Field paths offered while typing a query object key
    #[serde(default)]
    pub autocomplete_keys: Vec<String>,

    /// Displayed columns
    #[serde(default)]
    pub summary: Vec<SummarySpec>,

    /// Field used to fetch a single document
    pub unique_key: String,

    /// Converter applied to identifiers before fetching
    #[serde(default)]
    pub unique_key_type: Option<String>,

    /// Document dump (JSON array or JSON Lines) served by the in-memory store
    #[serde(default)]
    pub source: Option<PathBuf>,
}

/// A query rule as written in settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RuleSpec {
    /// `[field, pattern, type]`, where `type` may be null
    Typed(String, String, Option<String>),
    /// `[field, pattern]`
    Untyped(String, String),
    /// `{ field = "...", pattern = "...", type = "..." }`
    Table {
        field: String,
        pattern: String,
        #[serde(default, rename = "type")]
        type_spec: Option<String>,
    },
}

impl RuleSpec {
    fn parts(&self) -> (&str, &str, Option<&str>) {
        match self {
            RuleSpec::Typed(field, pattern, spec) => (field, pattern, spec.as_deref()),
            RuleSpec::Untyped(field, pattern) => (field, pattern, None),
            RuleSpec::Table {
                field,
                pattern,
                type_spec,
            } => (field, pattern, type_spec.as_deref()),
        }
    }
}

/// A summary column as written in settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SummarySpec {
    /// `[field, type]`, where `type` may be null
    Typed(String, Option<String>),
    /// `"field"`
    Bare(String),
    /// `{ field = "...", type = "..." }`
    Table {
        field: String,
        #[serde(default, rename = "type")]
        type_spec: Option<String>,
    },
}

impl SummarySpec {
    fn parts(&self) -> (&str, Option<&str>) {
        match self {
            SummarySpec::Typed(field, spec) => (field, spec.as_deref()),
            SummarySpec::Bare(field) => (field, None),
            SummarySpec::Table { field, type_spec } => (field, type_spec.as_deref()),
        }
    }
}

/// Deserialize a map into ordered pairs, keeping duplicate keys so that
/// validation can reject them.
fn ordered_pairs<'de, D>(deserializer: D) -> std::result::Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct PairsVisitor;

    impl<'de> Visitor<'de> for PairsVisitor {
        type Value = Vec<(String, String)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of display names to field paths")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(pair) = map.next_entry::<String, String>()? {
                pairs.push(pair);
            }
            Ok(pairs)
        }
    }

    deserializer.deserialize_map(PairsVisitor)
}

impl Settings {
    /// Load settings from a specific path.
    ///
    /// Files ending in `.json` are parsed as JSON, everything else as TOML.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(FlamyngoError::config(format!(
                "settings file not found: {}",
                path.display()
            )));
        }

        info!(path = %path.display(), "Loading settings");
        let contents = fs::read_to_string(path)?;

        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&contents)
        } else {
            Self::from_toml(&contents)
        }
    }

    /// Parse settings from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| FlamyngoError::config(format!("Failed to parse settings: {}", e)))
    }

    /// Parse settings from JSON text.
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| FlamyngoError::config(format!("Failed to parse settings: {}", e)))
    }

    /// Get the default settings file path.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "flamyngo")
            .ok_or_else(|| FlamyngoError::config("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("flamyngo.toml"))
    }
}

// === Validated Configuration ===

/// A search rule: when the search text matches `pattern` (anchored at the
/// start), the query targets `field`.
#[derive(Debug, Clone)]
pub struct QueryRule {
    /// Field path the rule targets
    pub field: String,

    /// Converter applied to the search text
    pub converter: Option<Converter>,

    pattern: String,
    regex: Regex,
}

impl QueryRule {
    /// Compile a rule. Invalid patterns are configuration errors.
    pub fn new(
        field: impl Into<String>,
        pattern: impl Into<String>,
        converter: Option<Converter>,
    ) -> Result<Self> {
        let field = field.into();
        let pattern = pattern.into();
        let regex = Regex::new(&format!("^(?:{})", pattern)).map_err(|e| {
            FlamyngoError::config(format!(
                "invalid pattern for field '{}': {}: {}",
                field, pattern, e
            ))
        })?;

        Ok(QueryRule {
            field,
            converter,
            pattern,
            regex,
        })
    }

    /// The pattern as written in settings
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Check whether the search text selects this rule.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// A displayed column and its converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryField {
    pub field: String,
    pub converter: Option<Converter>,
}

/// Bidirectional display-name / field-path mapping.
///
/// Both directions are injective; construction fails otherwise.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    by_display: HashMap<String, String>,
    by_field: HashMap<String, String>,
}

impl AliasMap {
    /// Build the mapping from `(display name, field path)` pairs.
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let mut aliases = AliasMap::default();

        for (display, field) in pairs {
            if aliases.by_display.contains_key(&display) {
                return Err(FlamyngoError::config(format!(
                    "alias '{}' is declared more than once",
                    display
                )));
            }
            if let Some(existing) = aliases.by_field.get(&field) {
                return Err(FlamyngoError::config(format!(
                    "aliases '{}' and '{}' both map to field '{}'",
                    existing, display, field
                )));
            }
            aliases.by_field.insert(field.clone(), display.clone());
            aliases.by_display.insert(display, field);
        }

        Ok(aliases)
    }

    /// Map a display name to its field path; unknown names pass through.
    pub fn field_for<'a>(&'a self, name: &'a str) -> &'a str {
        self.by_display.get(name).map_or(name, String::as_str)
    }

    /// Map a field path to its display name; unaliased paths pass through.
    pub fn display_for<'a>(&'a self, field: &'a str) -> &'a str {
        self.by_field.get(field).map_or(field, String::as_str)
    }

    /// Number of aliases
    pub fn len(&self) -> usize {
        self.by_display.len()
    }

    /// True when no aliases are configured
    pub fn is_empty(&self) -> bool {
        self.by_display.is_empty()
    }
}

/// Validated, read-only configuration for one collection.
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    pub name: String,
    pub query_rules: Vec<QueryRule>,
    pub aliases: AliasMap,
    pub friendly_terms: Map<String, Value>,
    pub autocomplete_keys: Vec<String>,
    pub summary: Vec<SummaryField>,
    pub unique_key: String,
    pub unique_key_type: Option<Converter>,

    /// Document dump location, resolved against the settings directory
    pub source: Option<PathBuf>,
}

impl CollectionConfig {
    /// Validate collection settings.
    ///
    /// Relative `source` paths are resolved against `base_dir` when given.
    pub fn from_settings(settings: CollectionSettings, base_dir: Option<&Path>) -> Result<Self> {
        let name = settings.name.trim().to_string();
        if name.is_empty() {
            return Err(FlamyngoError::config("collection name must not be empty"));
        }

        let in_collection =
            |e: FlamyngoError| FlamyngoError::config(format!("collection '{}': {}", name, reason(e)));

        if settings.unique_key.trim().is_empty() {
            return Err(in_collection(FlamyngoError::config(
                "unique_key must not be empty",
            )));
        }

        let query_rules = settings
            .query
            .iter()
            .map(|rule| {
                let (field, pattern, spec) = rule.parts();
                QueryRule::new(field, pattern, Converter::from_spec(spec)?)
            })
            .collect::<Result<Vec<_>>>()
            .map_err(in_collection)?;

        let summary = settings
            .summary
            .iter()
            .map(|column| {
                let (field, spec) = column.parts();
                Ok(SummaryField {
                    field: field.to_string(),
                    converter: Converter::from_spec(spec)?,
                })
            })
            .collect::<Result<Vec<_>>>()
            .map_err(in_collection)?;

        let aliases = AliasMap::new(settings.aliases).map_err(in_collection)?;
        let unique_key_type =
            Converter::from_spec(settings.unique_key_type.as_deref()).map_err(in_collection)?;

        let mut seen = HashSet::new();
        let autocomplete_keys = settings
            .autocomplete_keys
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .collect();

        let source = settings.source.map(|path| match base_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path,
        });

        debug!(
            collection = %name,
            rules = query_rules.len(),
            aliases = aliases.len(),
            friendly_terms = settings.autocomplete_friendly_terms.len(),
            "Collection configured"
        );

        Ok(CollectionConfig {
            name,
            query_rules,
            aliases,
            friendly_terms: settings.autocomplete_friendly_terms,
            autocomplete_keys,
            summary,
            unique_key: settings.unique_key,
            unique_key_type,
            source,
        })
    }

    /// The first rule whose pattern matches `text`.
    pub fn matching_rule(&self, text: &str) -> Option<&QueryRule> {
        self.query_rules.iter().find(|rule| rule.is_match(text))
    }

    /// Field paths fetched by a summary query.
    pub fn projection(&self) -> Vec<String> {
        self.summary.iter().map(|s| s.field.clone()).collect()
    }

    /// Displayed columns in summary order.
    pub fn columns(&self) -> Vec<Column> {
        self.summary
            .iter()
            .map(|s| Column {
                field: s.field.clone(),
                name: self.aliases.display_for(&s.field).to_string(),
            })
            .collect()
    }
}

fn reason(err: FlamyngoError) -> String {
    match err {
        FlamyngoError::ConfigError { reason } => reason,
        other => other.to_string(),
    }
}

/// Immutable, process-wide configuration: one [`CollectionConfig`] per
/// collection, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    general: GeneralSettings,
    collections: Vec<CollectionConfig>,
    by_name: HashMap<String, usize>,
}

impl ConfigStore {
    /// Load and validate settings from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&Settings::default_path()?)
    }

    /// Load and validate settings from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = Settings::load_from(path)?;
        Self::from_settings(settings, path.parent())
    }

    /// Validate settings into a store.
    pub fn from_settings(settings: Settings, base_dir: Option<&Path>) -> Result<Self> {
        let mut collections = Vec::with_capacity(settings.collections.len());
        let mut by_name = HashMap::with_capacity(settings.collections.len());

        for collection in settings.collections {
            let config = CollectionConfig::from_settings(collection, base_dir)?;
            if by_name.contains_key(&config.name) {
                return Err(FlamyngoError::config(format!(
                    "collection '{}' is declared more than once",
                    config.name
                )));
            }
            by_name.insert(config.name.clone(), collections.len());
            collections.push(config);
        }

        info!(collections = collections.len(), "Configuration loaded");

        Ok(ConfigStore {
            general: settings.general,
            collections,
            by_name,
        })
    }

    /// General settings
    pub fn general(&self) -> &GeneralSettings {
        &self.general
    }

    /// Look up a collection, failing with `UnknownCollection`.
    pub fn get(&self, name: &str) -> Result<&CollectionConfig> {
        self.collection(name)
            .ok_or_else(|| FlamyngoError::UnknownCollection {
                name: name.to_string(),
            })
    }

    /// Look up a collection by name.
    pub fn collection(&self, name: &str) -> Option<&CollectionConfig> {
        self.by_name.get(name).map(|&i| &self.collections[i])
    }

    /// All collections in declaration order
    pub fn collections(&self) -> &[CollectionConfig] {
        &self.collections
    }

    /// Collection names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.collections.iter().map(|c| c.name.as_str())
    }

    /// Number of configured collections
    pub fn len(&self) -> usize {
        self.collections.len()
    }

    /// True when no collections are configured
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
