//! # Flamyngo Core Library
//!
//! This crate turns free-text search strings into structured document-database
//! queries using per-collection configuration, and formats the documents that
//! come back. All database access goes through the [`DocumentStore`] trait.
//!
//! ## Architecture
//!
//! - **Config** (`config`): Settings loading and the immutable `ConfigStore`
//! - **Convert** (`convert`): Static converter registry and numeric inference
//! - **Resolve** (`resolve`): Dotted field-path extraction from documents
//! - **Compile** (`compile`): Search string to criteria translation
//! - **Suggest** (`suggest`): Autocomplete for partial search strings
//! - **Backend** (`backend`): Interface to the document database
//! - **Store** (`store`): In-memory `DocumentStore` implementation
//! - **Browser** (`browser`): Query, autocomplete and fetch requests
//!
//! ## Example
//!
//! ```rust,ignore
//! use flamyngo_core::{Browser, ConfigStore, MemoryStore};
//! use std::sync::Arc;
//!
//! let config = Arc::new(ConfigStore::load_from("flamyngo.toml".as_ref())?);
//! let store = Arc::new(MemoryStore::new());
//! let browser = Browser::new(config, store);
//!
//! for row in browser.query("materials", "MoS2")?.rows {
//!     println!("{:?}", row.rendered());
//! }
//! ```

pub mod backend;
pub mod browser;
pub mod compile;
pub mod config;
pub mod convert;
pub mod error;
pub mod resolve;
pub mod store;
pub mod suggest;
pub mod types;

// Re-export commonly used types
pub use backend::{DocumentCursor, DocumentStore};
pub use browser::Browser;
pub use compile::compile;
pub use config::{CollectionConfig, ConfigStore, Settings};
pub use convert::{coerce, Converter};
pub use error::{FlamyngoError, Result};
pub use resolve::{display_value, lookup, resolve};
pub use store::MemoryStore;
pub use suggest::{suggest, SuggestMode};
pub use types::{Column, Criteria, Document, QueryResults, Row};
