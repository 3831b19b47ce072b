#![forbid(unsafe_code)]

//! Core domain model for trainlog.
//!
//! This crate provides:
//! - Duration normalization and clock formatting
//! - Protocol templates (protocol -> block -> exercise) and their validation
//! - Instantiation of templates into mutable workout instances
//! - Progress aggregation over instances
//! - Persistence (JSON store, JSONL journal, CSV rollup)

pub mod types;
pub mod error;
pub mod duration;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod protocol;
pub mod instantiate;
pub mod instance;
pub mod progress;
pub mod resolve;
pub mod store;
pub mod session;
pub mod journal;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use duration::{format_clock, to_seconds, DurationUnit, DurationValue};
pub use catalog::{build_default_catalog, build_default_protocols, get_default_catalog, Catalog};
pub use config::Config;
pub use instantiate::{instantiate, instantiate_block};
pub use progress::{compute_completion_ratio, compute_elapsed, compute_remaining, summarize};
pub use resolve::{resolve_protocol, TemplateLookup};
pub use store::{FileStore, MemoryStore, Store};
pub use session::DeletePolicy;
pub use journal::{InstanceSink, JsonlJournal};
