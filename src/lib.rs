//! # sparkify-etl
//!
//! Batch ETL from JSON song metadata and user activity logs into a
//! PostgreSQL star schema.
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use sparkify_etl::prelude::*;
//!
//! let config = EtlConfig::load(None)?;
//! let mut store = PgStore::connect(&config.database_url, config.statements.clone()).await?;
//! let report = sparkify_etl::run_and_close(&config, &mut store).await?;
//! ```
//!
//! ## Tables
//!
//! | Table       | Source     | On conflict        |
//! |-------------|------------|--------------------|
//! | `songs`     | song files | ignore             |
//! | `artists`   | song files | ignore             |
//! | `time`      | log files  | ignore             |
//! | `users`     | log files  | update name, level |
//! | `songplays` | log files  | always inserted    |
//!
//! Song-play `song_id`/`artist_id` come from a lookup on title, artist
//! name and exact duration; they are null when nothing matches.

pub mod calendar;
pub mod catalog;
pub mod config;
pub mod driver;
pub mod error;
pub mod records;
pub mod store;
pub mod transform;

pub use driver::{discover_files, process_data, run, run_and_close};

pub mod prelude {
    pub use crate::catalog::{StatementCatalog, StatementKind};
    pub use crate::config::EtlConfig;
    pub use crate::driver::{discover_files, process_data, run, run_and_close};
    pub use crate::error::*;
    pub use crate::records::*;
    pub use crate::store::{MemoryStore, PgStore, Store};
    pub use crate::transform::{FileTransformer, LoadReport, LogFileTransformer, SongFileTransformer};
}
