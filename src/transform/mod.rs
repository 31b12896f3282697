//! File transformers: one input file in, statements against a [`Store`] out.
//!
//! Transformers never commit; the driver owns the unit-of-work boundary.

pub mod log;
pub mod song;

use std::ops::AddAssign;
use std::path::Path;

use async_trait::async_trait;

use crate::error::EtlResult;
use crate::store::Store;

pub use log::LogFileTransformer;
pub use song::SongFileTransformer;

/// Maps one input file to statements against the store.
#[async_trait]
pub trait FileTransformer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn transform(&self, store: &mut dyn Store, path: &Path) -> EtlResult<LoadReport>;
}

/// Statement counts for one file, or summed over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub files: usize,
    pub songs: usize,
    pub artists: usize,
    pub time_rows: usize,
    pub users: usize,
    pub songplays: usize,
    /// Song plays whose lookup found a song/artist pair.
    pub matched: usize,
    /// Log events dropped by the page filter.
    pub filtered: usize,
}

impl LoadReport {
    pub fn unmatched(&self) -> usize {
        self.songplays - self.matched
    }
}

impl AddAssign for LoadReport {
    fn add_assign(&mut self, other: Self) {
        self.files += other.files;
        self.songs += other.songs;
        self.artists += other.artists;
        self.time_rows += other.time_rows;
        self.users += other.users;
        self.songplays += other.songplays;
        self.matched += other.matched;
        self.filtered += other.filtered;
    }
}
