//! The relational store the ETL writes into.
//!
//! A unit of work opens implicitly with the first statement after a
//! `commit` or `rollback`, and stays open until one of them is called.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::error::EtlResult;
use crate::records::{ArtistRow, SongLookup, SongMatch, SongPlayRow, SongRow, TimeRow, UserRow};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Statement sink for the five target tables.
///
/// Write methods return the number of rows the store reports as affected.
#[async_trait]
pub trait Store: Send {
    async fn insert_song(&mut self, row: &SongRow) -> EtlResult<u64>;

    async fn insert_artist(&mut self, row: &ArtistRow) -> EtlResult<u64>;

    async fn insert_time(&mut self, row: &TimeRow) -> EtlResult<u64>;

    /// Insert, or overwrite the names and level of an existing user.
    async fn upsert_user(&mut self, row: &UserRow) -> EtlResult<u64>;

    async fn insert_songplay(&mut self, row: &SongPlayRow) -> EtlResult<u64>;

    /// At most one song/artist pair matching the lookup. Which one is
    /// returned when several match is unspecified.
    async fn find_song(&mut self, lookup: &SongLookup) -> EtlResult<Option<SongMatch>>;

    /// Make the open unit of work durable.
    async fn commit(&mut self) -> EtlResult<()>;

    /// Discard the open unit of work.
    async fn rollback(&mut self) -> EtlResult<()>;

    /// Release the underlying connection.
    async fn close(&mut self) -> EtlResult<()>;
}
