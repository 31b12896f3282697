//! In-memory store with the conflict rules of the default catalog.
//!
//! Songs, artists and time rows are insert-or-ignore, users are upserted,
//! song plays are appended. Writes are staged until `commit`; lookups see
//! the staged view. Used by `--dry-run` and the tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::EtlResult;
use crate::records::{ArtistRow, SongLookup, SongMatch, SongPlayRow, SongRow, TimeRow, UserRow};
use crate::store::Store;

/// The five tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub songs: BTreeMap<String, SongRow>,
    pub artists: BTreeMap<String, ArtistRow>,
    pub time: BTreeMap<NaiveDateTime, TimeRow>,
    pub users: BTreeMap<i64, UserRow>,
    pub songplays: Vec<SongPlayRow>,
}

impl Tables {
    fn find_song(&self, lookup: &SongLookup) -> Option<SongMatch> {
        self.songs
            .values()
            .filter(|song| song.title == lookup.title && song.duration == lookup.duration)
            .find_map(|song| {
                let artist = self.artists.get(&song.artist_id)?;
                (artist.name == lookup.artist).then(|| SongMatch {
                    song_id: song.song_id.clone(),
                    artist_id: artist.artist_id.clone(),
                })
            })
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    committed: Tables,
    staged: Option<Tables>,
    commits: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables as of the last commit.
    pub fn committed(&self) -> &Tables {
        &self.committed
    }

    /// Number of units of work committed so far.
    pub fn commits(&self) -> usize {
        self.commits
    }

    fn view(&self) -> &Tables {
        self.staged.as_ref().unwrap_or(&self.committed)
    }

    fn work(&mut self) -> &mut Tables {
        self.staged.get_or_insert_with(|| self.committed.clone())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_song(&mut self, row: &SongRow) -> EtlResult<u64> {
        let songs = &mut self.work().songs;
        let fresh = !songs.contains_key(&row.song_id);
        if fresh {
            songs.insert(row.song_id.clone(), row.clone());
        }
        Ok(u64::from(fresh))
    }

    async fn insert_artist(&mut self, row: &ArtistRow) -> EtlResult<u64> {
        let artists = &mut self.work().artists;
        let fresh = !artists.contains_key(&row.artist_id);
        if fresh {
            artists.insert(row.artist_id.clone(), row.clone());
        }
        Ok(u64::from(fresh))
    }

    async fn insert_time(&mut self, row: &TimeRow) -> EtlResult<u64> {
        let time = &mut self.work().time;
        let fresh = !time.contains_key(&row.start_time);
        if fresh {
            time.insert(row.start_time, row.clone());
        }
        Ok(u64::from(fresh))
    }

    async fn upsert_user(&mut self, row: &UserRow) -> EtlResult<u64> {
        self.work().users.insert(row.user_id, row.clone());
        Ok(1)
    }

    async fn insert_songplay(&mut self, row: &SongPlayRow) -> EtlResult<u64> {
        self.work().songplays.push(row.clone());
        Ok(1)
    }

    async fn find_song(&mut self, lookup: &SongLookup) -> EtlResult<Option<SongMatch>> {
        Ok(self.view().find_song(lookup))
    }

    async fn commit(&mut self) -> EtlResult<()> {
        if let Some(staged) = self.staged.take() {
            self.committed = staged;
        }
        self.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> EtlResult<()> {
        self.staged = None;
        Ok(())
    }

    async fn close(&mut self) -> EtlResult<()> {
        self.rollback().await
    }
}
