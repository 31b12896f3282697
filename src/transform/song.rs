//! Song metadata files: one record, one song row and one artist row.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{EtlError, EtlResult};
use crate::records::{ArtistRow, SongRow};
use crate::store::Store;
use crate::transform::{FileTransformer, LoadReport};

/// One song metadata record, decoded by field name.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SongRecord {
    /// Present in the source files, never loaded.
    pub num_songs: Option<i64>,
    pub artist_id: String,
    pub artist_latitude: Option<f64>,
    pub artist_longitude: Option<f64>,
    pub artist_location: Option<String>,
    pub artist_name: String,
    pub song_id: String,
    pub title: String,
    pub duration: f64,
    pub year: i32,
}

impl SongRecord {
    pub fn song_row(&self) -> SongRow {
        SongRow {
            song_id: self.song_id.clone(),
            title: self.title.clone(),
            artist_id: self.artist_id.clone(),
            year: self.year,
            duration: self.duration,
        }
    }

    pub fn artist_row(&self) -> ArtistRow {
        ArtistRow {
            artist_id: self.artist_id.clone(),
            name: self.artist_name.clone(),
            location: self.artist_location.clone(),
            latitude: self.artist_latitude,
            longitude: self.artist_longitude,
        }
    }
}

/// Read the single record of a song file.
pub fn read_song_file(path: &Path) -> EtlResult<SongRecord> {
    let content = fs::read_to_string(path)?;
    let mut lines = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (index, line) = lines
        .next()
        .ok_or_else(|| EtlError::data(path, "no song record"))?;
    let record = serde_json::from_str(line)
        .map_err(|e| EtlError::data_at(path, index + 1, e.to_string()))?;

    if let Some((extra, _)) = lines.next() {
        return Err(EtlError::data_at(
            path,
            extra + 1,
            "expected exactly one song record per file",
        ));
    }

    Ok(record)
}

/// Loads one song and its artist per file.
#[derive(Debug, Clone, Copy, Default)]
pub struct SongFileTransformer;

#[async_trait]
impl FileTransformer for SongFileTransformer {
    fn name(&self) -> &'static str {
        "song"
    }

    async fn transform(&self, store: &mut dyn Store, path: &Path) -> EtlResult<LoadReport> {
        let record = read_song_file(path)?;
        debug!(song_id = %record.song_id, artist_id = %record.artist_id, "song record");

        store.insert_song(&record.song_row()).await?;
        store.insert_artist(&record.artist_row()).await?;

        Ok(LoadReport {
            songs: 1,
            artists: 1,
            ..LoadReport::default()
        })
    }
}
