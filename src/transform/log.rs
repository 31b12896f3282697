//! User activity logs: one event per line.
//!
//! Only song-play events (page `NextSong` by default) are loaded. Each one
//! yields a time row, a user upsert and a song-play fact whose song/artist
//! ids come from a lookup against the songs already loaded.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{EtlError, EtlResult};
use crate::records::{SongLookup, SongMatch, SongPlayRow, TimeRow, UserRow};
use crate::store::Store;
use crate::transform::{FileTransformer, LoadReport};

/// Page value of a song-play event.
pub const SONG_PLAY_PAGE: &str = "NextSong";

/// `userId` is a string in the source logs and occasionally a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Num(i64),
    Text(String),
}

impl UserId {
    fn to_i64(&self) -> Option<i64> {
        match self {
            UserId::Num(n) => Some(*n),
            UserId::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// One log line as written. Everything but `page` may be null on events
/// that are filtered out.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEvent {
    pub ts: Option<i64>,
    pub page: String,
    pub user_id: Option<UserId>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: Option<String>,
    pub song: Option<String>,
    pub artist: Option<String>,
    pub length: Option<f64>,
    pub session_id: Option<i64>,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// A validated song-play event.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayEvent {
    pub time: TimeRow,
    pub user: UserRow,
    pub lookup: SongLookup,
    pub session_id: i64,
    pub location: String,
    pub user_agent: String,
}

impl PlayEvent {
    fn from_raw(raw: RawEvent, path: &Path, line: usize) -> EtlResult<Self> {
        let field = |name: &str| EtlError::data_at(path, line, format!("missing field `{}`", name));

        let ts = raw.ts.ok_or_else(|| field("ts"))?;
        let time = TimeRow::from_epoch_millis(ts)
            .ok_or_else(|| EtlError::data_at(path, line, format!("timestamp {} out of range", ts)))?;
        let user_id = raw.user_id.ok_or_else(|| field("userId"))?;
        let user_id = user_id.to_i64().ok_or_else(|| {
            EtlError::data_at(path, line, format!("userId {:?} is not an integer", user_id))
        })?;

        Ok(Self {
            time,
            user: UserRow {
                user_id,
                first_name: raw.first_name.ok_or_else(|| field("firstName"))?,
                last_name: raw.last_name.ok_or_else(|| field("lastName"))?,
                gender: raw.gender.ok_or_else(|| field("gender"))?,
                level: raw.level.ok_or_else(|| field("level"))?,
            },
            lookup: SongLookup {
                title: raw.song.ok_or_else(|| field("song"))?,
                artist: raw.artist.ok_or_else(|| field("artist"))?,
                duration: raw.length.ok_or_else(|| field("length"))?,
            },
            session_id: raw.session_id.ok_or_else(|| field("sessionId"))?,
            location: raw.location.ok_or_else(|| field("location"))?,
            user_agent: raw.user_agent.ok_or_else(|| field("userAgent"))?,
        })
    }

    /// The fact row, with ids from the lookup or null when nothing matched.
    pub fn songplay_row(&self, found: Option<SongMatch>) -> SongPlayRow {
        let (song_id, artist_id) = match found {
            Some(m) => (Some(m.song_id), Some(m.artist_id)),
            None => (None, None),
        };
        SongPlayRow {
            start_time: self.time.start_time,
            user_id: self.user.user_id,
            level: self.user.level.clone(),
            song_id,
            artist_id,
            session_id: self.session_id,
            location: self.location.clone(),
            user_agent: self.user_agent.clone(),
        }
    }
}

/// One non-blank log line: its page, read eagerly, and the rest of the event
/// left undecoded until the page is known to be wanted.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    pub line: usize,
    pub page: String,
    value: serde_json::Value,
}

impl LogLine {
    fn parse(path: &Path, line: usize, text: &str) -> EtlResult<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| EtlError::data_at(path, line, e.to_string()))?;
        let page = match value.get("page") {
            Some(serde_json::Value::String(page)) => page.clone(),
            Some(_) => return Err(EtlError::data_at(path, line, "`page` is not a string")),
            None => return Err(EtlError::data_at(path, line, "missing field `page`")),
        };
        Ok(Self { line, page, value })
    }

    /// Type-check the full event.
    pub fn decode(self, path: &Path) -> EtlResult<RawEvent> {
        let line = self.line;
        serde_json::from_value(self.value).map_err(|e| EtlError::data_at(path, line, e.to_string()))
    }
}

/// Lazy iterator over the lines of a log file, with 1-based line numbers.
/// Blank lines are skipped.
pub struct LogEvents<R> {
    path: PathBuf,
    lines: Lines<R>,
    line: usize,
}

impl LogEvents<BufReader<File>> {
    pub fn open(path: &Path) -> EtlResult<Self> {
        Ok(Self::new(path, BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> LogEvents<R> {
    pub fn new(path: &Path, reader: R) -> Self {
        Self {
            path: path.to_path_buf(),
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl<R: BufRead> Iterator for LogEvents<R> {
    type Item = EtlResult<LogLine>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let text = self.lines.next()?;
            self.line += 1;
            let text = match text {
                Ok(text) => text,
                Err(e) => return Some(Err(e.into())),
            };
            if text.trim().is_empty() {
                continue;
            }
            return Some(LogLine::parse(&self.path, self.line, &text));
        }
    }
}

/// Song-play events of one file, in file order.
#[derive(Debug, Default)]
pub struct PlayEvents {
    pub events: Vec<PlayEvent>,
    pub filtered: usize,
}

/// Decode and validate a whole log file, keeping events on `page`.
///
/// Every line must be a JSON object with a string `page`. Only retained
/// events are checked field by field.
pub fn read_play_events(path: &Path, page: &str) -> EtlResult<PlayEvents> {
    let mut plays = PlayEvents::default();
    for item in LogEvents::open(path)? {
        let log_line = item?;
        if log_line.page == page {
            let line = log_line.line;
            let raw = log_line.decode(path)?;
            plays.events.push(PlayEvent::from_raw(raw, path, line)?);
        } else {
            plays.filtered += 1;
        }
    }
    Ok(plays)
}

/// Loads the time, user and song-play rows of a log file.
#[derive(Debug, Clone)]
pub struct LogFileTransformer {
    page: String,
}

impl LogFileTransformer {
    pub fn new(page: impl Into<String>) -> Self {
        Self { page: page.into() }
    }
}

impl Default for LogFileTransformer {
    fn default() -> Self {
        Self::new(SONG_PLAY_PAGE)
    }
}

#[async_trait]
impl FileTransformer for LogFileTransformer {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn transform(&self, store: &mut dyn Store, path: &Path) -> EtlResult<LoadReport> {
        let plays = read_play_events(path, &self.page)?;
        debug!(
            events = plays.events.len(),
            filtered = plays.filtered,
            "log file decoded"
        );

        let mut report = LoadReport {
            filtered: plays.filtered,
            ..LoadReport::default()
        };

        for event in &plays.events {
            store.insert_time(&event.time).await?;
            report.time_rows += 1;
        }

        for event in &plays.events {
            store.upsert_user(&event.user).await?;
            report.users += 1;
        }

        for event in &plays.events {
            let found = store.find_song(&event.lookup).await?;
            if found.is_some() {
                report.matched += 1;
            } else {
                debug!(title = %event.lookup.title, artist = %event.lookup.artist, "no song match");
            }
            store.insert_songplay(&event.songplay_row(found)).await?;
            report.songplays += 1;
        }

        Ok(report)
    }
}
