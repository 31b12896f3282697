//! Rows written to the star schema.
//!
//! Each row type knows the order in which its fields are bound to the
//! matching statement template (see [`crate::catalog`]).

use chrono::NaiveDateTime;

/// Dynamic value type for statement bindings.
///
/// Nulls keep their column type so the driver can send a typed parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Int(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
    Timestamp(NaiveDateTime),
}

/// Types that bind to a positional parameter list.
pub trait BindParams {
    fn params(&self) -> Vec<SqlValue>;
}

/// `songs` row. Binds `(song_id, title, artist_id, year, duration)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SongRow {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,
    pub duration: f64,
}

impl BindParams for SongRow {
    fn params(&self) -> Vec<SqlValue> {
        vec![
            self.song_id.as_str().into(),
            self.title.as_str().into(),
            self.artist_id.as_str().into(),
            self.year.into(),
            self.duration.into(),
        ]
    }
}

/// `artists` row. Binds `(artist_id, name, location, latitude, longitude)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl BindParams for ArtistRow {
    fn params(&self) -> Vec<SqlValue> {
        vec![
            self.artist_id.as_str().into(),
            self.name.as_str().into(),
            self.location.clone().into(),
            self.latitude.into(),
            self.longitude.into(),
        ]
    }
}

/// `time` row. Binds `(start_time, hour, day, week, month, year, weekday)`.
///
/// Built by [`TimeRow::from_epoch_millis`]; `weekday` counts Monday as 0.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRow {
    pub start_time: NaiveDateTime,
    pub hour: u32,
    pub day: u32,
    pub week: u32,
    pub month: u32,
    pub year: i32,
    pub weekday: u32,
}

impl BindParams for TimeRow {
    fn params(&self) -> Vec<SqlValue> {
        vec![
            self.start_time.into(),
            self.hour.into(),
            self.day.into(),
            self.week.into(),
            self.month.into(),
            self.year.into(),
            self.weekday.into(),
        ]
    }
}

/// `users` row. Binds `(user_id, first_name, last_name, gender, level)`.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub user_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub gender: String,
    pub level: String,
}

impl BindParams for UserRow {
    fn params(&self) -> Vec<SqlValue> {
        vec![
            self.user_id.into(),
            self.first_name.as_str().into(),
            self.last_name.as_str().into(),
            self.gender.as_str().into(),
            self.level.as_str().into(),
        ]
    }
}

/// `songplays` fact row. Binds `(start_time, user_id, level, song_id,
/// artist_id, session_id, location, user_agent)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SongPlayRow {
    pub start_time: NaiveDateTime,
    pub user_id: i64,
    pub level: String,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: String,
    pub user_agent: String,
}

impl BindParams for SongPlayRow {
    fn params(&self) -> Vec<SqlValue> {
        vec![
            self.start_time.into(),
            self.user_id.into(),
            self.level.as_str().into(),
            self.song_id.clone().into(),
            self.artist_id.clone().into(),
            self.session_id.into(),
            self.location.as_str().into(),
            self.user_agent.as_str().into(),
        ]
    }
}

/// Song/artist lookup key. Binds `(title, artist name, duration)`.
///
/// Duration is compared with exact equality against the stored value.
#[derive(Debug, Clone, PartialEq)]
pub struct SongLookup {
    pub title: String,
    pub artist: String,
    pub duration: f64,
}

impl BindParams for SongLookup {
    fn params(&self) -> Vec<SqlValue> {
        vec![
            self.title.as_str().into(),
            self.artist.as_str().into(),
            self.duration.into(),
        ]
    }
}

/// Identifiers found by a [`SongLookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongMatch {
    pub song_id: String,
    pub artist_id: String,
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::Int(Some(v as i64))
    }
}

impl From<u32> for SqlValue {
    fn from(v: u32) -> Self {
        SqlValue::Int(Some(v as i64))
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        SqlValue::Int(Some(v))
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::Float(Some(v))
    }
}

impl From<Option<f64>> for SqlValue {
    fn from(v: Option<f64>) -> Self {
        SqlValue::Float(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(Some(v.to_string()))
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(Some(v))
    }
}

impl From<Option<String>> for SqlValue {
    fn from(v: Option<String>) -> Self {
        SqlValue::Text(v)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(v: NaiveDateTime) -> Self {
        SqlValue::Timestamp(v)
    }
}
