//! Parameterized statement templates for the five target tables.
//!
//! The catalog is plain data: built once (defaults, optionally overridden
//! from the config file) and handed to the store that executes it.

use serde::Deserialize;

use crate::error::{EtlError, EtlResult};

/// Statement identifiers, one per template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    SongInsert,
    ArtistInsert,
    TimeInsert,
    UserUpsert,
    SongPlayInsert,
    SongSelect,
}

impl StatementKind {
    pub const ALL: [StatementKind; 6] = [
        StatementKind::SongInsert,
        StatementKind::ArtistInsert,
        StatementKind::TimeInsert,
        StatementKind::UserUpsert,
        StatementKind::SongPlayInsert,
        StatementKind::SongSelect,
    ];

    /// Config key of the template.
    pub fn name(self) -> &'static str {
        match self {
            StatementKind::SongInsert => "song_insert",
            StatementKind::ArtistInsert => "artist_insert",
            StatementKind::TimeInsert => "time_insert",
            StatementKind::UserUpsert => "user_upsert",
            StatementKind::SongPlayInsert => "songplay_insert",
            StatementKind::SongSelect => "song_select",
        }
    }

    /// Number of positional parameters the row type binds.
    pub fn arity(self) -> usize {
        match self {
            StatementKind::SongInsert => 5,
            StatementKind::ArtistInsert => 5,
            StatementKind::TimeInsert => 7,
            StatementKind::UserUpsert => 5,
            StatementKind::SongPlayInsert => 8,
            StatementKind::SongSelect => 3,
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Named statement templates.
///
/// Any subset may be overridden from a `[statements]` config table; missing
/// keys fall back to the PostgreSQL defaults below.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatementCatalog {
    pub song_insert: String,
    pub artist_insert: String,
    pub time_insert: String,
    pub user_upsert: String,
    pub songplay_insert: String,
    pub song_select: String,
}

impl Default for StatementCatalog {
    fn default() -> Self {
        Self {
            song_insert: "INSERT INTO songs (song_id, title, artist_id, year, duration) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (song_id) DO NOTHING"
                .to_string(),
            artist_insert: "INSERT INTO artists (artist_id, name, location, latitude, longitude) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (artist_id) DO NOTHING"
                .to_string(),
            time_insert: "INSERT INTO time (start_time, hour, day, week, month, year, weekday) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (start_time) DO NOTHING"
                .to_string(),
            user_upsert: "INSERT INTO users (user_id, first_name, last_name, gender, level) \
                 VALUES ($1, $2, $3, $4, $5) \
                 ON CONFLICT (user_id) DO UPDATE SET \
                 first_name = EXCLUDED.first_name, \
                 last_name = EXCLUDED.last_name, \
                 gender = EXCLUDED.gender, \
                 level = EXCLUDED.level"
                .to_string(),
            songplay_insert: "INSERT INTO songplays \
                 (start_time, user_id, level, song_id, artist_id, session_id, location, user_agent) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
                .to_string(),
            song_select: "SELECT songs.song_id, artists.artist_id \
                 FROM songs JOIN artists ON songs.artist_id = artists.artist_id \
                 WHERE songs.title = $1 AND artists.name = $2 AND songs.duration = $3 \
                 LIMIT 1"
                .to_string(),
        }
    }
}

impl StatementCatalog {
    /// Template text for a statement.
    pub fn sql(&self, kind: StatementKind) -> &str {
        match kind {
            StatementKind::SongInsert => &self.song_insert,
            StatementKind::ArtistInsert => &self.artist_insert,
            StatementKind::TimeInsert => &self.time_insert,
            StatementKind::UserUpsert => &self.user_upsert,
            StatementKind::SongPlayInsert => &self.songplay_insert,
            StatementKind::SongSelect => &self.song_select,
        }
    }

    /// Check that every template uses exactly the placeholders its row binds.
    pub fn validate(&self) -> EtlResult<()> {
        for kind in StatementKind::ALL {
            let sql = self.sql(kind);
            if sql.trim().is_empty() {
                return Err(EtlError::Config(format!("statement '{}' is empty", kind)));
            }
            let highest = highest_placeholder(sql).ok_or_else(|| {
                EtlError::Config(format!("statement '{}' has an oversized parameter number", kind))
            })?;
            if highest != kind.arity() {
                return Err(EtlError::Config(format!(
                    "statement '{}' uses ${} as its highest parameter, expected ${}",
                    kind,
                    highest,
                    kind.arity()
                )));
            }
        }
        Ok(())
    }
}

/// Highest `$n` placeholder in a template, ignoring quoted literals.
/// `None` if a placeholder number does not fit in `usize`.
fn highest_placeholder(sql: &str) -> Option<usize> {
    let mut highest = 0;
    let mut in_quote = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' => in_quote = !in_quote,
            '$' if !in_quote => {
                let mut n = 0usize;
                let mut seen = false;
                while let Some(d) = chars.peek().and_then(|d| d.to_digit(10)) {
                    n = n.checked_mul(10)?.checked_add(d as usize)?;
                    seen = true;
                    chars.next();
                }
                if seen {
                    highest = highest.max(n);
                }
            }
            _ => {}
        }
    }

    Some(highest)
}
