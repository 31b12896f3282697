//! Full runs against the in-memory store.

use std::fs;
use std::path::Path;

use pretty_assertions::assert_eq;
use sparkify_etl::prelude::*;
use tempfile::TempDir;

const CARBON_RING: &str = r#"{"num_songs": 1, "artist_id": "ARXR32B1187FB57099", "artist_latitude": null, "artist_longitude": null, "artist_location": "", "artist_name": "Explicit Chill", "song_id": "SOGDBUF12A8C140FAA", "title": "Carbon Ring", "duration": 185.3, "year": 2008}"#;

const PLAY: &str = r#"{"artist":"Explicit Chill","auth":"Logged In","firstName":"Kaylee","gender":"F","itemInSession":3,"lastName":"Summers","length":185.3,"level":"free","location":"Phoenix-Mesa-Scottsdale, AZ","method":"PUT","page":"NextSong","registration":1540344794796.0,"sessionId":139,"song":"Carbon Ring","status":200,"ts":1541106106796,"userAgent":"Mozilla/5.0 (Windows NT 6.1; WOW64)","userId":"8"}"#;

const HOME: &str = r#"{"artist":null,"auth":"Logged In","firstName":"Kaylee","gender":"F","itemInSession":0,"lastName":"Summers","length":null,"level":"free","location":"Phoenix-Mesa-Scottsdale, AZ","method":"GET","page":"Home","registration":1540344794796.0,"sessionId":139,"song":null,"status":200,"ts":1541106000796,"userAgent":"Mozilla/5.0 (Windows NT 6.1; WOW64)","userId":"8"}"#;

fn write(dir: &Path, rel: &str, lines: &[&str]) {
    let path = dir.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, lines.join("\n")).unwrap();
}

fn config(dir: &Path) -> EtlConfig {
    EtlConfig {
        song_data: dir.join("song_data"),
        log_data: dir.join("log_data"),
        ..EtlConfig::default()
    }
}

#[tokio::test]
async fn song_then_log_yields_one_row_per_table() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "song_data/A/R/X/TRARXR.json", &[CARBON_RING]);
    write(dir.path(), "log_data/2018/11/2018-11-01-events.json", &[HOME, PLAY]);

    let mut store = MemoryStore::new();
    let report = run(&config(dir.path()), &mut store).await.unwrap();

    assert_eq!(
        report,
        LoadReport {
            files: 2,
            songs: 1,
            artists: 1,
            time_rows: 1,
            users: 1,
            songplays: 1,
            matched: 1,
            filtered: 1,
        }
    );

    let tables = store.committed();
    assert_eq!(tables.songs.len(), 1);
    assert_eq!(tables.artists.len(), 1);
    assert_eq!(tables.time.len(), 1);
    assert_eq!(tables.users.len(), 1);
    assert_eq!(tables.songplays.len(), 1);

    let play = &tables.songplays[0];
    assert_eq!(play.song_id.as_deref(), Some("SOGDBUF12A8C140FAA"));
    assert_eq!(play.artist_id.as_deref(), Some("ARXR32B1187FB57099"));
    assert_eq!(play.user_id, 8);
    assert_eq!(play.session_id, 139);
    assert_eq!(tables.time.values().next().unwrap().start_time, play.start_time);
}

#[tokio::test]
async fn malformed_event_aborts_run_after_earlier_commits() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "song_data/song.json", &[CARBON_RING]);
    write(dir.path(), "log_data/a-good.json", &[PLAY]);
    let second = PLAY.replace("1541106106796", "1541107000796");
    let broken = PLAY
        .replace("1541106106796", "1541108000796")
        .replace(r#""sessionId":139,"#, "");
    write(dir.path(), "log_data/b-bad.json", &[&second, &broken]);

    let mut store = MemoryStore::new();
    let err = run(&config(dir.path()), &mut store).await.unwrap_err();

    match &err {
        EtlError::DataShape { path, line, message } => {
            assert!(path.ends_with("b-bad.json"));
            assert_eq!(*line, Some(2));
            assert_eq!(message, "missing field `sessionId`");
        }
        other => panic!("unexpected error: {other}"),
    }

    // song file and first log file committed, second log file not at all
    assert_eq!(store.commits(), 2);
    let tables = store.committed();
    assert_eq!(tables.songs.len(), 1);
    assert_eq!(tables.songplays.len(), 1);
    assert_eq!(tables.time.len(), 1);
}

#[tokio::test]
async fn logs_before_songs_leave_ids_null() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "log_data/events.json", &[PLAY]);

    let mut store = MemoryStore::new();
    let report = run(&config(dir.path()), &mut store).await.unwrap();

    assert_eq!((report.songplays, report.unmatched()), (1, 1));
    let play = &store.committed().songplays[0];
    assert_eq!((play.song_id.as_deref(), play.artist_id.as_deref()), (None, None));
}
