//! File-set driver: discover, transform, commit, report.
//!
//! Each file is its own unit of work. A failing file is rolled back and
//! aborts the run; files committed before it stay loaded, so a rerun is
//! only safe as far as the store's conflict rules make it so.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::EtlConfig;
use crate::error::EtlResult;
use crate::store::Store;
use crate::transform::{FileTransformer, LoadReport, LogFileTransformer, SongFileTransformer};

/// All files under `root` with the given extension (case-insensitive),
/// following symlinks, sorted by the full path string. A missing root
/// yields no files.
pub fn discover_files(root: &Path, extension: &str) -> EtlResult<Vec<PathBuf>> {
    if !root.exists() {
        warn!(root = %root.display(), "input root does not exist");
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry?;
        if entry.file_type().is_file() && has_extension(entry.path(), extension) {
            files.push(entry.into_path());
        }
    }
    files.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));
    Ok(files)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

/// Apply `transformer` to every file under `root`, committing after each.
pub async fn process_data(
    store: &mut dyn Store,
    root: &Path,
    extension: &str,
    transformer: &dyn FileTransformer,
) -> EtlResult<LoadReport> {
    let files = discover_files(root, extension)?;
    let total = files.len();
    println!("{} files found in {}", total, root.display());

    let mut report = LoadReport::default();
    for (i, path) in files.iter().enumerate() {
        debug!(kind = transformer.name(), path = %path.display(), "processing");

        let file_report = match transformer.transform(store, path).await {
            Ok(file_report) => file_report,
            Err(e) => {
                error!(kind = transformer.name(), path = %path.display(), error = %e, "file failed, aborting run");
                if let Err(rollback) = store.rollback().await {
                    warn!(error = %rollback, "rollback failed");
                }
                return Err(e);
            }
        };
        store.commit().await?;

        report += file_report;
        report.files += 1;
        println!("{}/{} files processed.", i + 1, total);
    }

    Ok(report)
}

/// Load song files, then log files.
pub async fn run(config: &EtlConfig, store: &mut dyn Store) -> EtlResult<LoadReport> {
    info!(root = %config.song_data.display(), "loading song files");
    let mut report = process_data(
        store,
        &config.song_data,
        &config.extension,
        &SongFileTransformer,
    )
    .await?;

    info!(root = %config.log_data.display(), "loading log files");
    report += process_data(
        store,
        &config.log_data,
        &config.extension,
        &LogFileTransformer::new(config.song_play_page.as_str()),
    )
    .await?;

    info!(
        files = report.files,
        songs = report.songs,
        artists = report.artists,
        time_rows = report.time_rows,
        users = report.users,
        songplays = report.songplays,
        matched = report.matched,
        unmatched = report.unmatched(),
        filtered = report.filtered,
        "run complete"
    );
    Ok(report)
}

/// [`run`], then close the store. When both fail, the close error is
/// logged and the run error returned.
pub async fn run_and_close(config: &EtlConfig, store: &mut dyn Store) -> EtlResult<LoadReport> {
    let result = run(config, store).await;
    match (result, store.close().await) {
        (result, Ok(())) => result,
        (Ok(_), Err(close)) => Err(close),
        (Err(e), Err(close)) => {
            warn!(error = %close, "closing the store failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EtlError;
    use crate::records::{ArtistRow, SongLookup, SongMatch, SongPlayRow, SongRow, TimeRow, UserRow};
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const SONG: &str = r#"{"num_songs": 1, "artist_id": "AR1", "artist_latitude": 35.1, "artist_longitude": -90.0, "artist_location": "Memphis, TN", "artist_name": "A", "song_id": "S1", "title": "T", "duration": 210.5, "year": 1999}"#;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discovery_is_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "B/b.json", "{}");
        write(dir.path(), "A/B/C/z.json", "{}");
        write(dir.path(), "A/a.JSON", "{}");
        write(dir.path(), "A/notes.txt", "");
        write(dir.path(), "a.json.bak", "");

        let files = discover_files(dir.path(), "json").unwrap();
        let rel: Vec<String> = files
            .iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(rel, vec!["A/B/C/z.json", "A/a.JSON", "B/b.json"]);
    }

    #[test]
    fn test_discovery_sorts_by_path_string() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/x.json", "{}");
        write(dir.path(), "a-b/x.json", "{}");

        let files = discover_files(dir.path(), "json").unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a-b/x.json"), dir.path().join("a/x.json")]
        );
    }

    #[test]
    fn test_missing_root_has_no_files() {
        let dir = TempDir::new().unwrap();
        let files = discover_files(&dir.path().join("absent"), "json").unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_commits_once_per_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "A/one.json", SONG);
        write(dir.path(), "B/two.json", &SONG.replace("\"S1\"", "\"S2\""));

        let mut store = MemoryStore::new();
        let report = process_data(&mut store, dir.path(), "json", &SongFileTransformer)
            .await
            .unwrap();

        assert_eq!((report.files, report.songs, report.artists), (2, 2, 2));
        assert_eq!(store.commits(), 2);
        assert_eq!(store.committed().songs.len(), 2);
        assert_eq!(store.committed().artists.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_earlier_files() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.json", SONG);
        write(dir.path(), "b.json", "{\"title\": 1}");
        write(dir.path(), "c.json", &SONG.replace("\"S1\"", "\"S3\""));

        let mut store = MemoryStore::new();
        let err = process_data(&mut store, dir.path(), "json", &SongFileTransformer)
            .await
            .unwrap_err();

        assert!(err.is_data_shape());
        assert_eq!(store.commits(), 1);
        assert_eq!(
            store.committed().songs.keys().collect::<Vec<_>>(),
            vec!["S1"]
        );
    }

    /// Memory store whose connection cannot be released.
    #[derive(Default)]
    struct CloseFails(MemoryStore);

    #[async_trait]
    impl Store for CloseFails {
        async fn insert_song(&mut self, row: &SongRow) -> EtlResult<u64> {
            self.0.insert_song(row).await
        }

        async fn insert_artist(&mut self, row: &ArtistRow) -> EtlResult<u64> {
            self.0.insert_artist(row).await
        }

        async fn insert_time(&mut self, row: &TimeRow) -> EtlResult<u64> {
            self.0.insert_time(row).await
        }

        async fn upsert_user(&mut self, row: &UserRow) -> EtlResult<u64> {
            self.0.upsert_user(row).await
        }

        async fn insert_songplay(&mut self, row: &SongPlayRow) -> EtlResult<u64> {
            self.0.insert_songplay(row).await
        }

        async fn find_song(&mut self, lookup: &SongLookup) -> EtlResult<Option<SongMatch>> {
            self.0.find_song(lookup).await
        }

        async fn commit(&mut self) -> EtlResult<()> {
            self.0.commit().await
        }

        async fn rollback(&mut self) -> EtlResult<()> {
            self.0.rollback().await
        }

        async fn close(&mut self) -> EtlResult<()> {
            Err(EtlError::Connection("connection reset".to_string()))
        }
    }

    fn config_for(dir: &Path) -> EtlConfig {
        EtlConfig {
            song_data: dir.join("song_data"),
            log_data: dir.join("log_data"),
            ..EtlConfig::default()
        }
    }

    #[tokio::test]
    async fn test_run_error_survives_close_failure() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "song_data/bad.json", "{\"title\": 1}");

        let mut store = CloseFails::default();
        let err = run_and_close(&config_for(dir.path()), &mut store)
            .await
            .unwrap_err();

        assert!(err.is_data_shape());
    }

    #[tokio::test]
    async fn test_close_failure_after_clean_run() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "song_data/a.json", SONG);

        let mut store = CloseFails::default();
        let err = run_and_close(&config_for(dir.path()), &mut store)
            .await
            .unwrap_err();

        assert!(matches!(err, EtlError::Connection(_)));
        assert_eq!(store.0.committed().songs.len(), 1);
    }
}
