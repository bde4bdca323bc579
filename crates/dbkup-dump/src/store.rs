//! File system storage for dump files

use chrono::{DateTime, Utc};
use dbkup_core::{BackupEntry, Error, Result, sanitize_file_name};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};

const DUMP_EXTENSION: &str = "sql";
const PARTIAL_SUFFIX: &str = ".partial";

/// The backup directory.
///
/// A flat namespace of `backup-<label>-<timestamp>.sql` files; listing it is
/// the only index. Files being written live under a hidden `.partial` name
/// and only appear once complete.
#[derive(Debug, Clone)]
pub struct BackupStore {
    base_path: PathBuf,
}

impl BackupStore {
    /// Create a store over an existing directory
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// `backup-<label>-<YYYY-MM-DD_HH-MM-SS>.sql`. `label` must already be sanitized.
    pub fn dump_file_name(label: &str, at: DateTime<Utc>) -> String {
        format!(
            "backup-{}-{}.{}",
            label,
            at.format("%Y-%m-%d_%H-%M-%S"),
            DUMP_EXTENSION
        )
    }

    /// Open a new dump for exclusive writing under its temporary name
    pub async fn create(&self, file_name: &str) -> Result<PendingDump> {
        let final_path = self.base_path.join(file_name);
        if fs::try_exists(&final_path).await? {
            return Err(Error::BackupExists(file_name.to_string()));
        }

        let temp_path = self
            .base_path
            .join(format!(".{}{}", file_name, PARTIAL_SUFFIX));

        let file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)
            .await
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    Error::BackupExists(file_name.to_string())
                } else {
                    Error::IoError(e)
                }
            })?;

        tracing::debug!(path = ?temp_path, "Opened dump file");

        Ok(PendingDump {
            writer: BufWriter::new(file),
            temp_path,
            final_path,
            file_name: file_name.to_string(),
            committed: false,
        })
    }

    /// Completed dump files, sorted by name
    pub async fn list(&self) -> Result<Vec<BackupEntry>> {
        if !fs::try_exists(&self.base_path).await? {
            return Ok(Vec::new());
        }

        let mut backups = Vec::new();
        let mut entries = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !is_dump_file_name(&file_name) {
                continue;
            }

            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }

            backups.push(BackupEntry {
                file_name,
                size_bytes: metadata.len(),
                modified: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        backups.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(backups)
    }

    /// Raw content of a completed dump.
    ///
    /// Only the final path segment of `file_name` is used, so the lookup can
    /// never leave the backup directory. Anything [`list`](Self::list) would
    /// not show, or that is not UTF-8 text, is `Ok(None)`.
    pub async fn read(&self, file_name: &str) -> Result<Option<String>> {
        let Some(name) = sanitize_file_name(file_name).filter(|n| is_dump_file_name(n)) else {
            return Ok(None);
        };

        let path = self.base_path.join(&name);
        match fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::InvalidData) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Visible, completed dump files only
fn is_dump_file_name(name: &str) -> bool {
    !name.starts_with('.')
        && Path::new(name)
            .extension()
            .is_some_and(|ext| ext == DUMP_EXTENSION)
}

/// A dump being written.
///
/// Dropping it without [`commit`](PendingDump::commit) removes the
/// temporary file, so an aborted job never leaves a file behind.
#[derive(Debug)]
pub struct PendingDump {
    writer: BufWriter<fs::File>,
    temp_path: PathBuf,
    final_path: PathBuf,
    file_name: String,
    committed: bool,
}

impl PendingDump {
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub async fn write_str(&mut self, text: &str) -> Result<()> {
        self.writer.write_all(text.as_bytes()).await?;
        Ok(())
    }

    /// Flush, sync and move the file to its final name
    pub async fn commit(mut self) -> Result<PathBuf> {
        self.writer.flush().await?;
        self.writer.get_ref().sync_all().await?;

        if fs::try_exists(&self.final_path).await? {
            return Err(Error::BackupExists(self.file_name.clone()));
        }
        fs::rename(&self.temp_path, &self.final_path).await?;
        self.committed = true;

        tracing::debug!(path = ?self.final_path, "Dump file committed");
        Ok(self.final_path.clone())
    }
}

impl Drop for PendingDump {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = std::fs::remove_file(&self.temp_path) {
                tracing::warn!(path = ?self.temp_path, error = %e, "Failed to remove partial dump");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn test_dump_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(
            BackupStore::dump_file_name("nightly", at),
            "backup-nightly-2024-03-09_07-05-01.sql"
        );
    }

    #[tokio::test]
    async fn test_commit_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let store = BackupStore::new(temp_dir.path());

        let mut dump = store.create("backup-x.sql").await.unwrap();
        dump.write_str("-- Table: t\n").await.unwrap();

        // Not visible while being written
        assert!(store.list().await.unwrap().is_empty());
        assert_eq!(store.read("backup-x.sql").await.unwrap(), None);

        let path = dump.commit().await.unwrap();
        assert_eq!(path, temp_dir.path().join("backup-x.sql"));

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].file_name, "backup-x.sql");
        assert_eq!(listed[0].size_bytes, 12);

        assert_eq!(
            store.read("backup-x.sql").await.unwrap().as_deref(),
            Some("-- Table: t\n")
        );
    }

    #[tokio::test]
    async fn test_dropped_dump_leaves_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let store = BackupStore::new(temp_dir.path());

        {
            let mut dump = store.create("backup-y.sql").await.unwrap();
            dump.write_str("partial").await.unwrap();
        }

        let mut entries = std::fs::read_dir(temp_dir.path()).unwrap();
        assert!(entries.next().is_none());
    }

    #[tokio::test]
    async fn test_create_refuses_existing_name() {
        let temp_dir = TempDir::new().unwrap();
        let store = BackupStore::new(temp_dir.path());
        std::fs::write(temp_dir.path().join("backup-z.sql"), "old").unwrap();

        let err = store.create("backup-z.sql").await.unwrap_err();
        assert!(matches!(err, Error::BackupExists(_)));

        let _first = store.create("backup-w.sql").await.unwrap();
        let err = store.create("backup-w.sql").await.unwrap_err();
        assert!(matches!(err, Error::BackupExists(_)));
    }

    #[tokio::test]
    async fn test_read_stays_inside_directory() {
        let temp_dir = TempDir::new().unwrap();
        let backups = temp_dir.path().join("bkups");
        std::fs::create_dir(&backups).unwrap();
        std::fs::write(temp_dir.path().join("secret.sql"), "secret").unwrap();

        let store = BackupStore::new(&backups);
        assert_eq!(store.read("../secret.sql").await.unwrap(), None);
        assert_eq!(store.read("../../etc/passwd").await.unwrap(), None);
        assert_eq!(store.read("..").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_only_returns_listed_text_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = BackupStore::new(temp_dir.path());
        std::fs::create_dir(temp_dir.path().join("dir.sql")).unwrap();
        std::fs::write(temp_dir.path().join("binary.sql"), [0xff, 0xfe, 0x00]).unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "n").unwrap();

        assert_eq!(store.read("dir.sql").await.unwrap(), None);
        assert_eq!(store.read("binary.sql").await.unwrap(), None);
        assert_eq!(store.read("notes.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_list_filters_non_dumps() {
        let temp_dir = TempDir::new().unwrap();
        let store = BackupStore::new(temp_dir.path());
        std::fs::write(temp_dir.path().join("backup-b.sql"), "b").unwrap();
        std::fs::write(temp_dir.path().join("backup-a.sql"), "a").unwrap();
        std::fs::write(temp_dir.path().join("notes.txt"), "n").unwrap();
        std::fs::write(temp_dir.path().join(".backup-c.sql.partial"), "c").unwrap();
        std::fs::create_dir(temp_dir.path().join("dir.sql")).unwrap();

        let names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.file_name)
            .collect();
        assert_eq!(names, vec!["backup-a.sql", "backup-b.sql"]);
    }

    #[tokio::test]
    async fn test_list_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let store = BackupStore::new(temp_dir.path().join("absent"));
        assert!(store.list().await.unwrap().is_empty());
    }
}
