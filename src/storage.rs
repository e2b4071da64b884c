use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use thiserror::Error;
use crate::model::FeedbackRecord;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Poisoned Lock")]
    Poisoned,
}

/// What `JsonFile::load` found on disk.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Vec<FeedbackRecord>),
    Missing,
    /// The file existed but could not be read or parsed. It will be
    /// overwritten by the next save.
    Recovered { reason: String },
}

impl LoadOutcome {
    pub fn into_records(self) -> Vec<FeedbackRecord> {
        match self {
            LoadOutcome::Loaded(records) => records,
            LoadOutcome::Missing | LoadOutcome::Recovered { .. } => Vec::new(),
        }
    }
}

/// The backing file: a JSON array of every record, rewritten whole on save.
#[derive(Debug, Clone)]
pub struct JsonFile {
    pub file_path: PathBuf,
}

impl JsonFile {
    pub fn new(path: &Path) -> Self {
        Self { file_path: path.to_path_buf() }
    }

    pub fn load(&self) -> LoadOutcome {
        let bytes = match fs::read(&self.file_path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return LoadOutcome::Missing,
            Err(e) => return LoadOutcome::Recovered { reason: e.to_string() },
        };

        match serde_json::from_slice::<Vec<FeedbackRecord>>(&bytes) {
            Ok(records) => LoadOutcome::Loaded(records),
            Err(e) => LoadOutcome::Recovered { reason: e.to_string() },
        }
    }

    pub fn save(&self, records: &[FeedbackRecord]) -> Result<(), StoreError> {
        // 4-space indent keeps files diff-compatible with older exports
        let mut bytes = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut bytes, PrettyFormatter::with_indent(b"    "));
        records.serialize(&mut serializer)?;

        if let Some(parent) = self.file_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // Write-then-rename so a crash never leaves a truncated file behind
        let tmp_path = self.tmp_path();
        let written = Self::write_synced(&tmp_path, &bytes)
            .and_then(|_| fs::rename(&tmp_path, &self.file_path));

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        Ok(())
    }

    fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = fs::File::create(path)?;
        file.write_all(bytes)?;
        file.sync_all()
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .file_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.file_path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sentiment;
    use tempfile::TempDir;

    fn record(product_id: &str, rating: i64, sentiment: Sentiment, themes: &[&str]) -> FeedbackRecord {
        FeedbackRecord {
            product_id: product_id.to_string(),
            rating,
            text: format!("review of {}", product_id),
            sentiment,
            themes: themes.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let file = JsonFile::new(&dir.path().join("feedback.json"));
        assert!(matches!(file.load(), LoadOutcome::Missing));
    }

    #[test]
    fn test_save_then_load_preserves_order() {
        let dir = TempDir::new().unwrap();
        let file = JsonFile::new(&dir.path().join("feedback.json"));
        let records = vec![
            record("P2", 1, Sentiment::Negative, &["Durability"]),
            record("P1", 5, Sentiment::Positive, &["Comfort", "Appearance"]),
            record("P2", 3, Sentiment::Positive, &[]),
        ];

        file.save(&records).unwrap();

        match file.load() {
            LoadOutcome::Loaded(loaded) => assert_eq!(loaded, records),
            other => panic!("expected Loaded, got {:?}", other),
        }
        assert!(!file.tmp_path().exists());
    }

    #[test]
    fn test_corrupt_file_is_recovered_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feedback.json");
        fs::write(&path, b"[{\"product_id\": \"P1\", \"rat").unwrap();

        let outcome = JsonFile::new(&path).load();
        assert!(matches!(outcome, LoadOutcome::Recovered { .. }));
        assert!(outcome.into_records().is_empty());
    }

    #[test]
    fn test_save_overwrites_previous_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feedback.json");
        fs::write(&path, b"not json at all").unwrap();

        let file = JsonFile::new(&path);
        file.save(&[record("P1", 4, Sentiment::Positive, &[])]).unwrap();

        assert_eq!(file.load().into_records().len(), 1);
    }

    #[test]
    fn test_save_creates_parent_dirs_and_indents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data").join("feedback.json");
        let file = JsonFile::new(&path);

        file.save(&[record("P1", 4, Sentiment::Positive, &[])]).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with("[\n    {\n        \"product_id\": \"P1\""));
    }

    #[test]
    fn test_failed_rename_removes_tmp_file() {
        let dir = TempDir::new().unwrap();
        // A non-empty directory at the target path makes the rename fail
        let path = dir.path().join("feedback.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        let file = JsonFile::new(&path);
        assert!(file.save(&[record("P1", 4, Sentiment::Positive, &[])]).is_err());
        assert!(!file.tmp_path().exists());
    }

    #[test]
    fn test_reads_legacy_file_without_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feedback.json");
        fs::write(
            &path,
            br#"[{"product_id": "P9", "rating": 2, "sentiment": "Negative", "themes": []}]"#,
        )
        .unwrap();

        let records = JsonFile::new(&path).load().into_records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "");
    }
}
