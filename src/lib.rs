pub mod model;
pub mod lexicon;
pub mod classifier;
pub mod storage;
pub mod server;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use crate::model::{Analysis, FeedbackRecord, NewFeedback};
use crate::storage::{JsonFile, LoadOutcome, StoreError};

/// Tallies over one product's reviews.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FeedbackStats {
    pub sentiment: BTreeMap<String, usize>,
    pub themes: BTreeMap<String, usize>,
}

/// Body of `GET /api/feedback/<product_id>`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ProductFeedback {
    pub reviews: Vec<FeedbackRecord>,
    pub stats: FeedbackStats,
}

/// In-memory feedback collection mirrored 1:1 to a JSON file.
///
/// The mutex covers append and persist together so concurrent submissions
/// cannot overwrite each other's records on disk.
pub struct FeedbackDb {
    records: Mutex<Vec<FeedbackRecord>>,
    file: JsonFile,
}

impl fmt::Debug for FeedbackDb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedbackDb")
        .field("file", &self.file.file_path)
        .field("record_count", &self.len())
        .finish()
    }
}

impl FeedbackDb {
    /// Loads the backing file once. A missing or unreadable file starts an
    /// empty collection.
    pub fn open(path: &Path) -> Self {
        let file = JsonFile::new(path);

        let outcome = file.load();
        match &outcome {
            LoadOutcome::Loaded(records) => {
                info!(path = %path.display(), count = records.len(), "Loaded feedback");
            }
            LoadOutcome::Missing => {
                info!(path = %path.display(), "No feedback file yet, starting empty");
            }
            LoadOutcome::Recovered { reason } => {
                warn!(path = %path.display(), %reason, "Discarding unreadable feedback file");
            }
        }

        Self {
            records: Mutex::new(outcome.into_records()),
            file,
        }
    }

    /// Classifies and stores one submission.
    ///
    /// If the file write fails the record is taken back out of memory and
    /// the error is returned, so memory never holds records the file lacks.
    pub fn submit(&self, feedback: NewFeedback) -> Result<Analysis, StoreError> {
        let analysis = classifier::analyze(&feedback.text);
        let record = FeedbackRecord::new(feedback, analysis.clone());

        let mut records = self.records.lock().map_err(|_| StoreError::Poisoned)?;
        records.push(record);

        if let Err(e) = self.file.save(&records) {
            records.pop();
            return Err(e);
        }

        debug!(total = records.len(), sentiment = %analysis.sentiment, "Stored feedback");
        Ok(analysis)
    }

    pub fn product_feedback(&self, product_id: &str) -> ProductFeedback {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());

        let reviews: Vec<FeedbackRecord> = records
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();

        let mut stats = FeedbackStats::default();
        for review in &reviews {
            *stats.sentiment.entry(review.sentiment.to_string()).or_insert(0) += 1;
            for theme in &review.themes {
                *stats.themes.entry(theme.clone()).or_insert(0) += 1;
            }
        }

        ProductFeedback { reviews, stats }
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or_else(|e| e.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
