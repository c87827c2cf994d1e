//! Review knowledge type definitions.

use chrono::{DateTime, Utc};
use pizzarag_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// One row of the review file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Zero-based row index, as a string
    pub id: String,

    /// Title and review body joined by a space
    pub text: String,

    /// Star rating
    pub rating: f64,

    /// Review date as written in the file
    pub date: String,
}

impl ReviewRecord {
    /// Metadata stored next to the record's embedding.
    pub fn metadata(&self) -> ReviewMetadata {
        ReviewMetadata {
            rating: self.rating,
            date: self.date.clone(),
        }
    }
}

/// Metadata attached to each index entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewMetadata {
    pub rating: f64,
    pub date: String,
}

/// A record as stored in the vector index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Record id, unique within a collection
    pub id: String,

    /// Embedding of `text`
    #[serde(skip_serializing, default)]
    pub embedding: Vec<f32>,

    /// Rating and date
    pub metadata: ReviewMetadata,

    /// Review text as loaded
    pub text: String,
}

impl IndexEntry {
    /// Pair a record with its embedding.
    pub fn from_record(record: &ReviewRecord, embedding: Vec<f32>) -> Self {
        Self {
            id: record.id.clone(),
            embedding,
            metadata: record.metadata(),
            text: record.text.clone(),
        }
    }
}

/// An index entry with its similarity to a query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredEntry {
    #[serde(flatten)]
    pub entry: IndexEntry,

    /// Cosine similarity, higher is closer
    pub score: f32,
}

/// A record that could not be indexed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexFailure {
    pub id: String,
    pub reason: String,
}

/// Outcome of an indexing run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    /// Records embedded and written during this run
    pub indexed: usize,

    /// Records that failed, in input order
    pub failures: Vec<IndexFailure>,

    /// True when the reindex policy skipped indexing
    pub skipped: bool,

    /// Entries in the collection after the run
    pub entries: usize,
}

impl IndexReport {
    /// Whether every input record made it into the index.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Convert a report with failures into an `AppError::Indexing` naming the first failure.
    pub fn into_result(self) -> AppResult<IndexReport> {
        match self.failures.first() {
            None => Ok(self),
            Some(first) => Err(AppError::Indexing {
                id: first.id.clone(),
                reason: first.reason.clone(),
                failed: self.failures.len(),
                indexed: self.indexed,
            }),
        }
    }
}

/// One question answered by the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Interaction {
    pub question: String,
    pub retrieved: Vec<ScoredEntry>,
    pub answer: String,
}

/// Summary of a collection, used by the `stats` command.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionStats {
    pub collection: String,
    pub entries: usize,
    pub embedding_model: Option<String>,
    pub dimensions: Option<usize>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_report_passes_through() {
        let report = IndexReport {
            indexed: 3,
            entries: 3,
            ..Default::default()
        };
        assert!(report.is_complete());
        assert_eq!(report.into_result().unwrap().indexed, 3);
    }

    #[test]
    fn test_failed_report_names_first_failure() {
        let report = IndexReport {
            indexed: 8,
            failures: vec![
                IndexFailure {
                    id: "4".to_string(),
                    reason: "timeout".to_string(),
                },
                IndexFailure {
                    id: "9".to_string(),
                    reason: "timeout".to_string(),
                },
            ],
            skipped: false,
            entries: 8,
        };

        match report.into_result() {
            Err(AppError::Indexing {
                id,
                failed,
                indexed,
                ..
            }) => {
                assert_eq!(id, "4");
                assert_eq!(failed, 2);
                assert_eq!(indexed, 8);
            }
            other => panic!("Expected indexing error, got {:?}", other),
        }
    }

    #[test]
    fn test_scored_entry_json_omits_embedding() {
        let entry = ScoredEntry {
            entry: IndexEntry {
                id: "0".to_string(),
                embedding: vec![0.1, 0.2],
                metadata: ReviewMetadata {
                    rating: 5.0,
                    date: "2024-01-01".to_string(),
                },
                text: "Great pizza".to_string(),
            },
            score: 0.9,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], "0");
        assert!(json.get("embedding").is_none());
        assert_eq!(json["metadata"]["date"], "2024-01-01");
    }
}
