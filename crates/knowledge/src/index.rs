//! SQLite-backed vector index for review entries.
//!
//! Vectors are stored as little-endian `f32` blobs and scored in process.
//! One database file can hold several collections; each keeps its own
//! dimension and embedding model.

use crate::types::{CollectionStats, IndexEntry, ReviewMetadata, ScoredEntry};
use crate::vector_index::{cosine_similarity, id_order, VectorIndex};
use chrono::{DateTime, Utc};
use pizzarag_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS collections (
        name TEXT PRIMARY KEY,
        embedding_model TEXT,
        dimensions INTEGER,
        updated_at TEXT
    );

    CREATE TABLE IF NOT EXISTS entries (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        text TEXT NOT NULL,
        embedding BLOB NOT NULL,
        metadata TEXT NOT NULL,
        PRIMARY KEY (collection, id)
    );
"#;

/// Persistent vector index stored in a SQLite file.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
    collection: String,
}

impl std::fmt::Debug for SqliteIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteIndex")
            .field("collection", &self.collection)
            .finish()
    }
}

impl SqliteIndex {
    /// Open (or create) the index at `db_path` for `collection`.
    pub fn open(db_path: &Path, collection: &str) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Index(format!("Failed to create index directory: {}", e))
                })?;
            }
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;

        let index = Self::init(conn, collection)?;
        tracing::debug!(
            "Opened SQLite index at {:?} (collection '{}')",
            db_path,
            collection
        );
        Ok(index)
    }

    /// In-memory index, gone when dropped.
    pub fn open_in_memory(collection: &str) -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Index(format!("Failed to open SQLite index: {}", e)))?;
        Self::init(conn, collection)
    }

    fn init(conn: Connection, collection: &str) -> AppResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(|e| AppError::Index(format!("Failed to create tables: {}", e)))?;

        conn.execute(
            "INSERT OR IGNORE INTO collections (name) VALUES (?1)",
            params![collection],
        )
        .map_err(|e| AppError::Index(format!("Failed to register collection: {}", e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
            collection: collection.to_string(),
        })
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Index("SQLite connection lock poisoned".to_string()))
    }

    fn dimensions(&self, conn: &Connection) -> AppResult<Option<usize>> {
        let dims: Option<i64> = conn
            .query_row(
                "SELECT dimensions FROM collections WHERE name = ?1",
                params![self.collection],
                |row| row.get::<_, Option<i64>>(0),
            )
            .optional()
            .map_err(|e| AppError::Index(format!("Failed to read collection: {}", e)))?
            .flatten();
        Ok(dims.map(|d| d as usize))
    }

    fn load_entries(&self, conn: &Connection) -> AppResult<Vec<IndexEntry>> {
        let mut stmt = conn
            .prepare(
                "SELECT id, text, embedding, metadata FROM entries
                 WHERE collection = ?1 ORDER BY length(id), id",
            )
            .map_err(|e| AppError::Index(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![self.collection], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Vec<u8>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .map_err(|e| AppError::Index(format!("Failed to query entries: {}", e)))?;

        let mut entries = Vec::new();
        for row in rows {
            let (id, text, embedding_bytes, metadata_json) =
                row.map_err(|e| AppError::Index(format!("Failed to read entry: {}", e)))?;

            let metadata: ReviewMetadata = serde_json::from_str(&metadata_json).map_err(|e| {
                AppError::Index(format!("Corrupt metadata for entry '{}': {}", id, e))
            })?;

            entries.push(IndexEntry {
                embedding: bytes_to_embedding(&embedding_bytes)?,
                id,
                metadata,
                text,
            });
        }

        Ok(entries)
    }

    fn touch(&self, conn: &Connection) -> AppResult<()> {
        conn.execute(
            "UPDATE collections SET updated_at = ?1 WHERE name = ?2",
            params![Utc::now().to_rfc3339(), self.collection],
        )
        .map_err(|e| AppError::Index(format!("Failed to update collection: {}", e)))?;
        Ok(())
    }
}

impl VectorIndex for SqliteIndex {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn upsert(&mut self, entry: &IndexEntry) -> AppResult<()> {
        if entry.embedding.is_empty() {
            return Err(AppError::Index(format!(
                "Entry '{}' has an empty embedding",
                entry.id
            )));
        }

        let conn = self.conn()?;

        match self.dimensions(&conn)? {
            Some(dims) if dims != entry.embedding.len() => {
                return Err(AppError::Index(format!(
                    "Entry '{}' has {} dimensions, collection '{}' stores {}",
                    entry.id,
                    entry.embedding.len(),
                    self.collection,
                    dims
                )));
            }
            Some(_) => {}
            None => {
                conn.execute(
                    "UPDATE collections SET dimensions = ?1 WHERE name = ?2",
                    params![entry.embedding.len() as i64, self.collection],
                )
                .map_err(|e| AppError::Index(format!("Failed to update collection: {}", e)))?;
            }
        }

        let metadata_json = serde_json::to_string(&entry.metadata)?;

        conn.execute(
            "INSERT OR REPLACE INTO entries (collection, id, text, embedding, metadata)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                self.collection,
                entry.id,
                entry.text,
                embedding_to_bytes(&entry.embedding),
                metadata_json,
            ],
        )
        .map_err(|e| AppError::Index(format!("Failed to upsert entry '{}': {}", entry.id, e)))?;

        self.touch(&conn)
    }

    fn query(&self, embedding: &[f32], k: usize) -> AppResult<Vec<ScoredEntry>> {
        let conn = self.conn()?;

        if let Some(dims) = self.dimensions(&conn)? {
            if dims != embedding.len() {
                return Err(AppError::Index(format!(
                    "Query has {} dimensions, collection '{}' stores {}",
                    embedding.len(),
                    self.collection,
                    dims
                )));
            }
        }

        let mut results: Vec<ScoredEntry> = self
            .load_entries(&conn)?
            .into_iter()
            .map(|entry| {
                let score = cosine_similarity(embedding, &entry.embedding);
                ScoredEntry { entry, score }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| id_order(&a.entry.id, &b.entry.id))
        });
        results.truncate(k);

        tracing::debug!(
            "Retrieved {} entries (requested top-{})",
            results.len(),
            k
        );

        Ok(results)
    }

    fn get_all(&self) -> AppResult<Vec<IndexEntry>> {
        let conn = self.conn()?;
        self.load_entries(&conn)
    }

    fn count(&self) -> AppResult<usize> {
        let conn = self.conn()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM entries WHERE collection = ?1",
                params![self.collection],
                |row| row.get(0),
            )
            .map_err(|e| AppError::Index(format!("Failed to count entries: {}", e)))?;
        Ok(count as usize)
    }

    fn reset(&mut self) -> AppResult<()> {
        let conn = self.conn()?;

        conn.execute(
            "DELETE FROM entries WHERE collection = ?1",
            params![self.collection],
        )
        .map_err(|e| AppError::Index(format!("Failed to delete entries: {}", e)))?;

        conn.execute(
            "UPDATE collections SET embedding_model = NULL, dimensions = NULL WHERE name = ?1",
            params![self.collection],
        )
        .map_err(|e| AppError::Index(format!("Failed to reset collection: {}", e)))?;

        tracing::info!("Reset collection '{}'", self.collection);
        Ok(())
    }

    fn embedding_model(&self) -> AppResult<Option<String>> {
        let conn = self.conn()?;
        let model: Option<String> = conn
            .query_row(
                "SELECT embedding_model FROM collections WHERE name = ?1",
                params![self.collection],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()
            .map_err(|e| AppError::Index(format!("Failed to read collection: {}", e)))?
            .flatten();
        Ok(model)
    }

    fn set_embedding_model(&mut self, model: &str) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE collections SET embedding_model = ?1 WHERE name = ?2",
            params![model, self.collection],
        )
        .map_err(|e| AppError::Index(format!("Failed to record embedding model: {}", e)))?;
        Ok(())
    }

    fn stats(&self) -> AppResult<CollectionStats> {
        let entries = self.count()?;
        let conn = self.conn()?;

        let (embedding_model, dimensions, updated_at) = conn
            .query_row(
                "SELECT embedding_model, dimensions, updated_at FROM collections WHERE name = ?1",
                params![self.collection],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .map_err(|e| AppError::Index(format!("Failed to read collection: {}", e)))?;

        let updated_at = updated_at
            .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
            .map(|ts| ts.with_timezone(&Utc));

        Ok(CollectionStats {
            collection: self.collection.clone(),
            entries,
            embedding_model,
            dimensions: dimensions.map(|d| d as usize),
            updated_at,
        })
    }
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Index(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(id: &str, embedding: Vec<f32>) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            embedding,
            metadata: ReviewMetadata {
                rating: 4.0,
                date: "2024-01-01".to_string(),
            },
            text: format!("review {}", id),
        }
    }

    #[test]
    fn test_insert_and_query() {
        let mut index = SqliteIndex::open_in_memory("reviews").unwrap();
        index.upsert(&entry("0", vec![1.0, 0.0, 0.0])).unwrap();
        index.upsert(&entry("1", vec![0.0, 1.0, 0.0])).unwrap();

        let results = index.query(&[1.0, 0.1, 0.0], 5).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].entry.id, "0");
        assert!(results[0].score > results[1].score);
        assert_eq!(results[0].entry.metadata.date, "2024-01-01");
    }

    #[test]
    fn test_query_truncates_to_k() {
        let mut index = SqliteIndex::open_in_memory("reviews").unwrap();
        for i in 0..10 {
            index
                .upsert(&entry(&i.to_string(), vec![1.0, i as f32]))
                .unwrap();
        }

        assert_eq!(index.query(&[1.0, 0.0], 3).unwrap().len(), 3);
        assert_eq!(index.query(&[1.0, 0.0], 50).unwrap().len(), 10);
    }

    #[test]
    fn test_ties_keep_ascending_id_order() {
        let mut index = SqliteIndex::open_in_memory("reviews").unwrap();
        for id in ["10", "2", "1"] {
            index.upsert(&entry(id, vec![1.0, 0.0])).unwrap();
        }

        let ids: Vec<String> = index
            .query(&[1.0, 0.0], 3)
            .unwrap()
            .into_iter()
            .map(|r| r.entry.id)
            .collect();
        assert_eq!(ids, vec!["1", "2", "10"]);
    }

    #[test]
    fn test_upsert_replaces_existing_id() {
        let mut index = SqliteIndex::open_in_memory("reviews").unwrap();
        index.upsert(&entry("0", vec![1.0, 0.0])).unwrap();

        let mut updated = entry("0", vec![0.0, 1.0]);
        updated.text = "edited".to_string();
        index.upsert(&updated).unwrap();

        assert_eq!(index.count().unwrap(), 1);
        assert_eq!(index.get_all().unwrap()[0].text, "edited");
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let mut index = SqliteIndex::open_in_memory("reviews").unwrap();
        index.upsert(&entry("0", vec![1.0, 0.0, 0.0])).unwrap();

        assert!(matches!(
            index.upsert(&entry("1", vec![1.0, 0.0])),
            Err(AppError::Index(_))
        ));
        assert!(matches!(index.query(&[1.0], 1), Err(AppError::Index(_))));
    }

    #[test]
    fn test_empty_index_query() {
        let index = SqliteIndex::open_in_memory("reviews").unwrap();
        assert!(index.query(&[1.0, 0.0], 5).unwrap().is_empty());
        assert_eq!(index.count().unwrap(), 0);
    }

    #[test]
    fn test_reset_clears_entries_and_model() {
        let mut index = SqliteIndex::open_in_memory("reviews").unwrap();
        index.set_embedding_model("mxbai-embed-large").unwrap();
        index.upsert(&entry("0", vec![1.0, 0.0])).unwrap();

        index.reset().unwrap();

        assert_eq!(index.count().unwrap(), 0);
        assert_eq!(index.embedding_model().unwrap(), None);
        // A new dimension is accepted after reset
        index.upsert(&entry("0", vec![1.0, 0.0, 0.0])).unwrap();
    }

    #[test]
    fn test_collections_are_isolated() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("db").join("reviews.sqlite");

        let mut first = SqliteIndex::open(&path, "first").unwrap();
        first.upsert(&entry("0", vec![1.0, 0.0])).unwrap();

        let second = SqliteIndex::open(&path, "second").unwrap();
        assert_eq!(second.count().unwrap(), 0);
        assert_eq!(first.count().unwrap(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("reviews.sqlite");

        {
            let mut index = SqliteIndex::open(&path, "reviews").unwrap();
            index.set_embedding_model("mxbai-embed-large").unwrap();
            index.upsert(&entry("0", vec![0.5, 0.5])).unwrap();
        }

        let index = SqliteIndex::open(&path, "reviews").unwrap();
        let stats = index.stats().unwrap();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.dimensions, Some(2));
        assert_eq!(stats.embedding_model.as_deref(), Some("mxbai-embed-large"));
        assert!(stats.updated_at.is_some());
        assert_eq!(index.get_all().unwrap()[0].embedding, vec![0.5, 0.5]);
    }

    #[test]
    fn test_embedding_bytes_roundtrip() {
        let embedding = vec![0.25, -1.5, 3.0];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), embedding);
        assert!(bytes_to_embedding(&bytes[..5]).is_err());
    }
}
