//! SQLite-backed vector index.
//!
//! Each logical index is one table in the database file. Embeddings are
//! stored as little-endian f32 blobs and scored in process; metadata filters
//! are pushed down with `json_extract`.

use crate::vector_index::{rank, IndexRecord, MetadataFilter, VectorIndex};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use syllabus_core::{AppError, AppResult};

/// A vector index stored in one SQLite table.
pub struct SqliteIndex {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteIndex {
    /// Open (or create) `table` in the database at `db_path`.
    pub fn open(db_path: &Path, table: &str) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create index directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;

        tracing::debug!("Opened SQLite index '{}' at {:?}", table, db_path);
        Self::with_connection(conn, table)
    }

    /// Create `table` in a private in-memory database.
    pub fn open_in_memory(table: &str) -> AppResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Knowledge(format!("Failed to open SQLite index: {}", e)))?;
        Self::with_connection(conn, table)
    }

    fn with_connection(conn: Connection, table: &str) -> AppResult<Self> {
        validate_table_name(table)?;

        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                text TEXT NOT NULL,
                embedding BLOB NOT NULL,
                metadata TEXT NOT NULL
            );
            "#
        ))
        .map_err(|e| AppError::Knowledge(format!("Failed to create table '{}': {}", table, e)))?;

        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Knowledge("SQLite connection lock poisoned".to_string()))
    }
}

impl VectorIndex for SqliteIndex {
    fn upsert(&self, records: Vec<IndexRecord>) -> AppResult<()> {
        let mut conn = self.conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT OR REPLACE INTO {} (id, text, embedding, metadata) VALUES (?1, ?2, ?3, ?4)",
                    self.table
                ))
                .map_err(|e| AppError::Knowledge(format!("Failed to prepare insert: {}", e)))?;

            for record in &records {
                let metadata_json = serde_json::to_string(&record.metadata)?;
                stmt.execute(params![
                    record.id,
                    record.text,
                    embedding_to_bytes(&record.embedding),
                    metadata_json,
                ])
                .map_err(|e| {
                    AppError::Knowledge(format!("Failed to insert record '{}': {}", record.id, e))
                })?;
            }
        }

        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit records: {}", e)))?;

        tracing::debug!("Upserted {} records into '{}'", records.len(), self.table);
        Ok(())
    }

    fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> AppResult<Vec<(IndexRecord, f32)>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT id, text, embedding, metadata FROM {} \
                 WHERE (?1 IS NULL OR json_extract(metadata, '$.course_title') = ?1) \
                 AND (?2 IS NULL OR json_extract(metadata, '$.lesson_number') = ?2)",
                self.table
            ))
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(
                params![filter.course_title, filter.lesson_number.map(i64::from)],
                read_row,
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to query records: {}", e)))?;

        let candidates = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| AppError::Knowledge(format!("Failed to read record: {}", e)))?;

        // Filter already applied in SQL
        let results = rank(candidates, embedding, top_k, &MetadataFilter::default());

        tracing::debug!(
            "Retrieved {} records from '{}' (requested top-{})",
            results.len(),
            self.table,
            top_k
        );

        Ok(results)
    }

    fn get(&self, id: &str) -> AppResult<Option<IndexRecord>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT id, text, embedding, metadata FROM {} WHERE id = ?1",
                self.table
            ),
            params![id],
            read_row,
        )
        .optional()
        .map_err(|e| AppError::Knowledge(format!("Failed to get record '{}': {}", id, e)))
    }

    fn ids(&self) -> AppResult<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!("SELECT id FROM {} ORDER BY id", self.table))
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare id query: {}", e)))?;

        let ids = stmt
            .query_map([], |row| row.get(0))
            .and_then(|rows| rows.collect::<Result<Vec<String>, _>>())
            .map_err(|e| AppError::Knowledge(format!("Failed to list ids: {}", e)))?;

        Ok(ids)
    }

    fn count(&self) -> AppResult<usize> {
        let conn = self.conn()?;
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| {
            row.get::<_, i64>(0)
        })
        .map(|n| n as usize)
        .map_err(|e| AppError::Knowledge(format!("Failed to count records: {}", e)))
    }

    fn clear(&self) -> AppResult<()> {
        let conn = self.conn()?;
        conn.execute(&format!("DELETE FROM {}", self.table), [])
            .map_err(|e| AppError::Knowledge(format!("Failed to clear '{}': {}", self.table, e)))?;

        tracing::info!("Cleared index '{}'", self.table);
        Ok(())
    }
}

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<IndexRecord> {
    let embedding_bytes: Vec<u8> = row.get(2)?;
    let embedding = bytes_to_embedding(&embedding_bytes).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Blob, Box::new(e))
    })?;

    let metadata_json: String = row.get(3)?;
    let metadata: serde_json::Value = serde_json::from_str(&metadata_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(IndexRecord {
        id: row.get(0)?,
        text: row.get(1)?,
        embedding,
        metadata,
    })
}

/// Table names are interpolated into SQL, so only identifiers are allowed.
fn validate_table_name(table: &str) -> AppResult<()> {
    let valid = !table.is_empty()
        && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !table.starts_with(|c: char| c.is_ascii_digit());

    if valid {
        Ok(())
    } else {
        Err(AppError::Knowledge(format!(
            "Invalid index table name: '{}'",
            table
        )))
    }
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(embedding.len() * 4);
    for &value in embedding {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
