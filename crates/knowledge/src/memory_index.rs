//! In-memory vector index.

use crate::vector_index::{rank, IndexRecord, MetadataFilter, VectorIndex};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use syllabus_core::{AppError, AppResult};

/// Brute-force index held in process memory. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    records: RwLock<BTreeMap<String, IndexRecord>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AppResult<RwLockReadGuard<'_, BTreeMap<String, IndexRecord>>> {
        self.records
            .read()
            .map_err(|_| AppError::Knowledge("Memory index lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<RwLockWriteGuard<'_, BTreeMap<String, IndexRecord>>> {
        self.records
            .write()
            .map_err(|_| AppError::Knowledge("Memory index lock poisoned".to_string()))
    }
}

impl VectorIndex for MemoryIndex {
    fn upsert(&self, records: Vec<IndexRecord>) -> AppResult<()> {
        let mut map = self.write()?;
        for record in records {
            map.insert(record.id.clone(), record);
        }
        Ok(())
    }

    fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: &MetadataFilter,
    ) -> AppResult<Vec<(IndexRecord, f32)>> {
        let map = self.read()?;
        Ok(rank(map.values().cloned(), embedding, top_k, filter))
    }

    fn get(&self, id: &str) -> AppResult<Option<IndexRecord>> {
        Ok(self.read()?.get(id).cloned())
    }

    fn ids(&self) -> AppResult<Vec<String>> {
        Ok(self.read()?.keys().cloned().collect())
    }

    fn count(&self) -> AppResult<usize> {
        Ok(self.read()?.len())
    }

    fn clear(&self) -> AppResult<()> {
        self.write()?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, embedding: Vec<f32>) -> IndexRecord {
        IndexRecord {
            id: id.to_string(),
            text: format!("text of {}", id),
            embedding,
            metadata: json!({"course_title": "C"}),
        }
    }

    #[test]
    fn test_upsert_replaces_by_id() {
        let index = MemoryIndex::new();
        index.upsert(vec![record("a", vec![1.0, 0.0])]).unwrap();
        index
            .upsert(vec![IndexRecord {
                text: "updated".to_string(),
                ..record("a", vec![0.0, 1.0])
            }])
            .unwrap();

        assert_eq!(index.count().unwrap(), 1);
        assert_eq!(index.get("a").unwrap().unwrap().text, "updated");
    }

    #[test]
    fn test_query_and_clear() {
        let index = MemoryIndex::new();
        index
            .upsert(vec![record("a", vec![1.0, 0.0]), record("b", vec![0.0, 1.0])])
            .unwrap();

        let results = index
            .query(&[0.0, 1.0], 5, &MetadataFilter::default())
            .unwrap();
        assert_eq!(results[0].0.id, "b");
        assert_eq!(index.ids().unwrap(), vec!["a", "b"]);

        index.clear().unwrap();
        assert_eq!(index.count().unwrap(), 0);
        assert!(index.get("a").unwrap().is_none());
    }
}
