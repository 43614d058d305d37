// In-memory store: the injectable test double for the storage contract.
//
// Enforces the same uniqueness constraints the Postgres schema declares, so
// the controller's pre-check-then-insert race handling can be exercised
// without a database.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::domain;
use crate::storage::{record_id, EntityKind, Record, Storage, StorageError};

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: Vec<Record>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<HashMap<EntityKind, Table>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn field_matches(row: &Record, field: &str, value: &str) -> bool {
        match row.get(field) {
            Some(Value::String(s)) => s == value,
            Some(Value::Number(n)) => n.to_string() == value,
            _ => false,
        }
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn find_all(&self, kind: EntityKind) -> Result<Vec<Record>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.get(&kind).map(|t| t.rows.clone()).unwrap_or_default())
    }

    async fn find_by_id(&self, kind: EntityKind, id: i64) -> Result<Option<Record>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&kind)
            .and_then(|t| t.rows.iter().find(|r| record_id(r) == Some(id)))
            .cloned())
    }

    async fn insert(&self, kind: EntityKind, mut record: Record) -> Result<Record, StorageError> {
        let unique = domain::descriptor(kind).unique_field;
        let mut tables = self.tables.write().await;
        let table = tables.entry(kind).or_default();

        if let Some(Value::String(value)) = record.get(unique) {
            if table.rows.iter().any(|r| Self::field_matches(r, unique, value)) {
                return Err(StorageError::Conflict {
                    field: unique.to_string(),
                    value: value.clone(),
                });
            }
        }

        table.next_id += 1;
        record.insert("id".to_string(), Value::from(table.next_id));
        table.rows.push(record.clone());
        Ok(record)
    }

    async fn update(&self, kind: EntityKind, record: Record) -> Result<Record, StorageError> {
        let id = record_id(&record)
            .ok_or_else(|| StorageError::Query("update requires an id field".to_string()))?;
        let unique = domain::descriptor(kind).unique_field;
        let mut tables = self.tables.write().await;
        let table = tables.entry(kind).or_default();

        if let Some(Value::String(value)) = record.get(unique) {
            let taken = table
                .rows
                .iter()
                .any(|r| record_id(r) != Some(id) && Self::field_matches(r, unique, value));
            if taken {
                return Err(StorageError::Conflict {
                    field: unique.to_string(),
                    value: value.clone(),
                });
            }
        }

        match table.rows.iter_mut().find(|r| record_id(r) == Some(id)) {
            Some(row) => {
                *row = record.clone();
                Ok(record)
            }
            None => Err(StorageError::NotFound(format!(
                "{} id {} not found",
                kind.table(),
                id
            ))),
        }
    }

    async fn delete(&self, kind: EntityKind, id: i64) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        let table = tables.entry(kind).or_default();
        let before = table.rows.len();
        table.rows.retain(|r| record_id(r) != Some(id));
        if table.rows.len() == before {
            return Err(StorageError::NotFound(format!(
                "{} id {} not found",
                kind.table(),
                id
            )));
        }
        Ok(())
    }

    async fn exists_with_field(
        &self,
        kind: EntityKind,
        field: &str,
        value: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.get(&kind).is_some_and(|t| {
            t.rows.iter().any(|r| {
                Self::field_matches(r, field, value)
                    && exclude_id.map_or(true, |ex| record_id(r) != Some(ex))
            })
        }))
    }

    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
