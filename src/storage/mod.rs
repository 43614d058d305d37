// Persistence engine contract consumed by the controllers.
use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Dynamic record shape shared by every entity type. Typed structure lives in
/// the entity descriptors, not in the record itself.
pub type Record = Map<String, Value>;

/// The four managed entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Area,
    Duvida,
    Projeto,
    Tag,
}

impl EntityKind {
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Area => "area",
            EntityKind::Duvida => "duvida",
            EntityKind::Projeto => "projeto",
            EntityKind::Tag => "tag",
        }
    }
}

/// Errors from the persistence engine.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Value '{value}' already exists for field '{field}'")]
    Conflict { field: String, value: String },

    #[error("Query error: {0}")]
    Query(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Storage contract. Implemented by the Postgres store in production and the
/// in-memory store in tests; controllers never see past this trait.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Every record of the given kind, in persistence order.
    async fn find_all(&self, kind: EntityKind) -> Result<Vec<Record>, StorageError>;

    /// A single record by id. Absence is `Ok(None)`, not an error.
    async fn find_by_id(&self, kind: EntityKind, id: i64) -> Result<Option<Record>, StorageError>;

    /// Insert a record without an id; returns it with the assigned id.
    /// A unique-constraint violation surfaces as `StorageError::Conflict`.
    async fn insert(&self, kind: EntityKind, record: Record) -> Result<Record, StorageError>;

    /// Persist changes to an existing record, addressed by its `id` field.
    async fn update(&self, kind: EntityKind, record: Record) -> Result<Record, StorageError>;

    /// Delete by id. A missing id is `StorageError::NotFound`, never a no-op.
    async fn delete(&self, kind: EntityKind, id: i64) -> Result<(), StorageError>;

    /// Whether any record (other than `exclude_id`, when given) already holds
    /// `value` in `field`.
    async fn exists_with_field(
        &self,
        kind: EntityKind,
        field: &str,
        value: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool, StorageError>;

    /// Liveness probe for the health endpoint.
    async fn ping(&self) -> Result<(), StorageError>;
}

/// Read the numeric id out of a record, when present.
pub fn record_id(record: &Record) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}
