// Postgres-backed storage. Dynamic SQL is built from the entity descriptors;
// rows come back through row_to_json so the column mapping stays generic.
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::{PgPool, QueryBuilder, Row};
use std::time::Duration;

use crate::domain;
use crate::storage::{record_id, EntityKind, Record, Storage, StorageError};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        connection_timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(connection_timeout_secs))
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn push_value(
        separated: &mut sqlx::query_builder::Separated<'_, '_, Postgres, &'static str>,
        field: &str,
        value: Option<&Value>,
    ) -> Result<(), StorageError> {
        match value {
            Some(Value::String(s)) => {
                separated.push_bind(s.clone());
                Ok(())
            }
            Some(Value::Number(n)) => match n.as_i64() {
                Some(i) => {
                    separated.push_bind(i);
                    Ok(())
                }
                None => Err(StorageError::Query(format!(
                    "non-integer numeric value for field '{}'",
                    field
                ))),
            },
            Some(Value::Null) | None => {
                separated.push_bind(Option::<String>::None);
                Ok(())
            }
            Some(other) => Err(StorageError::Query(format!(
                "unsupported value {:?} for field '{}'",
                other, field
            ))),
        }
    }

    fn constraint_error(kind: EntityKind, record: &Record, err: sqlx::Error) -> StorageError {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                let field = domain::descriptor(kind).unique_field;
                let value = record
                    .get(field)
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                return StorageError::Conflict {
                    field: field.to_string(),
                    value,
                };
            }
        }
        StorageError::Sqlx(err)
    }
}

#[async_trait]
impl Storage for PgStore {
    async fn find_all(&self, kind: EntityKind) -> Result<Vec<Record>, StorageError> {
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM \"{}\" ORDER BY id) t",
            kind.table()
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            match row.try_get::<Value, _>("row") {
                Ok(Value::Object(map)) => records.push(map),
                Ok(other) => {
                    return Err(StorageError::Query(format!(
                        "unexpected row shape from {}: {:?}",
                        kind.table(),
                        other
                    )))
                }
                Err(e) => return Err(StorageError::Sqlx(e)),
            }
        }
        Ok(records)
    }

    async fn find_by_id(&self, kind: EntityKind, id: i64) -> Result<Option<Record>, StorageError> {
        let sql = format!(
            "SELECT row_to_json(t) AS row FROM (SELECT * FROM \"{}\" WHERE id = $1) t",
            kind.table()
        );
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => match row.try_get::<Value, _>("row") {
                Ok(Value::Object(map)) => Ok(Some(map)),
                Ok(_) => Err(StorageError::Query(format!(
                    "unexpected row shape from {}",
                    kind.table()
                ))),
                Err(e) => Err(StorageError::Sqlx(e)),
            },
            None => Ok(None),
        }
    }

    async fn insert(&self, kind: EntityKind, mut record: Record) -> Result<Record, StorageError> {
        let descriptor = domain::descriptor(kind);

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO \"{}\" (", kind.table()));
        let mut columns = builder.separated(", ");
        for field in descriptor.fields {
            columns.push(format!("\"{}\"", field.name));
        }
        builder.push(") VALUES (");
        let mut values = builder.separated(", ");
        for field in descriptor.fields {
            Self::push_value(&mut values, field.name, record.get(field.name))?;
        }
        builder.push(") RETURNING id");

        let row = builder
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| Self::constraint_error(kind, &record, e))?;
        let id: i64 = row.try_get("id")?;
        record.insert("id".to_string(), Value::from(id));
        Ok(record)
    }

    async fn update(&self, kind: EntityKind, record: Record) -> Result<Record, StorageError> {
        let id = record_id(&record)
            .ok_or_else(|| StorageError::Query("update requires an id field".to_string()))?;
        let descriptor = domain::descriptor(kind);

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("UPDATE \"{}\" SET ", kind.table()));
        let mut assignments = builder.separated(", ");
        for field in descriptor.fields {
            assignments.push(format!("\"{}\" = ", field.name));
            match record.get(field.name) {
                Some(Value::String(s)) => {
                    assignments.push_bind_unseparated(s.clone());
                }
                Some(Value::Number(n)) => {
                    let i = n.as_i64().ok_or_else(|| {
                        StorageError::Query(format!(
                            "non-integer numeric value for field '{}'",
                            field.name
                        ))
                    })?;
                    assignments.push_bind_unseparated(i);
                }
                _ => {
                    assignments.push_bind_unseparated(Option::<String>::None);
                }
            }
        }
        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(" RETURNING id");

        let row = builder
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Self::constraint_error(kind, &record, e))?;
        match row {
            Some(_) => Ok(record),
            None => Err(StorageError::NotFound(format!(
                "{} id {} not found",
                kind.table(),
                id
            ))),
        }
    }

    async fn delete(&self, kind: EntityKind, id: i64) -> Result<(), StorageError> {
        let sql = format!("DELETE FROM \"{}\" WHERE id = $1", kind.table());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
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
        // Compared as text so reference fields and text fields go through the
        // same path.
        let sql = match exclude_id {
            Some(_) => format!(
                "SELECT EXISTS(SELECT 1 FROM \"{}\" WHERE \"{}\"::text = $1 AND id <> $2) AS hit",
                kind.table(),
                field
            ),
            None => format!(
                "SELECT EXISTS(SELECT 1 FROM \"{}\" WHERE \"{}\"::text = $1) AS hit",
                kind.table(),
                field
            ),
        };
        let mut query = sqlx::query(&sql).bind(value);
        if let Some(ex) = exclude_id {
            query = query.bind(ex);
        }
        let row = query.fetch_one(&self.pool).await?;
        Ok(row.try_get("hit")?)
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
