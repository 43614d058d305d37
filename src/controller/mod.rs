// Entity controllers: one generic implementation, parameterized by the
// entity descriptor, wrapping the storage contract with validation.
use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::domain::{EntityDescriptor, FieldKind};
use crate::storage::{record_id, Record, Storage, StorageError};

/// Raw form submission, field name -> raw value.
pub type FormFields = BTreeMap<String, String>;

/// Recoverable rejection of submitted data. Carries the submitted raw values
/// so the originating form can be redisplayed pre-filled.
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    pub message: String,
    pub echoed: BTreeMap<String, String>,
}

/// Outcome of a create or update. Storage faults travel separately as
/// `Err(StorageError)`; a rejection is a normal, recoverable value.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved(Record),
    Rejected(ValidationFailure),
}

pub struct EntityController {
    descriptor: &'static EntityDescriptor,
    store: Arc<dyn Storage>,
}

impl EntityController {
    pub fn new(descriptor: &'static EntityDescriptor, store: Arc<dyn Storage>) -> Self {
        Self { descriptor, store }
    }

    pub fn descriptor(&self) -> &'static EntityDescriptor {
        self.descriptor
    }

    /// Every record, in persistence order. No pagination.
    pub async fn list_all(&self) -> Result<Vec<Record>, StorageError> {
        self.store.find_all(self.descriptor.kind).await
    }

    /// Absence is `Ok(None)`; callers decide whether that is a 404.
    pub async fn get_one(&self, id: i64) -> Result<Option<Record>, StorageError> {
        self.store.find_by_id(self.descriptor.kind, id).await
    }

    pub async fn create(&self, fields: &FormFields) -> Result<SaveOutcome, StorageError> {
        let record = match self.validate(fields, None).await? {
            Ok(record) => record,
            Err(failure) => return Ok(SaveOutcome::Rejected(failure)),
        };

        match self.store.insert(self.descriptor.kind, record).await {
            Ok(saved) => {
                tracing::info!(entity = self.descriptor.kind.table(), "record created");
                Ok(SaveOutcome::Saved(saved))
            }
            // The pre-check is best-effort; the store constraint is the
            // authoritative rejection when two creates race.
            Err(StorageError::Conflict { value, .. }) => {
                Ok(SaveOutcome::Rejected(self.in_use(fields, &value)))
            }
            Err(other) => Err(other),
        }
    }

    /// Same validation as create, except the uniqueness check excludes the
    /// record's own id so it may keep its current value.
    pub async fn update(
        &self,
        existing: &Record,
        fields: &FormFields,
    ) -> Result<SaveOutcome, StorageError> {
        let own_id = record_id(existing);
        let mut record = match self.validate(fields, own_id).await? {
            Ok(record) => record,
            Err(failure) => return Ok(SaveOutcome::Rejected(failure)),
        };
        if let Some(id) = own_id {
            record.insert("id".to_string(), Value::from(id));
        }

        match self.store.update(self.descriptor.kind, record).await {
            Ok(saved) => {
                tracing::info!(entity = self.descriptor.kind.table(), "record updated");
                Ok(SaveOutcome::Saved(saved))
            }
            Err(StorageError::Conflict { value, .. }) => {
                Ok(SaveOutcome::Rejected(self.in_use(fields, &value)))
            }
            Err(other) => Err(other),
        }
    }

    /// Deleting a missing id is an error, never a no-op.
    pub async fn delete(&self, id: i64) -> Result<(), StorageError> {
        self.store.delete(self.descriptor.kind, id).await?;
        tracing::info!(entity = self.descriptor.kind.table(), id, "record deleted");
        Ok(())
    }

    /// Records of the referenced entity, for selector population. Empty when
    /// the descriptor declares no reference.
    pub async fn list_related(&self) -> Result<Vec<Record>, StorageError> {
        match self.descriptor.reference {
            Some(reference) => self.store.find_all(reference.target).await,
            None => Ok(vec![]),
        }
    }

    async fn validate(
        &self,
        fields: &FormFields,
        exclude_id: Option<i64>,
    ) -> Result<Result<Record, ValidationFailure>, StorageError> {
        let mut record = Record::new();

        for field in self.descriptor.fields {
            let raw = fields.get(field.name).map(String::as_str).unwrap_or("");
            if field.required && raw.trim().is_empty() {
                return Ok(Err(self.rejected(
                    fields,
                    format!("The field '{}' is required", field.name),
                )));
            }
            match field.kind {
                FieldKind::Text => {
                    record.insert(field.name.to_string(), Value::from(raw));
                }
                FieldKind::Reference => match raw.trim().parse::<i64>() {
                    Ok(id) => {
                        record.insert(field.name.to_string(), Value::from(id));
                    }
                    Err(_) => {
                        return Ok(Err(self.rejected(
                            fields,
                            format!("'{}' is not a valid selection for '{}'", raw, field.name),
                        )))
                    }
                },
            }
        }

        let unique = self.descriptor.unique_field;
        let candidate = fields.get(unique).map(String::as_str).unwrap_or("");
        if self
            .store
            .exists_with_field(self.descriptor.kind, unique, candidate, exclude_id)
            .await?
        {
            return Ok(Err(self.in_use(fields, candidate)));
        }

        // A dangling reference is a validation failure, not a fault.
        if let Some(reference) = self.descriptor.reference {
            if let Some(id) = record.get(reference.field).and_then(Value::as_i64) {
                if self.store.find_by_id(reference.target, id).await?.is_none() {
                    return Ok(Err(self.rejected(
                        fields,
                        format!("The selected {} does not exist", reference.target.table()),
                    )));
                }
            }
        }

        Ok(Ok(record))
    }

    fn rejected(&self, fields: &FormFields, message: String) -> ValidationFailure {
        let echoed = self
            .descriptor
            .fields
            .iter()
            .map(|f| {
                (
                    f.name.to_string(),
                    fields.get(f.name).cloned().unwrap_or_default(),
                )
            })
            .collect();
        ValidationFailure { message, echoed }
    }

    fn in_use(&self, fields: &FormFields, value: &str) -> ValidationFailure {
        self.rejected(fields, format!("'{}' is already in use", value))
    }
}
