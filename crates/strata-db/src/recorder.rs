//! Recorder: the only sanctioned way to mutate the journal store.
//!
//! Each mutation is wrapped in a record object and executed on the caller's
//! ambient transaction — the recorder never begins or commits one. After a
//! successful write, if a listener is registered for the entity type and
//! mutation kind, a domain event is constructed and dispatched synchronously
//! before the call returns. Listeners performing their own I/O are
//! responsible for their own transactional correctness; the recorder only
//! guarantees it attempted dispatch.

use std::sync::Arc;

use sqlx::{Sqlite, Transaction};
use tracing::debug;

use strata_core::{
    Error, MutationKind, ParamValue, PersistentEntity, Recordable, RecorderEvent,
    RecorderEventBus, Result,
};

use crate::binding::bind_query;

/// Wraps an entity to insert into the journal.
#[derive(Debug)]
pub struct InsertRecord<T: Recordable> {
    pub entity: T,
}

impl<T: Recordable> InsertRecord<T> {
    pub fn new(entity: T) -> Self {
        Self { entity }
    }
}

/// One column of a partial-field update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldUpdate {
    pub column: &'static str,
    pub value: ParamValue,
}

/// Partial-field update: an enumerated column → new-value set, so concurrent
/// updates to disjoint fields of the same row never clobber each other.
/// Last write wins per field; this is not optimistic locking.
#[derive(Debug, Clone, Default)]
pub struct UpdateDescriptor {
    fields: Vec<FieldUpdate>,
}

impl UpdateDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one column to a new value.
    pub fn set(mut self, column: &'static str, value: impl Into<ParamValue>) -> Self {
        self.fields.push(FieldUpdate {
            column,
            value: value.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn fields(&self) -> &[FieldUpdate] {
        &self.fields
    }

    /// JSON rendering of the changed fields, for event payloads.
    fn to_payload(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for field in &self.fields {
            let value = serde_json::to_value(&field.value)
                .unwrap_or(serde_json::Value::Null);
            map.insert(field.column.to_string(), value);
        }
        serde_json::Value::Object(map)
    }
}

/// Wraps a partial-field update of one journal row.
#[derive(Debug, Clone)]
pub struct UpdateRecord {
    pub id: i64,
    pub descriptor: UpdateDescriptor,
}

impl UpdateRecord {
    pub fn new(id: i64, descriptor: UpdateDescriptor) -> Self {
        Self { id, descriptor }
    }
}

/// Wraps the deletion of one journal row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRecord {
    pub id: i64,
}

impl DeleteRecord {
    pub fn new(id: i64) -> Self {
        Self { id }
    }
}

/// Journal mutation entry point.
#[derive(Clone)]
pub struct Recorder {
    bus: Arc<RecorderEventBus>,
}

impl Recorder {
    pub fn new(bus: Arc<RecorderEventBus>) -> Self {
        Self { bus }
    }

    /// The event bus this recorder dispatches through.
    pub fn event_bus(&self) -> &Arc<RecorderEventBus> {
        &self.bus
    }

    /// Insert a row, adopting the store-assigned id onto the entity.
    ///
    /// A unique-constraint violation surfaces as already-exists: uniqueness
    /// invariants are enforced by the store's constraints, not by
    /// check-then-insert pre-reads.
    pub async fn insert_tx<T: Recordable>(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        record: InsertRecord<T>,
    ) -> Result<T> {
        let mut entity = record.entity;
        let columns = T::INSERT_COLUMNS;
        let values = entity.insert_values();
        if values.len() != columns.len() {
            return Err(Error::InvalidInput(format!(
                "{} insert binds {} values for {} columns",
                T::ENTITY,
                values.len(),
                columns.len()
            )));
        }

        // Build the payload before values are consumed by binding, and only
        // when someone is listening.
        let payload = self
            .bus
            .has_listeners(T::ENTITY, MutationKind::Insert)
            .then(|| {
                let mut map = serde_json::Map::new();
                for (column, value) in columns.iter().zip(values.iter()) {
                    map.insert(
                        column.to_string(),
                        serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
                    );
                }
                serde_json::Value::Object(map)
            });

        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            T::TABLE,
            columns.join(", "),
            placeholders
        );
        let mut query = sqlx::query(&sql);
        for value in values {
            query = bind_query(query, value)?;
        }
        let result = query.execute(&mut **tx).await.map_err(|e| {
            if Error::is_unique_violation(&e) {
                Error::AlreadyExists(T::ENTITY.to_string())
            } else {
                Error::creation(T::ENTITY.to_string(), e)
            }
        })?;
        entity.set_id(result.last_insert_rowid());

        debug!(
            subsystem = "db",
            component = "recorder",
            op = "insert",
            entity = T::ENTITY,
            entity_id = entity.id(),
            "journal insert recorded"
        );
        if payload.is_some() {
            self.bus.emit(RecorderEvent::new(
                T::ENTITY,
                MutationKind::Insert,
                entity.id(),
                payload,
            ));
        }
        Ok(entity)
    }

    /// Apply a partial-field update to one row.
    ///
    /// An empty descriptor is a no-op; a row that no longer exists is
    /// not-found. Columns are validated against the entity's column list.
    pub async fn update_tx<T: PersistentEntity>(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        record: UpdateRecord,
    ) -> Result<()> {
        if record.descriptor.is_empty() {
            return Ok(());
        }
        for field in record.descriptor.fields() {
            if !T::COLUMNS.contains(&field.column) {
                return Err(Error::InvalidInput(format!(
                    "unknown column {:?} in {} update",
                    field.column,
                    T::ENTITY
                )));
            }
        }

        let assignments = record
            .descriptor
            .fields()
            .iter()
            .map(|f| format!("{} = ?", f.column))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE {} SET {} WHERE id = ?", T::TABLE, assignments);

        let payload = self
            .bus
            .has_listeners(T::ENTITY, MutationKind::Update)
            .then(|| record.descriptor.to_payload());

        let mut query = sqlx::query(&sql);
        for field in record.descriptor.fields() {
            query = bind_query(query, field.value.clone())?;
        }
        query = query.bind(record.id);
        let result = query
            .execute(&mut **tx)
            .await
            .map_err(|e| Error::modification(T::ENTITY.to_string(), e))?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "{} {} to update",
                T::ENTITY,
                record.id
            )));
        }

        debug!(
            subsystem = "db",
            component = "recorder",
            op = "update",
            entity = T::ENTITY,
            entity_id = record.id,
            "journal update recorded"
        );
        if payload.is_some() {
            self.bus.emit(RecorderEvent::new(
                T::ENTITY,
                MutationKind::Update,
                record.id,
                payload,
            ));
        }
        Ok(())
    }

    /// Delete one row.
    pub async fn delete_tx<T: PersistentEntity>(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        record: DeleteRecord,
    ) -> Result<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?", T::TABLE);
        let result = sqlx::query(&sql)
            .bind(record.id)
            .execute(&mut **tx)
            .await
            .map_err(|e| Error::modification(T::ENTITY.to_string(), e))?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!(
                "{} {} to delete",
                T::ENTITY,
                record.id
            )));
        }

        debug!(
            subsystem = "db",
            component = "recorder",
            op = "delete",
            entity = T::ENTITY,
            entity_id = record.id,
            "journal delete recorded"
        );
        if self.bus.has_listeners(T::ENTITY, MutationKind::Delete) {
            self.bus.emit(RecorderEvent::new(
                T::ENTITY,
                MutationKind::Delete,
                record.id,
                None,
            ));
        }
        Ok(())
    }
}
