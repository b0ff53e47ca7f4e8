//! Archive service: copy-on-freeze writes into the immutable historical
//! store, plus bulk delete-by-query for retention sweeps.
//!
//! Archiving is opt-in per entity type. Archive writes execute on the same
//! ambient transaction as the journal mutation that triggered them, so a
//! crash between the two can never be observed as "archived but not yet
//! updated" or the reverse. Archive rows are never mutated after insertion;
//! the only operation exposed over them is bulk deletion.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::{Sqlite, Transaction};
use tracing::debug;

use strata_core::{
    ArchivedEntity, DocumentMapping, Error, Parameters, PersistentEntity, Result,
};

use crate::binding::bind_query;
use crate::catalog::{expand_template, QueryCatalog};
use crate::read_service::ReadPersistenceService;

/// Writes and bulk-deletes archive rows; owns the definitive archive read
/// service.
#[derive(Clone)]
pub struct ArchiveService {
    definitive_read: ReadPersistenceService,
    catalog: Arc<QueryCatalog>,
    /// Logical names of the live entity types whose snapshots may be
    /// archived.
    archivable: HashSet<&'static str>,
}

impl ArchiveService {
    pub fn new(pool: SqlitePool, catalog: Arc<QueryCatalog>) -> Self {
        let mut archivable = HashSet::new();
        archivable.insert(DocumentMapping::ENTITY);
        Self {
            definitive_read: ReadPersistenceService::archive(pool, Arc::clone(&catalog)),
            catalog,
            archivable,
        }
    }

    /// Opt an additional live entity type into archiving.
    pub fn register_archivable(&mut self, entity: &'static str) {
        self.archivable.insert(entity);
    }

    /// Whether snapshots of this live entity type may be archived.
    pub fn is_archivable<T: PersistentEntity>(&self) -> bool {
        self.archivable.contains(T::ENTITY)
    }

    /// The read service bound to the archive store.
    pub fn definitive_read_service(&self) -> &ReadPersistenceService {
        &self.definitive_read
    }

    /// Write one immutable archive row, stamped with `archive_date`.
    ///
    /// Calling this for a snapshot type whose source entity is not
    /// archivable is a caller error.
    pub async fn record_insert_tx<A: ArchivedEntity>(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        archive_date: DateTime<Utc>,
        mut record: A,
    ) -> Result<A> {
        if !self.archivable.contains(A::SOURCE_ENTITY) {
            return Err(Error::InvalidInput(format!(
                "entity {} is not archivable",
                A::SOURCE_ENTITY
            )));
        }
        record.set_archive_date(archive_date);

        let columns = A::INSERT_COLUMNS;
        let values = record.insert_values();
        if values.len() != columns.len() {
            return Err(Error::InvalidInput(format!(
                "{} insert binds {} values for {} columns",
                A::ENTITY,
                values.len(),
                columns.len()
            )));
        }
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            A::TABLE,
            columns.join(", "),
            placeholders
        );
        let mut query = sqlx::query(&sql);
        for value in values {
            query = bind_query(query, value)?;
        }
        let result = query
            .execute(&mut **tx)
            .await
            .map_err(|e| Error::creation(A::ENTITY.to_string(), e))?;
        record.set_id(result.last_insert_rowid());

        debug!(
            subsystem = "db",
            component = "archive",
            op = "record_insert",
            entity = A::ENTITY,
            entity_id = record.id(),
            source_object_id = record.source_object_id(),
            "archive row frozen"
        );
        Ok(record)
    }

    /// Bulk delete through a catalog-registered DELETE query. Used for
    /// retention sweeps and cascading deletes when a parent entity is
    /// permanently removed. Returns the number of rows removed.
    pub async fn delete_from_query_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        query_name: &str,
        parameters: &Parameters,
    ) -> Result<u64> {
        let template = self.catalog.query(query_name)?;
        let (sql, binds) = expand_template(template, parameters)?;
        let mut query = sqlx::query(&sql);
        for value in binds {
            query = bind_query(query, value)?;
        }
        let result = query
            .execute(&mut **tx)
            .await
            .map_err(|e| Error::modification(query_name.to_string(), e))?;

        debug!(
            subsystem = "db",
            component = "archive",
            op = "delete_from_query",
            query_name = query_name,
            result_count = result.rows_affected(),
            "bulk delete executed"
        );
        Ok(result.rows_affected())
    }
}
