//! Document lifecycle: the worked example exercising the recorder, archive
//! service, and both read services under the engine's real invariants.
//!
//! A "document" is a content row; a "mapping" is the separately versioned,
//! indexable row binding a document to a process instance under a name.
//! Every content update first freezes the pre-update mapping snapshot into
//! the archive, then mutates the live row in place — reversing that order
//! would let a reader observe a live row whose archived predecessor does not
//! exist yet.
//!
//! Mutating operations come in pairs: `op_tx` runs on the caller's ambient
//! transaction; the [`DocumentRepository`] methods wrap one transaction
//! around the `_tx` form. All statements inside a `_tx` method run on the
//! transaction connection.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqlitePool;
use sqlx::{Sqlite, Transaction};
use tracing::info;

use strata_core::defaults::{DELETE_BATCH_SIZE, INITIAL_VERSION};
use strata_core::{
    next_version, parameters, ArchivedDocumentMapping, AttachDocumentRequest, Document,
    DocumentMapping, DocumentRepository, Error, MappedDocument, OrderDirection, ParamValue,
    Parameters, PersistentEntity, QueryOptions, Result, SelectByIdDescriptor,
    SelectListDescriptor, SelectOneDescriptor, UpdateDocumentRequest, NO_LIST_INDEX,
};

use crate::archive::ArchiveService;
use crate::catalog::QueryCatalog;
use crate::read_service::ReadPersistenceService;
use crate::recorder::{DeleteRecord, InsertRecord, Recorder, UpdateDescriptor, UpdateRecord};

/// Document lifecycle service over the journal and archive stores.
#[derive(Clone)]
pub struct DocumentService {
    pool: SqlitePool,
    recorder: Recorder,
    archive: ArchiveService,
    journal_read: ReadPersistenceService,
}

impl DocumentService {
    pub fn new(
        pool: SqlitePool,
        recorder: Recorder,
        archive: ArchiveService,
        catalog: Arc<QueryCatalog>,
    ) -> Self {
        Self {
            journal_read: ReadPersistenceService::journal(pool.clone(), catalog),
            pool,
            recorder,
            archive,
        }
    }

    /// The journal-bound read service this service queries.
    pub fn journal_read_service(&self) -> &ReadPersistenceService {
        &self.journal_read
    }

    /// `sha256:<hex>` digest of a content blob.
    fn hash_content(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        format!("sha256:{}", hex::encode(hasher.finalize()))
    }

    /// Attach a document within an ambient transaction.
    ///
    /// Inserts the content row, then the mapping. The slot-uniqueness
    /// invariant for index-less mappings is the store's partial unique
    /// index; its violation surfaces as already-exists.
    pub async fn attach_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        req: AttachDocumentRequest,
        index: i32,
    ) -> Result<MappedDocument> {
        let now = Utc::now();
        let AttachDocumentRequest {
            tenant_id,
            process_instance_id,
            name,
            description,
            author,
            file_name,
            mime_type,
            content,
            url,
        } = req;

        let document = Document {
            id: 0,
            tenant_id,
            author,
            creation_date: now,
            has_content: content.is_some(),
            file_name,
            mime_type,
            url,
            content_hash: content.as_deref().map(Self::hash_content),
            content,
        };
        let document = self.recorder.insert_tx(tx, InsertRecord::new(document)).await?;

        let mapping = DocumentMapping {
            id: 0,
            tenant_id,
            document_id: document.id,
            process_instance_id,
            name: name.clone(),
            description,
            version: INITIAL_VERSION.to_string(),
            index,
            creation_date: now,
        };
        let mapping = self
            .recorder
            .insert_tx(tx, InsertRecord::new(mapping))
            .await
            .map_err(|e| match e {
                Error::AlreadyExists(_) => Error::AlreadyExists(format!(
                    "document {name:?} on process instance {process_instance_id}"
                )),
                other => other,
            })?;

        Ok(MappedDocument::from_parts(&mapping, &document))
    }

    /// Supersede a slot's content within an ambient transaction: new content
    /// row, archived pre-update snapshot, then the live mapping updated in
    /// place with `version + 1`.
    pub async fn update_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        process_instance_id: i64,
        name: &str,
        index: i32,
        req: UpdateDocumentRequest,
    ) -> Result<MappedDocument> {
        let mapping = self
            .fetch_live_mapping_tx(tx, process_instance_id, name, index)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "document {name:?} on process instance {process_instance_id}"
                ))
            })?;

        let now = Utc::now();
        let UpdateDocumentRequest {
            description,
            author,
            file_name,
            mime_type,
            content,
            url,
        } = req;

        let document = Document {
            id: 0,
            tenant_id: mapping.tenant_id,
            author,
            creation_date: now,
            has_content: content.is_some(),
            file_name,
            mime_type,
            url,
            content_hash: content.as_deref().map(Self::hash_content),
            content,
        };
        let document = self.recorder.insert_tx(tx, InsertRecord::new(document)).await?;

        // Archive first, then mutate: never leave a live row whose archived
        // predecessor is missing.
        let snapshot = ArchivedDocumentMapping::from_live(&mapping, now);
        self.archive.record_insert_tx(tx, now, snapshot).await?;

        let version = next_version(&mapping.version)?;
        let mut descriptor = UpdateDescriptor::new()
            .set("document_id", document.id)
            .set("version", version.clone());
        if let Some(text) = description.clone() {
            descriptor = descriptor.set("description", text);
        }
        self.recorder
            .update_tx::<DocumentMapping>(tx, UpdateRecord::new(mapping.id, descriptor))
            .await?;

        let mut updated = mapping;
        updated.document_id = document.id;
        updated.version = version;
        if description.is_some() {
            updated.description = description;
        }
        Ok(MappedDocument::from_parts(&updated, &document))
    }

    /// Move a mapping to a new list position within an ambient transaction.
    /// The index is not versioned content, so nothing is archived.
    pub async fn update_index_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        mapping_id: i64,
        index: i32,
    ) -> Result<()> {
        self.recorder
            .update_tx::<DocumentMapping>(
                tx,
                UpdateRecord::new(mapping_id, UpdateDescriptor::new().set("list_index", index)),
            )
            .await
    }

    /// Delete a live mapping within an ambient transaction; the content row
    /// is untouched.
    pub async fn remove_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        mapping_id: i64,
    ) -> Result<()> {
        self.recorder
            .delete_tx::<DocumentMapping>(tx, DeleteRecord::new(mapping_id))
            .await
    }

    /// Archive-then-remove within an ambient transaction, so the removal
    /// itself is reconstructable from the archive.
    pub async fn remove_current_version_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        process_instance_id: i64,
        name: &str,
    ) -> Result<()> {
        let mapping = self
            .fetch_live_mapping_tx(tx, process_instance_id, name, NO_LIST_INDEX)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "document {name:?} on process instance {process_instance_id}"
                ))
            })?;
        let now = Utc::now();
        let snapshot = ArchivedDocumentMapping::from_live(&mapping, now);
        self.archive.record_insert_tx(tx, now, snapshot).await?;
        self.remove_tx(tx, mapping.id).await
    }

    async fn fetch_live_mapping_tx(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        process_instance_id: i64,
        name: &str,
        index: i32,
    ) -> Result<Option<DocumentMapping>> {
        sqlx::query_as::<_, DocumentMapping>(
            "SELECT id, tenant_id, document_id, process_instance_id, name, description, \
             version, list_index, creation_date \
             FROM document_mapping \
             WHERE process_instance_id = ? AND name = ? AND list_index = ?",
        )
        .bind(process_instance_id)
        .bind(name)
        .bind(index)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| Error::read("document_mapping by slot", e))
    }

    async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| Error::modification("transaction begin", e))
    }
}

async fn commit(tx: Transaction<'_, Sqlite>) -> Result<()> {
    tx.commit()
        .await
        .map_err(|e| Error::modification("transaction commit", e))
}

#[async_trait]
impl DocumentRepository for DocumentService {
    async fn attach_document_to_process_instance(
        &self,
        req: AttachDocumentRequest,
    ) -> Result<MappedDocument> {
        let mut tx = self.begin().await?;
        let mapped = self.attach_tx(&mut tx, req, NO_LIST_INDEX).await?;
        commit(tx).await?;
        Ok(mapped)
    }

    async fn attach_document_to_process_instance_at(
        &self,
        req: AttachDocumentRequest,
        index: i32,
    ) -> Result<MappedDocument> {
        if index < 0 {
            return Err(Error::InvalidInput(format!(
                "list index must be non-negative, got {index}"
            )));
        }
        let mut tx = self.begin().await?;
        let mapped = self.attach_tx(&mut tx, req, index).await?;
        commit(tx).await?;
        Ok(mapped)
    }

    async fn update_document(
        &self,
        process_instance_id: i64,
        name: &str,
        req: UpdateDocumentRequest,
    ) -> Result<MappedDocument> {
        let mut tx = self.begin().await?;
        let mapped = self
            .update_tx(&mut tx, process_instance_id, name, NO_LIST_INDEX, req)
            .await?;
        commit(tx).await?;
        Ok(mapped)
    }

    async fn update_document_of_list(
        &self,
        process_instance_id: i64,
        name: &str,
        index: i32,
        req: UpdateDocumentRequest,
    ) -> Result<MappedDocument> {
        let mut tx = self.begin().await?;
        let mapped = self
            .update_tx(&mut tx, process_instance_id, name, index, req)
            .await?;
        commit(tx).await?;
        Ok(mapped)
    }

    async fn update_document_index(&self, mapping_id: i64, index: i32) -> Result<()> {
        let mut tx = self.begin().await?;
        self.update_index_tx(&mut tx, mapping_id, index).await?;
        commit(tx).await
    }

    async fn remove_document(&self, mapping_id: i64) -> Result<()> {
        let mut tx = self.begin().await?;
        self.remove_tx(&mut tx, mapping_id).await?;
        commit(tx).await
    }

    async fn remove_current_version(&self, process_instance_id: i64, name: &str) -> Result<()> {
        let mut tx = self.begin().await?;
        self.remove_current_version_tx(&mut tx, process_instance_id, name)
            .await?;
        commit(tx).await
    }

    async fn get_mapped_document(
        &self,
        process_instance_id: i64,
        name: &str,
    ) -> Result<MappedDocument> {
        let descriptor = SelectOneDescriptor::<MappedDocument>::new(
            DocumentMapping::ENTITY,
            "getMappedDocumentOfProcessInstanceWithName",
            parameters([
                ("process_instance_id", ParamValue::Int(process_instance_id)),
                ("name", ParamValue::from(name)),
            ]),
        );
        self.journal_read
            .select_one(descriptor)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "document {name:?} on process instance {process_instance_id}"
                ))
            })
    }

    async fn get_mapped_document_at(
        &self,
        process_instance_id: i64,
        name: &str,
        time: DateTime<Utc>,
    ) -> Result<MappedDocument> {
        let descriptor = SelectOneDescriptor::<MappedDocument>::new(
            ArchivedDocumentMapping::ENTITY,
            "getArchivedMappedDocumentAt",
            parameters([
                ("process_instance_id", ParamValue::Int(process_instance_id)),
                ("name", ParamValue::from(name)),
                ("time", ParamValue::Timestamp(time)),
            ]),
        );
        match self
            .archive
            .definitive_read_service()
            .select_one(descriptor)
            .await?
        {
            Some(archived) => Ok(archived),
            // Nothing archived as of `time`: the live row is the answer.
            None => self.get_mapped_document(process_instance_id, name).await,
        }
    }

    async fn get_document(&self, document_id: i64) -> Result<Document> {
        self.journal_read
            .select_by_id(SelectByIdDescriptor::<Document>::new(
                Document::ENTITY,
                document_id,
            ))
            .await?
            .ok_or_else(|| Error::NotFound(format!("document {document_id}")))
    }

    async fn get_document_content(&self, document_id: i64) -> Result<Vec<u8>> {
        let document = self.get_document(document_id).await?;
        document
            .content
            .ok_or_else(|| Error::NotFound(format!("content of document {document_id}")))
    }

    async fn get_document_list(
        &self,
        name: &str,
        process_instance_id: i64,
        time: DateTime<Utc>,
    ) -> Result<Vec<MappedDocument>> {
        let params = parameters([
            ("process_instance_id", ParamValue::Int(process_instance_id)),
            ("name", ParamValue::from(name)),
            ("time", ParamValue::Timestamp(time)),
        ]);
        let archived: Vec<MappedDocument> = self
            .archive
            .definitive_read_service()
            .select_list(SelectListDescriptor::new(
                ArchivedDocumentMapping::ENTITY,
                "getArchivedDocumentListCreatedBefore",
                params.clone(),
                QueryOptions::ALL_RESULTS,
            ))
            .await?;
        let live: Vec<MappedDocument> = self
            .journal_read
            .select_list(SelectListDescriptor::new(
                DocumentMapping::ENTITY,
                "getDocumentListCreatedBefore",
                params,
                QueryOptions::ALL_RESULTS,
            ))
            .await?;

        // Union of both stores, no de-duplication: a superseded slot
        // contributes its snapshots and its live row.
        let mut all = archived;
        all.extend(live);
        all.sort_by_key(|d| d.index);
        Ok(all)
    }

    async fn get_documents_of_process_instance(
        &self,
        process_instance_id: i64,
        options: &QueryOptions,
    ) -> Result<Vec<DocumentMapping>> {
        self.journal_read
            .search_entity_with_suffix::<DocumentMapping>(
                "forProcessInstance",
                options,
                &parameters([("process_instance_id", ParamValue::Int(process_instance_id))]),
            )
            .await
    }

    async fn get_number_of_documents_of_process_instance(
        &self,
        process_instance_id: i64,
    ) -> Result<i64> {
        self.journal_read
            .get_number_of_entities_with_suffix::<DocumentMapping>(
                "forProcessInstance",
                &QueryOptions::ALL_RESULTS,
                &parameters([("process_instance_id", ParamValue::Int(process_instance_id))]),
            )
            .await
    }

    async fn search_documents(&self, options: &QueryOptions) -> Result<Vec<DocumentMapping>> {
        self.journal_read
            .search_entity::<DocumentMapping>(options, &Parameters::new())
            .await
    }

    async fn get_number_of_documents(&self, options: &QueryOptions) -> Result<i64> {
        self.journal_read
            .get_number_of_entities::<DocumentMapping>(options, &Parameters::new())
            .await
    }

    async fn delete_documents_from_process_instance(
        &self,
        process_instance_id: i64,
    ) -> Result<u64> {
        let start = Instant::now();
        let mut removed = 0u64;
        // Drain the table page by page; removal must also drop each
        // mapping's content row through the same per-row path, so this is
        // not a single bulk statement. Always page 0: the result set
        // shrinks as rows are removed.
        let page_options = QueryOptions::page(0, DELETE_BATCH_SIZE).order_by(
            DocumentMapping::ENTITY,
            "id",
            OrderDirection::Asc,
        );
        loop {
            let page: Vec<DocumentMapping> = self
                .journal_read
                .select_list(SelectListDescriptor::new(
                    DocumentMapping::ENTITY,
                    "getDocumentMappingsOfProcessInstance",
                    parameters([(
                        "process_instance_id",
                        ParamValue::Int(process_instance_id),
                    )]),
                    page_options.clone(),
                ))
                .await?;
            if page.is_empty() {
                break;
            }

            let mut tx = self.begin().await?;
            for mapping in &page {
                self.recorder
                    .delete_tx::<Document>(&mut tx, DeleteRecord::new(mapping.document_id))
                    .await?;
                self.remove_tx(&mut tx, mapping.id).await?;
            }
            removed += page.len() as u64;
            commit(tx).await?;
        }

        info!(
            subsystem = "db",
            component = "documents",
            op = "drain",
            process_instance_id = process_instance_id,
            result_count = removed,
            duration_ms = start.elapsed().as_millis() as u64,
            "live documents drained from process instance"
        );
        Ok(removed)
    }

    async fn delete_archived_documents(&self, process_instance_ids: &[i64]) -> Result<u64> {
        let rows: Vec<(i64, i64)> = self
            .archive
            .definitive_read_service()
            .select_list(SelectListDescriptor::new(
                ArchivedDocumentMapping::ENTITY,
                "getArchivedMappingIdsOfProcessInstances",
                parameters([(
                    "process_instance_ids",
                    ParamValue::IntList(process_instance_ids.to_vec()),
                )]),
                QueryOptions::ALL_RESULTS,
            ))
            .await?;
        if rows.is_empty() {
            return Ok(0);
        }

        let mapping_ids: Vec<i64> = rows.iter().map(|(id, _)| *id).collect();
        let mut document_ids: Vec<i64> = rows.iter().map(|(_, doc)| *doc).collect();
        document_ids.sort_unstable();
        document_ids.dedup();

        // Archive-side cleanup needs no per-row side effects: two bulk
        // delete-by-id-list statements, content rows first.
        let mut tx = self.begin().await?;
        self.archive
            .delete_from_query_tx(
                &mut tx,
                "deleteDocumentsByIds",
                &parameters([("ids", ParamValue::IntList(document_ids))]),
            )
            .await?;
        let removed = self
            .archive
            .delete_from_query_tx(
                &mut tx,
                "deleteArchivedDocumentMappingsByIds",
                &parameters([("ids", ParamValue::IntList(mapping_ids))]),
            )
            .await?;
        commit(tx).await?;
        Ok(removed)
    }

    async fn delete_content_of_archived_document(&self, document_id: i64) -> Result<()> {
        let mut tx = self.begin().await?;
        self.recorder
            .update_tx::<Document>(
                &mut tx,
                UpdateRecord::new(
                    document_id,
                    UpdateDescriptor::new()
                        .set("content", ParamValue::Null)
                        .set("content_hash", ParamValue::Null)
                        .set("has_content", false),
                ),
            )
            .await?;
        commit(tx).await
    }

    async fn delete_document(&self, document_id: i64) -> Result<()> {
        let mut tx = self.begin().await?;
        self.recorder
            .delete_tx::<Document>(&mut tx, DeleteRecord::new(document_id))
            .await?;
        commit(tx).await
    }
}
