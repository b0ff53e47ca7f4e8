//! Core traits for strata abstractions.
//!
//! These traits define the interfaces that concrete store implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Document, DocumentMapping, MappedDocument};
use crate::query::QueryOptions;

/// Request for attaching a document to a process instance.
#[derive(Debug, Clone, Default)]
pub struct AttachDocumentRequest {
    /// Tenant discriminator; tenant scoping is a caller contract.
    pub tenant_id: i64,
    pub process_instance_id: i64,
    /// Slot name within the process instance.
    pub name: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    /// Blob content; mutually exclusive with `url` in practice.
    pub content: Option<Vec<u8>>,
    /// External location for URL-backed documents.
    pub url: Option<String>,
}

/// Request for superseding a mapped document's content.
#[derive(Debug, Clone, Default)]
pub struct UpdateDocumentRequest {
    pub description: Option<String>,
    pub author: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub content: Option<Vec<u8>>,
    pub url: Option<String>,
}

/// The document lifecycle contract: attach / update / reorder / archive /
/// delete plus point-in-time reconstruction.
///
/// Mutations execute inside one transaction per call; reads are side-effect
/// free. Absence on the single-row reads is the domain not-found error —
/// this layer wraps it, the descriptor layer below does not throw.
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Create a content row and an index-less mapping (`version = "1"`).
    /// A live mapping already occupying the `(process_instance_id, name)`
    /// slot raises already-exists.
    async fn attach_document_to_process_instance(
        &self,
        req: AttachDocumentRequest,
    ) -> Result<MappedDocument>;

    /// Create a content row and a list-managed mapping at `index`.
    async fn attach_document_to_process_instance_at(
        &self,
        req: AttachDocumentRequest,
        index: i32,
    ) -> Result<MappedDocument>;

    /// Supersede the content of the index-less mapping in a slot: new
    /// content row, archived pre-update snapshot, live row updated in place
    /// with an incremented version.
    async fn update_document(
        &self,
        process_instance_id: i64,
        name: &str,
        req: UpdateDocumentRequest,
    ) -> Result<MappedDocument>;

    /// List-managed variant of [`Self::update_document`].
    async fn update_document_of_list(
        &self,
        process_instance_id: i64,
        name: &str,
        index: i32,
        req: UpdateDocumentRequest,
    ) -> Result<MappedDocument>;

    /// Move a mapping to a new list position. The index is not versioned
    /// content: no snapshot is archived.
    async fn update_document_index(&self, mapping_id: i64, index: i32) -> Result<()>;

    /// Delete the live mapping row; the content row is untouched.
    async fn remove_document(&self, mapping_id: i64) -> Result<()>;

    /// Archive the live mapping, then remove it, so the removal itself is
    /// reconstructable.
    async fn remove_current_version(&self, process_instance_id: i64, name: &str) -> Result<()>;

    /// The current mapped document of an index-less slot.
    async fn get_mapped_document(
        &self,
        process_instance_id: i64,
        name: &str,
    ) -> Result<MappedDocument>;

    /// The mapped document of a slot as of `time`: the earliest archived
    /// snapshot frozen after `time`, or the live row when nothing had been
    /// archived as of `time`.
    async fn get_mapped_document_at(
        &self,
        process_instance_id: i64,
        name: &str,
        time: DateTime<Utc>,
    ) -> Result<MappedDocument>;

    /// Fetch a content row.
    async fn get_document(&self, document_id: i64) -> Result<Document>;

    /// Fetch a content row's blob; wiped or URL-backed content is absent.
    async fn get_document_content(&self, document_id: i64) -> Result<Vec<u8>>;

    /// Union of archived rows created before `time` and live rows created
    /// before `time` for a list slot, ordered by list index. No
    /// de-duplication across the two stores.
    async fn get_document_list(
        &self,
        name: &str,
        process_instance_id: i64,
        time: DateTime<Utc>,
    ) -> Result<Vec<MappedDocument>>;

    /// Page through the live mappings of a process instance.
    async fn get_documents_of_process_instance(
        &self,
        process_instance_id: i64,
        options: &QueryOptions,
    ) -> Result<Vec<DocumentMapping>>;

    /// Count the live mappings of a process instance.
    async fn get_number_of_documents_of_process_instance(
        &self,
        process_instance_id: i64,
    ) -> Result<i64>;

    /// Generic search over live mappings.
    async fn search_documents(&self, options: &QueryOptions) -> Result<Vec<DocumentMapping>>;

    /// Count matching live mappings with the same predicate as
    /// [`Self::search_documents`].
    async fn get_number_of_documents(&self, options: &QueryOptions) -> Result<i64>;

    /// Drain every live mapping of a process instance, one page at a time,
    /// removing each mapping's content row through the same per-row path.
    /// Returns the number of mappings removed.
    async fn delete_documents_from_process_instance(&self, process_instance_id: i64)
        -> Result<u64>;

    /// Archive-side bulk cleanup for permanently removed process instances:
    /// one delete-by-id-list for referenced content rows, then one for the
    /// archived mappings. Returns the number of archived mappings removed.
    async fn delete_archived_documents(&self, process_instance_ids: &[i64]) -> Result<u64>;

    /// Deliberate content wipe: clear the blob and mark the row empty,
    /// keeping the metadata for history.
    async fn delete_content_of_archived_document(&self, document_id: i64) -> Result<()>;

    /// Delete a content row. Callers own reference hygiene: no mapping may
    /// still need the row.
    async fn delete_document(&self, document_id: i64) -> Result<()>;
}
