//! Domain models for the document lifecycle worked example.
//!
//! A document's content row and its mapping row have independent identities:
//! many mapping versions may point to different content rows over a
//! document's history. The archived mapping is a frozen copy of the live
//! mapping at the instant it was superseded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::descriptor::ParamValue;
use crate::entity::{ArchivedEntity, PersistentEntity, Recordable, SearchableEntity, StoreBinding};
use crate::error::{Error, Result};

/// Sentinel index for a mapping that is not list-managed.
pub const NO_LIST_INDEX: i32 = -1;

/// Increment a string-encoded version number.
///
/// Versions are positive integers rendered as strings; a non-numeric version
/// is corrupt data and is rejected rather than silently reset.
pub fn next_version(version: &str) -> Result<String> {
    let n: u64 = version
        .parse()
        .map_err(|_| Error::InvalidInput(format!("corrupt mapping version {version:?}")))?;
    Ok((n + 1).to_string())
}

/// A content row: the blob (or external URL) a mapping points at.
///
/// Content rows are deleted independently of mappings and are not
/// reference-counted here; callers must ensure no other mapping still needs
/// a row before wiping or deleting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: i64,
    pub tenant_id: i64,
    pub author: Option<String>,
    pub creation_date: DateTime<Utc>,
    /// False once content has been deliberately wiped, or for URL-backed
    /// external documents.
    pub has_content: bool,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    /// External location for URL-backed documents.
    pub url: Option<String>,
    /// Nullable after a deliberate content wipe.
    #[serde(skip_serializing)]
    pub content: Option<Vec<u8>>,
    /// `sha256:<hex>` digest of the content at write time.
    pub content_hash: Option<String>,
}

impl PersistentEntity for Document {
    const ENTITY: &'static str = "document";
    const TABLE: &'static str = "document";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "tenant_id",
        "author",
        "creation_date",
        "has_content",
        "file_name",
        "mime_type",
        "url",
        "content",
        "content_hash",
    ];
    const STORE: StoreBinding = StoreBinding::Journal;

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

impl Recordable for Document {
    const INSERT_COLUMNS: &'static [&'static str] = &[
        "tenant_id",
        "author",
        "creation_date",
        "has_content",
        "file_name",
        "mime_type",
        "url",
        "content",
        "content_hash",
    ];

    fn insert_values(&self) -> Vec<ParamValue> {
        vec![
            ParamValue::Int(self.tenant_id),
            opt_text(&self.author),
            ParamValue::Timestamp(self.creation_date),
            ParamValue::Bool(self.has_content),
            opt_text(&self.file_name),
            opt_text(&self.mime_type),
            opt_text(&self.url),
            match &self.content {
                Some(bytes) => ParamValue::Bytes(bytes.clone()),
                None => ParamValue::Null,
            },
            opt_text(&self.content_hash),
        ]
    }
}

impl SearchableEntity for Document {
    const SEARCH_FIELDS: &'static [&'static str] = &["author", "file_name", "mime_type"];
}

/// The versioned, nameable binding between a process instance and a content
/// row. The journal holds at most one current mapping per
/// `(process_instance_id, name)` slot when not list-managed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DocumentMapping {
    pub id: i64,
    pub tenant_id: i64,
    /// Current content row.
    pub document_id: i64,
    pub process_instance_id: i64,
    pub name: String,
    pub description: Option<String>,
    /// String-encoded positive integer, starting at
    /// [`crate::defaults::INITIAL_VERSION`].
    pub version: String,
    /// Position in an ordered list when the slot holds several documents;
    /// [`NO_LIST_INDEX`] when not list-managed.
    #[sqlx(rename = "list_index")]
    pub index: i32,
    pub creation_date: DateTime<Utc>,
}

impl DocumentMapping {
    /// Whether this mapping participates in an ordered list.
    pub fn is_list_managed(&self) -> bool {
        self.index != NO_LIST_INDEX
    }
}

impl PersistentEntity for DocumentMapping {
    const ENTITY: &'static str = "document_mapping";
    const TABLE: &'static str = "document_mapping";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "tenant_id",
        "document_id",
        "process_instance_id",
        "name",
        "description",
        "version",
        "list_index",
        "creation_date",
    ];
    const STORE: StoreBinding = StoreBinding::Journal;

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

impl Recordable for DocumentMapping {
    const INSERT_COLUMNS: &'static [&'static str] = &[
        "tenant_id",
        "document_id",
        "process_instance_id",
        "name",
        "description",
        "version",
        "list_index",
        "creation_date",
    ];

    fn insert_values(&self) -> Vec<ParamValue> {
        vec![
            ParamValue::Int(self.tenant_id),
            ParamValue::Int(self.document_id),
            ParamValue::Int(self.process_instance_id),
            ParamValue::Text(self.name.clone()),
            opt_text(&self.description),
            ParamValue::Text(self.version.clone()),
            ParamValue::Int(i64::from(self.index)),
            ParamValue::Timestamp(self.creation_date),
        ]
    }
}

impl SearchableEntity for DocumentMapping {
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "description"];
}

/// Immutable copy of a [`DocumentMapping`] at the instant it was superseded.
///
/// A document's full history is its archived mappings ordered by
/// `archive_date` plus the one live mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ArchivedDocumentMapping {
    pub id: i64,
    pub tenant_id: i64,
    /// Instant the snapshot was frozen.
    pub archive_date: DateTime<Utc>,
    /// Id of the live mapping this row was copied from.
    pub source_object_id: i64,
    pub document_id: i64,
    pub process_instance_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    #[sqlx(rename = "list_index")]
    pub index: i32,
    pub creation_date: DateTime<Utc>,
}

impl ArchivedDocumentMapping {
    /// Freeze a snapshot of a live mapping.
    pub fn from_live(mapping: &DocumentMapping, archive_date: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            tenant_id: mapping.tenant_id,
            archive_date,
            source_object_id: mapping.id,
            document_id: mapping.document_id,
            process_instance_id: mapping.process_instance_id,
            name: mapping.name.clone(),
            description: mapping.description.clone(),
            version: mapping.version.clone(),
            index: mapping.index,
            creation_date: mapping.creation_date,
        }
    }
}

impl PersistentEntity for ArchivedDocumentMapping {
    const ENTITY: &'static str = "arch_document_mapping";
    const TABLE: &'static str = "arch_document_mapping";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "tenant_id",
        "archive_date",
        "source_object_id",
        "document_id",
        "process_instance_id",
        "name",
        "description",
        "version",
        "list_index",
        "creation_date",
    ];
    const STORE: StoreBinding = StoreBinding::Archive;

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }
}

impl Recordable for ArchivedDocumentMapping {
    const INSERT_COLUMNS: &'static [&'static str] = &[
        "tenant_id",
        "archive_date",
        "source_object_id",
        "document_id",
        "process_instance_id",
        "name",
        "description",
        "version",
        "list_index",
        "creation_date",
    ];

    fn insert_values(&self) -> Vec<ParamValue> {
        vec![
            ParamValue::Int(self.tenant_id),
            ParamValue::Timestamp(self.archive_date),
            ParamValue::Int(self.source_object_id),
            ParamValue::Int(self.document_id),
            ParamValue::Int(self.process_instance_id),
            ParamValue::Text(self.name.clone()),
            opt_text(&self.description),
            ParamValue::Text(self.version.clone()),
            ParamValue::Int(i64::from(self.index)),
            ParamValue::Timestamp(self.creation_date),
        ]
    }
}

impl SearchableEntity for ArchivedDocumentMapping {
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "description"];
}

impl ArchivedEntity for ArchivedDocumentMapping {
    const SOURCE_ENTITY: &'static str = DocumentMapping::ENTITY;

    fn archive_date(&self) -> DateTime<Utc> {
        self.archive_date
    }

    fn set_archive_date(&mut self, archive_date: DateTime<Utc>) {
        self.archive_date = archive_date;
    }

    fn source_object_id(&self) -> i64 {
        self.source_object_id
    }
}

/// Read view joining a mapping (live or archived) with its content row's
/// metadata. Not itself persistent; produced by catalog join queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct MappedDocument {
    /// Id of the live mapping (for archived snapshots: the source mapping).
    pub mapping_id: i64,
    pub document_id: i64,
    pub process_instance_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub version: String,
    #[sqlx(rename = "list_index")]
    pub index: i32,
    pub creation_date: DateTime<Utc>,
    pub author: Option<String>,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub url: Option<String>,
    pub has_content: bool,
}

impl MappedDocument {
    /// Assemble the view from freshly written rows, saving a re-read inside
    /// a mutating transaction.
    pub fn from_parts(mapping: &DocumentMapping, document: &Document) -> Self {
        Self {
            mapping_id: mapping.id,
            document_id: document.id,
            process_instance_id: mapping.process_instance_id,
            name: mapping.name.clone(),
            description: mapping.description.clone(),
            version: mapping.version.clone(),
            index: mapping.index,
            creation_date: mapping.creation_date,
            author: document.author.clone(),
            file_name: document.file_name.clone(),
            mime_type: document.mime_type.clone(),
            url: document.url.clone(),
            has_content: document.has_content,
        }
    }
}

fn opt_text(value: &Option<String>) -> ParamValue {
    match value {
        Some(s) => ParamValue::Text(s.clone()),
        None => ParamValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults;

    fn mapping() -> DocumentMapping {
        DocumentMapping {
            id: 9,
            tenant_id: 1,
            document_id: 4,
            process_instance_id: 42,
            name: "spec.pdf".to_string(),
            description: None,
            version: defaults::INITIAL_VERSION.to_string(),
            index: NO_LIST_INDEX,
            creation_date: Utc::now(),
        }
    }

    #[test]
    fn test_next_version_increments() {
        assert_eq!(next_version("1").unwrap(), "2");
        assert_eq!(next_version("41").unwrap(), "42");
    }

    #[test]
    fn test_next_version_rejects_corrupt_input() {
        assert!(next_version("one").is_err());
        assert!(next_version("").is_err());
    }

    #[test]
    fn test_snapshot_copies_live_fields() {
        let live = mapping();
        let at = Utc::now();
        let snap = ArchivedDocumentMapping::from_live(&live, at);
        assert_eq!(snap.source_object_id, live.id);
        assert_eq!(snap.archive_date, at);
        assert_eq!(snap.version, live.version);
        assert_eq!(snap.document_id, live.document_id);
        assert_eq!(snap.id, 0);
    }

    #[test]
    fn test_insert_values_match_insert_columns() {
        let live = mapping();
        assert_eq!(
            live.insert_values().len(),
            DocumentMapping::INSERT_COLUMNS.len()
        );
        let snap = ArchivedDocumentMapping::from_live(&live, Utc::now());
        assert_eq!(
            snap.insert_values().len(),
            ArchivedDocumentMapping::INSERT_COLUMNS.len()
        );
    }

    #[test]
    fn test_list_management_flag() {
        let mut m = mapping();
        assert!(!m.is_list_managed());
        m.index = 0;
        assert!(m.is_list_managed());
    }
}
