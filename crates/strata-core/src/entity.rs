//! Entity contracts: the metadata a persistent type exposes so the generic
//! query machinery stays typed without per-entity handwritten plumbing.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;

use crate::descriptor::ParamValue;

/// Which physical store a persistent type belongs to.
///
/// Journal and archive read services verify this binding and refuse
/// mismatched entity types: the two stores are never interchanged
/// implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreBinding {
    /// The mutable, current-state store.
    Journal,
    /// The immutable, historical-snapshot store.
    Archive,
}

impl StoreBinding {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreBinding::Journal => "journal",
            StoreBinding::Archive => "archive",
        }
    }
}

/// A domain entity with a stable numeric identity and a known table layout.
pub trait PersistentEntity: Send + Sync + Unpin {
    /// Logical entity name, used for store routing, event dispatch, and
    /// instrumentation.
    const ENTITY: &'static str;

    /// Backing table.
    const TABLE: &'static str;

    /// Full column list, including `id`. Doubles as the allowlist for
    /// filter/order fields and partial-update targets.
    const COLUMNS: &'static [&'static str];

    /// Store this entity lives in.
    const STORE: StoreBinding;

    /// Row identity. Zero until the store assigns one.
    fn id(&self) -> i64;

    /// Adopt the store-assigned identity after insertion.
    fn set_id(&mut self, id: i64);
}

/// A persistent entity the recorder knows how to insert generically.
pub trait Recordable: PersistentEntity {
    /// Insert column list, excluding the store-assigned `id`.
    const INSERT_COLUMNS: &'static [&'static str];

    /// Values for [`Self::INSERT_COLUMNS`], in the same order.
    fn insert_values(&self) -> Vec<ParamValue>;
}

/// A persistent entity the generic search/count machinery can page over.
pub trait SearchableEntity:
    PersistentEntity + for<'r> sqlx::FromRow<'r, SqliteRow>
{
    /// Fields the cross-field search token matches against when the caller
    /// does not name any.
    const SEARCH_FIELDS: &'static [&'static str] = &[];
}

/// An immutable historical snapshot row.
///
/// Carries the archive timestamp and the id of the live row it was copied
/// from. Never mutated after insertion; the only permitted operation is bulk
/// deletion by id-set.
pub trait ArchivedEntity: Recordable {
    /// Logical name of the live entity this type snapshots.
    const SOURCE_ENTITY: &'static str;

    /// Instant the snapshot was frozen.
    fn archive_date(&self) -> DateTime<Utc>;

    /// Stamp the freeze instant before insertion.
    fn set_archive_date(&mut self, archive_date: DateTime<Utc>);

    /// Id of the live row this snapshot was copied from.
    fn source_object_id(&self) -> i64;
}
