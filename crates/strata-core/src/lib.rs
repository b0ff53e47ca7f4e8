//! # strata-core
//!
//! Core types, traits, and abstractions for the strata persistence layer:
//! the query-descriptor model, typed select descriptors, entity contracts,
//! recorder events, and the document lifecycle models.
//!
//! This crate provides the foundational data structures and trait
//! definitions that the store crates depend on. It performs no I/O.

pub mod defaults;
pub mod descriptor;
pub mod entity;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod query;
pub mod traits;

// Re-export commonly used types at crate root
pub use descriptor::{
    parameters, ParamValue, Parameters, SelectByIdDescriptor, SelectListDescriptor,
    SelectOneDescriptor,
};
pub use entity::{ArchivedEntity, PersistentEntity, Recordable, SearchableEntity, StoreBinding};
pub use error::{Error, Result};
pub use events::{MutationKind, RecorderEvent, RecorderEventBus};
pub use models::{
    next_version, ArchivedDocumentMapping, Document, DocumentMapping, MappedDocument,
    NO_LIST_INDEX,
};
pub use query::{
    FilterOperator, FilterOption, OrderByOption, OrderDirection, QueryOptions, SearchTerm,
};
pub use traits::{AttachDocumentRequest, DocumentRepository, UpdateDocumentRequest};
