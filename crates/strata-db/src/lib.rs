//! # strata-db
//!
//! SQLite store layer for the strata persistence core.
//!
//! This crate provides:
//! - Connection pool management
//! - The named-query catalog (the engine's query configuration)
//! - Journal and archive read persistence services
//! - The recorder (the sole journal mutation path) and its event dispatch
//! - The archive service (copy-on-freeze writes, retention bulk deletes)
//! - The document lifecycle service
//!
//! ## Example
//!
//! ```rust,ignore
//! use strata_db::{Database, AttachDocumentRequest, DocumentRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite://strata.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let mapped = db.documents.attach_document_to_process_instance(
//!         AttachDocumentRequest {
//!             process_instance_id: 42,
//!             name: "spec.pdf".to_string(),
//!             content: Some(b"...".to_vec()),
//!             ..Default::default()
//!         },
//!     ).await?;
//!
//!     println!("Attached mapping {}", mapped.mapping_id);
//!     Ok(())
//! }
//! ```

pub mod archive;
mod binding;
pub mod catalog;
pub mod config;
pub mod documents;
pub mod pool;
pub mod read_service;
pub mod recorder;
pub mod search_builder;

// Test fixtures for integration tests
// Note: always compiled so integration tests (in tests/) can use them.
pub mod test_fixtures;

// Re-export core types
pub use strata_core::*;

use std::sync::Arc;

use sqlx::sqlite::SqlitePool;

use crate::archive::ArchiveService;
use crate::catalog::{engine_catalog, QueryCatalog};
use crate::documents::DocumentService;
use crate::pool::{create_pool_with_config, PoolConfig};
use crate::read_service::ReadPersistenceService;
use crate::recorder::Recorder;

/// Escape LIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Wired-up persistence core: pool, catalog, event bus, recorder, both read
/// services, archive service, and the document lifecycle service.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: SqlitePool,
    /// The engine's named-query catalog.
    pub catalog: Arc<QueryCatalog>,
    /// Recorder event bus; register listener interests here.
    pub bus: Arc<RecorderEventBus>,
    /// Journal mutation entry point.
    pub recorder: Recorder,
    /// Read service bound to the journal store.
    pub journal: ReadPersistenceService,
    /// Archive service, owning the definitive archive read service.
    pub archive: ArchiveService,
    /// Document lifecycle service.
    pub documents: DocumentService,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        let catalog = engine_catalog();
        let bus = Arc::new(RecorderEventBus::default());
        let recorder = Recorder::new(Arc::clone(&bus));
        let journal = ReadPersistenceService::journal(pool.clone(), Arc::clone(&catalog));
        let archive = ArchiveService::new(pool.clone(), Arc::clone(&catalog));
        let documents = DocumentService::new(
            pool.clone(),
            recorder.clone(),
            archive.clone(),
            Arc::clone(&catalog),
        );
        Self {
            pool,
            catalog,
            bus,
            recorder,
            journal,
            archive,
            documents,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, PoolConfig::default()).await
    }

    /// Create a new Database instance with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Create a private in-memory database (single-connection pool).
    pub async fn connect_memory() -> Result<Self> {
        Self::connect_with_config("sqlite::memory:", PoolConfig::in_memory()).await
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(Error::from)
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
