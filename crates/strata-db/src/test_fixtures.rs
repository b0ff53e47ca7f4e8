//! Test fixtures for database integration tests.
//!
//! Provides a migrated in-memory database and request builders for
//! consistent testing across the codebase.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use strata_db::test_fixtures::{attach_request, TestDatabase};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let test_db = TestDatabase::new().await;
//!     let mapped = test_db
//!         .db
//!         .documents
//!         .attach_document_to_process_instance(attach_request(42, "spec.pdf"))
//!         .await
//!         .unwrap();
//!     // Run your tests...
//! }
//! ```

use strata_core::{AttachDocumentRequest, UpdateDocumentRequest};

use crate::Database;

/// A migrated, private in-memory database. Dropped with the test.
pub struct TestDatabase {
    pub db: Database,
}

impl TestDatabase {
    pub async fn new() -> Self {
        init_test_logging();
        let db = Database::connect_memory()
            .await
            .expect("failed to open in-memory database");
        db.migrate().await.expect("failed to run migrations");
        Self { db }
    }
}

/// Install an env-filtered subscriber once per test process. Controlled by
/// `RUST_LOG`; quiet by default.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// An attach request with blob content, tenant 1.
pub fn attach_request(process_instance_id: i64, name: &str) -> AttachDocumentRequest {
    AttachDocumentRequest {
        tenant_id: 1,
        process_instance_id,
        name: name.to_string(),
        description: None,
        author: Some("tester".to_string()),
        file_name: Some(format!("{name}.bin")),
        mime_type: Some("application/octet-stream".to_string()),
        content: Some(format!("content of {name}").into_bytes()),
        url: None,
    }
}

/// An update request swapping in new blob content.
pub fn update_request(content: &[u8]) -> UpdateDocumentRequest {
    UpdateDocumentRequest {
        description: None,
        author: Some("tester".to_string()),
        file_name: None,
        mime_type: Some("application/octet-stream".to_string()),
        content: Some(content.to_vec()),
        url: None,
    }
}
