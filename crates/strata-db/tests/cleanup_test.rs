//! Bulk cleanup tests: the journal drain loop, the archive-side bulk
//! deletes, and archive immutability.

use anyhow::Result;

use strata_db::test_fixtures::{attach_request, update_request, TestDatabase};
use strata_db::{
    parameters, ArchivedDocumentMapping, DocumentRepository, Error, ParamValue, QueryOptions,
};

async fn archived_snapshots(
    test_db: &TestDatabase,
    process_instance_id: i64,
) -> Result<Vec<ArchivedDocumentMapping>> {
    let rows = test_db
        .db
        .archive
        .definitive_read_service()
        .search_entity_with_suffix::<ArchivedDocumentMapping>(
            "forProcessInstance",
            &QueryOptions::ALL_RESULTS,
            &parameters([("process_instance_id", ParamValue::Int(process_instance_id))]),
        )
        .await?;
    Ok(rows)
}

#[tokio::test]
async fn drain_removes_all_mappings_and_their_content_rows() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    // 250 live mappings against an internal page size of 100.
    let mut document_ids = Vec::new();
    for i in 0..250 {
        let mapped = documents
            .attach_document_to_process_instance(attach_request(99, &format!("doc-{i:03}")))
            .await?;
        document_ids.push(mapped.document_id);
    }
    assert_eq!(
        documents.get_number_of_documents_of_process_instance(99).await?,
        250
    );

    let removed = documents.delete_documents_from_process_instance(99).await?;
    assert_eq!(removed, 250);
    assert_eq!(
        documents.get_number_of_documents_of_process_instance(99).await?,
        0
    );

    // The per-row path dropped the content rows too.
    for document_id in document_ids.iter().take(5) {
        assert!(matches!(
            documents.get_document(*document_id).await.unwrap_err(),
            Error::NotFound(_)
        ));
    }
    Ok(())
}

#[tokio::test]
async fn drain_of_an_empty_instance_is_a_no_op() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let removed = test_db
        .db
        .documents
        .delete_documents_from_process_instance(1234)
        .await?;
    assert_eq!(removed, 0);
    Ok(())
}

#[tokio::test]
async fn delete_archived_documents_sweeps_snapshots_and_content() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    // Two instances with history, one untouched bystander.
    for pid in [31, 32, 33] {
        documents
            .attach_document_to_process_instance(attach_request(pid, "spec"))
            .await?;
        documents.update_document(pid, "spec", update_request(b"v2")).await?;
    }
    let superseded_content = archived_snapshots(&test_db, 31).await?[0].document_id;

    let removed = documents.delete_archived_documents(&[31, 32]).await?;
    assert_eq!(removed, 2);
    assert!(archived_snapshots(&test_db, 31).await?.is_empty());
    assert!(archived_snapshots(&test_db, 32).await?.is_empty());
    assert_eq!(archived_snapshots(&test_db, 33).await?.len(), 1);

    // The superseded content row went with its snapshot.
    assert!(matches!(
        documents.get_document(superseded_content).await.unwrap_err(),
        Error::NotFound(_)
    ));

    // Live rows are untouched by the archive-side sweep.
    assert_eq!(documents.get_mapped_document(31, "spec").await?.version, "2");
    Ok(())
}

#[tokio::test]
async fn delete_archived_documents_with_no_matches_is_zero() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let removed = test_db.db.documents.delete_archived_documents(&[404]).await?;
    assert_eq!(removed, 0);
    Ok(())
}

/// Archive rows are never changed by any operation in this core: later
/// lifecycle activity on the live row leaves existing snapshots untouched.
#[tokio::test]
async fn archived_snapshots_are_immutable_under_later_activity() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    documents
        .attach_document_to_process_instance(attach_request(41, "spec"))
        .await?;
    documents.update_document(41, "spec", update_request(b"v2")).await?;
    let before = archived_snapshots(&test_db, 41).await?;
    assert_eq!(before.len(), 1);

    // More updates, a reindex of a sibling list slot, and finally removal
    // of the live row.
    documents.update_document(41, "spec", update_request(b"v3")).await?;
    let sibling = documents
        .attach_document_to_process_instance_at(attach_request(41, "annex"), 0)
        .await?;
    documents.update_document_index(sibling.mapping_id, 3).await?;
    documents.remove_current_version(41, "spec").await?;

    let after = archived_snapshots(&test_db, 41).await?;
    assert_eq!(after.len(), 3);
    let original = after
        .iter()
        .find(|s| s.id == before[0].id)
        .expect("first snapshot still present");
    assert_eq!(original, &before[0]);
    Ok(())
}
