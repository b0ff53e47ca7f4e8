//! Lifecycle tests for the document mapping state machine: attach,
//! supersede-with-archive, reorder, remove, and point-in-time reads.

use anyhow::Result;
use chrono::Utc;

use strata_db::test_fixtures::{attach_request, update_request, TestDatabase};
use strata_db::{
    parameters, ArchivedDocumentMapping, DocumentRepository, Error, OrderDirection, ParamValue,
    QueryOptions,
};

async fn archived_snapshots(
    test_db: &TestDatabase,
    process_instance_id: i64,
) -> Result<Vec<ArchivedDocumentMapping>> {
    let options = QueryOptions::ALL_RESULTS.order_by(
        "arch_document_mapping",
        "archive_date",
        OrderDirection::Asc,
    );
    let rows = test_db
        .db
        .archive
        .definitive_read_service()
        .search_entity_with_suffix::<ArchivedDocumentMapping>(
            "forProcessInstance",
            &options,
            &parameters([("process_instance_id", ParamValue::Int(process_instance_id))]),
        )
        .await?;
    Ok(rows)
}

#[tokio::test]
async fn attach_then_update_archives_exactly_one_snapshot() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    // Attach: live mapping version "1", not list-managed.
    let attached = documents
        .attach_document_to_process_instance(attach_request(42, "spec.pdf"))
        .await?;
    assert_eq!(attached.version, "1");
    assert_eq!(attached.index, -1);
    assert!(attached.has_content);

    // Update once: live version "2".
    let updated = documents
        .update_document(42, "spec.pdf", update_request(b"second body"))
        .await?;
    assert_eq!(updated.version, "2");
    assert_eq!(updated.mapping_id, attached.mapping_id);
    assert_ne!(updated.document_id, attached.document_id);

    // The archive holds exactly one snapshot: version "1", pointing back at
    // the live mapping and its original content row.
    let snapshots = archived_snapshots(&test_db, 42).await?;
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].version, "1");
    assert_eq!(snapshots[0].source_object_id, attached.mapping_id);
    assert_eq!(snapshots[0].document_id, attached.document_id);
    Ok(())
}

#[tokio::test]
async fn version_increments_by_one_per_update() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    documents
        .attach_document_to_process_instance(attach_request(7, "contract"))
        .await?;
    for body in [b"v2".as_slice(), b"v3", b"v4"] {
        documents.update_document(7, "contract", update_request(body)).await?;
    }

    let live = documents.get_mapped_document(7, "contract").await?;
    assert_eq!(live.version, "4");

    // Each snapshot is exactly one version behind its successor.
    let snapshots = archived_snapshots(&test_db, 7).await?;
    let versions: Vec<&str> = snapshots.iter().map(|s| s.version.as_str()).collect();
    assert_eq!(versions, ["1", "2", "3"]);
    Ok(())
}

#[tokio::test]
async fn duplicate_attach_on_same_slot_is_already_exists() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    documents
        .attach_document_to_process_instance(attach_request(5, "report"))
        .await?;
    let err = documents
        .attach_document_to_process_instance(attach_request(5, "report"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyExists(_)), "got {err:?}");

    // A different slot name on the same instance is fine.
    documents
        .attach_document_to_process_instance(attach_request(5, "report-final"))
        .await?;
    Ok(())
}

#[tokio::test]
async fn update_of_missing_slot_is_not_found() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let err = test_db
        .db
        .documents
        .update_document(1, "ghost", update_request(b"x"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
    Ok(())
}

#[tokio::test]
async fn reindex_does_not_archive() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    let mapped = documents
        .attach_document_to_process_instance_at(attach_request(9, "attachment"), 0)
        .await?;
    documents.update_document_index(mapped.mapping_id, 4).await?;

    let listed = documents
        .get_documents_of_process_instance(9, &QueryOptions::ALL_RESULTS)
        .await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].index, 4);

    // The index is not versioned content: nothing was archived and the
    // version is untouched.
    assert_eq!(listed[0].version, "1");
    assert!(archived_snapshots(&test_db, 9).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn point_in_time_before_any_archive_falls_back_to_live() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    documents
        .attach_document_to_process_instance(attach_request(11, "spec"))
        .await?;
    let before_any_archive = Utc::now();

    let live = documents.get_mapped_document(11, "spec").await?;
    let at = documents
        .get_mapped_document_at(11, "spec", before_any_archive)
        .await?;
    assert_eq!(at, live);
    Ok(())
}

#[tokio::test]
async fn point_in_time_resolves_the_superseded_version() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    let attached = documents
        .attach_document_to_process_instance(attach_request(12, "spec"))
        .await?;
    let while_v1_was_live = Utc::now();
    documents.update_document(12, "spec", update_request(b"v2")).await?;
    let while_v2_is_live = Utc::now();

    // As of a time before the update, version "1" with its original content
    // row was current.
    let at_v1 = documents
        .get_mapped_document_at(12, "spec", while_v1_was_live)
        .await?;
    assert_eq!(at_v1.version, "1");
    assert_eq!(at_v1.document_id, attached.document_id);
    assert_eq!(at_v1.mapping_id, attached.mapping_id);

    // As of now, nothing has been archived after the query time: live row.
    let at_v2 = documents
        .get_mapped_document_at(12, "spec", while_v2_is_live)
        .await?;
    assert_eq!(at_v2.version, "2");
    Ok(())
}

#[tokio::test]
async fn remove_current_version_archives_then_removes() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    documents
        .attach_document_to_process_instance(attach_request(13, "draft"))
        .await?;
    documents.remove_current_version(13, "draft").await?;

    let err = documents.get_mapped_document(13, "draft").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    // The removal is reconstructable: one snapshot of the final state.
    let snapshots = archived_snapshots(&test_db, 13).await?;
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].version, "1");
    Ok(())
}

#[tokio::test]
async fn remove_document_leaves_content_row_untouched() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    let mapped = documents
        .attach_document_to_process_instance(attach_request(14, "note"))
        .await?;
    documents.remove_document(mapped.mapping_id).await?;

    assert!(matches!(
        documents.get_mapped_document(14, "note").await.unwrap_err(),
        Error::NotFound(_)
    ));
    // Content lifecycle is separate: the blob is still there.
    let content = documents.get_document_content(mapped.document_id).await?;
    assert_eq!(content, b"content of note".to_vec());
    Ok(())
}

#[tokio::test]
async fn content_hash_and_wipe_lifecycle() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    let mapped = documents
        .attach_document_to_process_instance(attach_request(15, "blob"))
        .await?;
    let document = documents.get_document(mapped.document_id).await?;
    assert!(document
        .content_hash
        .as_deref()
        .is_some_and(|h| h.starts_with("sha256:")));

    documents
        .delete_content_of_archived_document(mapped.document_id)
        .await?;
    let wiped = documents.get_document(mapped.document_id).await?;
    assert!(!wiped.has_content);
    assert!(wiped.content_hash.is_none());
    assert!(matches!(
        documents
            .get_document_content(mapped.document_id)
            .await
            .unwrap_err(),
        Error::NotFound(_)
    ));
    Ok(())
}
