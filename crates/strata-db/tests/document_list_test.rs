//! Ordered-list slot tests: multi-document names, list updates, and the
//! archive/journal union read.

use anyhow::Result;
use chrono::Utc;

use strata_db::test_fixtures::{attach_request, update_request, TestDatabase};
use strata_db::{DocumentRepository, OrderDirection, QueryOptions};

#[tokio::test]
async fn three_indexed_attachments_come_back_in_requested_order() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    // Indices attached out of order on purpose.
    for index in [2, 0, 1] {
        let mut req = attach_request(7, "attachment");
        req.file_name = Some(format!("part-{index}.bin"));
        documents
            .attach_document_to_process_instance_at(req, index)
            .await?;
    }

    let options = QueryOptions::ALL_RESULTS.order_by(
        "document_mapping",
        "list_index",
        OrderDirection::Asc,
    );
    let listed = documents.get_documents_of_process_instance(7, &options).await?;
    assert_eq!(listed.len(), 3);
    let indices: Vec<i32> = listed.iter().map(|m| m.index).collect();
    assert_eq!(indices, [0, 1, 2]);
    assert_eq!(
        documents.get_number_of_documents_of_process_instance(7).await?,
        3
    );
    Ok(())
}

#[tokio::test]
async fn negative_list_index_is_rejected() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let err = test_db
        .db
        .documents
        .attach_document_to_process_instance_at(attach_request(7, "attachment"), -2)
        .await
        .unwrap_err();
    assert!(matches!(err, strata_db::Error::InvalidInput(_)));
    Ok(())
}

#[tokio::test]
async fn update_document_of_list_targets_one_index() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    for index in [0, 1] {
        documents
            .attach_document_to_process_instance_at(attach_request(8, "attachment"), index)
            .await?;
    }
    let updated = documents
        .update_document_of_list(8, "attachment", 1, update_request(b"new body"))
        .await?;
    assert_eq!(updated.version, "2");
    assert_eq!(updated.index, 1);

    // The sibling at index 0 is untouched.
    let options = QueryOptions::ALL_RESULTS.order_by(
        "document_mapping",
        "list_index",
        OrderDirection::Asc,
    );
    let listed = documents.get_documents_of_process_instance(8, &options).await?;
    assert_eq!(listed[0].version, "1");
    assert_eq!(listed[1].version, "2");
    Ok(())
}

/// Pins the open-question union semantics: a slot whose mapping has been
/// superseded contributes both its archived snapshot and its live row, with
/// no de-duplication across the two stores.
#[tokio::test]
async fn document_list_union_keeps_archived_and_live_rows() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    documents
        .attach_document_to_process_instance_at(attach_request(21, "attachment"), 0)
        .await?;
    documents
        .update_document_of_list(21, "attachment", 0, update_request(b"superseded"))
        .await?;

    let list = documents
        .get_document_list("attachment", 21, Utc::now())
        .await?;
    assert_eq!(list.len(), 2, "archived snapshot and live row both appear");

    let versions: Vec<&str> = list.iter().map(|d| d.version.as_str()).collect();
    assert!(versions.contains(&"1"));
    assert!(versions.contains(&"2"));
    Ok(())
}

#[tokio::test]
async fn document_list_excludes_rows_created_after_the_query_time() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    documents
        .attach_document_to_process_instance_at(attach_request(22, "attachment"), 0)
        .await?;
    let before_second_attach = Utc::now();
    documents
        .attach_document_to_process_instance_at(attach_request(22, "attachment"), 1)
        .await?;

    let list = documents
        .get_document_list("attachment", 22, before_second_attach)
        .await?;
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].index, 0);
    Ok(())
}

#[tokio::test]
async fn document_list_orders_by_list_index() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;

    for index in [1, 0, 2] {
        documents
            .attach_document_to_process_instance_at(attach_request(23, "attachment"), index)
            .await?;
    }
    let list = documents
        .get_document_list("attachment", 23, Utc::now())
        .await?;
    let indices: Vec<i32> = list.iter().map(|d| d.index).collect();
    assert_eq!(indices, [0, 1, 2]);
    Ok(())
}
