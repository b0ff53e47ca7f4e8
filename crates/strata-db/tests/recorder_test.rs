//! Recorder tests: event dispatch gated by listener interest, and
//! partial-field updates on disjoint fields.

use anyhow::Result;

use strata_db::recorder::{UpdateDescriptor, UpdateRecord};
use strata_db::test_fixtures::{attach_request, TestDatabase};
use strata_db::{
    DocumentMapping, DocumentRepository, Error, MutationKind, ParamValue, SelectByIdDescriptor,
};

#[tokio::test]
async fn interested_listener_receives_each_mutation_kind() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let bus = &test_db.db.bus;
    let mut inserts = bus.register_interest("document_mapping", MutationKind::Insert);
    let mut updates = bus.register_interest("document_mapping", MutationKind::Update);
    let mut deletes = bus.register_interest("document_mapping", MutationKind::Delete);

    let documents = &test_db.db.documents;
    let mapped = documents
        .attach_document_to_process_instance_at(attach_request(61, "attachment"), 0)
        .await?;
    documents.update_document_index(mapped.mapping_id, 2).await?;
    documents.remove_document(mapped.mapping_id).await?;

    let insert_event = inserts.recv().await?;
    assert_eq!(insert_event.entity, "document_mapping");
    assert_eq!(insert_event.kind, MutationKind::Insert);
    assert_eq!(insert_event.entity_id, mapped.mapping_id);
    let payload = insert_event.payload.expect("insert payload");
    assert_eq!(payload["name"]["Text"], "attachment");

    // The interested receivers also saw the other kinds they registered
    // for; each stream carries every dispatched event.
    let update_event = updates
        .recv()
        .await
        .into_iter()
        .chain(std::iter::from_fn(|| updates.try_recv().ok()))
        .find(|e| e.kind == MutationKind::Update)
        .expect("update event");
    assert_eq!(update_event.entity_id, mapped.mapping_id);
    let payload = update_event.payload.expect("update payload");
    assert_eq!(payload["list_index"]["Int"], 2);

    let delete_event = deletes
        .recv()
        .await
        .into_iter()
        .chain(std::iter::from_fn(|| deletes.try_recv().ok()))
        .find(|e| e.kind == MutationKind::Delete)
        .expect("delete event");
    assert_eq!(delete_event.entity_id, mapped.mapping_id);
    assert!(delete_event.payload.is_none());
    Ok(())
}

#[tokio::test]
async fn no_event_is_constructed_without_a_matching_interest() -> Result<()> {
    let test_db = TestDatabase::new().await;
    // Listener only cares about deletes of content rows.
    let mut deletes = test_db.db.bus.register_interest("document", MutationKind::Delete);

    let documents = &test_db.db.documents;
    let mapped = documents
        .attach_document_to_process_instance(attach_request(62, "spec"))
        .await?;
    documents.remove_document(mapped.mapping_id).await?;
    documents.delete_document(mapped.document_id).await?;

    // The only event on the stream is the content-row delete: the attach
    // inserts and the mapping delete were never constructed.
    let event = deletes.recv().await?;
    assert_eq!(event.entity, "document");
    assert_eq!(event.kind, MutationKind::Delete);
    assert_eq!(event.entity_id, mapped.document_id);
    assert!(deletes.try_recv().is_err());
    Ok(())
}

#[tokio::test]
async fn disjoint_partial_updates_do_not_clobber_each_other() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let documents = &test_db.db.documents;
    let mapped = documents
        .attach_document_to_process_instance_at(attach_request(63, "attachment"), 0)
        .await?;

    // Two partial updates touching disjoint fields.
    let recorder = &test_db.db.recorder;
    let mut tx = test_db.db.pool.begin().await?;
    recorder
        .update_tx::<DocumentMapping>(
            &mut tx,
            UpdateRecord::new(
                mapped.mapping_id,
                UpdateDescriptor::new().set("description", "first pass"),
            ),
        )
        .await?;
    recorder
        .update_tx::<DocumentMapping>(
            &mut tx,
            UpdateRecord::new(
                mapped.mapping_id,
                UpdateDescriptor::new().set("list_index", 7),
            ),
        )
        .await?;
    tx.commit().await?;

    let row = test_db
        .db
        .journal
        .select_by_id(SelectByIdDescriptor::<DocumentMapping>::new(
            "document_mapping",
            mapped.mapping_id,
        ))
        .await?
        .expect("mapping row");
    assert_eq!(row.description.as_deref(), Some("first pass"));
    assert_eq!(row.index, 7);
    Ok(())
}

#[tokio::test]
async fn empty_update_descriptor_is_a_no_op() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let recorder = &test_db.db.recorder;
    let mut tx = test_db.db.pool.begin().await?;
    recorder
        .update_tx::<DocumentMapping>(&mut tx, UpdateRecord::new(1, UpdateDescriptor::new()))
        .await?;
    tx.commit().await?;
    Ok(())
}

#[tokio::test]
async fn update_of_unknown_column_is_rejected() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let recorder = &test_db.db.recorder;
    let mut tx = test_db.db.pool.begin().await?;
    let err = recorder
        .update_tx::<DocumentMapping>(
            &mut tx,
            UpdateRecord::new(1, UpdateDescriptor::new().set("no_such_column", 1i64)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    tx.commit().await?;
    Ok(())
}

#[tokio::test]
async fn update_of_missing_row_is_not_found() -> Result<()> {
    let test_db = TestDatabase::new().await;
    let recorder = &test_db.db.recorder;
    let mut tx = test_db.db.pool.begin().await?;
    let err = recorder
        .update_tx::<DocumentMapping>(
            &mut tx,
            UpdateRecord::new(
                987654,
                UpdateDescriptor::new().set("list_index", ParamValue::Int(0)),
            ),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    tx.commit().await?;
    Ok(())
}
