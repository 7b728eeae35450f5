use canvas_core::db::open_db_in_memory;
use canvas_core::{
    AccessAction, DenialReason, EntityKind, ErrorKind, FieldType, JsonMap, NewBinding, NewField,
    NewObject, NewRelationship, ObjectModel, ObjectPatch, RelationshipType, RepoError,
};
use rusqlite::{params, Connection};
use serde_json::json;
use uuid::Uuid;

const SHARED_OBJECT_ID: &str = "obj_shared01";

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

/// Seeds a global object owned by `publisher`, as a shared template would be.
fn seed_global_object(conn: &Connection, publisher: Uuid) {
    conn.execute(
        "INSERT INTO objects (id, name, label, plural_name, is_custom, is_global, created_by)
         VALUES (?1, 'shared', 'Shared', 'Shared', 0, 1, ?2);",
        params![SHARED_OBJECT_ID, publisher.to_string()],
    )
    .unwrap();
}

fn name_data(value: &str) -> JsonMap {
    let mut data = JsonMap::new();
    data.insert("fld_name".to_string(), json!(value));
    data
}

#[test]
fn global_object_is_readable_but_not_writable() {
    let conn = setup();
    let publisher = Uuid::new_v4();
    seed_global_object(&conn, publisher);
    let model = ObjectModel::try_new(&conn).unwrap();
    let caller = Uuid::new_v4();

    let shared = model.objects.get_object(SHARED_OBJECT_ID, caller).unwrap().unwrap();
    assert!(shared.is_global);
    assert!(!shared.is_custom);
    assert_eq!(shared.created_by, Some(publisher));
    assert!(model.objects.list_owned_objects(caller).unwrap().is_empty());

    let patch = ObjectPatch {
        label: Some("Mine now".to_string()),
        ..ObjectPatch::default()
    };
    match model.objects.update_object(SHARED_OBJECT_ID, &patch, caller).unwrap_err() {
        RepoError::AccessDenied(violation) => {
            assert_eq!(violation.kind, EntityKind::Object);
            assert_eq!(violation.action, AccessAction::Update);
            assert_eq!(violation.reason, DenialReason::NotOwner);
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = model.objects.delete_object(SHARED_OBJECT_ID, caller).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);
    assert!(model.objects.get_object(SHARED_OBJECT_ID, caller).unwrap().is_some());
}

#[test]
fn records_and_bindings_under_global_object_require_ownership() {
    let conn = setup();
    let publisher = Uuid::new_v4();
    seed_global_object(&conn, publisher);
    let model = ObjectModel::try_new(&conn).unwrap();
    let caller = Uuid::new_v4();

    let err = model
        .records
        .create_record(SHARED_OBJECT_ID, &name_data("Ada"), caller)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);
    let err = model
        .records
        .get_records_by_object(SHARED_OBJECT_ID, 0, 10, caller)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);
    let err = model
        .records
        .search_records(SHARED_OBJECT_ID, "ada", caller)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);

    let field = model
        .fields
        .create_field(&NewField::new("notes", "Notes", FieldType::Textarea), caller)
        .unwrap();
    let err = model
        .bindings
        .attach_field(&NewBinding::new(SHARED_OBJECT_ID, field.id.clone()), caller)
        .unwrap_err();
    match err {
        RepoError::AccessDenied(violation) => {
            assert_eq!(violation.action, AccessAction::Insert);
            assert_eq!(violation.reason, DenialReason::NotOwner);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Binding reads follow the object read rule.
    assert!(model
        .bindings
        .list_bindings_for_object(SHARED_OBJECT_ID, caller)
        .unwrap()
        .is_empty());

    // The publisher still owns the object outright.
    let record = model
        .records
        .create_record(SHARED_OBJECT_ID, &name_data("Template row"), publisher)
        .unwrap();
    assert!(model.records.get_record(&record.id, caller).unwrap().is_none());
    assert!(model.records.get_record(&record.id, publisher).unwrap().is_some());
}

#[test]
fn relationships_may_target_visible_global_objects() {
    let conn = setup();
    seed_global_object(&conn, Uuid::new_v4());
    let model = ObjectModel::try_new(&conn).unwrap();
    let caller = Uuid::new_v4();

    let own = model
        .objects
        .create_object(&NewObject::new("ticket", "Ticket", "Tickets"), caller)
        .unwrap();
    let relationship = model
        .relationships
        .create_relationship(
            &NewRelationship::new("template", own.id.clone(), SHARED_OBJECT_ID, RelationshipType::Lookup),
            caller,
        )
        .unwrap();
    assert_eq!(relationship.to_object_id, SHARED_OBJECT_ID);
    assert_eq!(relationship.created_by, Some(caller));
}

#[test]
fn private_foreign_rows_look_absent() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let object = model
        .objects
        .create_object(&NewObject::new("invoice", "Invoice", "Invoices"), owner)
        .unwrap();
    let record = model
        .records
        .create_record(&object.id, &name_data("INV-1"), owner)
        .unwrap();

    assert!(model.objects.get_object(&object.id, stranger).unwrap().is_none());
    let err = model
        .records
        .create_record(&object.id, &name_data("INV-2"), stranger)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            kind: EntityKind::Object,
            ..
        }
    ));
    let err = model
        .records
        .get_records_by_object(&object.id, 0, 0, stranger)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    assert!(model.records.get_record(&record.id, stranger).unwrap().is_none());
    let err = model
        .records
        .update_record(&record.id, &name_data("INV-9"), stranger)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            kind: EntityKind::Record,
            ..
        }
    ));
    assert!(!model.records.delete_record(&record.id, stranger).unwrap());
    assert!(!model.objects.delete_object(&object.id, stranger).unwrap());

    let stats = model.dashboard.dashboard_stats(stranger).unwrap();
    assert_eq!(stats.total_records, 0);
    assert_eq!(stats.active_objects, 0);

    let untouched = model.records.get_record(&record.id, owner).unwrap().unwrap();
    assert_eq!(untouched.data["fld_name"], json!("INV-1"));
}
