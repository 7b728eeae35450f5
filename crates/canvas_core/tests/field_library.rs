use canvas_core::db::open_db_in_memory;
use canvas_core::{
    DenialReason, EntityKind, ErrorKind, FieldListQuery, FieldPatch, FieldScope, FieldType,
    NewBinding, NewField, NewObject, ObjectModel, RepoError, ValidationError,
};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn text_field(name: &str) -> NewField {
    NewField::new(name, name.replace('_', " "), FieldType::Text)
}

#[test]
fn create_field_is_custom_private_and_owned() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();

    let mut input = NewField::new("email", "Email", FieldType::Email);
    input.category = Some("Contact".to_string());
    input.config.insert("placeholder".to_string(), json!("name@example.com"));
    let field = model.fields.create_field(&input, owner).unwrap();

    assert!(EntityKind::Field.owns_id(&field.id));
    assert_eq!(field.field_type, FieldType::Email);
    assert!(field.is_custom);
    assert!(!field.is_global);
    assert!(!field.is_system_field);
    assert_eq!(field.created_by, Some(owner));
    assert_eq!(field.config["placeholder"], json!("name@example.com"));

    let loaded = model.fields.get_field(&field.id, owner).unwrap().unwrap();
    assert_eq!(loaded, field);
}

#[test]
fn duplicate_field_name_for_same_owner_conflicts() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();

    model.fields.create_field(&text_field("company"), owner).unwrap();
    let err = model
        .fields
        .create_field(&text_field("company"), owner)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let other_owner = Uuid::new_v4();
    model
        .fields
        .create_field(&text_field("company"), other_owner)
        .unwrap();
}

#[test]
fn non_custom_field_creation_is_denied() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();

    let mut input = text_field("status");
    input.is_custom = false;
    let err = model.fields.create_field(&input, Uuid::new_v4()).unwrap_err();
    match err {
        RepoError::AccessDenied(violation) => {
            assert_eq!(violation.reason, DenialReason::NotCustom);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_field_input_is_rejected_before_storage() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();

    assert!(matches!(
        "rich_text".parse::<FieldType>(),
        Err(ValidationError::UnknownFieldType(_))
    ));

    let err = model
        .fields
        .create_field(&NewField::new("First Name", "First", FieldType::Text), owner)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);

    let mut select = NewField::new("stage", "Stage", FieldType::Select);
    select.config.insert("options".to_string(), json!("open,won"));
    let err = model.fields.create_field(&select, owner).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::InvalidShape {
            attribute: "config.options",
            ..
        })
    ));

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM fields WHERE is_custom = 1;", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn listing_shows_global_fields_plus_own_fields_only() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let alice_field = model.fields.create_field(&text_field("nickname"), alice).unwrap();
    let bob_field = model.fields.create_field(&text_field("badge"), bob).unwrap();

    let alice_view = model
        .fields
        .list_fields(&FieldListQuery::default(), alice)
        .unwrap();
    let ids: Vec<_> = alice_view.iter().map(|field| field.id.as_str()).collect();
    assert_eq!(alice_view.len(), 6);
    assert!(ids.contains(&alice_field.id.as_str()));
    assert!(!ids.contains(&bob_field.id.as_str()));
    assert!(ids.contains(&"fld_system_owner"));

    assert!(model.fields.get_field(&bob_field.id, alice).unwrap().is_none());
    assert!(model
        .fields
        .get_field("fld_system_created_at", alice)
        .unwrap()
        .is_some());
}

#[test]
fn listing_scopes_and_filters_narrow_results() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();

    let mut phone = NewField::new("mobile", "Mobile", FieldType::Phone);
    phone.category = Some("Contact".to_string());
    let phone = model.fields.create_field(&phone, owner).unwrap();
    let notes = model
        .fields
        .create_field(&NewField::new("notes", "Notes", FieldType::Textarea), owner)
        .unwrap();

    let global = model.fields.list_global_fields(owner).unwrap();
    assert_eq!(global.len(), 5);
    assert!(global.iter().all(|field| field.is_system_field));

    let own = model.fields.list_user_fields(owner).unwrap();
    let own_ids: Vec<_> = own.iter().map(|field| field.id.clone()).collect();
    assert_eq!(own_ids, vec![phone.id.clone(), notes.id.clone()]);

    let contact = model
        .fields
        .list_fields(
            &FieldListQuery {
                category: Some("Contact".to_string()),
                ..FieldListQuery::default()
            },
            owner,
        )
        .unwrap();
    assert_eq!(contact.len(), 1);
    assert_eq!(contact[0].id, phone.id);

    let non_system = model
        .fields
        .list_fields(
            &FieldListQuery {
                scope: FieldScope::All,
                is_system: Some(false),
                ..FieldListQuery::default()
            },
            owner,
        )
        .unwrap();
    assert_eq!(non_system.len(), 2);

    let system_in_category = model
        .fields
        .list_fields(
            &FieldListQuery {
                category: Some("System".to_string()),
                is_system: Some(true),
                ..FieldListQuery::default()
            },
            owner,
        )
        .unwrap();
    assert_eq!(system_in_category.len(), 5);
}

#[test]
fn update_field_applies_only_supplied_attributes() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();

    let mut input = NewField::new("budget", "Budget", FieldType::Number);
    input.description = Some("Planned spend".to_string());
    let field = model.fields.create_field(&input, owner).unwrap();

    let patch = FieldPatch {
        label: Some("Budget (EUR)".to_string()),
        field_type: Some(FieldType::Currency),
        ..FieldPatch::default()
    };
    let updated = model.fields.update_field(&field.id, &patch, owner).unwrap();
    assert_eq!(updated.label, "Budget (EUR)");
    assert_eq!(updated.field_type, FieldType::Currency);
    assert_eq!(updated.name, "budget");
    assert_eq!(updated.description.as_deref(), Some("Planned spend"));

    let loaded = model.fields.get_field(&field.id, owner).unwrap().unwrap();
    assert_eq!(loaded, updated);

    let err = model
        .fields
        .update_field(&field.id, &FieldPatch::default(), owner)
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(ValidationError::EmptyPatch)));
}

#[test]
fn update_field_rename_onto_existing_name_conflicts() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();

    model.fields.create_field(&text_field("title"), owner).unwrap();
    let other = model.fields.create_field(&text_field("headline"), owner).unwrap();

    let patch = FieldPatch {
        name: Some("title".to_string()),
        ..FieldPatch::default()
    };
    let err = model.fields.update_field(&other.id, &patch, owner).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let loaded = model.fields.get_field(&other.id, owner).unwrap().unwrap();
    assert_eq!(loaded.name, "headline");
}

#[test]
fn system_and_foreign_fields_cannot_be_changed() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let patch = FieldPatch {
        label: Some("Renamed".to_string()),
        ..FieldPatch::default()
    };

    let err = model
        .fields
        .update_field("fld_system_owner", &patch, owner)
        .unwrap_err();
    match err {
        RepoError::AccessDenied(violation) => {
            assert_eq!(violation.reason, DenialReason::SystemField);
        }
        other => panic!("unexpected error: {other}"),
    }
    let err = model.fields.delete_field("fld_system_owner", owner).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AccessDenied);

    let private = model.fields.create_field(&text_field("secret"), owner).unwrap();
    let err = model
        .fields
        .update_field(&private.id, &patch, stranger)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!model.fields.delete_field(&private.id, stranger).unwrap());
    assert!(model.fields.get_field(&private.id, owner).unwrap().is_some());
}

#[test]
fn deleting_bound_field_is_restricted_and_keeps_rows() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();

    let field = model.fields.create_field(&text_field("industry"), owner).unwrap();
    let object = model
        .objects
        .create_object(&NewObject::new("account", "Account", "Accounts"), owner)
        .unwrap();
    let binding = model
        .bindings
        .attach_field(&NewBinding::new(object.id.clone(), field.id.clone()), owner)
        .unwrap();

    let err = model.fields.delete_field(&field.id, owner).unwrap_err();
    match err {
        RepoError::RestrictedDelete {
            kind,
            blocking,
            references,
            ..
        } => {
            assert_eq!(kind, EntityKind::Field);
            assert_eq!(blocking, EntityKind::ObjectField);
            assert_eq!(references, 1);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(model.fields.get_field(&field.id, owner).unwrap().is_some());
    assert!(model.bindings.get_binding(&binding.id, owner).unwrap().is_some());

    assert!(model.bindings.detach_field(&binding.id, owner).unwrap());
    assert!(model.fields.delete_field(&field.id, owner).unwrap());
    assert!(model.fields.get_field(&field.id, owner).unwrap().is_none());
    assert!(!model.fields.delete_field(&field.id, owner).unwrap());
}
