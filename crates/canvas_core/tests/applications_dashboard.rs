use canvas_core::db::open_db_in_memory;
use canvas_core::{
    ApplicationPatch, DashboardStats, EntityKind, ErrorKind, FieldType, JsonMap, NewApplication,
    NewField, NewObject, ObjectModel, RepoError, ValidationError,
};
use rusqlite::Connection;
use serde_json::json;
use std::thread;
use std::time::Duration;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn create_and_get_application() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();

    let mut input = NewApplication::new("sales_crm", "Sales CRM");
    input.icon = Some("briefcase".to_string());
    input.config.insert("theme".to_string(), json!("dark"));
    let app = model.applications.create_application(&input, owner).unwrap();

    assert!(EntityKind::Application.owns_id(&app.id));
    assert_eq!(app.created_by, Some(owner));
    assert_eq!(app.created_at, app.updated_at);
    assert!(!app.is_published());
    assert_eq!(app.config["theme"], json!("dark"));

    let loaded = model.applications.get_application(&app.id, owner).unwrap().unwrap();
    assert_eq!(loaded, app);

    let err = model
        .applications
        .create_application(&NewApplication::new("Sales CRM", "Sales"), owner)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::InvalidName { .. })
    ));
}

#[test]
fn update_and_publish_application() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();

    let app = model
        .applications
        .create_application(&NewApplication::new("helpdesk", "Helpdesk"), owner)
        .unwrap();

    let mut config = JsonMap::new();
    config.insert("objects".to_string(), json!(["obj_tickets1"]));
    let patch = ApplicationPatch {
        label: Some("Support Desk".to_string()),
        config: Some(config),
        ..ApplicationPatch::default()
    };
    let updated = model
        .applications
        .update_application(&app.id, &patch, owner)
        .unwrap();
    assert_eq!(updated.name, "helpdesk");
    assert_eq!(updated.label, "Support Desk");
    assert_eq!(updated.config["objects"], json!(["obj_tickets1"]));
    assert!(updated.updated_at >= app.updated_at);

    let err = model
        .applications
        .update_application(&app.id, &ApplicationPatch::default(), owner)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailure);

    let published = model.applications.publish_application(&app.id, owner).unwrap();
    assert!(published.is_published());
    assert_eq!(published.published_at, Some(published.updated_at));
    assert_eq!(published.label, "Support Desk");
    assert_eq!(
        model.applications.get_application(&app.id, owner).unwrap().unwrap(),
        published
    );
}

#[test]
fn applications_are_private_to_their_creator() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let app = model
        .applications
        .create_application(&NewApplication::new("recruiting", "Recruiting"), owner)
        .unwrap();

    assert!(model.applications.get_application(&app.id, stranger).unwrap().is_none());
    assert!(model.applications.list_user_applications(stranger).unwrap().is_empty());
    let err = model
        .applications
        .publish_application(&app.id, stranger)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let patch = ApplicationPatch {
        label: Some("Hijacked".to_string()),
        ..ApplicationPatch::default()
    };
    let err = model
        .applications
        .update_application(&app.id, &patch, stranger)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!model.applications.delete_application(&app.id, stranger).unwrap());

    assert!(model.applications.delete_application(&app.id, owner).unwrap());
    assert!(model.applications.get_application(&app.id, owner).unwrap().is_none());
    assert!(!model.applications.delete_application(&app.id, owner).unwrap());
}

#[test]
fn list_user_applications_puts_recently_updated_first() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();

    let first = model
        .applications
        .create_application(&NewApplication::new("inventory", "Inventory"), owner)
        .unwrap();
    thread::sleep(Duration::from_millis(5));
    let second = model
        .applications
        .create_application(&NewApplication::new("payroll", "Payroll"), owner)
        .unwrap();

    let ids: Vec<_> = model
        .applications
        .list_user_applications(owner)
        .unwrap()
        .into_iter()
        .map(|app| app.id)
        .collect();
    assert_eq!(ids, vec![second.id.clone(), first.id.clone()]);

    thread::sleep(Duration::from_millis(5));
    model.applications.publish_application(&first.id, owner).unwrap();
    let ids: Vec<_> = model
        .applications
        .list_user_applications(owner)
        .unwrap()
        .into_iter()
        .map(|app| app.id)
        .collect();
    assert_eq!(ids, vec![first.id, second.id]);
}

#[test]
fn dashboard_counts_only_what_the_caller_can_see() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    assert_eq!(
        model.dashboard.dashboard_stats(owner).unwrap(),
        DashboardStats {
            total_records: 0,
            active_objects: 0,
            fields_count: 5,
            applications_count: 0,
        }
    );

    let contact = model
        .objects
        .create_object(&NewObject::new("contact", "Contact", "Contacts"), owner)
        .unwrap();
    model
        .objects
        .create_object(&NewObject::new("company", "Company", "Companies"), owner)
        .unwrap();
    for name in ["Ada", "Grace", "Linus"] {
        let mut data = JsonMap::new();
        data.insert("fld_name".to_string(), json!(name));
        model.records.create_record(&contact.id, &data, owner).unwrap();
    }
    model
        .fields
        .create_field(&NewField::new("nickname", "Nickname", FieldType::Text), owner)
        .unwrap();
    model
        .applications
        .create_application(&NewApplication::new("crm", "CRM"), owner)
        .unwrap();

    model
        .objects
        .create_object(&NewObject::new("secret", "Secret", "Secrets"), stranger)
        .unwrap();
    model
        .fields
        .create_field(&NewField::new("alias", "Alias", FieldType::Text), stranger)
        .unwrap();

    let stats = model.dashboard.dashboard_stats(owner).unwrap();
    assert_eq!(stats.total_records, 3);
    assert_eq!(stats.active_objects, 2);
    assert_eq!(stats.fields_count, 6);
    assert_eq!(stats.applications_count, 1);

    let stranger_stats = model.dashboard.dashboard_stats(stranger).unwrap();
    assert_eq!(stranger_stats.total_records, 0);
    assert_eq!(stranger_stats.active_objects, 1);
    assert_eq!(stranger_stats.fields_count, 6);
    assert_eq!(stranger_stats.applications_count, 0);
}
