use canvas_core::db::open_db_in_memory;
use canvas_core::{
    EntityKind, ErrorKind, JsonMap, NewLink, NewObject, NewRelationship, Object, ObjectModel,
    Record, RelationshipPatch, RelationshipType, RepoError, ValidationError,
};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn object(model: &ObjectModel<'_>, name: &str, owner: Uuid) -> Object {
    model
        .objects
        .create_object(&NewObject::new(name, name, format!("{name}s")), owner)
        .unwrap()
}

fn record(model: &ObjectModel<'_>, object: &Object, name: &str, owner: Uuid) -> Record {
    let mut data = JsonMap::new();
    data.insert("fld_name".to_string(), json!(name));
    model.records.create_record(&object.id, &data, owner).unwrap()
}

#[test]
fn relationship_type_only_accepts_known_cardinalities() {
    assert_eq!("1:N".parse::<RelationshipType>().unwrap(), RelationshipType::OneToMany);
    assert_eq!("lookup".parse::<RelationshipType>().unwrap(), RelationshipType::Lookup);
    assert!(matches!(
        "1:1".parse::<RelationshipType>(),
        Err(ValidationError::UnknownRelationshipType(_))
    ));
    assert!(serde_json::from_value::<RelationshipType>(json!("many")).is_err());
}

#[test]
fn create_relationship_requires_visible_endpoints() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();
    let contact = object(&model, "contact", owner);
    let foreign = object(&model, "company", Uuid::new_v4());

    let err = model
        .relationships
        .create_relationship(
            &NewRelationship::new("works_at", contact.id.clone(), foreign.id.clone(), RelationshipType::OneToMany),
            owner,
        )
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            kind: EntityKind::Object,
            ..
        }
    ));

    let err = model
        .relationships
        .create_relationship(
            &NewRelationship::new("works_at", contact.id.clone(), "obj_missing0", RelationshipType::OneToMany),
            owner,
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn duplicate_relationship_name_between_same_objects_conflicts() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();
    let contact = object(&model, "contact", owner);
    let company = object(&model, "company", owner);

    let mut input = NewRelationship::new(
        "works_at",
        contact.id.clone(),
        company.id.clone(),
        RelationshipType::OneToMany,
    );
    input.from_label = Some("Employer".to_string());
    input.to_label = Some("Employees".to_string());
    let relationship = model.relationships.create_relationship(&input, owner).unwrap();
    assert!(EntityKind::Relationship.owns_id(&relationship.id));
    assert_eq!(relationship.from_label.as_deref(), Some("Employer"));

    let err = model
        .relationships
        .create_relationship(&input, owner)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let reverse = NewRelationship::new(
        "works_at",
        company.id.clone(),
        contact.id.clone(),
        RelationshipType::OneToMany,
    );
    model.relationships.create_relationship(&reverse, owner).unwrap();
}

#[test]
fn link_lookup_is_symmetric() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();
    let contact = object(&model, "contact", owner);
    let company = object(&model, "company", owner);
    let ada = record(&model, &contact, "Ada", owner);
    let acme = record(&model, &company, "Acme", owner);

    let works_at = model
        .relationships
        .create_relationship(
            &NewRelationship::new("works_at", contact.id.clone(), company.id.clone(), RelationshipType::OneToMany),
            owner,
        )
        .unwrap();

    let mut input = NewLink::new(works_at.id.clone(), ada.id.clone(), acme.id.clone());
    input.metadata.insert("role".to_string(), json!("engineer"));
    let link = model.relationships.link_records(&input, owner).unwrap();
    assert!(EntityKind::Link.owns_id(&link.id));
    assert_eq!(link.metadata["role"], json!("engineer"));

    let from_side = model
        .relationships
        .get_related_records(&ada.id, &works_at.id, owner)
        .unwrap();
    let to_side = model
        .relationships
        .get_related_records(&acme.id, &works_at.id, owner)
        .unwrap();
    assert_eq!(from_side, vec![link.clone()]);
    assert_eq!(to_side, vec![link.clone()]);
    assert_eq!(from_side[0].other_endpoint(&ada.id), Some(acme.id.as_str()));
    assert_eq!(to_side[0].other_endpoint(&acme.id), Some(ada.id.as_str()));

    let err = model.relationships.link_records(&input, owner).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn link_endpoints_must_match_declared_objects() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();
    let contact = object(&model, "contact", owner);
    let company = object(&model, "company", owner);
    let ada = record(&model, &contact, "Ada", owner);
    let acme = record(&model, &company, "Acme", owner);

    let works_at = model
        .relationships
        .create_relationship(
            &NewRelationship::new("works_at", contact.id.clone(), company.id.clone(), RelationshipType::OneToMany),
            owner,
        )
        .unwrap();

    let err = model
        .relationships
        .link_records(&NewLink::new(works_at.id.clone(), acme.id.clone(), ada.id.clone()), owner)
        .unwrap_err();
    match err {
        RepoError::Validation(ValidationError::LinkEndpointMismatch {
            endpoint,
            expected_object_id,
            actual_object_id,
        }) => {
            assert_eq!(endpoint, "from");
            assert_eq!(expected_object_id, contact.id);
            assert_eq!(actual_object_id, company.id);
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = model
        .relationships
        .link_records(&NewLink::new(works_at.id.clone(), ada.id.clone(), "rec_missing0"), owner)
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            kind: EntityKind::Record,
            ..
        }
    ));

    let links: i64 = conn
        .query_row("SELECT COUNT(*) FROM relationship_records;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(links, 0);
}

#[test]
fn deleting_records_or_relationships_removes_links() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();
    let project = object(&model, "project", owner);
    let person = object(&model, "person", owner);
    let apollo = record(&model, &project, "Apollo", owner);
    let gemini = record(&model, &project, "Gemini", owner);
    let ada = record(&model, &person, "Ada", owner);

    let members = model
        .relationships
        .create_relationship(
            &NewRelationship::new("members", project.id.clone(), person.id.clone(), RelationshipType::ManyToMany),
            owner,
        )
        .unwrap();
    model
        .relationships
        .link_records(&NewLink::new(members.id.clone(), apollo.id.clone(), ada.id.clone()), owner)
        .unwrap();
    model
        .relationships
        .link_records(&NewLink::new(members.id.clone(), gemini.id.clone(), ada.id.clone()), owner)
        .unwrap();

    let linked = model
        .relationships
        .get_related_records(&ada.id, &members.id, owner)
        .unwrap();
    assert_eq!(linked.len(), 2);

    assert!(model.records.delete_record(&apollo.id, owner).unwrap());
    let linked = model
        .relationships
        .get_related_records(&ada.id, &members.id, owner)
        .unwrap();
    assert_eq!(linked.len(), 1);
    assert_eq!(linked[0].from_record_id, gemini.id);

    assert!(model.relationships.delete_relationship(&members.id, owner).unwrap());
    assert!(model.relationships.get_relationship(&members.id, owner).unwrap().is_none());
    let links: i64 = conn
        .query_row("SELECT COUNT(*) FROM relationship_records;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(links, 0);
    assert!(model.records.get_record(&ada.id, owner).unwrap().is_some());
}

#[test]
fn unlink_removes_single_link() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();
    let contact = object(&model, "contact", owner);
    let ada = record(&model, &contact, "Ada", owner);
    let grace = record(&model, &contact, "Grace", owner);

    let knows = model
        .relationships
        .create_relationship(
            &NewRelationship::new("knows", contact.id.clone(), contact.id.clone(), RelationshipType::ManyToMany),
            owner,
        )
        .unwrap();
    let link = model
        .relationships
        .link_records(&NewLink::new(knows.id.clone(), ada.id.clone(), grace.id.clone()), owner)
        .unwrap();

    assert!(!model.relationships.unlink(&link.id, Uuid::new_v4()).unwrap());
    assert!(model.relationships.unlink(&link.id, owner).unwrap());
    assert!(!model.relationships.unlink(&link.id, owner).unwrap());
    assert!(model
        .relationships
        .get_related_records(&grace.id, &knows.id, owner)
        .unwrap()
        .is_empty());
}

#[test]
fn list_get_and_update_relationships() {
    let conn = setup();
    let model = ObjectModel::try_new(&conn).unwrap();
    let owner = Uuid::new_v4();
    let contact = object(&model, "contact", owner);
    let company = object(&model, "company", owner);
    let deal = object(&model, "deal", owner);

    let works_at = model
        .relationships
        .create_relationship(
            &NewRelationship::new("works_at", contact.id.clone(), company.id.clone(), RelationshipType::OneToMany),
            owner,
        )
        .unwrap();
    let deal_contact = model
        .relationships
        .create_relationship(
            &NewRelationship::new("primary_contact", deal.id.clone(), contact.id.clone(), RelationshipType::Lookup),
            owner,
        )
        .unwrap();
    model
        .relationships
        .create_relationship(
            &NewRelationship::new("account", deal.id.clone(), company.id.clone(), RelationshipType::Lookup),
            owner,
        )
        .unwrap();

    let ids: Vec<_> = model
        .relationships
        .list_relationships_for_object(&contact.id, owner)
        .unwrap()
        .into_iter()
        .map(|relationship| relationship.id)
        .collect();
    assert_eq!(ids, vec![works_at.id.clone(), deal_contact.id.clone()]);

    let patch = RelationshipPatch {
        relationship_type: Some(RelationshipType::ManyToMany),
        to_label: Some("Staff".to_string()),
        ..RelationshipPatch::default()
    };
    let updated = model
        .relationships
        .update_relationship(&works_at.id, &patch, owner)
        .unwrap();
    assert_eq!(updated.relationship_type, RelationshipType::ManyToMany);
    assert_eq!(updated.to_label.as_deref(), Some("Staff"));
    assert_eq!(updated.name, "works_at");
    assert_eq!(
        model.relationships.get_relationship(&works_at.id, owner).unwrap().unwrap(),
        updated
    );

    let stranger = Uuid::new_v4();
    assert!(model.relationships.get_relationship(&works_at.id, stranger).unwrap().is_none());
    let err = model
        .relationships
        .update_relationship(&works_at.id, &patch, stranger)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert!(!model.relationships.delete_relationship(&works_at.id, stranger).unwrap());
}
