//! Relationship engine model.
//!
//! # Responsibility
//! - Describe typed links between two objects and the record pairs they join.
//!
//! # Invariants
//! - `(from_object_id, to_object_id, name)` is unique.
//! - A link triple `(relationship_id, from_record_id, to_record_id)` is unique.
//! - Link lookup is symmetric: a record may sit on either endpoint.

use crate::model::ids::{EntityKind, LinkId, ObjectId, OwnerId, RecordId, RelationshipId};
use crate::model::validation::{validate_entity_id, validate_label, validate_logical_name, ValidationError};
use crate::model::JsonMap;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Cardinality of a relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    #[serde(rename = "1:N")]
    OneToMany,
    #[serde(rename = "N:N")]
    ManyToMany,
    #[serde(rename = "lookup")]
    Lookup,
}

impl RelationshipType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneToMany => "1:N",
            Self::ManyToMany => "N:N",
            Self::Lookup => "lookup",
        }
    }
}

impl Display for RelationshipType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationshipType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "1:N" => Ok(Self::OneToMany),
            "N:N" => Ok(Self::ManyToMany),
            "lookup" => Ok(Self::Lookup),
            other => Err(ValidationError::UnknownRelationshipType(other.to_string())),
        }
    }
}

/// Persisted relationship definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: RelationshipId,
    pub name: String,
    pub from_object_id: ObjectId,
    pub to_object_id: ObjectId,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    pub from_label: Option<String>,
    pub to_label: Option<String>,
    pub created_by: Option<OwnerId>,
    pub created_at: i64,
}

/// Input for defining a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRelationship {
    pub name: String,
    pub from_object_id: ObjectId,
    pub to_object_id: ObjectId,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    #[serde(default)]
    pub from_label: Option<String>,
    #[serde(default)]
    pub to_label: Option<String>,
}

impl NewRelationship {
    pub fn new(
        name: impl Into<String>,
        from_object_id: impl Into<ObjectId>,
        to_object_id: impl Into<ObjectId>,
        relationship_type: RelationshipType,
    ) -> Self {
        Self {
            name: name.into(),
            from_object_id: from_object_id.into(),
            to_object_id: to_object_id.into(),
            relationship_type,
            from_label: None,
            to_label: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_logical_name("name", &self.name)?;
        validate_entity_id(EntityKind::Object, &self.from_object_id)?;
        validate_entity_id(EntityKind::Object, &self.to_object_id)?;
        validate_optional_label("from_label", self.from_label.as_deref())?;
        validate_optional_label("to_label", self.to_label.as_deref())
    }
}

/// Partial relationship update. Endpoints are fixed once created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationshipPatch {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub relationship_type: Option<RelationshipType>,
    pub from_label: Option<String>,
    pub to_label: Option<String>,
}

impl RelationshipPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.relationship_type.is_none()
            && self.from_label.is_none()
            && self.to_label.is_none()
    }

    pub fn apply_to(&self, relationship: &mut Relationship) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(name) = &self.name {
            validate_logical_name("name", name)?;
            relationship.name = name.clone();
        }
        if let Some(relationship_type) = self.relationship_type {
            relationship.relationship_type = relationship_type;
        }
        if let Some(from_label) = &self.from_label {
            validate_label("from_label", from_label)?;
            relationship.from_label = Some(from_label.clone());
        }
        if let Some(to_label) = &self.to_label {
            validate_label("to_label", to_label)?;
            relationship.to_label = Some(to_label.clone());
        }
        Ok(())
    }
}

/// Persisted record pair joined by a relationship.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipLink {
    pub id: LinkId,
    pub relationship_id: RelationshipId,
    pub from_record_id: RecordId,
    pub to_record_id: RecordId,
    #[serde(rename = "relationship_metadata")]
    pub metadata: JsonMap,
    pub created_by: Option<OwnerId>,
    pub created_at: i64,
}

impl RelationshipLink {
    /// Returns the endpoint opposite `record_id`, or `None` if it is not an endpoint.
    pub fn other_endpoint(&self, record_id: &str) -> Option<&str> {
        if self.from_record_id == record_id {
            Some(self.to_record_id.as_str())
        } else if self.to_record_id == record_id {
            Some(self.from_record_id.as_str())
        } else {
            None
        }
    }
}

/// Input for linking two records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewLink {
    pub relationship_id: RelationshipId,
    pub from_record_id: RecordId,
    pub to_record_id: RecordId,
    #[serde(default, rename = "relationship_metadata")]
    pub metadata: JsonMap,
}

impl NewLink {
    pub fn new(
        relationship_id: impl Into<RelationshipId>,
        from_record_id: impl Into<RecordId>,
        to_record_id: impl Into<RecordId>,
    ) -> Self {
        Self {
            relationship_id: relationship_id.into(),
            from_record_id: from_record_id.into(),
            to_record_id: to_record_id.into(),
            metadata: JsonMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_entity_id(EntityKind::Relationship, &self.relationship_id)?;
        validate_entity_id(EntityKind::Record, &self.from_record_id)?;
        validate_entity_id(EntityKind::Record, &self.to_record_id)
    }
}

fn validate_optional_label(
    attribute: &'static str,
    value: Option<&str>,
) -> Result<(), ValidationError> {
    match value {
        Some(value) => validate_label(attribute, value),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::{NewRelationship, RelationshipLink, RelationshipType};
    use crate::model::validation::ValidationError;
    use crate::model::JsonMap;

    #[test]
    fn relationship_type_uses_wire_names() {
        assert_eq!("N:N".parse::<RelationshipType>().unwrap(), RelationshipType::ManyToMany);
        assert_eq!(
            serde_json::to_string(&RelationshipType::OneToMany).unwrap(),
            "\"1:N\""
        );
        assert_eq!(
            "1:1".parse::<RelationshipType>(),
            Err(ValidationError::UnknownRelationshipType("1:1".to_string()))
        );
    }

    #[test]
    fn endpoints_must_be_object_ids() {
        let input = NewRelationship::new(
            "works_at",
            "obj_0a1b2c3d",
            "rec_0a1b2c3d",
            RelationshipType::OneToMany,
        );
        assert!(matches!(
            input.validate(),
            Err(ValidationError::MalformedId { .. })
        ));
    }

    #[test]
    fn other_endpoint_is_symmetric() {
        let link = RelationshipLink {
            id: "lnk_0a1b2c3d".to_string(),
            relationship_id: "rel_0a1b2c3d".to_string(),
            from_record_id: "rec_aaaaaaaa".to_string(),
            to_record_id: "rec_bbbbbbbb".to_string(),
            metadata: JsonMap::new(),
            created_by: None,
            created_at: 0,
        };
        assert_eq!(link.other_endpoint("rec_aaaaaaaa"), Some("rec_bbbbbbbb"));
        assert_eq!(link.other_endpoint("rec_bbbbbbbb"), Some("rec_aaaaaaaa"));
        assert_eq!(link.other_endpoint("rec_cccccccc"), None);
    }
}
