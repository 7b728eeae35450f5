//! Prefixed entity identifiers and caller identity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Verified caller identity supplied by the authentication collaborator.
pub type OwnerId = Uuid;

pub type FieldId = String;
pub type ObjectId = String;
pub type BindingId = String;
pub type RecordId = String;
pub type RelationshipId = String;
pub type LinkId = String;
pub type ApplicationId = String;

const RANDOM_SUFFIX_LEN: usize = 8;

/// Entity families that own a stable id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Field,
    Object,
    ObjectField,
    Record,
    Relationship,
    Link,
    Application,
}

impl EntityKind {
    /// Id prefix, part of the external id contract.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Field => "fld_",
            Self::Object => "obj_",
            Self::ObjectField => "ofd_",
            Self::Record => "rec_",
            Self::Relationship => "rel_",
            Self::Link => "lnk_",
            Self::Application => "app_",
        }
    }

    /// Human-readable singular name used in error messages and logs.
    pub fn label(self) -> &'static str {
        match self {
            Self::Field => "field",
            Self::Object => "object",
            Self::ObjectField => "object field",
            Self::Record => "record",
            Self::Relationship => "relationship",
            Self::Link => "relationship link",
            Self::Application => "application",
        }
    }

    /// Generates a fresh id: prefix plus 8 random lowercase hex characters.
    pub fn new_id(self) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("{}{}", self.prefix(), &suffix[..RANDOM_SUFFIX_LEN])
    }

    /// Returns whether `id` carries this kind's prefix and a non-empty suffix.
    pub fn owns_id(self, id: &str) -> bool {
        id.strip_prefix(self.prefix())
            .is_some_and(|suffix| !suffix.is_empty())
    }
}
