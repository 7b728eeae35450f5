//! Object registry model.
//!
//! # Responsibility
//! - Describe user-defined entity types and their view/permission config.
//! - Shape-check `views` and `permissions` without interpreting them.
//!
//! # Invariants
//! - `(name, created_by)` is unique; enforced by storage.
//! - Objects created through the registry are custom and never global.
//! - `views` always contains the four canonical view lists.

use crate::model::ids::{ObjectId, OwnerId};
use crate::model::validation::{validate_label, validate_logical_name, ValidationError};
use crate::model::JsonMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// View lists every object carries, in canonical order.
pub const CANONICAL_VIEW_KINDS: [&str; 4] = ["forms", "tables", "kanbans", "calendars"];

/// Role token granting an action to everyone.
pub const ALL_ROLES: &str = "all";

/// Persisted object definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub id: ObjectId,
    pub name: String,
    pub label: String,
    pub plural_name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub is_custom: bool,
    pub is_global: bool,
    /// Named view lists; opaque to the core beyond their shape.
    pub views: JsonMap,
    pub permissions: ObjectPermissions,
    pub created_by: Option<OwnerId>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Allowed role tokens per CRUD action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPermissions {
    #[serde(default = "all_roles")]
    pub create: Vec<String>,
    #[serde(default = "all_roles")]
    pub read: Vec<String>,
    #[serde(default = "all_roles")]
    pub update: Vec<String>,
    #[serde(default = "all_roles")]
    pub delete: Vec<String>,
}

fn all_roles() -> Vec<String> {
    vec![ALL_ROLES.to_string()]
}

impl Default for ObjectPermissions {
    fn default() -> Self {
        Self {
            create: all_roles(),
            read: all_roles(),
            update: all_roles(),
            delete: all_roles(),
        }
    }
}

impl ObjectPermissions {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (action, roles) in [
            ("create", &self.create),
            ("read", &self.read),
            ("update", &self.update),
            ("delete", &self.delete),
        ] {
            if roles.is_empty() {
                return Err(ValidationError::InvalidShape {
                    attribute: "permissions",
                    message: format!("`{action}` must list at least one role"),
                });
            }
            if roles.iter().any(|role| role.trim().is_empty()) {
                return Err(ValidationError::InvalidShape {
                    attribute: "permissions",
                    message: format!("`{action}` contains a blank role"),
                });
            }
        }
        Ok(())
    }
}

/// Default `views` document: the four canonical lists, all empty.
pub fn default_views() -> JsonMap {
    CANONICAL_VIEW_KINDS
        .iter()
        .map(|kind| (kind.to_string(), Value::Array(Vec::new())))
        .collect()
}

/// Shape-checks a `views` document and fills in missing canonical lists.
///
/// Every entry must be an array; extra view kinds are kept as supplied.
pub fn normalize_views(views: &JsonMap) -> Result<JsonMap, ValidationError> {
    if let Some((kind, _)) = views.iter().find(|(_, value)| !value.is_array()) {
        return Err(ValidationError::InvalidShape {
            attribute: "views",
            message: format!("`{kind}` must be a list of views"),
        });
    }

    let mut normalized = default_views();
    for (kind, value) in views {
        normalized.insert(kind.clone(), value.clone());
    }
    Ok(normalized)
}

/// Input for creating an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewObject {
    pub name: String,
    pub label: String,
    pub plural_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub views: Option<JsonMap>,
    #[serde(default)]
    pub permissions: Option<ObjectPermissions>,
}

impl NewObject {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        plural_name: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            plural_name: plural_name.into(),
            description: None,
            icon: None,
            views: None,
            permissions: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_logical_name("name", &self.name)?;
        validate_label("label", &self.label)?;
        validate_label("plural_name", &self.plural_name)?;
        if let Some(views) = &self.views {
            normalize_views(views)?;
        }
        if let Some(permissions) = &self.permissions {
            permissions.validate()?;
        }
        Ok(())
    }

    /// Views to persist: supplied views normalized, or the default shape.
    pub fn resolved_views(&self) -> Result<JsonMap, ValidationError> {
        match &self.views {
            Some(views) => normalize_views(views),
            None => Ok(default_views()),
        }
    }
}

/// Partial object update; `None` leaves the attribute unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectPatch {
    pub name: Option<String>,
    pub label: Option<String>,
    pub plural_name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub views: Option<JsonMap>,
    pub permissions: Option<ObjectPermissions>,
}

impl ObjectPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.label.is_none()
            && self.plural_name.is_none()
            && self.description.is_none()
            && self.icon.is_none()
            && self.views.is_none()
            && self.permissions.is_none()
    }

    /// Applies supplied attributes to `object`, validating each one.
    pub fn apply_to(&self, object: &mut Object) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(name) = &self.name {
            validate_logical_name("name", name)?;
            object.name = name.clone();
        }
        if let Some(label) = &self.label {
            validate_label("label", label)?;
            object.label = label.clone();
        }
        if let Some(plural_name) = &self.plural_name {
            validate_label("plural_name", plural_name)?;
            object.plural_name = plural_name.clone();
        }
        if let Some(description) = &self.description {
            object.description = Some(description.clone());
        }
        if let Some(icon) = &self.icon {
            object.icon = Some(icon.clone());
        }
        if let Some(views) = &self.views {
            object.views = normalize_views(views)?;
        }
        if let Some(permissions) = &self.permissions {
            permissions.validate()?;
            object.permissions = permissions.clone();
        }
        Ok(())
    }
}
