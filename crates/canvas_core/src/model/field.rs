//! Field library model.
//!
//! # Responsibility
//! - Describe reusable attribute definitions shared across objects.
//! - Validate field definitions and partial updates.
//!
//! # Invariants
//! - `(name, created_by)` is unique; enforced by storage.
//! - System fields (`is_system_field = true`) are seeded, global and never custom.

use crate::model::ids::{FieldId, OwnerId};
use crate::model::validation::{validate_label, validate_logical_name, ValidationError};
use crate::model::JsonMap;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Ids of the five seeded system fields.
pub const SYSTEM_FIELD_IDS: [&str; 5] = [
    "fld_system_created_at",
    "fld_system_created_by",
    "fld_system_updated_at",
    "fld_system_updated_by",
    "fld_system_owner",
];

/// Value kind of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Number,
    Currency,
    Percent,
    Email,
    Phone,
    Url,
    Date,
    Datetime,
    Boolean,
    Select,
    Multiselect,
    Lookup,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Textarea => "textarea",
            Self::Number => "number",
            Self::Currency => "currency",
            Self::Percent => "percent",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Url => "url",
            Self::Date => "date",
            Self::Datetime => "datetime",
            Self::Boolean => "boolean",
            Self::Select => "select",
            Self::Multiselect => "multiselect",
            Self::Lookup => "lookup",
        }
    }

    fn has_options(self) -> bool {
        matches!(self, Self::Select | Self::Multiselect)
    }
}

impl Display for FieldType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = match value.trim() {
            "text" => Self::Text,
            "textarea" => Self::Textarea,
            "number" => Self::Number,
            "currency" => Self::Currency,
            "percent" => Self::Percent,
            "email" => Self::Email,
            "phone" => Self::Phone,
            "url" => Self::Url,
            "date" => Self::Date,
            "datetime" => Self::Datetime,
            "boolean" => Self::Boolean,
            "select" => Self::Select,
            "multiselect" => Self::Multiselect,
            "lookup" => Self::Lookup,
            other => return Err(ValidationError::UnknownFieldType(other.to_string())),
        };
        Ok(parsed)
    }
}

/// Persisted field definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    /// Logical key, unique per owner.
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub description: Option<String>,
    /// Validation rules, options, default value, lookup target.
    pub config: JsonMap,
    pub category: Option<String>,
    /// Visible to every caller.
    pub is_global: bool,
    /// Seeded, immutable, auto-populated.
    pub is_system_field: bool,
    /// User-defined.
    pub is_custom: bool,
    /// `None` for seeded system rows.
    pub created_by: Option<OwnerId>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Input for creating a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewField {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub config: JsonMap,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default = "default_is_custom")]
    pub is_custom: bool,
}

fn default_is_custom() -> bool {
    true
}

impl NewField {
    pub fn new(name: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            field_type,
            description: None,
            config: JsonMap::new(),
            category: None,
            is_custom: true,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_logical_name("name", &self.name)?;
        validate_label("label", &self.label)?;
        validate_config(self.field_type, &self.config)
    }
}

/// Partial field update; `None` leaves the attribute unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldPatch {
    pub name: Option<String>,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub field_type: Option<FieldType>,
    pub description: Option<String>,
    pub config: Option<JsonMap>,
    pub category: Option<String>,
}

impl FieldPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.label.is_none()
            && self.field_type.is_none()
            && self.description.is_none()
            && self.config.is_none()
            && self.category.is_none()
    }

    /// Applies supplied attributes to `field` and validates the result.
    pub fn apply_to(&self, field: &mut Field) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(name) = &self.name {
            validate_logical_name("name", name)?;
            field.name = name.clone();
        }
        if let Some(label) = &self.label {
            validate_label("label", label)?;
            field.label = label.clone();
        }
        if let Some(field_type) = self.field_type {
            field.field_type = field_type;
        }
        if let Some(description) = &self.description {
            field.description = Some(description.clone());
        }
        if let Some(config) = &self.config {
            field.config = config.clone();
        }
        if let Some(category) = &self.category {
            field.category = Some(category.clone());
        }
        validate_config(field.field_type, &field.config)
    }
}

/// Which slice of the field library a listing covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldScope {
    /// Global rows plus the caller's own rows.
    #[default]
    All,
    /// Global rows only.
    GlobalOnly,
    /// The caller's own custom rows only.
    OwnedCustom,
}

/// Filters for listing fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldListQuery {
    pub scope: FieldScope,
    pub category: Option<String>,
    /// `Some(true)` keeps only system fields, `Some(false)` excludes them.
    pub is_system: Option<bool>,
}

fn validate_config(field_type: FieldType, config: &JsonMap) -> Result<(), ValidationError> {
    if field_type.has_options() {
        if let Some(options) = config.get("options") {
            if !options.is_array() {
                return Err(ValidationError::InvalidShape {
                    attribute: "config.options",
                    message: "must be an array".to_string(),
                });
            }
        }
    }
    if field_type == FieldType::Lookup {
        if let Some(target) = config.get("lookupObject") {
            if target.as_str().map_or(true, |value| value.trim().is_empty()) {
                return Err(ValidationError::InvalidShape {
                    attribute: "config.lookupObject",
                    message: "must be a non-empty string".to_string(),
                });
            }
        }
    }
    Ok(())
}
