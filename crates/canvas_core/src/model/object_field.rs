//! Object-field binding model.
//!
//! # Responsibility
//! - Describe how one library field is attached to one object.
//! - Compute the effective field config for a binding.
//!
//! # Invariants
//! - A `(object_id, field_id)` pair is bound at most once.
//! - `display_order >= 0`.

use crate::model::field::Field;
use crate::model::ids::{BindingId, EntityKind, FieldId, ObjectId};
use crate::model::validation::{validate_entity_id, ValidationError};
use crate::model::JsonMap;
use serde::{Deserialize, Serialize};

/// Persisted binding between an object and a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectField {
    pub id: BindingId,
    pub object_id: ObjectId,
    pub field_id: FieldId,
    pub display_order: i64,
    pub is_required: bool,
    pub is_visible: bool,
    pub is_readonly: bool,
    /// Per-object overrides overlaid on the field's `config`.
    pub field_overrides: JsonMap,
    pub created_at: i64,
}

impl ObjectField {
    /// Field config with this binding's overrides overlaid key by key.
    pub fn effective_config(&self, field: &Field) -> JsonMap {
        let mut config = field.config.clone();
        for (key, value) in &self.field_overrides {
            config.insert(key.clone(), value.clone());
        }
        config
    }
}

/// Binding joined with its field and the resulting config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedField {
    pub binding: ObjectField,
    pub field: Field,
    pub effective_config: JsonMap,
}

impl ResolvedField {
    pub fn new(binding: ObjectField, field: Field) -> Self {
        let effective_config = binding.effective_config(&field);
        Self {
            binding,
            field,
            effective_config,
        }
    }
}

/// Input for attaching a field to an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBinding {
    pub object_id: ObjectId,
    pub field_id: FieldId,
    /// `None` stores order 0.
    #[serde(default)]
    pub display_order: Option<i64>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default = "default_is_visible")]
    pub is_visible: bool,
    #[serde(default)]
    pub is_readonly: bool,
    #[serde(default)]
    pub field_overrides: JsonMap,
}

fn default_is_visible() -> bool {
    true
}

impl NewBinding {
    pub fn new(object_id: impl Into<ObjectId>, field_id: impl Into<FieldId>) -> Self {
        Self {
            object_id: object_id.into(),
            field_id: field_id.into(),
            display_order: None,
            is_required: false,
            is_visible: true,
            is_readonly: false,
            field_overrides: JsonMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_entity_id(EntityKind::Object, &self.object_id)?;
        validate_entity_id(EntityKind::Field, &self.field_id)?;
        validate_display_order(self.display_order.unwrap_or(0))
    }

    pub fn resolved_display_order(&self) -> i64 {
        self.display_order.unwrap_or(0)
    }
}

/// Partial binding update; `None` leaves the attribute unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingPatch {
    pub display_order: Option<i64>,
    pub is_required: Option<bool>,
    pub is_visible: Option<bool>,
    pub is_readonly: Option<bool>,
    pub field_overrides: Option<JsonMap>,
}

impl BindingPatch {
    pub fn is_empty(&self) -> bool {
        self.display_order.is_none()
            && self.is_required.is_none()
            && self.is_visible.is_none()
            && self.is_readonly.is_none()
            && self.field_overrides.is_none()
    }

    pub fn apply_to(&self, binding: &mut ObjectField) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(display_order) = self.display_order {
            validate_display_order(display_order)?;
            binding.display_order = display_order;
        }
        if let Some(is_required) = self.is_required {
            binding.is_required = is_required;
        }
        if let Some(is_visible) = self.is_visible {
            binding.is_visible = is_visible;
        }
        if let Some(is_readonly) = self.is_readonly {
            binding.is_readonly = is_readonly;
        }
        if let Some(field_overrides) = &self.field_overrides {
            binding.field_overrides = field_overrides.clone();
        }
        Ok(())
    }
}

fn validate_display_order(value: i64) -> Result<(), ValidationError> {
    if value < 0 {
        return Err(ValidationError::NegativeDisplayOrder(value));
    }
    Ok(())
}
