//! Record store model and pure record rules.
//!
//! # Responsibility
//! - Describe schema-flexible records keyed by field id.
//! - Derive `primary_value`, merge patches and check bound-field rules.
//!
//! # Invariants
//! - `data` keeps caller-supplied key order; `primary_value` depends on it.
//! - `primary_value` is always derived, never supplied.
//! - Merges never remove keys.

use crate::model::ids::{ObjectId, OwnerId, RecordId};
use crate::model::object_field::ObjectField;
use crate::model::validation::ValidationError;
use crate::model::JsonMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum length, in characters, of a derived primary value.
pub const PRIMARY_VALUE_MAX_CHARS: usize = 255;
/// Maximum number of rows returned by a primary-value search.
pub const SEARCH_RESULT_LIMIT: u32 = 50;
/// Page size used when a caller passes `limit = 0`.
pub const DEFAULT_PAGE_LIMIT: u32 = 50;
/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub object_id: ObjectId,
    /// Payload keyed by field id, in insertion order.
    pub data: JsonMap,
    pub primary_value: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub created_by: Option<OwnerId>,
    pub updated_by: Option<OwnerId>,
    /// Denormalized owner tag; set to the creator.
    pub tenant_id: Option<String>,
}

/// One page of records plus the unpaginated total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    pub records: Vec<Record>,
    pub total: u64,
}

/// Offset pagination for record listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPageQuery {
    pub offset: u32,
    /// `0` selects [`DEFAULT_PAGE_LIMIT`]; larger values clamp to [`MAX_PAGE_LIMIT`].
    pub limit: u32,
}

impl RecordPageQuery {
    pub fn new(offset: u32, limit: u32) -> Self {
        Self { offset, limit }
    }

    pub fn effective_limit(&self) -> u32 {
        match self.limit {
            0 => DEFAULT_PAGE_LIMIT,
            limit => limit.min(MAX_PAGE_LIMIT),
        }
    }
}

/// Returns the first string value with non-whitespace content, truncated.
///
/// Scans `data` in insertion order, so `{"fld_b": "", "fld_a": "Ali"}`
/// yields `"Ali"`.
pub fn derive_primary_value(data: &JsonMap) -> Option<String> {
    data.values()
        .filter_map(Value::as_str)
        .find(|value| !value.trim().is_empty())
        .map(|value| value.chars().take(PRIMARY_VALUE_MAX_CHARS).collect())
}

/// Overlays `patch` on `base`.
///
/// Existing keys keep their position, new keys are appended and absent keys
/// are preserved. An empty patch leaves `base` unchanged.
pub fn merge_record_data(base: &mut JsonMap, patch: &JsonMap) {
    for (key, value) in patch {
        base.insert(key.clone(), value.clone());
    }
}

/// Checks that every required binding has a present, non-blank value.
pub fn check_required_fields(
    bindings: &[ObjectField],
    data: &JsonMap,
) -> Result<(), ValidationError> {
    for binding in bindings.iter().filter(|binding| binding.is_required) {
        if !has_value(data.get(&binding.field_id)) {
            return Err(ValidationError::MissingRequiredField(
                binding.field_id.clone(),
            ));
        }
    }
    Ok(())
}

/// Checks that `patch` does not clear any required binding it carries.
///
/// Keys the patch leaves out are not checked, so rows written before a
/// binding became required stay updatable.
pub fn check_required_patch(
    bindings: &[ObjectField],
    patch: &JsonMap,
) -> Result<(), ValidationError> {
    for binding in bindings.iter().filter(|binding| binding.is_required) {
        if let Some(value) = patch.get(&binding.field_id) {
            if !has_value(Some(value)) {
                return Err(ValidationError::MissingRequiredField(
                    binding.field_id.clone(),
                ));
            }
        }
    }
    Ok(())
}

/// Checks that `patch` does not change the value of any readonly binding.
///
/// Re-sending the stored value is accepted.
pub fn check_readonly_fields(
    bindings: &[ObjectField],
    current: &JsonMap,
    patch: &JsonMap,
) -> Result<(), ValidationError> {
    for binding in bindings.iter().filter(|binding| binding.is_readonly) {
        if let Some(next) = patch.get(&binding.field_id) {
            if current.get(&binding.field_id) != Some(next) {
                return Err(ValidationError::ReadonlyField(binding.field_id.clone()));
            }
        }
    }
    Ok(())
}

fn has_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !text.trim().is_empty(),
        Some(_) => true,
    }
}
