//! Input validation shared by every entity.
//!
//! Validation runs before any SQL is issued; a failure here never reaches
//! storage.

use crate::model::ids::{EntityKind, FieldId};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum length, in characters, of names and labels.
pub const MAX_NAME_CHARS: usize = 255;

static LOGICAL_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid logical name regex"));

/// Malformed input rejected before persistence.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Attribute is empty or whitespace only.
    Blank(&'static str),
    /// Attribute exceeds [`MAX_NAME_CHARS`].
    TooLong {
        attribute: &'static str,
        max_chars: usize,
    },
    /// Logical name is not lowercase snake_case.
    InvalidName {
        attribute: &'static str,
        value: String,
    },
    /// Id does not carry the expected entity prefix.
    MalformedId { kind: EntityKind, value: String },
    UnknownFieldType(String),
    UnknownRelationshipType(String),
    NegativeDisplayOrder(i64),
    /// Structured config does not have the expected shape.
    InvalidShape {
        attribute: &'static str,
        message: String,
    },
    /// A required bound field is absent, null or blank.
    MissingRequiredField(FieldId),
    /// A readonly bound field would change value.
    ReadonlyField(FieldId),
    /// Link endpoint record belongs to another object than the relationship declares.
    LinkEndpointMismatch {
        endpoint: &'static str,
        expected_object_id: String,
        actual_object_id: String,
    },
    /// Patch carries no attribute to change.
    EmptyPatch,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(attribute) => write!(f, "{attribute} must not be blank"),
            Self::TooLong {
                attribute,
                max_chars,
            } => write!(f, "{attribute} exceeds {max_chars} characters"),
            Self::InvalidName { attribute, value } => write!(
                f,
                "{attribute} `{value}` must be lowercase snake_case starting with a letter"
            ),
            Self::MalformedId { kind, value } => write!(
                f,
                "`{value}` is not a {} id (expected prefix `{}`)",
                kind.label(),
                kind.prefix()
            ),
            Self::UnknownFieldType(value) => write!(f, "unknown field type `{value}`"),
            Self::UnknownRelationshipType(value) => write!(
                f,
                "unknown relationship type `{value}`; expected 1:N|N:N|lookup"
            ),
            Self::NegativeDisplayOrder(value) => {
                write!(f, "display_order must be >= 0, got {value}")
            }
            Self::InvalidShape { attribute, message } => {
                write!(f, "invalid {attribute}: {message}")
            }
            Self::MissingRequiredField(field_id) => {
                write!(f, "required field `{field_id}` is missing")
            }
            Self::ReadonlyField(field_id) => write!(f, "field `{field_id}` is readonly"),
            Self::LinkEndpointMismatch {
                endpoint,
                expected_object_id,
                actual_object_id,
            } => write!(
                f,
                "{endpoint} record belongs to object `{actual_object_id}`, relationship expects `{expected_object_id}`"
            ),
            Self::EmptyPatch => write!(f, "patch does not change any attribute"),
        }
    }
}

impl Error for ValidationError {}

/// Checks a lowercase snake_case logical name (field or object `name`).
pub fn validate_logical_name(attribute: &'static str, value: &str) -> Result<(), ValidationError> {
    validate_label(attribute, value)?;
    if !LOGICAL_NAME_RE.is_match(value) {
        return Err(ValidationError::InvalidName {
            attribute,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Checks a free-form display label: non-blank, bounded length.
pub fn validate_label(attribute: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank(attribute));
    }
    if value.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::TooLong {
            attribute,
            max_chars: MAX_NAME_CHARS,
        });
    }
    Ok(())
}

/// Checks that `value` looks like an id of `kind`.
pub fn validate_entity_id(kind: EntityKind, value: &str) -> Result<(), ValidationError> {
    if kind.owns_id(value) {
        Ok(())
    } else {
        Err(ValidationError::MalformedId {
            kind,
            value: value.to_string(),
        })
    }
}
