//! Application containers that group objects into an app.

use crate::model::ids::{ApplicationId, OwnerId};
use crate::model::validation::{validate_label, validate_logical_name, ValidationError};
use crate::model::JsonMap;
use serde::{Deserialize, Serialize};

/// Persisted application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub name: String,
    pub label: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    /// Open app settings such as navigation and member object ids.
    pub config: JsonMap,
    pub created_by: Option<OwnerId>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Epoch ms of the last publish; `None` while in draft.
    pub published_at: Option<i64>,
}

impl Application {
    pub fn is_published(&self) -> bool {
        self.published_at.is_some()
    }
}

/// Input for creating an application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewApplication {
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub config: JsonMap,
}

impl NewApplication {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            description: None,
            icon: None,
            config: JsonMap::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_logical_name("name", &self.name)?;
        validate_label("label", &self.label)
    }
}

/// Partial application update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationPatch {
    pub name: Option<String>,
    pub label: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub config: Option<JsonMap>,
}

impl ApplicationPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.label.is_none()
            && self.description.is_none()
            && self.icon.is_none()
            && self.config.is_none()
    }

    pub fn apply_to(&self, application: &mut Application) -> Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }
        if let Some(name) = &self.name {
            validate_logical_name("name", name)?;
            application.name = name.clone();
        }
        if let Some(label) = &self.label {
            validate_label("label", label)?;
            application.label = label.clone();
        }
        if let Some(description) = &self.description {
            application.description = Some(description.clone());
        }
        if let Some(icon) = &self.icon {
            application.icon = Some(icon.clone());
        }
        if let Some(config) = &self.config {
            application.config = config.clone();
        }
        Ok(())
    }
}
