//! Composition catalog port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::registry::UserId;

/// A named, ordered list of role labels describing a group makeup.
///
/// Sessions copy `role_slots` when they open, so a template never changes
/// underneath a running session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositionTemplate {
    /// Display name; unique in the catalog (case-sensitive).
    pub name: String,
    /// Role labels in slot order. Duplicates are allowed.
    pub role_slots: Vec<String>,
    /// Author of the template.
    pub created_by: UserId,
    /// Publication timestamp.
    pub created_at: DateTime<Utc>,
}

/// Read-mostly store of composition templates.
#[async_trait]
pub trait CompositionCatalog: Send + Sync {
    /// Finds a template by case-insensitive exact name match. When several
    /// names differ only by case the earliest published wins.
    async fn find_by_name(&self, name: &str) -> Result<Option<CompositionTemplate>, DomainError>;

    /// Lists distinct template names in ascending order.
    async fn list_names(&self) -> Result<Vec<String>, DomainError>;

    /// Inserts a new template.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a template with the same
    /// case-sensitive name already exists.
    async fn insert(&self, template: CompositionTemplate) -> Result<(), DomainError>;
}
