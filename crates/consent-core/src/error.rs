//! Error types for the consent registry.

use std::fmt;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConsentError>;

/// Failures raised by [`crate::ConsentLogic`] operations.
///
/// All of them are local validation failures: deterministic, scoped to the
/// single call that raised them, and never worth retrying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsentError {
    #[error("User not found: {0}")]
    UserNotFound(String),

    #[error("Consent not found: {0}")]
    ConsentNotFound(String),

    #[error("Invalid consent name '{0}'. It should include only alphanumeric characters and _")]
    InvalidName(String),
}

/// Which keyed entity a raw store lookup failed to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    User,
    Grant,
    ConsentDefinition,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::User => f.write_str("user"),
            Entity::Grant => f.write_str("grant"),
            Entity::ConsentDefinition => f.write_str("consent definition"),
        }
    }
}

/// Raw failure from [`crate::ConsentStore`].
///
/// The store only knows "this key is missing". Callers going through
/// [`crate::ConsentLogic`] never see it because existence is checked first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: Entity, key: String },
}

impl StoreError {
    pub(crate) fn user(username: &str) -> Self {
        StoreError::NotFound {
            entity: Entity::User,
            key: username.to_string(),
        }
    }

    pub(crate) fn grant(consent_name: &str) -> Self {
        StoreError::NotFound {
            entity: Entity::Grant,
            key: consent_name.to_string(),
        }
    }

    pub(crate) fn definition(consent_name: &str) -> Self {
        StoreError::NotFound {
            entity: Entity::ConsentDefinition,
            key: consent_name.to_string(),
        }
    }

    /// The entity whose key was missing.
    pub fn entity(&self) -> Entity {
        match self {
            StoreError::NotFound { entity, .. } => *entity,
        }
    }
}

impl From<StoreError> for ConsentError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound {
                entity: Entity::User,
                key,
            } => ConsentError::UserNotFound(key),
            StoreError::NotFound { key, .. } => ConsentError::ConsentNotFound(key),
        }
    }
}
