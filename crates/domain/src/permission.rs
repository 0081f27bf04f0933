//! Permission catalog types.
//!
//! The catalog is an open set of `(resource, action)` pairs. The five CRUD
//! and `manage` actions are well-known constants with special semantics at
//! resolution time; anything else the catalog defines is carried as a
//! custom action string.

use std::fmt::{Display, Formatter};

use clearance_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a catalog permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a new random permission identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for PermissionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// An operation on a resource.
///
/// Standard actions compare before any custom action, which keeps matrix
/// columns in the conventional CRUD+manage order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
    /// Create a new instance of the resource.
    Create,
    /// Read the resource.
    Read,
    /// Update an existing instance.
    Update,
    /// Delete an instance.
    Delete,
    /// Full control; implies every other action on the same resource.
    Manage,
    /// A catalog-defined custom action, stored lowercase.
    Custom(String),
}

impl Action {
    /// The well-known actions, in matrix column order.
    pub const STANDARD: [Self; 5] = [
        Self::Create,
        Self::Read,
        Self::Update,
        Self::Delete,
        Self::Manage,
    ];

    /// Parses an action string case-insensitively.
    ///
    /// Unknown values become [`Action::Custom`]; empty values are rejected.
    pub fn parse(value: &str) -> AppResult<Self> {
        let lowered = value.trim().to_lowercase();
        match lowered.as_str() {
            "" => Err(AppError::Validation(
                "action must not be empty or whitespace".to_owned(),
            )),
            "create" => Ok(Self::Create),
            "read" => Ok(Self::Read),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "manage" => Ok(Self::Manage),
            _ => Ok(Self::Custom(lowered)),
        }
    }

    /// Returns the stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Manage => "manage",
            Self::Custom(value) => value.as_str(),
        }
    }

    /// Returns whether this is one of the well-known actions.
    #[must_use]
    pub fn is_standard(&self) -> bool {
        !matches!(self, Self::Custom(_))
    }
}

impl Display for Action {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.as_str())
    }
}

impl TryFrom<String> for Action {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value.as_str())
    }
}

impl From<Action> for String {
    fn from(value: Action) -> Self {
        value.as_str().to_owned()
    }
}

/// A catalog entry granting one action on one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable catalog identifier.
    pub id: PermissionId,
    /// Resource the action applies to, stored lowercase.
    pub resource: String,
    /// Action granted on the resource.
    pub action: Action,
    /// Human-readable permission name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
}

impl Permission {
    /// Creates a catalog entry with a normalized resource name.
    pub fn new(
        id: PermissionId,
        resource: impl Into<String>,
        action: Action,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> AppResult<Self> {
        let resource = resource.into().trim().to_lowercase();
        if resource.is_empty() {
            return Err(AppError::Validation(
                "permission resource must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            id,
            resource,
            action,
            name: name.into(),
            description: description.into(),
        })
    }

    /// Returns the `resource:action` form used in tokens and denial reasons.
    #[must_use]
    pub fn permission_string(&self) -> String {
        format!("{}:{}", self.resource, self.action)
    }
}
