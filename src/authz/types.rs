use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::authz::errors::AuthzError;

/// How an operation on a collection is permitted.
///
/// Precedence is fixed and does not follow declaration order:
/// `Never` > `Always` > `Entity`. An empty candidate set resolves to `Never`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessType {
    /// Denied, whatever else the caller holds.
    Never,
    /// Permitted on every entity of the collection.
    Always,
    /// Permitted only on entities covered by an access control entry.
    Entity,
}

impl AccessType {
    /// Whether this access type ultimately permits the operation.
    pub fn access(self) -> bool {
        match self {
            AccessType::Never => false,
            AccessType::Always | AccessType::Entity => true,
        }
    }

    fn precedence(self) -> u8 {
        match self {
            AccessType::Never => 2,
            AccessType::Always => 1,
            AccessType::Entity => 0,
        }
    }

    /// Reduce the access types gathered across all of a caller's roles into
    /// the one that governs the request. `Never` overrides everything.
    pub fn higher_precedence<I>(candidates: I) -> AccessType
    where
        I: IntoIterator<Item = AccessType>,
    {
        candidates
            .into_iter()
            .max_by_key(|access_type| access_type.precedence())
            .unwrap_or(AccessType::Never)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessType::Never => "NEVER",
            AccessType::Always => "ALWAYS",
            AccessType::Entity => "ENTITY",
        }
    }
}

impl std::fmt::Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action a caller attempts on a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    Create,
    Update,
    Delete,
    Read,
    Acl,
}

/// Protected resource collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    MetricDefinition,
    Metric,
    Role,
    Provider,
    Project,
    Installation,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::MetricDefinition => "MetricDefinition",
            Collection::Metric => "Metric",
            Collection::Role => "Role",
            Collection::Provider => "Provider",
            Collection::Project => "Project",
            Collection::Installation => "Installation",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Collection {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MetricDefinition" => Ok(Collection::MetricDefinition),
            "Metric" => Ok(Collection::Metric),
            "Role" => Ok(Collection::Role),
            "Provider" => Ok(Collection::Provider),
            "Project" => Ok(Collection::Project),
            "Installation" => Ok(Collection::Installation),
            other => Err(AuthzError::UnknownCollection(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub operation: Operation,
    pub access_type: AccessType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionPermission {
    pub collection: Collection,
    pub permissions: Vec<Permission>,
}
