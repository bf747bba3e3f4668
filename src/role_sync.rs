use crate::authz::types::CollectionPermission;
use crate::storage::{self, NewRole};
use miette::{IntoDiagnostic, Result};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Role definition from JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Role name (unique)
    pub name: String,
    #[serde(default)]
    pub collection_permissions: Vec<CollectionPermission>,
}

/// Root structure of the roles JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolesFile {
    pub roles: Vec<RoleDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Sync roles from a JSON file to the database (idempotent)
pub async fn sync_roles_from_file(db: &DatabaseConnection, file_path: &Path) -> Result<SyncSummary> {
    tracing::info!("Loading roles from {}", file_path.display());

    let content = fs::read_to_string(file_path).into_diagnostic().map_err(|e| {
        miette::miette!(
            "Failed to read roles file at '{}': {}",
            file_path.display(),
            e
        )
    })?;

    let roles_file: RolesFile = serde_json::from_str(&content)
        .into_diagnostic()
        .map_err(|e| {
            miette::miette!(
                "Failed to parse roles JSON file: {}\n\nExpected format:\n{{\n  \"roles\": [\n    {{\n      \"name\": \"metric_reader\",\n      \"collection_permissions\": [\n        {{ \"collection\": \"Metric\", \"permissions\": [ {{ \"operation\": \"READ\", \"access_type\": \"ALWAYS\" }} ] }}\n      ]\n    }}\n  ]\n}}",
                e
            )
        })?;

    sync_roles(db, roles_file.roles).await
}

pub async fn sync_roles(
    db: &DatabaseConnection,
    definitions: Vec<RoleDefinition>,
) -> Result<SyncSummary> {
    let mut summary = SyncSummary::default();

    for def in definitions {
        match sync_role(db, def).await? {
            SyncResult::Created => summary.created += 1,
            SyncResult::Updated => summary.updated += 1,
            SyncResult::Unchanged => summary.unchanged += 1,
        }
    }

    tracing::info!(
        "Role sync complete: {} created, {} updated, {} unchanged",
        summary.created,
        summary.updated,
        summary.unchanged
    );

    Ok(summary)
}

#[derive(Debug)]
enum SyncResult {
    Created,
    Updated,
    Unchanged,
}

async fn sync_role(db: &DatabaseConnection, def: RoleDefinition) -> Result<SyncResult> {
    let existing = storage::get_role_by_name(db, &def.name)
        .await
        .into_diagnostic()?;

    let result = match existing {
        None => {
            tracing::info!("Creating role: {}", def.name);
            storage::create_role(
                db,
                NewRole {
                    name: def.name,
                    collection_permissions: def.collection_permissions,
                },
            )
            .await
            .into_diagnostic()?;
            SyncResult::Created
        }
        Some(role) if role.collection_permissions == def.collection_permissions => {
            SyncResult::Unchanged
        }
        Some(mut role) => {
            tracing::info!("Updating role permissions: {}", role.name);
            role.collection_permissions = def.collection_permissions;
            storage::update_role(db, role).await.into_diagnostic()?;
            SyncResult::Updated
        }
    };

    Ok(result)
}
