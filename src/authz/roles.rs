use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::authz::context::RequestInformation;
use crate::authz::errors::AuthzError;
use crate::authz::modulator::AccessModulator;
use crate::authz::strategy::EntityStore;
use crate::authz::types::{AccessType, Collection, Operation, Permission};
use crate::errors::StoreError;
use crate::storage::{self, AccessControl, NewRole, Role, UpdateRole};

/// Roles are themselves a protected collection.
pub struct RoleStore {
    db: DatabaseConnection,
}

impl RoleStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl EntityStore for RoleStore {
    type Entity = Role;

    fn collection(&self) -> Collection {
        Collection::Role
    }

    fn entity_id(entity: &Role) -> &str {
        &entity.id
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Role, StoreError> {
        storage::get_role(&self.db, id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                table: "Role",
                id: id.to_string(),
            })
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError> {
        storage::delete_role(&self.db, id).await
    }

    async fn update(&self, entity: Role) -> Result<Role, StoreError> {
        storage::update_role(&self.db, entity).await
    }

    async fn list_all(&self) -> Result<Vec<Role>, StoreError> {
        storage::list_roles(&self.db).await
    }

    async fn list_by_ids(&self, ids: &[String]) -> Result<Vec<Role>, StoreError> {
        storage::list_roles_by_ids(&self.db, ids).await
    }
}

/// Access decisions and role administration.
#[derive(Clone)]
pub struct RoleService {
    db: DatabaseConnection,
    modulator: AccessModulator<Role>,
}

impl RoleService {
    pub fn new(db: DatabaseConnection) -> Self {
        let store = Arc::new(RoleStore::new(db.clone()));
        let modulator = AccessModulator::for_store(store, db.clone());
        Self { db, modulator }
    }

    pub fn modulator(&self) -> &AccessModulator<Role> {
        &self.modulator
    }

    /// Whether a caller holding `provided_roles` may perform `operation` on
    /// `collection`. The governing access type is recorded in `ctx` for the
    /// rest of the request; `NEVER` on any role wins.
    pub async fn has_access(
        &self,
        ctx: &RequestInformation,
        provided_roles: &[String],
        collection: Collection,
        operation: Operation,
    ) -> Result<bool, AuthzError> {
        let mut candidates = Vec::new();
        for role in provided_roles {
            let permissions = self
                .get_role_permissions_upon_a_collection(role, collection)
                .await?;
            candidates.extend(
                permissions
                    .into_iter()
                    .filter(|p| p.operation == operation)
                    .map(|p| p.access_type),
            );
        }

        let precedence = AccessType::higher_precedence(candidates);
        ctx.set_access_type(precedence)?;

        tracing::debug!(
            who = ctx.who(),
            roles = ?provided_roles,
            %collection,
            ?operation,
            access_type = %precedence,
            "resolved access"
        );

        Ok(precedence.access())
    }

    pub async fn get_role_permissions_upon_a_collection(
        &self,
        name: &str,
        collection: Collection,
    ) -> Result<Vec<Permission>, AuthzError> {
        Ok(storage::get_role_permissions_upon_a_collection(&self.db, name, collection).await?)
    }

    pub async fn get_role_by_name(&self, name: &str) -> Result<Option<Role>, AuthzError> {
        Ok(storage::get_role_by_name(&self.db, name).await?)
    }

    pub async fn save(&self, request: NewRole) -> Result<Role, AuthzError> {
        let name = request.name.clone();
        match storage::create_role(&self.db, request).await {
            Ok(role) => {
                tracing::info!(role = %role.name, id = %role.id, "Created role");
                Ok(role)
            }
            Err(StoreError::UniqueViolation(_)) => Err(AuthzError::Conflict(format!(
                "There is already a role with this name : {name}"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn fetch_roles(&self, ctx: &RequestInformation) -> Result<Vec<Role>, AuthzError> {
        self.modulator.get_all_entities(ctx).await
    }

    /// Fails with `NotFound` if the role doesn't exist.
    pub async fn fetch_role(&self, ctx: &RequestInformation, id: &str) -> Result<Role, AuthzError> {
        self.modulator.fetch_entity_by_id(ctx, id).await
    }

    /// `false` when no role had that id. The access control entries naming
    /// the role go with it.
    pub async fn delete(&self, ctx: &RequestInformation, id: &str) -> Result<bool, AuthzError> {
        self.modulator.delete_entity_by_id(ctx, id).await
    }

    /// Merge the fields present in `request` into the stored role.
    pub async fn update(
        &self,
        ctx: &RequestInformation,
        id: &str,
        request: UpdateRole,
    ) -> Result<Role, AuthzError> {
        let mut role = self.modulator.fetch_entity_by_id(ctx, id).await?;
        request.merge_into(&mut role);

        match self.modulator.update_entity(ctx, role).await {
            Err(e) if e.is_unique_violation() => Err(AuthzError::Conflict(
                "The role name should be unique. A Role with that name has already been created."
                    .to_string(),
            )),
            other => other,
        }
    }

    pub async fn grant_permission(
        &self,
        ctx: &RequestInformation,
        acl: &AccessControl,
    ) -> Result<(), AuthzError> {
        self.modulator.grant_permission(ctx, acl).await
    }

    pub async fn modify_permission(
        &self,
        ctx: &RequestInformation,
        acl: &AccessControl,
    ) -> Result<(), AuthzError> {
        self.modulator.modify_permission(ctx, acl).await
    }

    pub async fn revoke_permission(
        &self,
        ctx: &RequestInformation,
        id: &str,
    ) -> Result<(), AuthzError> {
        self.modulator.revoke_permission(ctx, id).await
    }

    /// Access control entry `id` on the roles collection.
    pub async fn access_control(&self, id: &str) -> Result<AccessControl, AuthzError> {
        Ok(storage::get_access_control_in(&self.db, Collection::Role, id).await?)
    }
}
