use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::DatabaseConnection;

use crate::authz::context::RequestInformation;
use crate::authz::errors::AuthzError;
use crate::authz::types::Collection;
use crate::errors::StoreError;
use crate::storage::{self, AccessControl};

/// Generic persistence for one protected collection.
#[async_trait]
pub trait EntityStore: Send + Sync {
    type Entity: Clone + Send + Sync + 'static;

    fn collection(&self) -> Collection;

    fn entity_id(entity: &Self::Entity) -> &str;

    /// Fails with `StoreError::NotFound` when `id` is absent.
    async fn fetch_by_id(&self, id: &str) -> Result<Self::Entity, StoreError>;

    async fn delete_by_id(&self, id: &str) -> Result<bool, StoreError>;

    async fn update(&self, entity: Self::Entity) -> Result<Self::Entity, StoreError>;

    async fn list_all(&self) -> Result<Vec<Self::Entity>, StoreError>;

    async fn list_by_ids(&self, ids: &[String]) -> Result<Vec<Self::Entity>, StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Always,
    Entity,
    Deny,
}

/// The capability set shared by the modulator and every strategy it can
/// route to.
#[async_trait]
pub trait AccessStrategy<E: Send + 'static>: Send + Sync {
    fn kind(&self) -> StrategyKind;

    async fn fetch_entity_by_id(&self, ctx: &RequestInformation, id: &str)
        -> Result<E, AuthzError>;

    async fn delete_entity_by_id(
        &self,
        ctx: &RequestInformation,
        id: &str,
    ) -> Result<bool, AuthzError>;

    async fn update_entity(&self, ctx: &RequestInformation, entity: E) -> Result<E, AuthzError>;

    async fn get_all_entities(&self, ctx: &RequestInformation) -> Result<Vec<E>, AuthzError>;

    async fn grant_permission(
        &self,
        ctx: &RequestInformation,
        acl: &AccessControl,
    ) -> Result<(), AuthzError>;

    /// Rewrites the stored entry `acl.id` with the fields of `acl`.
    async fn modify_permission(
        &self,
        ctx: &RequestInformation,
        acl: &AccessControl,
    ) -> Result<(), AuthzError>;

    async fn revoke_permission(&self, ctx: &RequestInformation, id: &str)
        -> Result<(), AuthzError>;
}

fn ensure_collection(expected: Collection, acl: &AccessControl) -> Result<(), AuthzError> {
    if acl.collection == expected {
        Ok(())
    } else {
        Err(AuthzError::CollectionMismatch {
            expected,
            found: acl.collection,
        })
    }
}

/// Blanket access to the collection; access control entries are not read.
pub struct AlwaysStrategy<S> {
    store: Arc<S>,
    db: DatabaseConnection,
}

impl<S> AlwaysStrategy<S> {
    pub fn new(store: Arc<S>, db: DatabaseConnection) -> Self {
        Self { store, db }
    }
}

#[async_trait]
impl<S: EntityStore + 'static> AccessStrategy<S::Entity> for AlwaysStrategy<S> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Always
    }

    async fn fetch_entity_by_id(
        &self,
        _ctx: &RequestInformation,
        id: &str,
    ) -> Result<S::Entity, AuthzError> {
        Ok(self.store.fetch_by_id(id).await?)
    }

    async fn delete_entity_by_id(
        &self,
        _ctx: &RequestInformation,
        id: &str,
    ) -> Result<bool, AuthzError> {
        Ok(self.store.delete_by_id(id).await?)
    }

    async fn update_entity(
        &self,
        _ctx: &RequestInformation,
        entity: S::Entity,
    ) -> Result<S::Entity, AuthzError> {
        Ok(self.store.update(entity).await?)
    }

    async fn get_all_entities(
        &self,
        _ctx: &RequestInformation,
    ) -> Result<Vec<S::Entity>, AuthzError> {
        Ok(self.store.list_all().await?)
    }

    async fn grant_permission(
        &self,
        _ctx: &RequestInformation,
        acl: &AccessControl,
    ) -> Result<(), AuthzError> {
        ensure_collection(self.store.collection(), acl)?;
        storage::insert_access_control(&self.db, acl).await?;
        Ok(())
    }

    async fn modify_permission(
        &self,
        _ctx: &RequestInformation,
        acl: &AccessControl,
    ) -> Result<(), AuthzError> {
        let collection = self.store.collection();
        ensure_collection(collection, acl)?;
        storage::get_access_control_in(&self.db, collection, &acl.id).await?;
        storage::update_access_control(&self.db, acl).await?;
        Ok(())
    }

    async fn revoke_permission(
        &self,
        _ctx: &RequestInformation,
        id: &str,
    ) -> Result<(), AuthzError> {
        storage::get_access_control_in(&self.db, self.store.collection(), id).await?;
        storage::delete_access_control(&self.db, id).await?;
        Ok(())
    }
}

/// Access gated per entity: the caller must hold an access control entry
/// `{who, collection, id}` for every entity it touches.
pub struct EntityStrategy<S> {
    store: Arc<S>,
    db: DatabaseConnection,
}

impl<S: EntityStore> EntityStrategy<S> {
    pub fn new(store: Arc<S>, db: DatabaseConnection) -> Self {
        Self { store, db }
    }

    async fn ensure_access(&self, ctx: &RequestInformation, entity: &str) -> Result<(), AuthzError> {
        let collection = self.store.collection();
        if storage::access_control_exists(&self.db, ctx.who(), collection, entity).await? {
            Ok(())
        } else {
            tracing::debug!(who = ctx.who(), %collection, entity, "no access control entry");
            Err(AuthzError::Forbidden)
        }
    }
}

#[async_trait]
impl<S: EntityStore + 'static> AccessStrategy<S::Entity> for EntityStrategy<S> {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Entity
    }

    async fn fetch_entity_by_id(
        &self,
        ctx: &RequestInformation,
        id: &str,
    ) -> Result<S::Entity, AuthzError> {
        self.ensure_access(ctx, id).await?;
        Ok(self.store.fetch_by_id(id).await?)
    }

    async fn delete_entity_by_id(
        &self,
        ctx: &RequestInformation,
        id: &str,
    ) -> Result<bool, AuthzError> {
        self.ensure_access(ctx, id).await?;
        Ok(self.store.delete_by_id(id).await?)
    }

    async fn update_entity(
        &self,
        ctx: &RequestInformation,
        entity: S::Entity,
    ) -> Result<S::Entity, AuthzError> {
        self.ensure_access(ctx, S::entity_id(&entity)).await?;
        Ok(self.store.update(entity).await?)
    }

    async fn get_all_entities(
        &self,
        ctx: &RequestInformation,
    ) -> Result<Vec<S::Entity>, AuthzError> {
        let ids = storage::entity_ids_for(&self.db, ctx.who(), self.store.collection()).await?;
        Ok(self.store.list_by_ids(&ids).await?)
    }

    async fn grant_permission(
        &self,
        ctx: &RequestInformation,
        acl: &AccessControl,
    ) -> Result<(), AuthzError> {
        ensure_collection(self.store.collection(), acl)?;
        self.ensure_access(ctx, &acl.entity).await?;
        storage::insert_access_control(&self.db, acl).await?;
        Ok(())
    }

    async fn modify_permission(
        &self,
        ctx: &RequestInformation,
        acl: &AccessControl,
    ) -> Result<(), AuthzError> {
        let collection = self.store.collection();
        ensure_collection(collection, acl)?;

        // The caller needs an entry on the entity the row names now and on
        // the one it will name afterwards.
        let stored = storage::get_access_control_in(&self.db, collection, &acl.id).await?;
        self.ensure_access(ctx, &stored.entity).await?;
        if stored.entity != acl.entity {
            self.ensure_access(ctx, &acl.entity).await?;
        }

        storage::update_access_control(&self.db, acl).await?;
        Ok(())
    }

    async fn revoke_permission(
        &self,
        ctx: &RequestInformation,
        id: &str,
    ) -> Result<(), AuthzError> {
        let stored = storage::get_access_control_in(&self.db, self.store.collection(), id).await?;
        self.ensure_access(ctx, &stored.entity).await?;
        storage::delete_access_control(&self.db, id).await?;
        Ok(())
    }
}

/// Rejects every operation. Used for `NEVER` and for a request whose access
/// type was never resolved.
pub struct DenyStrategy;

#[async_trait]
impl<E: Send + 'static> AccessStrategy<E> for DenyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Deny
    }

    async fn fetch_entity_by_id(&self, _: &RequestInformation, _: &str) -> Result<E, AuthzError> {
        Err(AuthzError::Forbidden)
    }

    async fn delete_entity_by_id(&self, _: &RequestInformation, _: &str) -> Result<bool, AuthzError> {
        Err(AuthzError::Forbidden)
    }

    async fn update_entity(&self, _: &RequestInformation, _: E) -> Result<E, AuthzError> {
        Err(AuthzError::Forbidden)
    }

    async fn get_all_entities(&self, _: &RequestInformation) -> Result<Vec<E>, AuthzError> {
        Err(AuthzError::Forbidden)
    }

    async fn grant_permission(
        &self,
        _: &RequestInformation,
        _: &AccessControl,
    ) -> Result<(), AuthzError> {
        Err(AuthzError::Forbidden)
    }

    async fn modify_permission(
        &self,
        _: &RequestInformation,
        _: &AccessControl,
    ) -> Result<(), AuthzError> {
        Err(AuthzError::Forbidden)
    }

    async fn revoke_permission(&self, _: &RequestInformation, _: &str) -> Result<(), AuthzError> {
        Err(AuthzError::Forbidden)
    }
}
