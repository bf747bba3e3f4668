use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::authz::context::RequestInformation;
use crate::authz::errors::AuthzError;
use crate::authz::guard::conflict_on_duplicate;
use crate::authz::strategy::{
    AccessStrategy, AlwaysStrategy, DenyStrategy, EntityStore, EntityStrategy,
};
use crate::authz::types::AccessType;
use crate::storage::AccessControl;

/// Routes entity operations to the strategy matching the access type recorded
/// in the request's [`RequestInformation`]. Holds no entity data itself.
pub struct AccessModulator<E: Send + 'static> {
    always: Arc<dyn AccessStrategy<E>>,
    entity: Arc<dyn AccessStrategy<E>>,
    deny: Arc<dyn AccessStrategy<E>>,
}

impl<E: Send + 'static> Clone for AccessModulator<E> {
    fn clone(&self) -> Self {
        Self {
            always: self.always.clone(),
            entity: self.entity.clone(),
            deny: self.deny.clone(),
        }
    }
}

impl<E: Send + 'static> AccessModulator<E> {
    pub fn new(
        always: Arc<dyn AccessStrategy<E>>,
        entity: Arc<dyn AccessStrategy<E>>,
        deny: Arc<dyn AccessStrategy<E>>,
    ) -> Self {
        Self {
            always,
            entity,
            deny,
        }
    }

    /// Modulator over `store` with the stock strategies.
    pub fn for_store<S>(store: Arc<S>, db: DatabaseConnection) -> Self
    where
        S: EntityStore<Entity = E> + 'static,
    {
        Self::new(
            Arc::new(AlwaysStrategy::new(store.clone(), db.clone())),
            Arc::new(EntityStrategy::new(store, db)),
            Arc::new(DenyStrategy),
        )
    }

    pub fn get(&self, ctx: &RequestInformation) -> &dyn AccessStrategy<E> {
        let strategy = match ctx.access_type() {
            Some(AccessType::Always) => &self.always,
            Some(AccessType::Entity) => &self.entity,
            Some(AccessType::Never) | None => &self.deny,
        };
        tracing::debug!(
            who = ctx.who(),
            access_type = ?ctx.access_type(),
            strategy = ?strategy.kind(),
            "selected access strategy"
        );
        strategy.as_ref()
    }

    pub async fn fetch_entity_by_id(
        &self,
        ctx: &RequestInformation,
        id: &str,
    ) -> Result<E, AuthzError> {
        self.get(ctx).fetch_entity_by_id(ctx, id).await
    }

    pub async fn delete_entity_by_id(
        &self,
        ctx: &RequestInformation,
        id: &str,
    ) -> Result<bool, AuthzError> {
        self.get(ctx).delete_entity_by_id(ctx, id).await
    }

    pub async fn update_entity(&self, ctx: &RequestInformation, entity: E) -> Result<E, AuthzError> {
        self.get(ctx).update_entity(ctx, entity).await
    }

    pub async fn get_all_entities(&self, ctx: &RequestInformation) -> Result<Vec<E>, AuthzError> {
        self.get(ctx).get_all_entities(ctx).await
    }

    pub async fn grant_permission(
        &self,
        ctx: &RequestInformation,
        acl: &AccessControl,
    ) -> Result<(), AuthzError> {
        let result = self.get(ctx).grant_permission(ctx, acl).await;
        conflict_on_duplicate(acl, result)
    }

    pub async fn modify_permission(
        &self,
        ctx: &RequestInformation,
        acl: &AccessControl,
    ) -> Result<(), AuthzError> {
        self.get(ctx).modify_permission(ctx, acl).await
    }

    pub async fn revoke_permission(
        &self,
        ctx: &RequestInformation,
        id: &str,
    ) -> Result<(), AuthzError> {
        self.get(ctx).revoke_permission(ctx, id).await
    }
}
