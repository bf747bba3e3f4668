use accessgate::authz::{
    AccessType, Collection, CollectionPermission, Operation, Permission, RequestInformation,
};
use accessgate::storage::{self, AccessControl, NewRole, Role};
use sea_orm::DatabaseConnection;

/// Builder for creating test roles
pub struct RoleBuilder {
    name: String,
    collection_permissions: Vec<CollectionPermission>,
}

impl RoleBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            collection_permissions: Vec::new(),
        }
    }

    /// Add one permission, grouping by collection.
    pub fn allow(mut self, collection: Collection, operation: Operation, access_type: AccessType) -> Self {
        let permission = Permission {
            operation,
            access_type,
        };
        match self
            .collection_permissions
            .iter_mut()
            .find(|cp| cp.collection == collection)
        {
            Some(cp) => cp.permissions.push(permission),
            None => self.collection_permissions.push(CollectionPermission {
                collection,
                permissions: vec![permission],
            }),
        }
        self
    }

    pub fn build(self) -> NewRole {
        NewRole {
            name: self.name,
            collection_permissions: self.collection_permissions,
        }
    }

    pub async fn create(self, db: &DatabaseConnection) -> Role {
        storage::create_role(db, self.build())
            .await
            .expect("Failed to create test role")
    }
}

/// Insert an access control entry directly, bypassing the modulator.
pub async fn seed_acl(
    db: &DatabaseConnection,
    who: &str,
    collection: Collection,
    entity: &str,
) -> AccessControl {
    let acl = AccessControl::new(who, collection, entity);
    storage::insert_access_control(db, &acl)
        .await
        .expect("Failed to create test access control entry")
}

/// Request context already resolved to `access_type`.
pub fn resolved_ctx(who: &str, access_type: AccessType) -> RequestInformation {
    let ctx = RequestInformation::new(who);
    ctx.set_access_type(access_type)
        .expect("fresh context is unresolved");
    ctx
}
