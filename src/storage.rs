use crate::authz::types::{Collection, CollectionPermission, Permission};
use crate::entities;
use crate::errors::{GateError, StoreError};
use crate::settings::Database as DbCfg;
use base64ct::Encoding;
use chrono::Utc;
use rand::RngCore;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub name: String,
    pub collection_permissions: Vec<CollectionPermission>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub collection_permissions: Vec<CollectionPermission>,
}

/// Partial update of a role. Only the fields that are present overwrite the
/// stored role.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRole {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub collection_permissions: Option<Vec<CollectionPermission>>,
}

impl UpdateRole {
    pub fn merge_into(self, role: &mut Role) {
        if let Some(name) = self.name {
            role.name = name;
        }
        if let Some(collection_permissions) = self.collection_permissions {
            role.collection_permissions = collection_permissions;
        }
    }
}

/// "`who` may act on `entity` within `collection`".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControl {
    pub id: String,
    pub who: String,
    pub collection: Collection,
    pub entity: String,
}

impl AccessControl {
    /// New entry with a freshly generated id.
    pub fn new(who: impl Into<String>, collection: Collection, entity: impl Into<String>) -> Self {
        Self {
            id: random_id(),
            who: who.into(),
            collection,
            entity: entity.into(),
        }
    }
}

pub async fn init(cfg: &DbCfg) -> Result<DatabaseConnection, GateError> {
    let db = Database::connect(&cfg.url).await?;
    Ok(db)
}

fn random_id() -> String {
    let mut bytes = [0u8; 18];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64ct::Base64UrlUnpadded::encode_string(&bytes)
}

// Role functions

fn role_from_model(model: entities::role::Model) -> Result<Role, StoreError> {
    let collection_permissions: Vec<CollectionPermission> =
        serde_json::from_str(&model.collection_permissions)?;
    Ok(Role {
        id: model.id,
        name: model.name,
        collection_permissions,
    })
}

pub async fn create_role(db: &DatabaseConnection, input: NewRole) -> Result<Role, StoreError> {
    let id = random_id();
    let permissions_json = serde_json::to_string(&input.collection_permissions)?;

    let role = entities::role::ActiveModel {
        id: Set(id.clone()),
        name: Set(input.name.clone()),
        collection_permissions: Set(permissions_json),
        created_at: Set(Utc::now().timestamp()),
    };

    role.insert(db).await?;

    Ok(Role {
        id,
        name: input.name,
        collection_permissions: input.collection_permissions,
    })
}

pub async fn get_role(db: &DatabaseConnection, id: &str) -> Result<Option<Role>, StoreError> {
    use entities::role::Entity;

    match Entity::find_by_id(id.to_string()).one(db).await? {
        Some(model) => Ok(Some(role_from_model(model)?)),
        None => Ok(None),
    }
}

pub async fn get_role_by_name(
    db: &DatabaseConnection,
    name: &str,
) -> Result<Option<Role>, StoreError> {
    use entities::role::{Column, Entity};

    match Entity::find().filter(Column::Name.eq(name)).one(db).await? {
        Some(model) => Ok(Some(role_from_model(model)?)),
        None => Ok(None),
    }
}

/// Permissions a role holds on one collection. An unknown role name yields
/// an empty list.
pub async fn get_role_permissions_upon_a_collection(
    db: &DatabaseConnection,
    name: &str,
    collection: Collection,
) -> Result<Vec<Permission>, StoreError> {
    let permissions = get_role_by_name(db, name)
        .await?
        .map(|role| {
            role.collection_permissions
                .into_iter()
                .filter(|cp| cp.collection == collection)
                .flat_map(|cp| cp.permissions)
                .collect()
        })
        .unwrap_or_default();
    Ok(permissions)
}

pub async fn list_roles(db: &DatabaseConnection) -> Result<Vec<Role>, StoreError> {
    use entities::role::{Column, Entity};

    Entity::find()
        .order_by_asc(Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(role_from_model)
        .collect()
}

pub async fn list_roles_by_ids(
    db: &DatabaseConnection,
    ids: &[String],
) -> Result<Vec<Role>, StoreError> {
    use entities::role::{Column, Entity};

    if ids.is_empty() {
        return Ok(Vec::new());
    }

    Entity::find()
        .filter(Column::Id.is_in(ids.iter().cloned()))
        .order_by_asc(Column::Name)
        .all(db)
        .await?
        .into_iter()
        .map(role_from_model)
        .collect()
}

/// Overwrite the stored role with `role`. Fails with `NotFound` if no role
/// has its id.
pub async fn update_role(db: &DatabaseConnection, role: Role) -> Result<Role, StoreError> {
    use entities::role::Entity;

    let model = Entity::find_by_id(role.id.clone())
        .one(db)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            table: "Role",
            id: role.id.clone(),
        })?;

    let mut active: entities::role::ActiveModel = model.into();
    active.name = Set(role.name.clone());
    active.collection_permissions = Set(serde_json::to_string(&role.collection_permissions)?);
    active.update(db).await?;

    Ok(role)
}

/// Delete a role together with the access control entries naming it.
pub async fn delete_role(db: &DatabaseConnection, id: &str) -> Result<bool, StoreError> {
    use entities::access_control::{Column as AclColumn, Entity as AclEntity};
    use entities::role::Entity;

    let txn = db.begin().await?;

    let result = Entity::delete_by_id(id.to_string()).exec(&txn).await?;
    AclEntity::delete_many()
        .filter(AclColumn::Collection.eq(Collection::Role.as_str()))
        .filter(AclColumn::Entity.eq(id))
        .exec(&txn)
        .await?;

    txn.commit().await?;
    Ok(result.rows_affected > 0)
}

// Access control functions

fn access_control_from_model(
    model: entities::access_control::Model,
) -> Result<AccessControl, StoreError> {
    let collection = model
        .collection
        .parse::<Collection>()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
    Ok(AccessControl {
        id: model.id,
        who: model.who,
        collection,
        entity: model.entity,
    })
}

/// Insert a new entry. A second entry with the same `{who, collection,
/// entity}` is rejected by the unique index and reported as
/// `StoreError::UniqueViolation`.
pub async fn insert_access_control(
    db: &DatabaseConnection,
    acl: &AccessControl,
) -> Result<AccessControl, StoreError> {
    let entry = entities::access_control::ActiveModel {
        id: Set(acl.id.clone()),
        who: Set(acl.who.clone()),
        collection: Set(acl.collection.as_str().to_string()),
        entity: Set(acl.entity.clone()),
        created_at: Set(Utc::now().timestamp()),
    };

    entry.insert(db).await?;
    Ok(acl.clone())
}

pub async fn update_access_control(
    db: &DatabaseConnection,
    acl: &AccessControl,
) -> Result<AccessControl, StoreError> {
    use entities::access_control::Entity;

    let model = Entity::find_by_id(acl.id.clone())
        .one(db)
        .await?
        .ok_or_else(|| StoreError::NotFound {
            table: "AccessControl",
            id: acl.id.clone(),
        })?;

    let mut active: entities::access_control::ActiveModel = model.into();
    active.who = Set(acl.who.clone());
    active.collection = Set(acl.collection.as_str().to_string());
    active.entity = Set(acl.entity.clone());
    active.update(db).await?;

    Ok(acl.clone())
}

pub async fn get_access_control(
    db: &DatabaseConnection,
    id: &str,
) -> Result<Option<AccessControl>, StoreError> {
    use entities::access_control::Entity;

    match Entity::find_by_id(id.to_string()).one(db).await? {
        Some(model) => Ok(Some(access_control_from_model(model)?)),
        None => Ok(None),
    }
}

/// Entry `id`, provided it belongs to `collection`. Entries of other
/// collections are reported as `NotFound`.
pub async fn get_access_control_in(
    db: &DatabaseConnection,
    collection: Collection,
    id: &str,
) -> Result<AccessControl, StoreError> {
    match get_access_control(db, id).await? {
        Some(acl) if acl.collection == collection => Ok(acl),
        _ => Err(StoreError::NotFound {
            table: "AccessControl",
            id: id.to_string(),
        }),
    }
}

pub async fn access_control_exists(
    db: &DatabaseConnection,
    who: &str,
    collection: Collection,
    entity: &str,
) -> Result<bool, StoreError> {
    use entities::access_control::{Column, Entity};

    let found = Entity::find()
        .filter(Column::Who.eq(who))
        .filter(Column::Collection.eq(collection.as_str()))
        .filter(Column::Entity.eq(entity))
        .one(db)
        .await?;
    Ok(found.is_some())
}

/// Ids of the entities of `collection` that `who` holds an entry for.
pub async fn entity_ids_for(
    db: &DatabaseConnection,
    who: &str,
    collection: Collection,
) -> Result<Vec<String>, StoreError> {
    use entities::access_control::{Column, Entity};

    let ids: Vec<String> = Entity::find()
        .select_only()
        .column(Column::Entity)
        .filter(Column::Who.eq(who))
        .filter(Column::Collection.eq(collection.as_str()))
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids)
}

pub async fn list_access_controls(
    db: &DatabaseConnection,
    collection: Collection,
    entity: &str,
) -> Result<Vec<AccessControl>, StoreError> {
    use entities::access_control::{Column, Entity};

    Entity::find()
        .filter(Column::Collection.eq(collection.as_str()))
        .filter(Column::Entity.eq(entity))
        .order_by_asc(Column::CreatedAt)
        .all(db)
        .await?
        .into_iter()
        .map(access_control_from_model)
        .collect()
}

pub async fn delete_access_control(db: &DatabaseConnection, id: &str) -> Result<bool, StoreError> {
    use entities::access_control::Entity;

    let result = Entity::delete_by_id(id.to_string()).exec(db).await?;
    Ok(result.rows_affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::types::{AccessType, Operation};

    fn sample_role() -> Role {
        Role {
            id: "r-1".into(),
            name: "collection_owner".into(),
            collection_permissions: vec![CollectionPermission {
                collection: Collection::Metric,
                permissions: vec![Permission {
                    operation: Operation::Read,
                    access_type: AccessType::Always,
                }],
            }],
        }
    }

    #[test]
    fn test_merge_name_only_keeps_permissions() {
        let mut role = sample_role();
        let before = role.collection_permissions.clone();

        UpdateRole {
            name: Some("renamed".into()),
            collection_permissions: None,
        }
        .merge_into(&mut role);

        assert_eq!(role.name, "renamed");
        assert_eq!(role.collection_permissions, before);
    }

    #[test]
    fn test_merge_permissions_only_keeps_name() {
        let mut role = sample_role();
        let replacement = vec![CollectionPermission {
            collection: Collection::Role,
            permissions: vec![],
        }];

        UpdateRole {
            name: None,
            collection_permissions: Some(replacement.clone()),
        }
        .merge_into(&mut role);

        assert_eq!(role.name, "collection_owner");
        assert_eq!(role.collection_permissions, replacement);
    }

    #[test]
    fn test_update_role_absent_fields_deserialize_as_none() {
        let update: UpdateRole = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert_eq!(update.name.as_deref(), Some("x"));
        assert!(update.collection_permissions.is_none());
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(random_id(), random_id());
        assert_eq!(random_id().len(), 24);
    }
}
