use crate::authz::errors::AuthzError;
use crate::storage::AccessControl;

/// Translate a unique-index rejection of an access control insert into a
/// conflict naming the offending `{who, collection, entity}` triple. Every
/// other outcome passes through untouched.
pub fn conflict_on_duplicate<T>(
    acl: &AccessControl,
    result: Result<T, AuthzError>,
) -> Result<T, AuthzError> {
    match result {
        Err(err) if err.is_unique_violation() => {
            tracing::warn!(
                who = %acl.who,
                collection = %acl.collection,
                entity = %acl.entity,
                "duplicate access control entry rejected"
            );
            Err(AuthzError::Conflict(format!(
                "There is already an Access Control Entry with this {{who, collection, entity}} : {{{}, {}, {}}}",
                acl.who, acl.collection, acl.entity
            )))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::types::Collection;
    use crate::errors::StoreError;

    fn acl() -> AccessControl {
        AccessControl {
            id: "acl-1".into(),
            who: "alice".into(),
            collection: Collection::Metric,
            entity: "m-42".into(),
        }
    }

    #[test]
    fn test_unique_violation_becomes_conflict() {
        let result: Result<(), AuthzError> = Err(AuthzError::Store(StoreError::UniqueViolation(
            "UNIQUE constraint failed".into(),
        )));
        match conflict_on_duplicate(&acl(), result) {
            Err(AuthzError::Conflict(msg)) => {
                assert!(msg.contains("{alice, Metric, m-42}"), "message was: {msg}");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_other_errors_pass_through() {
        let result: Result<(), AuthzError> = Err(AuthzError::Forbidden);
        assert!(matches!(
            conflict_on_duplicate(&acl(), result),
            Err(AuthzError::Forbidden)
        ));

        let result: Result<(), AuthzError> =
            Err(AuthzError::Store(StoreError::Corrupt("bad json".into())));
        assert!(matches!(
            conflict_on_duplicate(&acl(), result),
            Err(AuthzError::Store(StoreError::Corrupt(_)))
        ));

        assert!(conflict_on_duplicate(&acl(), Ok(7)).is_ok());
    }
}
