use std::sync::OnceLock;

use crate::authz::errors::AuthzError;
use crate::authz::types::AccessType;

/// Per-request holder of the access type that governs the request's entity
/// operations.
///
/// Build one with [`RequestInformation::new`] when a request arrives and pass
/// it by reference to the resolver and the modulator; drop it when the request
/// ends. It is never stored in shared state.
#[derive(Debug)]
pub struct RequestInformation {
    who: String,
    access_type: OnceLock<AccessType>,
}

impl RequestInformation {
    pub fn new(who: impl Into<String>) -> Self {
        Self {
            who: who.into(),
            access_type: OnceLock::new(),
        }
    }

    /// Subject identifier of the authenticated caller.
    pub fn who(&self) -> &str {
        &self.who
    }

    /// `None` until the resolver has run for this request.
    pub fn access_type(&self) -> Option<AccessType> {
        self.access_type.get().copied()
    }

    pub fn set_access_type(&self, access_type: AccessType) -> Result<(), AuthzError> {
        self.access_type.set(access_type).map_err(|_| {
            let current = self
                .access_type()
                .map(|a| a.as_str())
                .unwrap_or("unresolved");
            AuthzError::AccessTypeAlreadyResolved(current.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unresolved() {
        let info = RequestInformation::new("alice");
        assert_eq!(info.who(), "alice");
        assert!(info.access_type().is_none());
    }

    #[test]
    fn test_written_once() {
        let info = RequestInformation::new("alice");
        info.set_access_type(AccessType::Entity).unwrap();
        assert_eq!(info.access_type(), Some(AccessType::Entity));

        let err = info.set_access_type(AccessType::Always).unwrap_err();
        assert!(matches!(err, AuthzError::AccessTypeAlreadyResolved(ref s) if s == "ENTITY"));
        assert_eq!(info.access_type(), Some(AccessType::Entity));
    }
}
