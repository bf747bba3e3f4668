use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

use crate::authz::types::Collection;
use crate::errors::StoreError;

#[derive(Debug, Error, Diagnostic)]
pub enum AuthzError {
    #[error("{0}")]
    #[diagnostic(code(accessgate::authz::not_found))]
    NotFound(String),

    #[error("{0}")]
    #[diagnostic(
        code(accessgate::authz::conflict),
        help("The key named in the message already exists; modify the existing record instead")
    )]
    Conflict(String),

    #[error("You have no access to execute this operation")]
    #[diagnostic(code(accessgate::authz::forbidden))]
    Forbidden,

    #[error("Access type already resolved for this request (currently `{0}`)")]
    #[diagnostic(
        code(accessgate::authz::already_resolved),
        help("Create a new RequestInformation for every request")
    )]
    AccessTypeAlreadyResolved(String),

    #[error("Unknown collection `{0}`")]
    #[diagnostic(code(accessgate::authz::unknown_collection))]
    UnknownCollection(String),

    #[error("Access control entry targets `{found}` but this store guards `{expected}`")]
    #[diagnostic(code(accessgate::authz::collection_mismatch))]
    CollectionMismatch {
        expected: Collection,
        found: Collection,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AuthzError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { table, id } => {
                AuthzError::NotFound(format!("{table} with id {id} not found"))
            }
            other => AuthzError::Store(other),
        }
    }
}

impl AuthzError {
    /// True when the underlying store rejected a write on a unique index.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, AuthzError::Store(StoreError::UniqueViolation(_)))
    }
}

impl IntoResponse for AuthzError {
    fn into_response(self) -> Response {
        let status = match &self {
            AuthzError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthzError::Conflict(_) => StatusCode::CONFLICT,
            AuthzError::Forbidden => StatusCode::FORBIDDEN,
            AuthzError::UnknownCollection(_) | AuthzError::CollectionMismatch { .. } => {
                StatusCode::BAD_REQUEST
            }
            AuthzError::AccessTypeAlreadyResolved(_) | AuthzError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}
