//! HTTP surface over the role service. Callers are authenticated upstream;
//! the gateway forwards the subject in `x-subject` and the caller's role names
//! in `x-roles` (comma separated).
use crate::authz::{AuthzError, Collection, Operation, RequestInformation, RoleService};
use crate::storage::{AccessControl, NewRole, UpdateRole};
use axum::extract::{FromRequestParts, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use miette::IntoDiagnostic;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Clone)]
pub struct AppState {
    pub roles: RoleService,
}

/// Identity of the caller as forwarded by the authenticating gateway.
#[derive(Debug, Clone)]
pub struct Caller {
    pub subject: String,
    pub roles: Vec<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let subject = parts
            .headers
            .get("x-subject")
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "missing x-subject header" })),
                )
                    .into_response()
            })?;

        let roles = parts
            .headers
            .get("x-roles")
            .and_then(|v| v.to_str().ok())
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Caller {
            subject: subject.to_string(),
            roles,
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/access/check", post(check_access))
        .route("/roles", get(list_roles).post(create_role))
        .route(
            "/roles/{id}",
            get(get_role).patch(update_role).delete(delete_role),
        )
        .route("/roles/{id}/acl", post(grant_permission))
        .route(
            "/roles/{id}/acl/{acl_id}",
            put(modify_permission).delete(revoke_permission),
        )
        .route("/healthz", get(health))
        .with_state(state)
}

pub async fn serve(addr: &str, db: DatabaseConnection) -> miette::Result<()> {
    let state = AppState {
        roles: RoleService::new(db),
    };

    let listener = tokio::net::TcpListener::bind(addr).await.into_diagnostic()?;
    tracing::info!(%addr, "accessgate listening");
    axum::serve(listener, router(state)).await.into_diagnostic()?;
    Ok(())
}

/// Resolve the caller's access to `operation` on roles into a fresh
/// per-request context, or reject with 403.
async fn authorize(
    state: &AppState,
    caller: &Caller,
    operation: Operation,
) -> Result<RequestInformation, AuthzError> {
    let ctx = RequestInformation::new(caller.subject.clone());
    if state
        .roles
        .has_access(&ctx, &caller.roles, Collection::Role, operation)
        .await?
    {
        Ok(ctx)
    } else {
        Err(AuthzError::Forbidden)
    }
}

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub collection: Collection,
    pub operation: Operation,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    pub access_type: Option<String>,
}

async fn check_access(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, AuthzError> {
    let ctx = RequestInformation::new(caller.subject);
    let allowed = state
        .roles
        .has_access(&ctx, &caller.roles, req.collection, req.operation)
        .await?;
    Ok(Json(CheckResponse {
        allowed,
        access_type: ctx.access_type().map(|a| a.to_string()),
    }))
}

async fn create_role(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<NewRole>,
) -> Result<Response, AuthzError> {
    authorize(&state, &caller, Operation::Create).await?;
    let role = state.roles.save(req).await?;
    Ok((StatusCode::CREATED, Json(role)).into_response())
}

async fn list_roles(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Response, AuthzError> {
    let ctx = authorize(&state, &caller, Operation::Read).await?;
    let roles = state.roles.fetch_roles(&ctx).await?;
    Ok(Json(roles).into_response())
}

async fn get_role(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Response, AuthzError> {
    let ctx = authorize(&state, &caller, Operation::Read).await?;
    let role = state.roles.fetch_role(&ctx, &id).await?;
    Ok(Json(role).into_response())
}

async fn update_role(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<UpdateRole>,
) -> Result<Response, AuthzError> {
    let ctx = authorize(&state, &caller, Operation::Update).await?;
    let role = state.roles.update(&ctx, &id, req).await?;
    Ok(Json(role).into_response())
}

async fn delete_role(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Response, AuthzError> {
    let ctx = authorize(&state, &caller, Operation::Delete).await?;
    if state.roles.delete(&ctx, &id).await? {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Err(AuthzError::NotFound(format!("Role with id {id} not found")))
    }
}

#[derive(Debug, Deserialize)]
pub struct AclRequest {
    pub who: String,
}

async fn grant_permission(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<AclRequest>,
) -> Result<Response, AuthzError> {
    let ctx = authorize(&state, &caller, Operation::Acl).await?;
    let acl = AccessControl::new(req.who, Collection::Role, id);
    state.roles.grant_permission(&ctx, &acl).await?;
    Ok((StatusCode::CREATED, Json(acl)).into_response())
}

/// The entry `acl_id`, provided it is attached to role `role_id`.
async fn role_entry(
    state: &AppState,
    role_id: &str,
    acl_id: &str,
) -> Result<AccessControl, AuthzError> {
    let acl = state.roles.access_control(acl_id).await?;
    if acl.entity == role_id {
        Ok(acl)
    } else {
        Err(AuthzError::NotFound(format!(
            "AccessControl with id {acl_id} not found on role {role_id}"
        )))
    }
}

async fn modify_permission(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, acl_id)): Path<(String, String)>,
    Json(req): Json<AclRequest>,
) -> Result<Response, AuthzError> {
    let ctx = authorize(&state, &caller, Operation::Acl).await?;
    role_entry(&state, &id, &acl_id).await?;
    let acl = AccessControl {
        id: acl_id,
        who: req.who,
        collection: Collection::Role,
        entity: id,
    };
    state.roles.modify_permission(&ctx, &acl).await?;
    Ok(Json(acl).into_response())
}

async fn revoke_permission(
    State(state): State<AppState>,
    caller: Caller,
    Path((id, acl_id)): Path<(String, String)>,
) -> Result<Response, AuthzError> {
    let ctx = authorize(&state, &caller, Operation::Acl).await?;
    role_entry(&state, &id, &acl_id).await?;
    state.roles.revoke_permission(&ctx, &acl_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
