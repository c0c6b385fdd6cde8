use crate::{
    auth::BearerToken,
    error::ServiceError,
    models::{
        Account, AccountKind, AccountRequest, ActiveFlag, CREATED_MSG, DELETED_MSG, DeleteFlag,
        Envelope, Level, LoginRequest, LoginResponse, Message, Taxon, TaxonNode, TaxonRequest,
        UPDATED_MSG, Updated,
    },
    service::ServiceState,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// A list body, or 204 when there is nothing to list.
fn list_response<T: Serialize>(items: Vec<T>) -> Response {
    if items.is_empty() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (StatusCode::OK, Json(items)).into_response()
    }
}

// --- Sessions ---

/// login
///
/// [Public Route] Mounted twice: `/api/admin-login` and `/api/user-login`. The account kind
/// arrives as a route extension.
#[utoipa::path(
    post,
    path = "/api/{kind}-login",
    params(("kind" = AccountKind, Path, description = "admin or user")),
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session opened", body = LoginResponse),
        (status = 401, description = "Bad credentials, deleted or inactive account")
    )
)]
pub async fn login(
    Extension(kind): Extension<AccountKind>,
    State(service): State<ServiceState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServiceError> {
    Ok(Json(service.login(kind, payload).await?))
}

/// logout
///
/// Revokes the session named by the bearer token.
#[utoipa::path(
    post,
    path = "/api/logout",
    responses(
        (status = 200, description = "Session closed"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn logout(
    State(service): State<ServiceState>,
    token: BearerToken,
) -> Result<StatusCode, ServiceError> {
    service.logout(token.as_deref()).await?;
    Ok(StatusCode::OK)
}

// --- Accounts (superadmin) ---

/// create_account
///
/// [Superadmin] `/api/create-admin` and `/api/create-user`.
#[utoipa::path(
    post,
    path = "/api/create-{kind}",
    params(("kind" = AccountKind, Path, description = "admin or user")),
    request_body = AccountRequest,
    responses(
        (status = 201, description = "Created", body = Account),
        (status = 204, description = "Empty or space-containing credentials"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn create_account(
    Extension(kind): Extension<AccountKind>,
    State(service): State<ServiceState>,
    token: BearerToken,
    Json(payload): Json<AccountRequest>,
) -> Result<(StatusCode, Json<Envelope<Account>>), ServiceError> {
    let account = service
        .create_account(kind, token.as_deref(), payload)
        .await?;
    Ok((StatusCode::CREATED, Json(Envelope::new(account, CREATED_MSG))))
}

/// create_superadmin
///
/// Open while no superadmin exists; afterwards only the current superadmin may call it,
/// and the call replaces them.
#[utoipa::path(
    post,
    path = "/api/create-superadmin",
    request_body = AccountRequest,
    responses(
        (status = 201, description = "Superadmin replaced", body = Account),
        (status = 204, description = "Empty or space-containing credentials"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Username held by a regular admin")
    )
)]
pub async fn create_superadmin(
    State(service): State<ServiceState>,
    token: BearerToken,
    Json(payload): Json<AccountRequest>,
) -> Result<(StatusCode, Json<Envelope<Account>>), ServiceError> {
    let account = service.create_superadmin(token.as_deref(), payload).await?;
    Ok((StatusCode::CREATED, Json(Envelope::new(account, CREATED_MSG))))
}

/// update_account
#[utoipa::path(
    put,
    path = "/api/update-{kind}/{id}",
    params(
        ("kind" = AccountKind, Path, description = "admin or user"),
        ("id" = i64, Path, description = "Account ID")
    ),
    request_body = AccountRequest,
    responses(
        (status = 200, description = "Updated", body = Updated),
        (status = 204, description = "Missing row or invalid credentials"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Username taken by another account")
    )
)]
pub async fn update_account(
    Extension(kind): Extension<AccountKind>,
    State(service): State<ServiceState>,
    Path(id): Path<i64>,
    token: BearerToken,
    Json(payload): Json<AccountRequest>,
) -> Result<Json<Envelope<Updated>>, ServiceError> {
    let updated = service
        .update_account(kind, id, token.as_deref(), payload)
        .await?;
    Ok(Json(Envelope::new(updated, UPDATED_MSG)))
}

/// list_accounts
///
/// `/api/get-admin-admins` and `/api/get-admin-users`.
#[utoipa::path(
    get,
    path = "/api/get-admin-{kind}s",
    params(("kind" = AccountKind, Path, description = "admin or user")),
    responses(
        (status = 200, description = "Live accounts, newest first", body = [Account]),
        (status = 204, description = "None"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_accounts(
    Extension(kind): Extension<AccountKind>,
    State(service): State<ServiceState>,
    token: BearerToken,
) -> Result<Response, ServiceError> {
    let accounts = service.list_accounts(kind, token.as_deref()).await?;
    Ok(list_response(accounts))
}

/// get_account
#[utoipa::path(
    get,
    path = "/api/get-admin-{kind}/{id}",
    params(
        ("kind" = AccountKind, Path, description = "admin or user"),
        ("id" = i64, Path, description = "Account ID")
    ),
    responses(
        (status = 200, description = "Found", body = Account),
        (status = 204, description = "Missing or deleted"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_account(
    Extension(kind): Extension<AccountKind>,
    State(service): State<ServiceState>,
    Path(id): Path<i64>,
    token: BearerToken,
) -> Result<Json<Account>, ServiceError> {
    Ok(Json(service.get_account(kind, id, token.as_deref()).await?))
}

/// delete_account
///
/// Soft delete: sets `is_deleted` to the given flag.
#[utoipa::path(
    put,
    path = "/api/delete-{kind}/{id}",
    params(
        ("kind" = AccountKind, Path, description = "admin or user"),
        ("id" = i64, Path, description = "Account ID")
    ),
    request_body = DeleteFlag,
    responses(
        (status = 200, description = "Flag set", body = DeleteFlag),
        (status = 204, description = "Missing row"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn delete_account(
    Extension(kind): Extension<AccountKind>,
    State(service): State<ServiceState>,
    Path(id): Path<i64>,
    token: BearerToken,
    Json(payload): Json<DeleteFlag>,
) -> Result<Json<Envelope<DeleteFlag>>, ServiceError> {
    let is_deleted = service
        .set_account_deleted(kind, id, token.as_deref(), payload.is_deleted)
        .await?;
    Ok(Json(Envelope::new(DeleteFlag { is_deleted }, UPDATED_MSG)))
}

/// activate_account
#[utoipa::path(
    put,
    path = "/api/activate-{kind}/{id}",
    params(
        ("kind" = AccountKind, Path, description = "admin or user"),
        ("id" = i64, Path, description = "Account ID")
    ),
    request_body = ActiveFlag,
    responses(
        (status = 200, description = "Flag set", body = ActiveFlag),
        (status = 204, description = "Missing row"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn activate_account(
    Extension(kind): Extension<AccountKind>,
    State(service): State<ServiceState>,
    Path(id): Path<i64>,
    token: BearerToken,
    Json(payload): Json<ActiveFlag>,
) -> Result<Json<Envelope<ActiveFlag>>, ServiceError> {
    let is_active = service
        .set_account_active(kind, id, token.as_deref(), payload.is_active)
        .await?;
    Ok(Json(Envelope::new(ActiveFlag { is_active }, UPDATED_MSG)))
}

// --- Taxonomy (admin) ---

/// create_taxon
///
/// One handler for all seven levels; the level arrives as a route extension.
#[utoipa::path(
    post,
    path = "/api/create-{level}",
    params(("level" = Level, Path, description = "Hierarchy level")),
    request_body = TaxonRequest,
    responses(
        (status = 201, description = "Created", body = Taxon),
        (status = 204, description = "Missing parent id"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_taxon(
    Extension(level): Extension<Level>,
    State(service): State<ServiceState>,
    token: BearerToken,
    Json(payload): Json<TaxonRequest>,
) -> Result<(StatusCode, Json<Envelope<TaxonNode>>), ServiceError> {
    let node = service.create_taxon(level, token.as_deref(), payload).await?;
    Ok((StatusCode::CREATED, Json(Envelope::new(node, CREATED_MSG))))
}

/// update_taxon
#[utoipa::path(
    put,
    path = "/api/update-{level}/{id}",
    params(
        ("level" = Level, Path, description = "Hierarchy level"),
        ("id" = i64, Path, description = "Row ID")
    ),
    request_body = TaxonRequest,
    responses(
        (status = 200, description = "Updated", body = Updated),
        (status = 204, description = "Missing row or parent id"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn update_taxon(
    Extension(level): Extension<Level>,
    State(service): State<ServiceState>,
    Path(id): Path<i64>,
    token: BearerToken,
    Json(payload): Json<TaxonRequest>,
) -> Result<Json<Envelope<Updated>>, ServiceError> {
    let updated = service
        .update_taxon(level, id, token.as_deref(), payload)
        .await?;
    Ok(Json(Envelope::new(updated, UPDATED_MSG)))
}

/// list_taxa
///
/// Every live row of the level with its full subtree, newest first.
#[utoipa::path(
    get,
    path = "/api/get-admin-{levels}",
    params(("levels" = String, Path, description = "Plural level name, e.g. classes")),
    responses(
        (status = 200, description = "Rows with nested descendants"),
        (status = 204, description = "None"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_taxa(
    Extension(level): Extension<Level>,
    State(service): State<ServiceState>,
    token: BearerToken,
) -> Result<Response, ServiceError> {
    let nodes = service.list_taxa(level, token.as_deref()).await?;
    Ok(list_response(nodes))
}

/// get_taxon
#[utoipa::path(
    get,
    path = "/api/get-admin-{level}/{id}",
    params(
        ("level" = Level, Path, description = "Hierarchy level"),
        ("id" = i64, Path, description = "Row ID")
    ),
    responses(
        (status = 200, description = "Row with nested descendants"),
        (status = 204, description = "Missing or deleted"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_taxon(
    Extension(level): Extension<Level>,
    State(service): State<ServiceState>,
    Path(id): Path<i64>,
    token: BearerToken,
) -> Result<Json<TaxonNode>, ServiceError> {
    Ok(Json(service.get_taxon(level, id, token.as_deref()).await?))
}

/// delete_taxon
///
/// Soft delete for every level below departments.
#[utoipa::path(
    put,
    path = "/api/delete-{level}/{id}",
    params(
        ("level" = Level, Path, description = "Hierarchy level other than department"),
        ("id" = i64, Path, description = "Row ID")
    ),
    request_body = DeleteFlag,
    responses(
        (status = 200, description = "Flag set", body = DeleteFlag),
        (status = 204, description = "Missing row"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn delete_taxon(
    Extension(level): Extension<Level>,
    State(service): State<ServiceState>,
    Path(id): Path<i64>,
    token: BearerToken,
    Json(payload): Json<DeleteFlag>,
) -> Result<Json<Envelope<DeleteFlag>>, ServiceError> {
    let is_deleted = service
        .set_taxon_deleted(level, id, token.as_deref(), payload.is_deleted)
        .await?;
    Ok(Json(Envelope::new(DeleteFlag { is_deleted }, UPDATED_MSG)))
}

/// delete_department
///
/// Physical removal of a department.
#[utoipa::path(
    delete,
    path = "/api/delete-department/{id}",
    params(("id" = i64, Path, description = "Department ID")),
    responses(
        (status = 200, description = "Removed", body = Message),
        (status = 204, description = "Missing row"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn delete_department(
    State(service): State<ServiceState>,
    Path(id): Path<i64>,
    token: BearerToken,
) -> Result<Json<Message>, ServiceError> {
    service.delete_department(id, token.as_deref()).await?;
    Ok(Json(Message { msg: DELETED_MSG }))
}
