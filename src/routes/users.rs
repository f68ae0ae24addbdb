// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User routes: registration, login, token refresh, and every mutation of the
//! embedded per-user collections (plans, history, records, search history).

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::plan::PublicType;
use crate::models::{
    HistoryItem, Plan, RecordItem, SearchHistoryItem, User, UserSearchResult, UserSummary,
};
use crate::routes::plans::decode_plan;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use validator::Validate;

const DEFAULT_SEARCH_RESULTS: usize = 10;
const MAX_SEARCH_RESULTS: usize = 50;

/// Public user routes: registration, login, refresh, public views.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route("/users/token", post(refresh_token))
        .route("/users/public/plans/{id}", get(get_public_plans))
        .route("/users/public/records/{id}", get(get_public_records))
        .route("/users/public/history/{id}", get(get_public_history))
}

/// User mutations (auth middleware applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users/username/{id}", put(update_username))
        .route("/users/password/{id}", put(update_password))
        .route(
            "/users/plans/{id}",
            post(add_plan).put(edit_plan).delete(remove_plan),
        )
        .route("/users/history/{id}", put(add_history_item))
        .route("/users/set-public/plans/{id}", post(set_plans_public))
        .route("/users/set-public/history/{id}", post(set_history_public))
        .route("/users/update-records/{id}", post(update_records))
        .route("/users/search/{id}", post(search_users))
        .route("/users/search-user/{id}", post(add_search_entry))
        .route("/users/search-history/{id}", delete(clear_search_history))
        .route(
            "/users/search-history/{id}/{item_id}",
            delete(remove_search_entry),
        )
}

/// Plain acknowledgement body used by several mutations.
#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

fn message(text: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.to_string(),
    })
}

// ─── Listings & Public Views ─────────────────────────────────────

/// List all users, sanitized (no password hashes, no tokens).
async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<UserSummary>>> {
    let users = state.db.list_user_summaries().await?;
    Ok(Json(users))
}

async fn get_public_plans(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<Plan>>> {
    Ok(Json(state.db.get_public_plans(&id).await?))
}

async fn get_public_records(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<RecordItem>>> {
    Ok(Json(state.db.get_public_records(&id).await?))
}

async fn get_public_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<HistoryItem>>> {
    Ok(Json(state.db.get_public_history_items(&id).await?))
}

// ─── Registration & Login ────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub created_at: String,
}

/// Register a new user. Email and username are globally unique; a duplicate
/// of either is a 409.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let password_hash = state.auth.hash_password(&body.password).await?;
    let user = User::new(body.username, body.email, password_hash);
    let user = state.db.register_user(user).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserSummary,
}

/// Log in with email + password; issues an access/refresh token pair and
/// persists the refresh token on the user document.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let Some(user) = state.db.get_user_by_email(&body.email).await? else {
        return Err(AppError::Unauthorized);
    };

    if !state
        .auth
        .verify_password(&body.password, &user.password)
        .await?
    {
        return Err(AppError::Unauthorized);
    }

    let access_token = state.auth.issue_access_token(&user)?;
    let refresh_token = state.auth.issue_refresh_token(&user)?;
    state.db.save_refresh_token(&user.id, &refresh_token).await?;

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        access_token,
        refresh_token,
        user: UserSummary::from(&user),
    }))
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Exchange a refresh token for a fresh access token.
///
/// The presented token must decode AND match the one stored at last login;
/// any failure is a uniform 403.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>> {
    let claims = state
        .auth
        .verify_token(&body.token)
        .map_err(|_| AppError::Forbidden)?;

    let user = state
        .db
        .get_user(&claims.sub)
        .await?
        .ok_or(AppError::Forbidden)?;

    if user.refresh_token.as_deref() != Some(body.token.as_str()) {
        return Err(AppError::Forbidden);
    }

    let access_token = state.auth.issue_access_token(&user)?;
    Ok(Json(RefreshResponse { access_token }))
}

// ─── Account Updates ─────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUsernameRequest {
    pub new_username: String,
    /// Current password, re-checked before the rename.
    pub password: String,
}

#[derive(Serialize)]
pub struct UpdateUsernameResponse {
    pub username: String,
}

async fn update_username(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUsernameRequest>,
) -> Result<Json<UpdateUsernameResponse>> {
    auth_user.ensure_owns(&id)?;

    let user = state.db.get_user_required(&id).await?;
    if !state
        .auth
        .verify_password(&body.password, &user.password)
        .await?
    {
        return Err(AppError::Unauthorized);
    }

    let username = state
        .db
        .update_user_username(&id, &body.new_username)
        .await?;
    tracing::info!(user_id = %id, "Username changed");

    Ok(Json(UpdateUsernameResponse { username }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    auth_user.ensure_owns(&id)?;

    let user = state.db.get_user_required(&id).await?;
    if !state
        .auth
        .verify_password(&body.old_password, &user.password)
        .await?
    {
        return Err(AppError::Unauthorized);
    }

    let new_hash = state.auth.hash_password(&body.new_password).await?;
    state.db.update_user_password(&id, &new_hash).await?;

    Ok(message("Password updated successfully"))
}

// ─── Embedded Plans ──────────────────────────────────────────────

/// Add a plan to the user's embedded plans (upsert by id).
async fn add_plan(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(raw): Json<Value>,
) -> Result<(StatusCode, Json<Plan>)> {
    auth_user.ensure_owns(&id)?;
    let plan = decode_plan(raw)?;
    let added = state.db.add_plan_to_user(&id, plan).await?;
    Ok((StatusCode::CREATED, Json(added)))
}

async fn edit_plan(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(raw): Json<Value>,
) -> Result<Json<Plan>> {
    auth_user.ensure_owns(&id)?;
    let plan = decode_plan(raw)?;
    let updated = state.db.edit_user_plan(&id, plan).await?;
    Ok(Json(updated))
}

#[derive(Deserialize)]
pub struct RemovePlanRequest {
    /// Id of the embedded plan to remove.
    pub id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovePlanResponse {
    pub message: String,
    pub plan_id: String,
}

async fn remove_plan(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<RemovePlanRequest>,
) -> Result<Json<RemovePlanResponse>> {
    auth_user.ensure_owns(&id)?;
    let removed = state.db.remove_plan_from_user(&id, &body.id).await?;
    Ok(Json(RemovePlanResponse {
        message: "Plan removed successfully".to_string(),
        plan_id: removed.id,
    }))
}

// ─── History & Records ───────────────────────────────────────────

async fn add_history_item(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(item): Json<HistoryItem>,
) -> Result<Json<HistoryItem>> {
    auth_user.ensure_owns(&id)?;
    let added = state.db.add_history_item_to_user(&id, item).await?;
    Ok(Json(added))
}

#[derive(Deserialize)]
pub struct SetPlansPublicRequest {
    pub items: Vec<crate::models::VisibilityUpdate>,
}

async fn set_plans_public(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<SetPlansPublicRequest>,
) -> Result<Json<Vec<Plan>>> {
    auth_user.ensure_owns(&id)?;
    let public = state.db.set_plans_public_status(&id, body.items).await?;
    Ok(Json(public))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetHistoryPublicRequest {
    pub items: Vec<crate::models::VisibilityUpdate>,
    /// When present, also becomes the user's default history visibility.
    #[serde(default)]
    pub default_public_type: Option<PublicType>,
}

async fn set_history_public(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<SetHistoryPublicRequest>,
) -> Result<Json<Vec<HistoryItem>>> {
    auth_user.ensure_owns(&id)?;
    let public = state
        .db
        .set_history_public_status(&id, body.items, body.default_public_type)
        .await?;
    Ok(Json(public))
}

#[derive(Deserialize)]
pub struct UpdateRecordsRequest {
    pub records: Vec<RecordItem>,
}

async fn update_records(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateRecordsRequest>,
) -> Result<Json<MessageResponse>> {
    auth_user.ensure_owns(&id)?;
    state.db.update_user_records(&id, body.records).await?;
    Ok(message("Records updated successfully"))
}

// ─── Search ──────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub max_results: Option<usize>,
}

/// Case-insensitive username search; never returns the requester.
async fn search_users(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<SearchRequest>,
) -> Result<Json<Vec<UserSearchResult>>> {
    auth_user.ensure_owns(&id)?;
    let max_results = body
        .max_results
        .unwrap_or(DEFAULT_SEARCH_RESULTS)
        .min(MAX_SEARCH_RESULTS);
    let results = state
        .db
        .search_users_by_username(&body.query, max_results, &id)
        .await?;
    Ok(Json(results))
}

/// Remember a viewed user in search history (de-duplicated by target).
async fn add_search_entry(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(item): Json<SearchHistoryItem>,
) -> Result<(StatusCode, Json<SearchHistoryItem>)> {
    auth_user.ensure_owns(&id)?;
    let added = state.db.add_search_history_item_to_user(&id, item).await?;
    Ok((StatusCode::CREATED, Json(added)))
}

async fn remove_search_entry(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>> {
    auth_user.ensure_owns(&id)?;
    state
        .db
        .remove_search_history_item_from_user(&id, &item_id)
        .await?;
    Ok(message("Search history item removed successfully"))
}

async fn clear_search_history(
    State(state): State<Arc<AppState>>,
    Extension(auth_user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    auth_user.ensure_owns(&id)?;
    state.db.clear_search_history_for_user(&id).await?;
    Ok(message("Search history cleared successfully"))
}
