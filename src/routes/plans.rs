// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Standalone plan collection routes (legacy; later revisions embed plans in
//! the owning user document, see routes/users.rs).
//!
//! Every plan body is structurally validated before any store write.

use crate::error::{AppError, Result};
use crate::models::{plan, Plan};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Plan routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/plans", get(list_plans).post(create_plan))
        .route("/plans/{id}", axum::routing::put(update_plan).delete(delete_plan))
}

/// Validate a raw plan body and deserialize it.
///
/// Validation runs on the untyped JSON so violation messages stay exact;
/// a body that passes but still fails typed deserialization is malformed in
/// some non-plan way (e.g. wrong `allowedUsers` element shape).
pub fn decode_plan(raw: Value) -> Result<Plan> {
    plan::validate(&raw).map_err(|v| AppError::Validation(v.to_string()))?;
    serde_json::from_value(raw).map_err(|e| AppError::BadRequest(e.to_string()))
}

#[derive(Deserialize)]
struct ListPlansQuery {
    /// Filter by owning user
    author: Option<String>,
}

async fn list_plans(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListPlansQuery>,
) -> Result<Json<Vec<Plan>>> {
    let plans = match params.author.as_deref() {
        Some(author_id) => state.db.get_plans_by_author(author_id).await?,
        None => state.db.list_plans().await?,
    };
    Ok(Json(plans))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatePlanRequest {
    new_plan: Value,
    user_id: String,
}

async fn create_plan(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<Plan>)> {
    let plan = decode_plan(body.new_plan)?;
    let created = state.db.create_plan(plan, &body.user_id).await?;
    tracing::info!(plan_id = %created.id, author_id = %body.user_id, "Plan created");
    Ok((StatusCode::CREATED, Json(created)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePlanRequest {
    updated_plan: Value,
}

async fn update_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<UpdatePlanRequest>,
) -> Result<Json<Plan>> {
    let mut plan = decode_plan(body.updated_plan)?;
    if !plan.id.is_empty() && plan.id != id {
        return Err(AppError::BadRequest(
            "Plan id does not match request path".to_string(),
        ));
    }
    plan.id = id.clone();
    let replaced = state.db.replace_plan(&id, plan).await?;
    Ok(Json(replaced))
}

async fn delete_plan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.db.delete_plan(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
