// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exercise library routes.
//!
//! Reads are public (clients sync the library before login); mutations are
//! reserved for authenticated curators.

use crate::error::Result;
use crate::models::Exercise;
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use std::sync::Arc;

/// Public library reads.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/exercises", get(list_exercises))
        .route("/exercises/{id}", get(get_exercises_by_version))
}

/// Library mutations (auth middleware applied in routes/mod.rs).
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/exercises", post(create_exercise))
        .route(
            "/exercises/{id}",
            put(replace_exercise).delete(delete_exercise),
        )
}

/// List the whole exercise library.
async fn list_exercises(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Exercise>>> {
    let exercises = state.db.list_exercises().await?;
    Ok(Json(exercises))
}

/// List library entries for one published version.
async fn get_exercises_by_version(
    State(state): State<Arc<AppState>>,
    Path(version): Path<String>,
) -> Result<Json<Vec<Exercise>>> {
    let exercises = state.db.get_exercises_by_version(&version).await?;
    Ok(Json(exercises))
}

async fn create_exercise(
    State(state): State<Arc<AppState>>,
    Json(exercise): Json<Exercise>,
) -> Result<(StatusCode, Json<Exercise>)> {
    let created = state.db.create_exercise(exercise).await?;
    tracing::info!(exercise_id = %created.id, "Exercise created");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn replace_exercise(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(exercise): Json<Exercise>,
) -> Result<Json<Exercise>> {
    let replaced = state.db.replace_exercise(&id, exercise).await?;
    Ok(Json(replaced))
}

async fn delete_exercise(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.db.delete_exercise(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
