// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use std::sync::Arc;
use workon_api::config::Config;
use workon_api::db::FirestoreDb;
use workon_api::routes::create_router;
use workon_api::services::AuthService;
use workon_api::AppState;

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    let config = Config::test_default();
    let db = test_db_offline();
    let auth = AuthService::new(config.jwt_signing_key.clone(), config.bcrypt_cost);

    let state = Arc::new(AppState { config, db, auth });

    (create_router(state.clone()), state)
}

/// Mint an access token for an arbitrary user id, the way login does.
#[allow(dead_code)]
pub fn create_test_jwt(state: &AppState, user_id: &str) -> String {
    let mut user = workon_api::models::User::new(
        "testuser".to_string(),
        "test@example.com".to_string(),
        String::new(),
    );
    user.id = user_id.to_string();

    state
        .auth
        .issue_access_token(&user)
        .expect("Failed to create JWT")
}
