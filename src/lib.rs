// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! WorkOn: workout plans, exercise library, and training history API.
//!
//! This crate provides the backend API over the Firestore document
//! collections that hold the exercise library, standalone plans, and user
//! documents with their embedded collections.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use db::FirestoreDb;
use services::AuthService;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: FirestoreDb,
    pub auth: AuthService,
}
