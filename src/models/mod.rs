// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Data models for the application.

pub mod exercise;
pub mod plan;
pub mod user;

pub use exercise::Exercise;
pub use plan::{Plan, PlanViolation, PublicType};
pub use user::{
    HistoryItem, RecordItem, SearchHistoryItem, User, UserSearchResult, UserSummary,
    VisibilityUpdate,
};
