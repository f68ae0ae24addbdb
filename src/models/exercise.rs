// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exercise library model.

use serde::{Deserialize, Serialize};

use crate::models::plan::ExtraFields;

/// One exercise in the shared library collection.
///
/// Clients cache the library and poll by `version`; beyond id/name/version the
/// document shape is owned by the library curators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    /// Server-assigned id; empty until assigned.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    /// Library version this entry belongs to.
    #[serde(default)]
    pub version: String,
    #[serde(flatten)]
    pub extra: ExtraFields,
}
