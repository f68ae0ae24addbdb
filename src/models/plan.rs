// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout plan model and structural validation.
//!
//! Plans arrive as raw JSON and are validated with [`validate`] before any
//! store write. Validation walks the untyped document because most of its
//! checks are *type* checks whose exact violation messages are part of the API
//! contract; typed deserialization would collapse them into one serde error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Freeform fields a client may attach beyond the validated schema.
pub type ExtraFields = serde_json::Map<String, Value>;

/// Tri-state visibility classification for plans and history items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicType {
    Public,
    Restricted,
    Private,
}

impl Default for PublicType {
    fn default() -> Self {
        PublicType::Private
    }
}

/// A workout plan, either a standalone document in the plans collection or
/// embedded in a user's `plans` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    /// Server-assigned id; empty until assigned.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    pub name: String,
    pub public_type: PublicType,
    /// Users allowed to view a restricted plan.
    pub allowed_users: Vec<Value>,
    /// Owning user (set on standalone plan creation).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    pub days: Vec<Day>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// One training day within a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Day {
    pub id: String,
    pub name: String,
    pub exercises: Vec<PlanExercise>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// An exercise scheduled in a day, with its target rep range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanExercise {
    pub id: String,
    pub load_increase: f64,
    /// `[min, max]` with `min <= max`.
    pub reps_range: [f64; 2],
    pub series: Vec<Series>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

/// A single set: reps must fall inside the owning exercise's rep range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    pub reps: f64,
    pub weight: f64,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

const PUBLIC_TYPES: [&str; 3] = ["public", "restricted", "private"];

/// A structural or range violation found in a plan document.
///
/// Display strings are API contract; clients match on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlanViolation {
    #[error("Unexpected name type")]
    Name,
    #[error("Unexpected public type")]
    PublicType,
    #[error("Unexpected allowed users")]
    AllowedUsers,
    #[error("Unexpected days type")]
    Days,
    #[error("Unexpected day id type")]
    DayId,
    #[error("Unexpected day name type")]
    DayName,
    #[error("Unexpected exercises type")]
    Exercises,
    #[error("Unexpected exercise id type")]
    ExerciseId,
    #[error("Unexpected load increase type")]
    LoadIncrease,
    #[error("Unexpected reps range type")]
    RepsRange,
    #[error("Max reps range is lower than min reps range")]
    RepsRangeOrder,
    #[error("Unexpected series type")]
    SeriesList,
    #[error("Unexpected series reps type")]
    SeriesReps,
    #[error("Reps are lower than min reps range")]
    RepsBelowRange,
    #[error("Reps are higher than max reps range")]
    RepsAboveRange,
    #[error("Unexpected series weight type")]
    SeriesWeight,
}

/// Validate a plan document's structure and numeric invariants.
///
/// Checks run in a fixed order and the first violation wins; there is no
/// aggregation. Pure: no side effects, no store access.
pub fn validate(plan: &Value) -> Result<(), PlanViolation> {
    if !plan.get("name").is_some_and(Value::is_string) {
        return Err(PlanViolation::Name);
    }

    let public_type = plan.get("publicType").and_then(Value::as_str);
    if !public_type.is_some_and(|t| PUBLIC_TYPES.contains(&t)) {
        return Err(PlanViolation::PublicType);
    }

    if !plan.get("allowedUsers").is_some_and(Value::is_array) {
        return Err(PlanViolation::AllowedUsers);
    }

    let days = plan
        .get("days")
        .and_then(Value::as_array)
        .ok_or(PlanViolation::Days)?;

    for day in days {
        if !day.get("id").is_some_and(Value::is_string) {
            return Err(PlanViolation::DayId);
        }
        if !day.get("name").is_some_and(Value::is_string) {
            return Err(PlanViolation::DayName);
        }

        let exercises = day
            .get("exercises")
            .and_then(Value::as_array)
            .ok_or(PlanViolation::Exercises)?;

        for exercise in exercises {
            validate_exercise(exercise)?;
        }
    }

    Ok(())
}

fn validate_exercise(exercise: &Value) -> Result<(), PlanViolation> {
    if !exercise.get("id").is_some_and(Value::is_string) {
        return Err(PlanViolation::ExerciseId);
    }
    if !exercise.get("loadIncrease").is_some_and(Value::is_number) {
        return Err(PlanViolation::LoadIncrease);
    }

    let reps_range = exercise
        .get("repsRange")
        .and_then(Value::as_array)
        .ok_or(PlanViolation::RepsRange)?;
    if reps_range.len() != 2 {
        return Err(PlanViolation::RepsRange);
    }
    let min = reps_range[0].as_f64().ok_or(PlanViolation::RepsRange)?;
    let max = reps_range[1].as_f64().ok_or(PlanViolation::RepsRange)?;
    if min > max {
        return Err(PlanViolation::RepsRangeOrder);
    }

    let series = exercise
        .get("series")
        .and_then(Value::as_array)
        .ok_or(PlanViolation::SeriesList)?;

    for entry in series {
        let reps = entry
            .get("reps")
            .and_then(Value::as_f64)
            .ok_or(PlanViolation::SeriesReps)?;
        if reps < min {
            return Err(PlanViolation::RepsBelowRange);
        }
        if reps > max {
            return Err(PlanViolation::RepsAboveRange);
        }
        if !entry.get("weight").is_some_and(Value::is_number) {
            return Err(PlanViolation::SeriesWeight);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leg_day() -> Value {
        json!({
            "name": "Leg Day",
            "publicType": "public",
            "allowedUsers": [],
            "days": [{
                "id": "d1",
                "name": "Day1",
                "exercises": [{
                    "id": "e1",
                    "loadIncrease": 2.5,
                    "repsRange": [8, 12],
                    "series": [{"reps": 10, "weight": 60}]
                }]
            }]
        })
    }

    #[test]
    fn test_valid_plan_passes() {
        assert_eq!(validate(&leg_day()), Ok(()));
    }

    #[test]
    fn test_empty_days_is_valid() {
        let mut plan = leg_day();
        plan["days"] = json!([]);
        assert_eq!(validate(&plan), Ok(()));
    }

    #[test]
    fn test_reps_above_range() {
        let mut plan = leg_day();
        plan["days"][0]["exercises"][0]["series"][0]["reps"] = json!(15);
        let err = validate(&plan).unwrap_err();
        assert_eq!(err, PlanViolation::RepsAboveRange);
        assert_eq!(err.to_string(), "Reps are higher than max reps range");
    }

    #[test]
    fn test_reps_below_range() {
        let mut plan = leg_day();
        plan["days"][0]["exercises"][0]["series"][0]["reps"] = json!(5);
        assert_eq!(validate(&plan), Err(PlanViolation::RepsBelowRange));
    }

    #[test]
    fn test_reps_at_bounds_pass() {
        let mut plan = leg_day();
        plan["days"][0]["exercises"][0]["series"] =
            json!([{"reps": 8, "weight": 60}, {"reps": 12, "weight": 80}]);
        assert_eq!(validate(&plan), Ok(()));
    }

    #[test]
    fn test_inverted_reps_range() {
        let mut plan = leg_day();
        plan["days"][0]["exercises"][0]["repsRange"] = json!([12, 8]);
        let err = validate(&plan).unwrap_err();
        assert_eq!(err.to_string(), "Max reps range is lower than min reps range");
    }

    #[test]
    fn test_name_must_be_string() {
        let mut plan = leg_day();
        plan["name"] = json!(42);
        assert_eq!(
            validate(&plan).unwrap_err().to_string(),
            "Unexpected name type"
        );
    }

    #[test]
    fn test_missing_name_rejected() {
        let mut plan = leg_day();
        plan.as_object_mut().unwrap().remove("name");
        assert_eq!(validate(&plan), Err(PlanViolation::Name));
    }

    #[test]
    fn test_unknown_public_type() {
        let mut plan = leg_day();
        plan["publicType"] = json!("friends-only");
        assert_eq!(
            validate(&plan).unwrap_err().to_string(),
            "Unexpected public type"
        );
    }

    #[test]
    fn test_allowed_users_must_be_array() {
        let mut plan = leg_day();
        plan["allowedUsers"] = json!("everyone");
        assert_eq!(validate(&plan), Err(PlanViolation::AllowedUsers));
    }

    #[test]
    fn test_days_must_be_array() {
        let mut plan = leg_day();
        plan["days"] = json!({});
        assert_eq!(
            validate(&plan).unwrap_err().to_string(),
            "Unexpected days type"
        );
    }

    #[test]
    fn test_day_field_types() {
        let mut plan = leg_day();
        plan["days"][0]["id"] = json!(1);
        assert_eq!(validate(&plan), Err(PlanViolation::DayId));

        let mut plan = leg_day();
        plan["days"][0]["name"] = json!(null);
        assert_eq!(validate(&plan), Err(PlanViolation::DayName));

        let mut plan = leg_day();
        plan["days"][0]["exercises"] = json!("none");
        assert_eq!(validate(&plan), Err(PlanViolation::Exercises));
    }

    #[test]
    fn test_exercise_field_types() {
        let mut plan = leg_day();
        plan["days"][0]["exercises"][0]["loadIncrease"] = json!("2.5");
        assert_eq!(validate(&plan), Err(PlanViolation::LoadIncrease));

        let mut plan = leg_day();
        plan["days"][0]["exercises"][0]["repsRange"] = json!([8]);
        assert_eq!(validate(&plan), Err(PlanViolation::RepsRange));

        let mut plan = leg_day();
        plan["days"][0]["exercises"][0]["repsRange"] = json!(["8", "12"]);
        assert_eq!(validate(&plan), Err(PlanViolation::RepsRange));

        let mut plan = leg_day();
        plan["days"][0]["exercises"][0]["series"] = json!(null);
        assert_eq!(validate(&plan), Err(PlanViolation::SeriesList));
    }

    #[test]
    fn test_series_field_types() {
        let mut plan = leg_day();
        plan["days"][0]["exercises"][0]["series"][0]["reps"] = json!("10");
        assert_eq!(validate(&plan), Err(PlanViolation::SeriesReps));

        let mut plan = leg_day();
        plan["days"][0]["exercises"][0]["series"][0]["weight"] = json!("60kg");
        assert_eq!(validate(&plan), Err(PlanViolation::SeriesWeight));
    }

    #[test]
    fn test_first_violation_wins() {
        // Both name and days are broken; the name check runs first.
        let plan = json!({
            "name": 7,
            "publicType": "nope",
            "allowedUsers": "x",
            "days": "y"
        });
        assert_eq!(validate(&plan), Err(PlanViolation::Name));
    }

    #[test]
    fn test_validated_plan_deserializes() {
        let mut raw = leg_day();
        raw["id"] = json!("p1");
        raw["authorId"] = json!("u1");
        validate(&raw).unwrap();

        let plan: Plan = serde_json::from_value(raw).unwrap();
        assert_eq!(plan.id, "p1");
        assert_eq!(plan.public_type, PublicType::Public);
        assert_eq!(plan.days[0].exercises[0].reps_range, [8.0, 12.0]);
        assert_eq!(plan.days[0].exercises[0].series[0].weight, 60.0);
    }

    #[test]
    fn test_extra_fields_survive_round_trip() {
        let mut raw = leg_day();
        raw["id"] = json!("p1");
        raw["description"] = json!("quads focus");
        validate(&raw).unwrap();

        let plan: Plan = serde_json::from_value(raw).unwrap();
        let back = serde_json::to_value(&plan).unwrap();
        assert_eq!(back["description"], json!("quads focus"));
    }
}
