use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::data::text_enum;
use crate::internal_error::{InternalError, InternalResult};
use crate::validation::{trim, Validate, Violations};

pub type HealthEntryID = i64;

/// One day, in minutes.
pub const MAX_DURATION: i64 = 1440;
pub const MAX_CALORIES: i64 = 20_000;

text_enum!(HealthType {
    Workout => "workout",
    Diet => "diet",
    Weight => "weight",
    Water => "water",
});

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthEntry {
    pub id: HealthEntryID,
    #[serde(rename = "type")]
    pub kind: HealthType,
    pub title: String,
    pub description: String,
    pub date: NaiveDate,
    /// Minutes.
    pub duration: Option<i64>,
    pub calories: Option<i64>,
    /// Kilograms.
    pub weight: Option<f64>,
    /// Litres.
    pub water: Option<f64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HealthEntryInput {
    #[serde(rename = "type")]
    pub kind: HealthType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Today when omitted.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub calories: Option<i64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub water: Option<f64>,
}

impl Validate for HealthEntryInput {
    fn validate(&mut self) -> InternalResult<()> {
        trim(&mut self.title);
        trim(&mut self.description);

        let mut violations = Violations::new();
        violations.length("title", &self.title, 1, 200);
        violations.length("description", &self.description, 0, 1000);
        violations.optional_range("duration", self.duration.map(|d| d as f64), 0.0, MAX_DURATION as f64);
        violations.optional_range("calories", self.calories.map(|c| c as f64), 0.0, MAX_CALORIES as f64);
        violations.optional_range("weight", self.weight, 0.0, 500.0);
        violations.optional_range("water", self.water, 0.0, 20.0);

        match self.kind {
            HealthType::Weight => {
                violations.require("weight", &self.weight, "weight is required for weight entries")
            }
            HealthType::Water => {
                violations.require("water", &self.water, "water is required for water entries")
            }
            HealthType::Workout | HealthType::Diet => {}
        }

        violations.finish()
    }
}

pub fn health_entry_not_found() -> InternalError {
    InternalError::NotFound {
        entity: "Health entry",
        code: "HEALTH_ENTRY_NOT_FOUND",
    }
}

impl HealthEntry {
    /// An entry that has not been stored yet (`id` is 0).
    pub fn new(input: HealthEntryInput, now: DateTime<Utc>) -> HealthEntry {
        HealthEntry {
            id: 0,
            kind: input.kind,
            title: input.title,
            description: input.description,
            date: input.date.unwrap_or_else(|| now.date_naive()),
            duration: input.duration,
            calories: input.calories,
            weight: input.weight,
            water: input.water,
            created_at: now,
        }
    }

    /// Full replace; identity and creation time survive.
    pub fn replace(&mut self, input: HealthEntryInput, now: DateTime<Utc>) {
        let replacement = HealthEntry::new(input, now);
        *self = HealthEntry {
            id: self.id,
            created_at: self.created_at,
            ..replacement
        };
    }
}
