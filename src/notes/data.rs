use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::internal_error::{InternalError, InternalResult};
use crate::validation::{trim, Validate, Violations};

pub type NoteID = i64;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteID,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct NoteInput {
    pub text: String,
    pub completed: bool,
}

impl Validate for NoteInput {
    fn validate(&mut self) -> InternalResult<()> {
        trim(&mut self.text);

        let mut violations = Violations::new();
        violations.length("text", &self.text, 1, 2000);
        violations.finish()
    }
}

pub fn note_not_found() -> InternalError {
    InternalError::NotFound {
        entity: "Note",
        code: "NOTE_NOT_FOUND",
    }
}

impl Note {
    pub fn new(input: NoteInput, now: DateTime<Utc>) -> Note {
        Note {
            id: 0,
            text: input.text,
            completed: input.completed,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn replace(&mut self, input: NoteInput, now: DateTime<Utc>) {
        self.text = input.text;
        self.completed = input.completed;
        self.updated_at = now;
    }

    pub fn toggle(&mut self, now: DateTime<Utc>) {
        self.completed = !self.completed;
        self.updated_at = now;
    }
}
