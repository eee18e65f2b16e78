use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::data::Note;

#[derive(Serialize, Debug, Default, Clone, Copy, PartialEq)]
pub struct NoteStats {
    pub total: usize,
    pub completed: usize,
    pub recent: usize,
}

/// Whether the note was created within the last seven days.
pub fn is_recent(note: &Note, now: DateTime<Utc>) -> bool {
    note.created_at >= now - Duration::days(7)
}

pub fn note_stats(notes: &[Note], now: DateTime<Utc>) -> NoteStats {
    NoteStats {
        total: notes.len(),
        completed: notes.iter().filter(|note| note.completed).count(),
        recent: notes.iter().filter(|note| is_recent(note, now)).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_completed_and_recent_notes() {
        let now = Utc::now();
        let note = |id, completed, age_days| Note {
            id,
            text: String::from("note"),
            completed,
            created_at: now - Duration::days(age_days),
            updated_at: now,
        };
        let notes = vec![note(1, true, 0), note(2, false, 6), note(3, true, 8)];

        assert_eq!(
            note_stats(&notes, now),
            NoteStats {
                total: 3,
                completed: 2,
                recent: 2
            }
        );
        assert_eq!(note_stats(&[], now), NoteStats::default());
    }
}
