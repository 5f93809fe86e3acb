use serde::Serialize;
use thiserror::Error;

use crate::types::{ConflictReport, Dimension};

/// A create/update would double-book a teacher, class or room.
///
/// Carries every violated dimension, whether the collision was caught by the
/// in-memory check or by the storage layer's unique indexes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConflictError {
    pub reports: Vec<ConflictReport>,
}

impl ConflictError {
    pub fn new(reports: Vec<ConflictReport>) -> Self {
        Self { reports }
    }

    pub fn dimensions(&self) -> Vec<Dimension> {
        self.reports.iter().map(|r| r.dimension).collect()
    }
}

impl std::fmt::Display for ConflictError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<&str> = self.reports.iter().map(|r| r.message.as_str()).collect();
        write!(f, "scheduling conflict: {}", messages.join("; "))
    }
}

impl std::error::Error for ConflictError {}

/// Failures reported by an [`crate::repository::EntryRepository`].
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A unique index rejected the write. Reports name the rows it collided with.
    #[error("constraint violation: {} conflict(s)", .0.len())]
    Conflict(Vec<ConflictReport>),

    /// No row with the given id exists in the scope.
    #[error("Entry not found: {id}")]
    NotFound { id: String },

    /// A stored row could not be decoded into a typed entry.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

/// Errors returned by [`crate::store::ScheduleStore`] operations.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error("Entry not found: {id}")]
    NotFound { id: String },

    #[error("Day {day} is not in the slot catalog")]
    UnknownDay { day: String },

    #[error("Slot {slot} is not in the slot catalog")]
    UnknownSlot { slot: String },

    /// The candidate belongs to a different school than the store.
    #[error("Entry scope {found} does not match store scope {expected}")]
    ScopeMismatch { expected: String, found: String },

    #[error(transparent)]
    Persistence(PersistenceError),
}

impl ScheduleError {
    /// Short error code string for machine-readable output.
    pub fn code(&self) -> &'static str {
        match self {
            ScheduleError::Conflict(_) => "CONFLICT",
            ScheduleError::NotFound { .. } => "NOT_FOUND",
            ScheduleError::UnknownDay { .. } => "UNKNOWN_DAY",
            ScheduleError::UnknownSlot { .. } => "UNKNOWN_SLOT",
            ScheduleError::ScopeMismatch { .. } => "SCOPE_MISMATCH",
            ScheduleError::Persistence(_) => "PERSISTENCE_ERROR",
        }
    }

    /// The conflict reports, if this is a conflict.
    pub fn conflicts(&self) -> Option<&[ConflictReport]> {
        match self {
            ScheduleError::Conflict(c) => Some(&c.reports),
            _ => None,
        }
    }
}

/// Storage-side conflicts and missing rows surface exactly like local ones.
impl From<PersistenceError> for ScheduleError {
    fn from(e: PersistenceError) -> Self {
        match e {
            PersistenceError::Conflict(reports) => {
                ScheduleError::Conflict(ConflictError::new(reports))
            }
            PersistenceError::NotFound { id } => ScheduleError::NotFound { id },
            other => ScheduleError::Persistence(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScheduleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use timetable_core::EntryId;

    fn report(dimension: Dimension, message: &str) -> ConflictReport {
        ConflictReport {
            dimension,
            conflicting_entry_id: EntryId::from("e1"),
            message: message.to_string(),
        }
    }

    #[test]
    fn conflict_display_lists_every_reason() {
        let err = ConflictError::new(vec![
            report(Dimension::Teacher, "teacher T1 is busy"),
            report(Dimension::Room, "room 101 is booked"),
        ]);
        let text = err.to_string();
        assert!(text.contains("teacher T1 is busy"));
        assert!(text.contains("room 101 is booked"));
        assert_eq!(err.dimensions(), vec![Dimension::Teacher, Dimension::Room]);
    }

    #[test]
    fn storage_conflict_maps_to_conflict() {
        let err: ScheduleError =
            PersistenceError::Conflict(vec![report(Dimension::Class, "class busy")]).into();
        assert_eq!(err.code(), "CONFLICT");
        assert_eq!(err.conflicts().unwrap().len(), 1);
    }

    #[test]
    fn storage_not_found_maps_to_not_found() {
        let err: ScheduleError = PersistenceError::NotFound { id: "x".into() }.into();
        assert_eq!(err.code(), "NOT_FOUND");
        assert!(err.conflicts().is_none());
    }

    #[test]
    fn other_storage_errors_stay_persistence() {
        let err: ScheduleError = PersistenceError::Corrupt("bad day".into()).into();
        assert_eq!(err.code(), "PERSISTENCE_ERROR");
    }
}
