//! `timetable-scheduler`: conflict-checked timetable booking.
//!
//! # Overview
//!
//! A [`ScheduleStore`] owns one school's entries. Each create or update is
//! checked by [`find_conflicts`] against the store's snapshot, then committed
//! through an [`EntryRepository`]. [`SqliteRepository`] backs the same rules
//! with unique indexes, so a write that slips past a stale snapshot is still
//! rejected and reported as the same [`ConflictError`].
//!
//! # Booking rules
//!
//! Within one scope, day and slot:
//!
//! | Dimension | Rule                                         |
//! |-----------|----------------------------------------------|
//! | Teacher   | a teacher teaches at most one class          |
//! | Class     | a class has at most one period               |
//! | Room      | a named room hosts at most one class         |
//!
//! Entries without a room never collide on the room dimension.
//!
//! [`suggest_teacher`] pre-fills a teacher from the roster; the store never
//! consults it.

pub mod advisor;
pub mod conflict;
pub mod db;
pub mod error;
pub mod repository;
pub mod store;
pub mod types;

pub use advisor::{suggest_available_teacher, suggest_teacher};
pub use conflict::find_conflicts;
pub use error::{ConflictError, PersistenceError, Result, ScheduleError};
pub use repository::{EntryRepository, SqliteRepository};
pub use store::ScheduleStore;
pub use types::{
    ConflictReport, Dimension, EntryDraft, EntryFilter, EntryPatch, RoomPatch, Subject, Teacher,
    TimetableEntry,
};
