//! `timetable-core`: shared ids, slot catalog and config for the timetable workspace.
//!
//! Holds the pieces every other crate agrees on: opaque identifiers, the
//! weekly [`types::Day`] enumeration, the [`catalog::SlotCatalog`] of
//! teaching periods, configuration loading, and the core error type.

pub mod catalog;
pub mod config;
pub mod error;
pub mod types;

pub use catalog::{SlotCatalog, SlotDefinition};
pub use config::TimetableConfig;
pub use error::{CoreError, Result};
pub use types::{ClassId, Day, EntryId, Room, ScopeId, Slot, SubjectId, TeacherId};
