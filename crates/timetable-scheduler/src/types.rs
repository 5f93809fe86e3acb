use serde::{Deserialize, Serialize};
use std::fmt;

use timetable_core::{ClassId, Day, EntryId, Room, ScopeId, Slot, SubjectId, TeacherId};

/// A persisted timetable entry: one class, subject and teacher (and optionally
/// a room) assigned to one (day, slot) cell of a school's week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEntry {
    /// UUIDv7 assigned on creation; never changes afterwards.
    pub id: EntryId,
    pub scope_id: ScopeId,
    pub day: Day,
    pub slot: Slot,
    pub class_id: ClassId,
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
    /// `None` means unspecified; unspecified rooms never conflict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
}

impl TimetableEntry {
    /// The entry's fields without its id, e.g. to re-check it as a candidate.
    pub fn draft(&self) -> EntryDraft {
        EntryDraft {
            scope_id: self.scope_id.clone(),
            day: self.day,
            slot: self.slot.clone(),
            class_id: self.class_id.clone(),
            subject_id: self.subject_id.clone(),
            teacher_id: self.teacher_id.clone(),
            room: self.room.clone(),
        }
    }

    /// True when `self` occupies the same scope, day and slot as `draft`.
    pub fn same_cell(&self, draft: &EntryDraft) -> bool {
        self.scope_id == draft.scope_id && self.day == draft.day && self.slot == draft.slot
    }
}

/// A candidate entry that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    pub scope_id: ScopeId,
    pub day: Day,
    pub slot: Slot,
    pub class_id: ClassId,
    pub subject_id: SubjectId,
    pub teacher_id: TeacherId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<Room>,
}

impl EntryDraft {
    pub fn new(
        scope_id: impl Into<ScopeId>,
        day: Day,
        slot: impl Into<Slot>,
        class_id: impl Into<ClassId>,
        subject_id: impl Into<SubjectId>,
        teacher_id: impl Into<TeacherId>,
    ) -> Self {
        Self {
            scope_id: scope_id.into(),
            day,
            slot: slot.into(),
            class_id: class_id.into(),
            subject_id: subject_id.into(),
            teacher_id: teacher_id.into(),
            room: None,
        }
    }

    /// Set the room. A blank label leaves the room unspecified.
    pub fn with_room(mut self, room: &str) -> Self {
        self.room = Room::new(room);
        self
    }

    pub fn into_entry(self, id: EntryId) -> TimetableEntry {
        TimetableEntry {
            id,
            scope_id: self.scope_id,
            day: self.day,
            slot: self.slot,
            class_id: self.class_id,
            subject_id: self.subject_id,
            teacher_id: self.teacher_id,
            room: self.room,
        }
    }
}

/// What to do with an entry's room during an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "room", rename_all = "snake_case")]
pub enum RoomPatch {
    #[default]
    Keep,
    Set(Room),
    Clear,
}

/// Field-wise replacement for an existing entry. `None` keeps the current value.
///
/// The id and scope of an entry cannot be patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(default)]
    pub day: Option<Day>,
    #[serde(default)]
    pub slot: Option<Slot>,
    #[serde(default)]
    pub class_id: Option<ClassId>,
    #[serde(default)]
    pub subject_id: Option<SubjectId>,
    #[serde(default)]
    pub teacher_id: Option<TeacherId>,
    #[serde(default)]
    pub room: RoomPatch,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        *self == EntryPatch::default()
    }

    /// Merge the patch over `entry`, producing the candidate to re-check.
    pub fn apply(&self, entry: &TimetableEntry) -> EntryDraft {
        let mut draft = entry.draft();
        if let Some(day) = self.day {
            draft.day = day;
        }
        if let Some(ref slot) = self.slot {
            draft.slot = slot.clone();
        }
        if let Some(ref class_id) = self.class_id {
            draft.class_id = class_id.clone();
        }
        if let Some(ref subject_id) = self.subject_id {
            draft.subject_id = subject_id.clone();
        }
        if let Some(ref teacher_id) = self.teacher_id {
            draft.teacher_id = teacher_id.clone();
        }
        match self.room {
            RoomPatch::Keep => {}
            RoomPatch::Set(ref room) => draft.room = Some(room.clone()),
            RoomPatch::Clear => draft.room = None,
        }
        draft
    }
}

/// Read-side narrowing for [`crate::ScheduleStore::list_entries`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFilter {
    pub teacher_id: Option<TeacherId>,
    pub class_id: Option<ClassId>,
    pub day: Option<Day>,
}

impl EntryFilter {
    pub fn teacher(teacher_id: impl Into<TeacherId>) -> Self {
        Self {
            teacher_id: Some(teacher_id.into()),
            ..Self::default()
        }
    }

    pub fn class(class_id: impl Into<ClassId>) -> Self {
        Self {
            class_id: Some(class_id.into()),
            ..Self::default()
        }
    }

    pub fn matches(&self, entry: &TimetableEntry) -> bool {
        self.teacher_id.as_ref().map_or(true, |t| *t == entry.teacher_id)
            && self.class_id.as_ref().map_or(true, |c| *c == entry.class_id)
            && self.day.map_or(true, |d| d == entry.day)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    /// Free text such as "Physics and Chemistry"; only the advisor reads it.
    #[serde(default)]
    pub specialization: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
}

/// Axis along which two entries in the same cell may collide.
///
/// Declaration order is the order reports are emitted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Teacher,
    Class,
    Room,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Teacher => write!(f, "teacher"),
            Dimension::Class => write!(f, "class"),
            Dimension::Room => write!(f, "room"),
        }
    }
}

/// One reason a candidate was rejected, naming the entry it collides with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub dimension: Dimension,
    pub conflicting_entry_id: EntryId,
    pub message: String,
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}
