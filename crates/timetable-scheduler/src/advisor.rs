use timetable_core::{Day, ScopeId, Slot, TeacherId};

use crate::types::{Subject, Teacher, TimetableEntry};

/// Suggest a teacher for `subject`: the first one in roster order whose
/// specialization contains the subject name, ignoring case.
///
/// Only a pre-fill hint. The suggested teacher can still be rejected by the
/// conflict check when the store is asked to book them. The name is matched
/// as given, so an empty name matches the first teacher on the roster.
pub fn suggest_teacher(subject: &Subject, roster: &[Teacher]) -> Option<TeacherId> {
    let needle = subject.name.to_lowercase();
    roster
        .iter()
        .find(|t| specializes_in(t, &needle))
        .map(|t| t.id.clone())
}

/// Like [`suggest_teacher`], but skips teachers already booked in the
/// (`scope`, `day`, `slot`) cell of `entries`. Bookings of other scopes are
/// ignored.
pub fn suggest_available_teacher(
    subject: &Subject,
    roster: &[Teacher],
    scope: &ScopeId,
    day: Day,
    slot: &Slot,
    entries: &[TimetableEntry],
) -> Option<TeacherId> {
    let needle = subject.name.to_lowercase();
    roster
        .iter()
        .filter(|t| specializes_in(t, &needle))
        .find(|t| {
            !entries.iter().any(|e| {
                e.scope_id == *scope && e.day == day && e.slot == *slot && e.teacher_id == t.id
            })
        })
        .map(|t| t.id.clone())
}

fn specializes_in(teacher: &Teacher, needle: &str) -> bool {
    teacher.specialization.to_lowercase().contains(needle)
}
