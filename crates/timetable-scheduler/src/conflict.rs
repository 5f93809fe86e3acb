use timetable_core::EntryId;

use crate::types::{ConflictReport, Dimension, EntryDraft, TimetableEntry};

/// Report every way `candidate` collides with `existing`.
///
/// Entries in another scope, day or slot are ignored, as is the entry whose id
/// equals `exclude` (the pre-edit record when checking an update). Reports come
/// grouped by dimension (teacher, then class, then room) and, within each
/// group, in the order of `existing`. A room comparison only happens when both
/// sides name a room.
///
/// Pure: the same inputs always produce the same reports in the same order.
pub fn find_conflicts(
    candidate: &EntryDraft,
    existing: &[TimetableEntry],
    exclude: Option<&EntryId>,
) -> Vec<ConflictReport> {
    let same_cell: Vec<&TimetableEntry> = existing
        .iter()
        .filter(|e| exclude != Some(&e.id))
        .filter(|e| e.same_cell(candidate))
        .collect();

    let mut reports = Vec::new();

    for e in same_cell.iter().filter(|e| e.teacher_id == candidate.teacher_id) {
        reports.push(report(
            Dimension::Teacher,
            e,
            format!(
                "teacher {} is already scheduled on {} {} (class {})",
                e.teacher_id, e.day, e.slot, e.class_id
            ),
        ));
    }

    for e in same_cell.iter().filter(|e| e.class_id == candidate.class_id) {
        reports.push(report(
            Dimension::Class,
            e,
            format!(
                "class {} already has a period on {} {} (subject {})",
                e.class_id, e.day, e.slot, e.subject_id
            ),
        ));
    }

    if let Some(ref room) = candidate.room {
        for e in same_cell.iter().filter(|e| e.room.as_ref() == Some(room)) {
            reports.push(report(
                Dimension::Room,
                e,
                format!(
                    "room {} is already booked on {} {} (class {})",
                    room, e.day, e.slot, e.class_id
                ),
            ));
        }
    }

    reports
}

fn report(dimension: Dimension, entry: &TimetableEntry, message: String) -> ConflictReport {
    ConflictReport {
        dimension,
        conflicting_entry_id: entry.id.clone(),
        message,
    }
}
