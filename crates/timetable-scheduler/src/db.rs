use rusqlite::Connection;

use crate::error::PersistenceError;

/// Initialise the timetable schema in `conn`.
///
/// The three unique indexes are the authoritative form of the booking rules:
/// within one school, day and slot, a teacher, a class and a named room may
/// each appear at most once. The in-memory conflict check only gives earlier,
/// friendlier feedback; these indexes hold even when two writers race.
pub fn init_db(conn: &Connection) -> Result<(), PersistenceError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS timetable_entries (
            id          TEXT    NOT NULL PRIMARY KEY,
            scope_id    TEXT    NOT NULL,
            day         TEXT    NOT NULL,
            slot        TEXT    NOT NULL,
            class_id    TEXT    NOT NULL,
            subject_id  TEXT    NOT NULL,
            teacher_id  TEXT    NOT NULL,
            room        TEXT,               -- NULL means unspecified
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL,
            CHECK (room IS NULL OR room <> '')
        ) STRICT;

        CREATE UNIQUE INDEX IF NOT EXISTS uq_entries_teacher_cell
            ON timetable_entries (scope_id, day, slot, teacher_id);

        CREATE UNIQUE INDEX IF NOT EXISTS uq_entries_class_cell
            ON timetable_entries (scope_id, day, slot, class_id);

        -- Unspecified rooms are not a booked resource.
        CREATE UNIQUE INDEX IF NOT EXISTS uq_entries_room_cell
            ON timetable_entries (scope_id, day, slot, room)
            WHERE room IS NOT NULL;
        ",
    )?;
    Ok(())
}
