use std::str::FromStr;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::Connection;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use timetable_core::{Day, EntryId, Room, ScopeId, Slot};

use crate::{
    conflict::find_conflicts,
    db::init_db,
    error::PersistenceError,
    types::TimetableEntry,
};

type Result<T> = std::result::Result<T, PersistenceError>;

/// The persistence boundary behind a [`crate::ScheduleStore`].
///
/// Implementations are the source of truth across sessions. They must enforce
/// the booking rules themselves and answer a rejected write with
/// [`PersistenceError::Conflict`] carrying the rows it collided with, so that
/// callers see the same conflict shape whichever layer caught it.
pub trait EntryRepository: Send + Sync {
    /// Every entry of `scope`, in a stable order.
    fn load_scope(&self, scope: &ScopeId) -> Result<Vec<TimetableEntry>>;

    fn insert(&self, entry: &TimetableEntry) -> Result<()>;

    /// Replace the stored row with the same id. `NotFound` if it is gone.
    fn update(&self, entry: &TimetableEntry) -> Result<()>;

    fn delete(&self, scope: &ScopeId, id: &EntryId) -> Result<()>;

    /// Revision counter bumped after every committed write, if the backend
    /// can report changes made by other writers.
    fn subscribe(&self) -> Option<watch::Receiver<u64>> {
        None
    }
}

impl<R: EntryRepository + ?Sized> EntryRepository for Arc<R> {
    fn load_scope(&self, scope: &ScopeId) -> Result<Vec<TimetableEntry>> {
        (**self).load_scope(scope)
    }

    fn insert(&self, entry: &TimetableEntry) -> Result<()> {
        (**self).insert(entry)
    }

    fn update(&self, entry: &TimetableEntry) -> Result<()> {
        (**self).update(entry)
    }

    fn delete(&self, scope: &ScopeId, id: &EntryId) -> Result<()> {
        (**self).delete(scope, id)
    }

    fn subscribe(&self) -> Option<watch::Receiver<u64>> {
        (**self).subscribe()
    }
}

/// SQLite-backed repository.
///
/// Share one instance (behind an `Arc`) between every store that writes the
/// same database so they all observe each other's change notifications.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
    changes: watch::Sender<u64>,
}

impl SqliteRepository {
    /// Wrap `conn`, creating the schema if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        let (changes, _) = watch::channel(0);
        Ok(Self {
            conn: Mutex::new(conn),
            changes,
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    /// Number of writes committed through this repository.
    pub fn revision(&self) -> u64 {
        *self.changes.borrow()
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("timetable db mutex poisoned")
    }

    fn bump(&self) {
        self.changes.send_modify(|rev| *rev += 1);
    }
}

impl EntryRepository for SqliteRepository {
    fn load_scope(&self, scope: &ScopeId) -> Result<Vec<TimetableEntry>> {
        let conn = self.conn();
        select_scope(&conn, scope)
    }

    fn insert(&self, entry: &TimetableEntry) -> Result<()> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let res = conn.execute(
            "INSERT INTO timetable_entries
             (id, scope_id, day, slot, class_id, subject_id, teacher_id, room,
              created_at, updated_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?9)",
            rusqlite::params![
                entry.id.as_str(),
                entry.scope_id.as_str(),
                entry.day.as_str(),
                entry.slot.as_str(),
                entry.class_id.as_str(),
                entry.subject_id.as_str(),
                entry.teacher_id.as_str(),
                entry.room.as_ref().map(|r| r.as_str()),
                now,
            ],
        );
        if let Err(e) = res {
            return Err(translate_write_error(&conn, entry, e));
        }
        drop(conn);

        info!(entry_id = %entry.id, scope = %entry.scope_id, "entry stored");
        self.bump();
        Ok(())
    }

    fn update(&self, entry: &TimetableEntry) -> Result<()> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let res = conn.execute(
            "UPDATE timetable_entries
             SET day=?3, slot=?4, class_id=?5, subject_id=?6, teacher_id=?7,
                 room=?8, updated_at=?9
             WHERE id=?1 AND scope_id=?2",
            rusqlite::params![
                entry.id.as_str(),
                entry.scope_id.as_str(),
                entry.day.as_str(),
                entry.slot.as_str(),
                entry.class_id.as_str(),
                entry.subject_id.as_str(),
                entry.teacher_id.as_str(),
                entry.room.as_ref().map(|r| r.as_str()),
                now,
            ],
        );
        match res {
            Ok(0) => {
                return Err(PersistenceError::NotFound {
                    id: entry.id.to_string(),
                })
            }
            Ok(_) => {}
            Err(e) => return Err(translate_write_error(&conn, entry, e)),
        }
        drop(conn);

        info!(entry_id = %entry.id, scope = %entry.scope_id, "entry updated");
        self.bump();
        Ok(())
    }

    fn delete(&self, scope: &ScopeId, id: &EntryId) -> Result<()> {
        let conn = self.conn();
        let n = conn.execute(
            "DELETE FROM timetable_entries WHERE id = ?1 AND scope_id = ?2",
            [id.as_str(), scope.as_str()],
        )?;
        if n == 0 {
            return Err(PersistenceError::NotFound { id: id.to_string() });
        }
        drop(conn);

        info!(entry_id = %id, %scope, "entry deleted");
        self.bump();
        Ok(())
    }

    fn subscribe(&self) -> Option<watch::Receiver<u64>> {
        Some(self.changes.subscribe())
    }
}

fn select_scope(conn: &Connection, scope: &ScopeId) -> Result<Vec<TimetableEntry>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, scope_id, day, slot, class_id, subject_id, teacher_id, room
         FROM timetable_entries
         WHERE scope_id = ?1
         ORDER BY rowid",
    )?;
    let rows = stmt
        .query_map([scope.as_str()], |row| {
            Ok(RawEntry {
                id: row.get(0)?,
                scope_id: row.get(1)?,
                day: row.get(2)?,
                slot: row.get(3)?,
                class_id: row.get(4)?,
                subject_id: row.get(5)?,
                teacher_id: row.get(6)?,
                room: row.get(7)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let entries = rows
        .into_iter()
        .map(RawEntry::into_entry)
        .collect::<Result<Vec<_>>>()?;
    debug!(%scope, count = entries.len(), "scope loaded");
    Ok(entries)
}

/// Turn a unique-index rejection into the reports it stands for.
///
/// Runs under the same connection lock as the failed write, so the rows that
/// caused the rejection are still there to be named.
fn translate_write_error(
    conn: &Connection,
    entry: &TimetableEntry,
    err: rusqlite::Error,
) -> PersistenceError {
    if !is_unique_violation(&err) {
        return PersistenceError::Database(err);
    }

    let rows = match select_scope(conn, &entry.scope_id) {
        Ok(rows) => rows,
        Err(e) => return e,
    };
    let reports = find_conflicts(&entry.draft(), &rows, Some(&entry.id));
    if reports.is_empty() {
        // Another process changed the table between the write and the read.
        warn!(entry_id = %entry.id, "unique violation with no identifiable collision: {err}");
        return PersistenceError::Database(err);
    }

    warn!(
        entry_id = %entry.id,
        conflicts = reports.len(),
        "write rejected by unique index"
    );
    PersistenceError::Conflict(reports)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Columns exactly as stored, before typing.
struct RawEntry {
    id: String,
    scope_id: String,
    day: String,
    slot: String,
    class_id: String,
    subject_id: String,
    teacher_id: String,
    room: Option<String>,
}

impl RawEntry {
    fn into_entry(self) -> Result<TimetableEntry> {
        let day = Day::from_str(&self.day)
            .map_err(|e| PersistenceError::Corrupt(format!("entry {}: {e}", self.id)))?;
        Ok(TimetableEntry {
            id: EntryId::from(self.id),
            scope_id: ScopeId::from(self.scope_id),
            day,
            slot: Slot::new(self.slot),
            class_id: self.class_id.into(),
            subject_id: self.subject_id.into(),
            teacher_id: self.teacher_id.into(),
            room: self.room.as_deref().and_then(Room::new),
        })
    }
}
