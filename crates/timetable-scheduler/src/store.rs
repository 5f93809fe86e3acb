use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use timetable_core::{EntryId, ScopeId, SlotCatalog};

use crate::{
    conflict::find_conflicts,
    error::{ConflictError, PersistenceError, Result, ScheduleError},
    repository::EntryRepository,
    types::{ConflictReport, EntryDraft, EntryFilter, EntryPatch, TimetableEntry},
};

/// Owns one school's timetable and is the only way to change it.
///
/// Every create and update is checked against the in-memory snapshot first,
/// then committed through the repository, whose own constraints have the final
/// word. Either way a collision comes back as [`ScheduleError::Conflict`].
///
/// The snapshot is reloaded automatically before a check whenever the
/// repository reports that someone else committed a write. The store's own
/// writes are already applied to the snapshot and do not cause a reload.
pub struct ScheduleStore<R: EntryRepository> {
    scope: ScopeId,
    catalog: SlotCatalog,
    repo: R,
    entries: Vec<TimetableEntry>,
    changes: Option<watch::Receiver<u64>>,
    /// Repository revision the snapshot reflects.
    seen: u64,
}

impl<R: EntryRepository> ScheduleStore<R> {
    /// Load `scope` from `repo` and subscribe to its change feed.
    pub fn open(scope: impl Into<ScopeId>, catalog: SlotCatalog, repo: R) -> Result<Self> {
        let scope = scope.into();
        let mut changes = repo.subscribe();
        // Everything committed so far is covered by the load below.
        let seen = changes.as_mut().map_or(0, |rx| *rx.borrow_and_update());
        let entries = repo.load_scope(&scope)?;
        info!(%scope, entries = entries.len(), "schedule store opened");
        Ok(Self {
            scope,
            catalog,
            repo,
            entries,
            changes,
            seen,
        })
    }

    /// Stop listening for outside changes; the snapshot then only moves on
    /// this store's own writes or an explicit [`Self::refresh`].
    pub fn without_change_feed(mut self) -> Self {
        self.changes = None;
        self
    }

    pub fn scope(&self) -> &ScopeId {
        &self.scope
    }

    pub fn catalog(&self) -> &SlotCatalog {
        &self.catalog
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &EntryId) -> Option<&TimetableEntry> {
        self.entries.iter().find(|e| e.id == *id)
    }

    /// Reload the snapshot from the repository.
    pub fn refresh(&mut self) -> Result<()> {
        if let Some(rx) = self.changes.as_mut() {
            self.seen = *rx.borrow_and_update();
        }
        self.entries = self.repo.load_scope(&self.scope)?;
        debug!(scope = %self.scope, entries = self.entries.len(), "snapshot refreshed");
        Ok(())
    }

    /// Conflicts `draft` would cause, without changing anything.
    ///
    /// Pass the id of the entry being edited as `exclude`.
    pub fn check(
        &mut self,
        draft: &EntryDraft,
        exclude: Option<&EntryId>,
    ) -> Result<Vec<ConflictReport>> {
        self.sync()?;
        self.validate(draft)?;
        Ok(find_conflicts(draft, &self.entries, exclude))
    }

    /// Book `draft` under a fresh id.
    #[instrument(skip(self), fields(scope = %self.scope))]
    pub fn create_entry(&mut self, draft: EntryDraft) -> Result<TimetableEntry> {
        self.sync()?;
        self.validate(&draft)?;

        let reports = find_conflicts(&draft, &self.entries, None);
        if !reports.is_empty() {
            let err = ConflictError::new(reports);
            warn!(dimensions = ?err.dimensions(), "create rejected");
            return Err(err.into());
        }

        let entry = draft.into_entry(EntryId::new());
        if let Err(e) = self.repo.insert(&entry) {
            return Err(self.rejected(e));
        }
        self.committed();

        self.entries.push(entry.clone());
        info!(entry_id = %entry.id, "entry created");
        Ok(entry)
    }

    /// Apply `patch` to the entry `id`, keeping its id.
    #[instrument(skip(self, patch), fields(scope = %self.scope, entry_id = %id))]
    pub fn update_entry(&mut self, id: &EntryId, patch: EntryPatch) -> Result<TimetableEntry> {
        self.sync()?;
        let pos = self.position(id)?;
        if patch.is_empty() {
            debug!("empty patch; nothing to write");
            return Ok(self.entries[pos].clone());
        }
        let draft = patch.apply(&self.entries[pos]);
        self.validate(&draft)?;

        let reports = find_conflicts(&draft, &self.entries, Some(id));
        if !reports.is_empty() {
            let err = ConflictError::new(reports);
            warn!(dimensions = ?err.dimensions(), "update rejected");
            return Err(err.into());
        }

        let updated = draft.into_entry(id.clone());
        if let Err(e) = self.repo.update(&updated) {
            return Err(self.rejected(e));
        }
        self.committed();

        self.entries[pos] = updated.clone();
        info!("entry updated");
        Ok(updated)
    }

    /// Remove the entry `id`. Removing can never create a conflict, so no
    /// check is made.
    #[instrument(skip(self), fields(scope = %self.scope, entry_id = %id))]
    pub fn delete_entry(&mut self, id: &EntryId) -> Result<()> {
        self.sync()?;
        let pos = self.position(id)?;
        if let Err(e) = self.repo.delete(&self.scope, id) {
            return Err(self.rejected(e));
        }
        self.committed();
        self.entries.remove(pos);
        info!("entry deleted");
        Ok(())
    }

    /// Entries of `scope` matching `filter`, ordered by day, then slot, then
    /// booking order. Filtering never affects conflict checks.
    ///
    /// Reads the current snapshot; call [`Self::refresh`] first to pick up
    /// outside writes eagerly.
    pub fn list_entries(&self, scope: &ScopeId, filter: &EntryFilter) -> Vec<TimetableEntry> {
        if *scope != self.scope {
            return Vec::new();
        }
        let mut out: Vec<TimetableEntry> = self
            .entries
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        out.sort_by_key(|e| {
            (
                e.day,
                self.catalog.slot_position(&e.slot).unwrap_or(usize::MAX),
            )
        });
        out
    }

    // --- private helpers ---------------------------------------------------

    /// Reload if the repository moved past the revision the snapshot reflects.
    fn sync(&mut self) -> Result<()> {
        let behind = self
            .changes
            .as_ref()
            .is_some_and(|rx| *rx.borrow() != self.seen);
        if behind {
            debug!(scope = %self.scope, "change feed signalled; reloading");
            self.refresh()?;
        }
        Ok(())
    }

    /// Account for a write this store just committed and applied locally.
    ///
    /// Only when the revision moved by exactly one step was that write the
    /// only change; otherwise the next sync reloads.
    fn committed(&mut self) {
        if let Some(rx) = self.changes.as_ref() {
            let rev = *rx.borrow();
            if rev == self.seen + 1 {
                self.seen = rev;
            }
        }
    }

    fn position(&self, id: &EntryId) -> Result<usize> {
        self.entries
            .iter()
            .position(|e| e.id == *id)
            .ok_or_else(|| ScheduleError::NotFound { id: id.to_string() })
    }

    fn validate(&self, draft: &EntryDraft) -> Result<()> {
        if draft.scope_id != self.scope {
            return Err(ScheduleError::ScopeMismatch {
                expected: self.scope.to_string(),
                found: draft.scope_id.to_string(),
            });
        }
        if !self.catalog.contains_day(draft.day) {
            return Err(ScheduleError::UnknownDay {
                day: draft.day.to_string(),
            });
        }
        if !self.catalog.contains_slot(&draft.slot) {
            return Err(ScheduleError::UnknownSlot {
                slot: draft.slot.to_string(),
            });
        }
        Ok(())
    }

    /// The repository refused a write the snapshot allowed: the snapshot is
    /// stale, so reload it before handing the error back.
    fn rejected(&mut self, err: PersistenceError) -> ScheduleError {
        if matches!(
            err,
            PersistenceError::Conflict(_) | PersistenceError::NotFound { .. }
        ) {
            warn!(scope = %self.scope, "repository rejected a locally clean write: {err}");
            if let Err(e) = self.refresh() {
                warn!(scope = %self.scope, "snapshot reload after rejection failed: {e}");
            }
        }
        err.into()
    }
}
