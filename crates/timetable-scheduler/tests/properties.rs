// Property checks for the conflict detector and the store's create gate.
//
// Entries are drawn from a deliberately tiny domain (2 days, 3 slots, 3
// classes, 3 teachers, 2 rooms + none) so collisions are frequent.

use proptest::prelude::*;

use timetable_core::{Day, EntryId, SlotCatalog};
use timetable_scheduler::{
    find_conflicts, Dimension, EntryDraft, EntryFilter, ScheduleStore, SqliteRepository,
    TimetableEntry,
};

const SCOPE: &str = "school";
const DAYS: [Day; 2] = [Day::Monday, Day::Tuesday];
const SLOTS: [&str; 3] = ["08:00-08:45", "08:45-09:30", "09:30-10:15"];
const CLASSES: [&str; 3] = ["C-A", "C-B", "C-C"];
const TEACHERS: [&str; 3] = ["T1", "T2", "T3"];
const ROOMS: [&str; 3] = ["", "101", "102"];

fn arb_draft() -> impl Strategy<Value = EntryDraft> {
    (0..2usize, 0..3usize, 0..3usize, 0..3usize, 0..3usize).prop_map(|(d, s, c, t, r)| {
        EntryDraft::new(SCOPE, DAYS[d], SLOTS[s], CLASSES[c], "Subject", TEACHERS[t])
            .with_room(ROOMS[r])
    })
}

/// Reference definition of a collision, independent of the detector.
fn clashes_on(a: &EntryDraft, b: &EntryDraft) -> Vec<Dimension> {
    let mut dims = Vec::new();
    if a.scope_id != b.scope_id || a.day != b.day || a.slot != b.slot {
        return dims;
    }
    if a.teacher_id == b.teacher_id {
        dims.push(Dimension::Teacher);
    }
    if a.class_id == b.class_id {
        dims.push(Dimension::Class);
    }
    if a.room.is_some() && a.room == b.room {
        dims.push(Dimension::Room);
    }
    dims
}

/// Keep only the drafts that fit alongside the ones already kept.
fn consistent_set(pool: Vec<EntryDraft>) -> Vec<TimetableEntry> {
    let mut kept: Vec<TimetableEntry> = Vec::new();
    for (i, draft) in pool.into_iter().enumerate() {
        if kept.iter().all(|e| clashes_on(&draft, &e.draft()).is_empty()) {
            kept.push(draft.into_entry(EntryId::from(format!("e{i}"))));
        }
    }
    kept
}

proptest! {
    #[test]
    fn reports_exactly_the_real_collisions(
        pool in prop::collection::vec(arb_draft(), 0..24),
        candidate in arb_draft(),
        exclude_at in prop::option::of(0usize..24),
    ) {
        let set = consistent_set(pool);
        let exclude = exclude_at.and_then(|i| set.get(i)).map(|e| e.id.clone());
        let reports = find_conflicts(&candidate, &set, exclude.as_ref());

        let mut expected = Vec::new();
        for e in set.iter().filter(|e| Some(&e.id) != exclude.as_ref()) {
            for dim in clashes_on(&candidate, &e.draft()) {
                expected.push((dim, e.id.clone()));
            }
        }
        expected.sort_by_key(|(dim, _)| *dim);

        let got: Vec<(Dimension, EntryId)> = reports
            .iter()
            .map(|r| (r.dimension, r.conflicting_entry_id.clone()))
            .collect();
        prop_assert_eq!(got, expected);
    }

    #[test]
    fn clean_check_preserves_invariants(
        pool in prop::collection::vec(arb_draft(), 0..24),
        candidate in arb_draft(),
    ) {
        let set = consistent_set(pool);
        if find_conflicts(&candidate, &set, None).is_empty() {
            for e in &set {
                prop_assert!(clashes_on(&candidate, &e.draft()).is_empty());
            }
        }
    }

    #[test]
    fn entries_never_conflict_with_themselves(pool in prop::collection::vec(arb_draft(), 0..24)) {
        let set = consistent_set(pool);
        for e in &set {
            prop_assert!(find_conflicts(&e.draft(), &set, Some(&e.id)).is_empty());
        }
    }

    #[test]
    fn reports_are_grouped_by_dimension(
        pool in prop::collection::vec(arb_draft(), 0..24),
        candidate in arb_draft(),
    ) {
        let set = consistent_set(pool);
        let reports = find_conflicts(&candidate, &set, None);
        let dims: Vec<Dimension> = reports.iter().map(|r| r.dimension).collect();
        let mut sorted = dims.clone();
        sorted.sort();
        prop_assert_eq!(dims, sorted);
        prop_assert_eq!(find_conflicts(&candidate, &set, None), reports);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn create_succeeds_iff_no_conflicts(
        pool in prop::collection::vec(arb_draft(), 0..16),
        candidate in arb_draft(),
    ) {
        let set = consistent_set(pool);
        let mut store = ScheduleStore::open(
            SCOPE,
            SlotCatalog::default(),
            SqliteRepository::open_in_memory().unwrap(),
        )
        .unwrap();
        for e in &set {
            store.create_entry(e.draft()).unwrap();
        }

        let current = store.list_entries(&SCOPE.into(), &EntryFilter::default());
        let expected_clean = find_conflicts(&candidate, &current, None).is_empty();

        match store.create_entry(candidate.clone()) {
            Ok(created) => {
                prop_assert!(expected_clean);
                prop_assert_eq!(created.draft(), candidate);
                prop_assert_eq!(store.len(), set.len() + 1);
            }
            Err(err) => {
                prop_assert!(!expected_clean);
                prop_assert_eq!(err.code(), "CONFLICT");
                prop_assert_eq!(store.len(), set.len());
            }
        }
    }

    #[test]
    fn delete_always_succeeds_for_present_ids(pool in prop::collection::vec(arb_draft(), 1..16)) {
        let set = consistent_set(pool);
        let mut store = ScheduleStore::open(
            SCOPE,
            SlotCatalog::default(),
            SqliteRepository::open_in_memory().unwrap(),
        )
        .unwrap();
        let ids: Vec<EntryId> = set
            .iter()
            .map(|e| store.create_entry(e.draft()).unwrap().id)
            .collect();

        for id in &ids {
            prop_assert!(store.delete_entry(id).is_ok());
        }
        prop_assert!(store.is_empty());
    }
}
