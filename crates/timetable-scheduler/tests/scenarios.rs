// End-to-end booking scenarios against an in-memory SQLite repository.

use std::sync::Arc;

use timetable_core::{Day, SlotCatalog};
use timetable_scheduler::{
    suggest_teacher, Dimension, EntryDraft, EntryFilter, EntryPatch, EntryRepository,
    ScheduleError, ScheduleStore, SqliteRepository, Subject, Teacher,
};

const SCOPE: &str = "springfield-elementary";
const FIRST_PERIOD: &str = "08:00-08:45";

fn open_store() -> ScheduleStore<SqliteRepository> {
    ScheduleStore::open(
        SCOPE,
        SlotCatalog::default(),
        SqliteRepository::open_in_memory().unwrap(),
    )
    .unwrap()
}

fn monday_first(class: &str, subject: &str, teacher: &str, room: &str) -> EntryDraft {
    EntryDraft::new(SCOPE, Day::Monday, FIRST_PERIOD, class, subject, teacher).with_room(room)
}

#[test]
fn weekly_booking_walkthrough() {
    let mut store = open_store();

    // Empty store, first entry.
    let first = store
        .create_entry(monday_first("C-A", "Math", "T1", "101"))
        .unwrap();
    let listed = store.list_entries(&SCOPE.into(), &EntryFilter::default());
    assert_eq!(listed, vec![first.clone()]);

    // Teacher double-book: one teacher report, no room report for unused 102.
    let err = store
        .create_entry(monday_first("C-B", "Science", "T1", "102"))
        .unwrap_err();
    let reports = err.conflicts().expect("conflict");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].dimension, Dimension::Teacher);
    assert_eq!(reports[0].conflicting_entry_id, first.id);

    // Room double-book: one room report, teacher/class clean.
    let err = store
        .create_entry(monday_first("C-C", "Art", "T2", "101"))
        .unwrap_err();
    let reports = err.conflicts().expect("conflict");
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].dimension, Dimension::Room);
    assert_eq!(reports[0].conflicting_entry_id, first.id);

    // Self-edit is safe.
    let patch = EntryPatch {
        subject_id: Some("Advanced Math".into()),
        ..EntryPatch::default()
    };
    let edited = store.update_entry(&first.id, patch).unwrap();
    assert_eq!(edited.id, first.id);
    assert_eq!(edited.subject_id.as_str(), "Advanced Math");

    // Freed slot.
    store.delete_entry(&first.id).unwrap();
    let rebooked = store
        .create_entry(monday_first("C-B", "Science", "T1", "102"))
        .unwrap();
    assert_eq!(
        store.list_entries(&SCOPE.into(), &EntryFilter::default()),
        vec![rebooked]
    );
}

#[test]
fn advisor_picks_first_specialist() {
    let roster = vec![
        Teacher {
            id: "T2".into(),
            name: "Marie".into(),
            specialization: "Physics and Chemistry".into(),
        },
        Teacher {
            id: "T3".into(),
            name: "Herodotus".into(),
            specialization: "History".into(),
        },
    ];
    let physics = Subject {
        id: "PHY".into(),
        name: "Physics".into(),
    };
    assert_eq!(suggest_teacher(&physics, &roster), Some("T2".into()));
}

#[test]
fn suggested_teacher_can_still_conflict() {
    let mut store = open_store();
    store
        .create_entry(monday_first("C-A", "Chemistry", "T2", ""))
        .unwrap();

    let roster = vec![Teacher {
        id: "T2".into(),
        name: "Marie".into(),
        specialization: "Physics and Chemistry".into(),
    }];
    let physics = Subject {
        id: "PHY".into(),
        name: "Physics".into(),
    };
    let teacher = suggest_teacher(&physics, &roster).unwrap();

    let err = store
        .create_entry(monday_first("C-B", "Physics", teacher.as_str(), ""))
        .unwrap_err();
    assert!(matches!(err, ScheduleError::Conflict(_)));
}

#[test]
fn stale_snapshot_is_caught_by_unique_indexes() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let mut office = ScheduleStore::open(SCOPE, SlotCatalog::default(), Arc::clone(&repo))
        .unwrap()
        .without_change_feed();
    let mut staffroom = ScheduleStore::open(SCOPE, SlotCatalog::default(), Arc::clone(&repo))
        .unwrap()
        .without_change_feed();

    let booked = office
        .create_entry(monday_first("C-A", "Math", "T1", "101"))
        .unwrap();

    // The staffroom's snapshot predates the booking, so its own check passes.
    let candidate = monday_first("C-B", "Science", "T1", "101");
    assert!(staffroom.check(&candidate, None).unwrap().is_empty());

    let err = staffroom.create_entry(candidate).unwrap_err();
    let reports = err.conflicts().expect("storage conflict maps to ConflictError");
    let dims: Vec<Dimension> = reports.iter().map(|r| r.dimension).collect();
    assert_eq!(dims, vec![Dimension::Teacher, Dimension::Room]);
    assert!(reports.iter().all(|r| r.conflicting_entry_id == booked.id));

    // The rejection reloads the stale snapshot.
    assert_eq!(staffroom.len(), 1);
    assert_eq!(repo.load_scope(&SCOPE.into()).unwrap().len(), 1);
}

#[test]
fn stale_update_is_caught_by_unique_indexes() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let mut office = ScheduleStore::open(SCOPE, SlotCatalog::default(), Arc::clone(&repo))
        .unwrap()
        .without_change_feed();

    let mut second_period = monday_first("C-B", "Art", "T2", "");
    second_period.slot = "08:45-09:30".into();
    let movable = office.create_entry(second_period).unwrap();

    let mut staffroom = ScheduleStore::open(SCOPE, SlotCatalog::default(), Arc::clone(&repo))
        .unwrap()
        .without_change_feed();
    staffroom
        .create_entry(monday_first("C-A", "Math", "T2", ""))
        .unwrap();

    let patch = EntryPatch {
        slot: Some(FIRST_PERIOD.into()),
        ..EntryPatch::default()
    };
    let err = office.update_entry(&movable.id, patch).unwrap_err();
    assert_eq!(err.code(), "CONFLICT");
    assert_eq!(
        office.get(&movable.id).unwrap().slot.as_str(),
        "08:45-09:30"
    );
}

#[test]
fn delete_of_entry_removed_elsewhere_is_not_found() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let mut office = ScheduleStore::open(SCOPE, SlotCatalog::default(), Arc::clone(&repo))
        .unwrap()
        .without_change_feed();
    let mut staffroom = ScheduleStore::open(SCOPE, SlotCatalog::default(), Arc::clone(&repo))
        .unwrap()
        .without_change_feed();

    let e = office
        .create_entry(monday_first("C-A", "Math", "T1", ""))
        .unwrap();
    staffroom.refresh().unwrap();
    office.delete_entry(&e.id).unwrap();

    let err = staffroom.delete_entry(&e.id).unwrap_err();
    assert_eq!(err.code(), "NOT_FOUND");
    assert!(staffroom.is_empty());
}

#[test]
fn scopes_never_interact() {
    let repo = Arc::new(SqliteRepository::open_in_memory().unwrap());
    let mut north =
        ScheduleStore::open("north", SlotCatalog::default(), Arc::clone(&repo)).unwrap();
    let mut south =
        ScheduleStore::open("south", SlotCatalog::default(), Arc::clone(&repo)).unwrap();

    let same_cell = |scope: &str| {
        EntryDraft::new(scope, Day::Monday, FIRST_PERIOD, "C-A", "Math", "T1").with_room("101")
    };
    north.create_entry(same_cell("north")).unwrap();
    south.create_entry(same_cell("south")).unwrap();

    assert_eq!(north.list_entries(&"north".into(), &EntryFilter::default()).len(), 1);
    assert!(north.list_entries(&"south".into(), &EntryFilter::default()).is_empty());
    assert_eq!(south.len(), 1);
}
