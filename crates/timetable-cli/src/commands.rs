use std::process::ExitCode;

use anyhow::Context;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

use timetable_core::{EntryId, Room, SlotCatalog};
use timetable_scheduler::{
    suggest_available_teacher, suggest_teacher, EntryDraft, EntryFilter, EntryPatch,
    EntryRepository, RoomPatch, ScheduleError, ScheduleStore, Subject, Teacher,
};

use crate::{CellArgs, Command};

const EXIT_CONFLICT: u8 = 2;
const EXIT_REJECTED: u8 = 1;

pub fn print_slots(catalog: &SlotCatalog) -> anyhow::Result<ExitCode> {
    let breaks: Vec<_> = catalog
        .breaks()
        .iter()
        .map(|(from, until)| {
            json!({
                "from": from.format("%H:%M").to_string(),
                "until": until.format("%H:%M").to_string(),
            })
        })
        .collect();
    emit(&json!({
        "days": catalog.days(),
        "slots": catalog.slots(),
        "breaks": breaks,
    }))
}

pub fn run<R: EntryRepository>(
    store: &mut ScheduleStore<R>,
    command: Command,
) -> anyhow::Result<ExitCode> {
    let scope = store.scope().clone();
    let outcome = match command {
        Command::Slots => return print_slots(store.catalog()),

        Command::List {
            teacher,
            class,
            day,
        } => {
            let filter = EntryFilter {
                teacher_id: teacher.map(Into::into),
                class_id: class.map(Into::into),
                day,
            };
            return emit(&store.list_entries(&scope, &filter));
        }

        Command::Add(cell) => store
            .create_entry(draft(&scope, cell))
            .map(|entry| json!({ "ok": true, "entry": entry })),

        Command::Check { cell, exclude } => {
            let exclude = exclude.map(EntryId::from);
            store
                .check(&draft(&scope, cell), exclude.as_ref())
                .map(|reports| json!({ "ok": reports.is_empty(), "conflicts": reports }))
        }

        Command::Update {
            id,
            day,
            slot,
            class,
            subject,
            teacher,
            room,
            clear_room,
        } => {
            let room = match (room.as_deref().and_then(Room::new), clear_room) {
                (_, true) => RoomPatch::Clear,
                (Some(room), false) => RoomPatch::Set(room),
                (None, false) => RoomPatch::Keep,
            };
            let patch = EntryPatch {
                day,
                slot: slot.map(Into::into),
                class_id: class.map(Into::into),
                subject_id: subject.map(Into::into),
                teacher_id: teacher.map(Into::into),
                room,
            };
            store
                .update_entry(&EntryId::from(id), patch)
                .map(|entry| json!({ "ok": true, "entry": entry }))
        }

        Command::Remove { id } => store
            .delete_entry(&EntryId::from(id.as_str()))
            .map(|()| json!({ "ok": true, "deleted": id })),

        Command::Suggest {
            subject,
            roster,
            day,
            slot,
        } => {
            let text = std::fs::read_to_string(&roster)
                .with_context(|| format!("reading roster {}", roster.display()))?;
            let roster: Vec<Teacher> =
                serde_json::from_str(&text).context("roster must be a JSON array of teachers")?;
            let subject = Subject {
                id: subject.as_str().into(),
                name: subject,
            };
            let teacher = match (day, slot) {
                (Some(day), Some(slot)) => {
                    let booked = store.list_entries(&scope, &EntryFilter::default());
                    let slot = slot.into();
                    suggest_available_teacher(&subject, &roster, &scope, day, &slot, &booked)
                }
                _ => suggest_teacher(&subject, &roster),
            };
            return emit(&json!({ "subject": subject.name, "teacher": teacher }));
        }
    };

    match outcome {
        Ok(value) => emit(&value),
        Err(err) => rejected(err),
    }
}

fn draft(scope: &timetable_core::ScopeId, cell: CellArgs) -> EntryDraft {
    let draft = EntryDraft::new(
        scope.clone(),
        cell.day,
        cell.slot.as_str(),
        cell.class,
        cell.subject,
        cell.teacher,
    );
    match cell.room {
        Some(room) => draft.with_room(&room),
        None => draft,
    }
}

/// Print a store rejection as JSON. Persistence failures are real errors.
fn rejected(err: ScheduleError) -> anyhow::Result<ExitCode> {
    if let ScheduleError::Persistence(_) = err {
        return Err(err.into());
    }
    warn!(code = err.code(), "{err}");
    let exit = if err.conflicts().is_some() {
        EXIT_CONFLICT
    } else {
        EXIT_REJECTED
    };
    emit(&json!({
        "ok": false,
        "code": err.code(),
        "message": err.to_string(),
        "conflicts": err.conflicts().unwrap_or_default(),
    }))?;
    Ok(ExitCode::from(exit))
}

fn emit<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(ExitCode::SUCCESS)
}
