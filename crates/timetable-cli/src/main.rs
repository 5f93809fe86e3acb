use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use timetable_core::{Day, TimetableConfig};
use tracing::info;

mod commands;

#[derive(Parser)]
#[command(name = "timetable")]
#[command(about = "Conflict-checked school timetable bookings")]
struct Cli {
    /// Config file (defaults to $TIMETABLE_CONFIG, then ~/.timetable/timetable.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// School scope; overrides `[school] scope` from config.
    #[arg(long, global = true)]
    scope: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the configured days and periods.
    Slots,
    /// List bookings, optionally narrowed to one teacher, class or day.
    List {
        #[arg(long)]
        teacher: Option<String>,
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        day: Option<Day>,
    },
    /// Book a period.
    Add(CellArgs),
    /// Report the conflicts a booking would cause, without booking it.
    Check {
        #[command(flatten)]
        cell: CellArgs,
        /// Entry being edited, excluded from the check.
        #[arg(long)]
        exclude: Option<String>,
    },
    /// Change fields of an existing booking.
    Update {
        id: String,
        #[arg(long)]
        day: Option<Day>,
        #[arg(long)]
        slot: Option<String>,
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        teacher: Option<String>,
        #[arg(long, conflicts_with = "clear_room")]
        room: Option<String>,
        #[arg(long)]
        clear_room: bool,
    },
    /// Delete a booking.
    Remove { id: String },
    /// Suggest a teacher for a subject from a JSON roster file.
    Suggest {
        #[arg(long)]
        subject: String,
        #[arg(long)]
        roster: PathBuf,
        /// With --slot, skip teachers already booked in that cell.
        #[arg(long, requires = "slot")]
        day: Option<Day>,
        #[arg(long, requires = "day")]
        slot: Option<String>,
    },
}

#[derive(Args)]
struct CellArgs {
    #[arg(long)]
    day: Day,
    #[arg(long)]
    slot: String,
    #[arg(long)]
    class: String,
    #[arg(long)]
    subject: String,
    #[arg(long)]
    teacher: String,
    #[arg(long)]
    room: Option<String>,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timetable_cli=info,timetable_scheduler=info".into()),
        )
        .init();

    let cli = Cli::parse();

    // load config: --config > TIMETABLE_CONFIG env > ~/.timetable/timetable.toml
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .or_else(|| std::env::var("TIMETABLE_CONFIG").ok());
    let config = TimetableConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        TimetableConfig::default()
    });

    let catalog = config.slot_catalog()?;
    let scope = cli.scope.unwrap_or_else(|| config.school.scope.clone());

    if let Command::Slots = cli.command {
        return commands::print_slots(&catalog);
    }

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, %scope, "opening timetable database");
    let conn = rusqlite::Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    let repo = timetable_scheduler::SqliteRepository::new(conn)?;
    let mut store = timetable_scheduler::ScheduleStore::open(scope, catalog, repo)?;

    commands::run(&mut store, cli.command)
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
