mod config;
mod replay;

use std::fs;

use anyhow::{bail, Context, Result};
use board_core::{
    events::UiEvent, BlockingBackend, CalendarMonth, ChannelFeedback, CraCalendar, DragController,
    KanbanBoard, NotificationCenter, NotificationFilter, Point,
};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use crossbeam_channel::{unbounded, Receiver};
use shared::{
    domain::{NotificationId, TaskId, TaskStatus, TimeEntryId, UserId},
    protocol::Surface,
};
use storage::NewTask;
use tracing_subscriber::EnvFilter;

use crate::config::{load_settings, prepare_database_url, Settings};

#[derive(Parser, Debug)]
#[command(name = "backlog", about = "Kanban board and CRA calendar from the terminal")]
struct Cli {
    /// Overrides the configured database url.
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inserts a few tasks, time entries and notifications.
    Seed {
        #[arg(long, default_value_t = 1)]
        user: i64,
        /// Month to put the time entries in (YYYY-MM); defaults to the current one.
        #[arg(long)]
        month: Option<String>,
    },
    Board,
    MoveTask {
        task_id: i64,
        status: String,
    },
    Calendar {
        #[arg(long)]
        month: Option<String>,
    },
    MoveEntry {
        entry_id: i64,
        /// YYYY-MM-DD
        day: String,
        /// Displayed month; defaults to the month of `day`.
        #[arg(long)]
        month: Option<String>,
    },
    Notifications {
        #[arg(long, default_value_t = 1)]
        user: i64,
        #[arg(long, default_value = "all")]
        filter: String,
    },
    Read {
        notification_id: i64,
        #[arg(long, default_value_t = 1)]
        user: i64,
    },
    ReadAll {
        #[arg(long, default_value_t = 1)]
        user: i64,
    },
    /// Replays a JSON gesture script against the board or the calendar.
    Replay {
        script: std::path::PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings();
    if let Some(url) = cli.database_url {
        settings.database_url = url;
    }
    init_tracing(&settings.log_filter);

    let database_url = prepare_database_url(&settings.database_url)?;
    let backend = BlockingBackend::open(&database_url)?;
    tracing::debug!(%database_url, "backend opened");

    match cli.command {
        Command::Seed { user, month } => seed(&backend, UserId(user), month_or_current(month)?)?,
        Command::Board => print_board(&backend)?,
        Command::MoveTask { task_id, status } => {
            move_task(&backend, &settings, TaskId(task_id), status.parse()?)?
        }
        Command::Calendar { month } => print_calendar(&backend, month_or_current(month)?)?,
        Command::MoveEntry {
            entry_id,
            day,
            month,
        } => {
            let day = replay::parse_day(&day)?;
            let month = match month {
                Some(raw) => raw.parse()?,
                None => CalendarMonth::of(day)?,
            };
            move_entry(&backend, &settings, TimeEntryId(entry_id), day, month)?
        }
        Command::Notifications { user, filter } => {
            let mut center = NotificationCenter::new(&backend, UserId(user));
            center.load()?;
            center.set_filter(filter.parse::<NotificationFilter>()?);
            println!("{} unread", center.unread_count());
            for item in center.visible() {
                let marker = if item.read { ' ' } else { '*' };
                println!(
                    "{marker} #{} {} {}",
                    item.id,
                    item.created_at.format("%Y-%m-%d %H:%M"),
                    item.message
                );
            }
        }
        Command::Read {
            notification_id,
            user,
        } => {
            let mut center = NotificationCenter::new(&backend, UserId(user));
            center.load()?;
            if center.mark_read(NotificationId(notification_id))? {
                println!("notification #{notification_id} marked read");
            } else {
                println!("notification #{notification_id} was already read");
            }
        }
        Command::ReadAll { user } => {
            let mut center = NotificationCenter::new(&backend, UserId(user));
            center.load()?;
            let marked = center.mark_all_read()?;
            println!("{marked} notification(s) marked read");
        }
        Command::Replay { script } => {
            let raw = fs::read_to_string(&script)
                .with_context(|| format!("failed to read '{}'", script.display()))?;
            let script = replay::parse_script(&raw)?;
            let (ui_tx, ui_rx) = unbounded();
            let reports = replay::replay(&backend, &script, &settings, ui_tx)?;
            for report in &reports {
                println!("{report:?}");
            }
            print_events(&ui_rx);
            replay::ensure_any_reassigned(&reports)?;
        }
    }

    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn month_or_current(raw: Option<String>) -> Result<CalendarMonth> {
    Ok(match raw {
        Some(raw) => raw.parse()?,
        None => CalendarMonth::of(Utc::now().date_naive())?,
    })
}

fn seed(backend: &BlockingBackend, user: UserId, month: CalendarMonth) -> Result<()> {
    let storage = backend.storage().clone();
    let now = Utc::now();
    backend.block_on(async {
        let mut first_task = None;
        for (title, status) in [
            ("Write release notes", TaskStatus::AFaire),
            ("Fix login bug", TaskStatus::EnCours),
            ("Review CRA export", TaskStatus::EnTest),
            ("Set up staging database", TaskStatus::Termine),
        ] {
            let id = storage
                .create_task(NewTask {
                    project_id: None,
                    title,
                    status,
                    assignee: Some(user),
                })
                .await?;
            first_task.get_or_insert(id);
        }

        let first = month.first_day();
        for (offset, label, hours) in [
            (0, "Sprint planning", 3.5),
            (0, "Code review", 2.0),
            (2, "Client workshop", 7.0),
            (9, "Release", 4.0),
        ] {
            storage
                .create_time_entry(first_task, label, first + Duration::days(offset), hours)
                .await?;
        }

        storage
            .create_notification(
                user,
                "You were assigned to 'Fix login bug'",
                now - Duration::hours(2),
            )
            .await?;
        storage
            .create_notification(user, "New comment on 'Review CRA export'", now)
            .await?;
        anyhow::Ok(())
    })?;
    println!("seeded board, {month} calendar and notifications for user {user}");
    Ok(())
}

fn print_board(backend: &BlockingBackend) -> Result<()> {
    let mut board = KanbanBoard::new(backend, board_core::NoFeedback, Default::default());
    board.load()?;
    for (status, cards) in board.columns() {
        println!("{status} ({})", cards.len());
        for card in cards {
            println!("  #{} {}", card.id, card.title);
        }
    }
    Ok(())
}

/// Drives the same gesture a pointer would: press, drag past the
/// threshold, drop on the column.
fn move_task(
    backend: &BlockingBackend,
    settings: &Settings,
    task_id: TaskId,
    status: TaskStatus,
) -> Result<()> {
    let (ui_tx, ui_rx) = unbounded();
    let controller = DragController::new(settings.drag_threshold())
        .with_success_flash(settings.success_flash());
    let mut board = KanbanBoard::with_controller(
        backend,
        ChannelFeedback::new(Surface::Kanban, ui_tx),
        controller,
    );
    board.load()?;

    let origin = Point::new(0.0, 0.0);
    if !board.pointer_down(task_id, origin) {
        bail!("task {task_id} is not on the board");
    }
    board.pointer_move(past_threshold(settings, origin));
    board.drag_over(status);
    let outcome = board.drop_on(Some(status));
    print_events(&ui_rx);
    if !outcome.is_reassigned() {
        bail!("task {task_id} was not moved: {outcome:?}");
    }
    Ok(())
}

fn print_calendar(backend: &BlockingBackend, month: CalendarMonth) -> Result<()> {
    let mut calendar = CraCalendar::new(
        backend,
        board_core::NoFeedback,
        Default::default(),
        month,
    );
    calendar.load(month)?;

    println!("{month}");
    println!("  Mon        Tue        Wed        Thu        Fri        Sat        Sun");
    for week in calendar.cells().chunks(7) {
        let line: Vec<String> = week
            .iter()
            .map(|cell| {
                if cell.in_active_month {
                    format!("{:>2} {:>5.1}h ", cell.date.day(), calendar.total_hours(cell.date))
                } else {
                    format!("{:>2}  ----  ", cell.date.day())
                }
            })
            .collect();
        println!("  {}", line.join(""));
    }

    for cell in calendar.cells().iter().filter(|cell| cell.in_active_month) {
        for entry in calendar.entries_on(cell.date) {
            println!("  {} #{} {} ({}h)", cell.date, entry.id, entry.label, entry.hours);
        }
    }
    Ok(())
}

fn move_entry(
    backend: &BlockingBackend,
    settings: &Settings,
    entry_id: TimeEntryId,
    day: NaiveDate,
    month: CalendarMonth,
) -> Result<()> {
    let (ui_tx, ui_rx) = unbounded();
    let controller = DragController::new(settings.drag_threshold())
        .with_success_flash(settings.success_flash());
    let mut calendar = CraCalendar::with_controller(
        backend,
        ChannelFeedback::new(Surface::Cra, ui_tx),
        controller,
        month,
    );
    calendar.load(month)?;

    let origin = Point::new(0.0, 0.0);
    if !calendar.pointer_down(entry_id, origin) {
        bail!("time entry {entry_id} is not in {month}");
    }
    calendar.pointer_move(past_threshold(settings, origin));
    calendar.drag_over(day);
    let outcome = calendar.drop_on(Some(day));
    print_events(&ui_rx);
    if !outcome.is_reassigned() {
        bail!("time entry {entry_id} was not moved: {outcome:?}");
    }
    Ok(())
}

fn past_threshold(settings: &Settings, origin: Point) -> Point {
    Point::new(origin.x, origin.y + settings.drag_threshold_y.max(0.0) + 1.0)
}

fn print_events(ui_rx: &Receiver<UiEvent>) {
    for event in ui_rx.try_iter() {
        match event {
            UiEvent::DragStarted { label } => println!("lifted '{label}'"),
            UiEvent::TargetHovered { target, accepted } => {
                println!("over {target} ({})", if accepted { "move" } else { "no drop" })
            }
            UiEvent::TargetLeft { target } => println!("left {target}"),
            UiEvent::Dropped { label, target } => println!("dropped '{label}' on {target}"),
            UiEvent::SuccessFlash { target, duration } => {
                println!("flash {target} for {}ms", duration.as_millis())
            }
            UiEvent::Reverted { label } => println!("'{label}' back in place"),
            UiEvent::Notice(notice) => {
                eprintln!("{}: {}", notice.title(), notice.message());
                if notice.requires_reload() {
                    eprintln!("the item no longer exists; reload before retrying");
                }
            }
        }
    }
}
