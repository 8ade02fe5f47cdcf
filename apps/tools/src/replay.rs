//! Feeds a recorded gesture script through the Kanban or CRA surface.

use anyhow::{anyhow, bail, Context, Result};
use board_core::{
    events::UiEvent, Affordance, CalendarMonth, ChannelFeedback, CraCalendar, CraService,
    DragController, DropOutcome, KanbanBoard, MoveOutcome, Point, TaskBoardService,
};
use chrono::{NaiveDate, Utc};
use crossbeam_channel::Sender;
use shared::{
    domain::{TaskId, TaskStatus, TimeEntryId},
    protocol::{GestureScript, GestureStep, Surface},
};
use tracing::info;

use crate::config::Settings;

#[derive(Debug, Clone, PartialEq)]
pub enum StepReport {
    PointerDown { item: i64, found: bool },
    PointerMove(MoveOutcome),
    PointerUp { activated: Option<i64> },
    DragOver { target: String, affordance: Affordance },
    DragLeave { target: String },
    Drop { reassigned: bool, detail: String },
}

pub fn parse_script(raw: &str) -> Result<GestureScript> {
    serde_json::from_str(raw).context("invalid gesture script")
}

pub fn replay<S>(
    service: S,
    script: &GestureScript,
    settings: &Settings,
    ui_tx: Sender<UiEvent>,
) -> Result<Vec<StepReport>>
where
    S: TaskBoardService + CraService,
{
    let controller_threshold = settings.drag_threshold();
    let feedback = ChannelFeedback::new(script.surface, ui_tx);
    info!(surface = ?script.surface, steps = script.steps.len(), "replaying gesture script");

    match script.surface {
        Surface::Kanban => {
            let controller = DragController::new(controller_threshold)
                .with_success_flash(settings.success_flash());
            let mut board = KanbanBoard::with_controller(service, feedback, controller);
            board.load()?;
            script
                .steps
                .iter()
                .map(|step| kanban_step(&mut board, step))
                .collect()
        }
        Surface::Cra => {
            let month = match &script.month {
                Some(raw) => raw.parse::<CalendarMonth>()?,
                None => CalendarMonth::of(Utc::now().date_naive())?,
            };
            let controller = DragController::new(controller_threshold)
                .with_success_flash(settings.success_flash());
            let mut calendar = CraCalendar::with_controller(service, feedback, controller, month);
            calendar.load(month)?;
            script
                .steps
                .iter()
                .map(|step| cra_step(&mut calendar, step))
                .collect()
        }
    }
}

fn kanban_step<S: TaskBoardService>(
    board: &mut KanbanBoard<S, ChannelFeedback>,
    step: &GestureStep,
) -> Result<StepReport> {
    Ok(match step {
        GestureStep::PointerDown { item, x, y } => StepReport::PointerDown {
            item: *item,
            found: board.pointer_down(TaskId(*item), Point::new(*x, *y)),
        },
        GestureStep::PointerMove { x, y } => {
            StepReport::PointerMove(board.pointer_move(Point::new(*x, *y)))
        }
        GestureStep::PointerUp { x, y } => StepReport::PointerUp {
            activated: board.pointer_up(Point::new(*x, *y)).map(|id| id.0),
        },
        GestureStep::DragOver { target } => StepReport::DragOver {
            target: target.clone(),
            affordance: board.drag_over(target.parse::<TaskStatus>()?),
        },
        GestureStep::DragLeave { target } => {
            board.drag_leave(target.parse::<TaskStatus>()?);
            StepReport::DragLeave {
                target: target.clone(),
            }
        }
        GestureStep::Drop { target } => {
            let status = target
                .as_deref()
                .map(str::parse::<TaskStatus>)
                .transpose()?;
            drop_report(board.drop_on(status))
        }
    })
}

fn cra_step<S: CraService>(
    calendar: &mut CraCalendar<S, ChannelFeedback>,
    step: &GestureStep,
) -> Result<StepReport> {
    Ok(match step {
        GestureStep::PointerDown { item, x, y } => StepReport::PointerDown {
            item: *item,
            found: calendar.pointer_down(TimeEntryId(*item), Point::new(*x, *y)),
        },
        GestureStep::PointerMove { x, y } => {
            StepReport::PointerMove(calendar.pointer_move(Point::new(*x, *y)))
        }
        GestureStep::PointerUp { x, y } => StepReport::PointerUp {
            activated: calendar.pointer_up(Point::new(*x, *y)).map(|id| id.0),
        },
        GestureStep::DragOver { target } => StepReport::DragOver {
            target: target.clone(),
            affordance: calendar.drag_over(parse_day(target)?),
        },
        GestureStep::DragLeave { target } => {
            calendar.drag_leave(parse_day(target)?);
            StepReport::DragLeave {
                target: target.clone(),
            }
        }
        GestureStep::Drop { target } => {
            let day = target.as_deref().map(parse_day).transpose()?;
            drop_report(calendar.drop_on(day))
        }
    })
}

pub fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| anyhow!("invalid day '{raw}', expected YYYY-MM-DD: {err}"))
}

fn drop_report<I, K>(outcome: DropOutcome<I, K>) -> StepReport
where
    I: std::fmt::Display,
    K: std::fmt::Debug,
{
    let detail = match &outcome {
        DropOutcome::Reassigned { payload, target } => format!("moved {payload} to {target:?}"),
        DropOutcome::Rejected(reason) => format!("rejected: {reason:?}"),
        DropOutcome::Failed { payload, error } => format!("failed to move {payload}: {error}"),
        DropOutcome::Ignored => "ignored".to_string(),
    };
    StepReport::Drop {
        reassigned: outcome.is_reassigned(),
        detail,
    }
}

/// Errors unless the script moved at least one item.
pub fn ensure_any_reassigned(reports: &[StepReport]) -> Result<()> {
    let moved = reports
        .iter()
        .any(|report| matches!(report, StepReport::Drop { reassigned: true, .. }));
    if !moved {
        bail!("gesture did not move anything");
    }
    Ok(())
}
