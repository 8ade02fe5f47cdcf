//! CRA calendar: time entries dragged between days of the displayed month.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{Datelike, Duration, Months, NaiveDate};
use shared::{
    domain::{TimeEntry, TimeEntryId},
    error::{ErrorCode, ServiceError},
};
use tracing::{debug, warn};

use crate::{
    drag::{
        Affordance, DragController, DragPhase, DragThreshold, Draggable, DropOutcome, DropTarget,
        MoveOutcome, Point, PointerUpOutcome,
    },
    feedback::Feedback,
};

/// Six Monday-first weeks.
pub const GRID_DAYS: usize = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarMonth {
    first: NaiveDate,
    last: NaiveDate,
}

impl CalendarMonth {
    /// Rejects months too close to the calendar bounds for their week grid
    /// and neighbouring months to exist.
    pub fn new(year: i32, month: u32) -> Result<Self, ServiceError> {
        let invalid = || {
            ServiceError::new(
                ErrorCode::Validation,
                format!("invalid calendar month {year}-{month:02}"),
            )
        };
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let last = first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .ok_or_else(invalid)?;
        let grid_fits = first.checked_sub_months(Months::new(1)).is_some()
            && first.checked_sub_signed(Duration::days(7)).is_some()
            && first.checked_add_months(Months::new(2)).is_some();
        if !grid_fits {
            return Err(invalid());
        }
        Ok(Self { first, last })
    }

    pub fn of(day: NaiveDate) -> Result<Self, ServiceError> {
        Self::new(day.year(), day.month())
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.last
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        (self.first..=self.last).contains(&day)
    }

    pub fn next(&self) -> Result<Self, ServiceError> {
        match self.month() {
            12 => Self::new(self.year() + 1, 1),
            month => Self::new(self.year(), month + 1),
        }
    }

    pub fn previous(&self) -> Result<Self, ServiceError> {
        match self.month() {
            1 => Self::new(self.year() - 1, 12),
            month => Self::new(self.year(), month - 1),
        }
    }
}

impl fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for CalendarMonth {
    type Err = ServiceError;

    /// `YYYY-MM`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            ServiceError::new(
                ErrorCode::Validation,
                format!("invalid month '{raw}', expected YYYY-MM"),
            )
        };
        let (year, month) = raw.trim().split_once('-').ok_or_else(invalid)?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    /// False for the padding days that align the grid on weeks.
    pub in_active_month: bool,
    pub valid_drop_day: bool,
}

impl DropTarget for DayCell {
    type Key = NaiveDate;

    fn key(&self) -> NaiveDate {
        self.date
    }

    fn accepts(&self) -> bool {
        self.in_active_month && self.valid_drop_day
    }

    fn label(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Builds the 42 cells shown for `month`, starting on the Monday on or
/// before its first day. [`CalendarMonth::new`] guarantees every cell is a
/// representable date.
pub fn month_grid(
    month: CalendarMonth,
    is_valid_drop_day: impl Fn(NaiveDate) -> bool,
) -> Vec<DayCell> {
    let first = month.first_day();
    let start = first - Duration::days(i64::from(first.weekday().num_days_from_monday()));
    start
        .iter_days()
        .take(GRID_DAYS)
        .map(|date| {
            let in_active_month = month.contains(date);
            DayCell {
                date,
                in_active_month,
                valid_drop_day: in_active_month && is_valid_drop_day(date),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryCell {
    pub id: TimeEntryId,
    pub label: String,
    pub day: NaiveDate,
    pub hours: f64,
}

impl From<TimeEntry> for EntryCell {
    fn from(entry: TimeEntry) -> Self {
        Self {
            id: entry.id,
            label: entry.label,
            day: entry.day,
            hours: entry.hours,
        }
    }
}

impl Draggable for EntryCell {
    type Id = TimeEntryId;

    fn id(&self) -> TimeEntryId {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }
}

pub trait CraService {
    fn list_entries(&self, month: CalendarMonth) -> Result<Vec<TimeEntry>, ServiceError>;
    fn mutate_scheduled_day(&self, entry_id: TimeEntryId, day: NaiveDate)
        -> Result<(), ServiceError>;

    /// Extra business rule on top of "inside the displayed month".
    fn is_valid_drop_day(&self, _day: NaiveDate) -> bool {
        true
    }
}

impl<T: CraService + ?Sized> CraService for &T {
    fn list_entries(&self, month: CalendarMonth) -> Result<Vec<TimeEntry>, ServiceError> {
        (**self).list_entries(month)
    }

    fn mutate_scheduled_day(
        &self,
        entry_id: TimeEntryId,
        day: NaiveDate,
    ) -> Result<(), ServiceError> {
        (**self).mutate_scheduled_day(entry_id, day)
    }

    fn is_valid_drop_day(&self, day: NaiveDate) -> bool {
        (**self).is_valid_drop_day(day)
    }
}

pub struct CraCalendar<S, F> {
    service: S,
    feedback: F,
    controller: DragController<EntryCell, DayCell>,
    month: CalendarMonth,
    cells: Vec<DayCell>,
    entries: BTreeMap<NaiveDate, Vec<EntryCell>>,
}

impl<S, F> CraCalendar<S, F>
where
    S: CraService,
    F: Feedback<EntryCell, DayCell>,
{
    pub fn new(service: S, feedback: F, threshold: DragThreshold, month: CalendarMonth) -> Self {
        Self::with_controller(service, feedback, DragController::new(threshold), month)
    }

    pub fn with_controller(
        service: S,
        feedback: F,
        controller: DragController<EntryCell, DayCell>,
        month: CalendarMonth,
    ) -> Self {
        let cells = month_grid(month, |day| service.is_valid_drop_day(day));
        Self {
            service,
            feedback,
            controller,
            month,
            cells,
            entries: BTreeMap::new(),
        }
    }

    /// Switches to `month` and reloads its entries. Any gesture in flight is
    /// abandoned since its cells are gone.
    pub fn load(&mut self, month: CalendarMonth) -> Result<(), ServiceError> {
        self.controller.reset(&mut self.feedback);
        let entries = self.service.list_entries(month)?;
        let service = &self.service;
        self.cells = month_grid(month, |day| service.is_valid_drop_day(day));
        self.month = month;
        self.entries = group_by_day(entries);
        debug!(%month, "cra calendar loaded");
        Ok(())
    }

    /// Reloads the displayed month. A gesture whose entry is gone is reset.
    pub fn refresh(&mut self) -> Result<(), ServiceError> {
        let entries = self.service.list_entries(self.month)?;
        self.entries = group_by_day(entries);

        let vanished = self
            .controller
            .session()
            .is_some_and(|session| self.find_entry(session.payload.id).is_none());
        if vanished {
            debug!("dragged entry vanished on reload; gesture reset");
            self.controller.reset(&mut self.feedback);
        }
        Ok(())
    }

    pub fn show_next_month(&mut self) -> Result<(), ServiceError> {
        self.load(self.month.next()?)
    }

    pub fn show_previous_month(&mut self) -> Result<(), ServiceError> {
        self.load(self.month.previous()?)
    }

    pub fn month(&self) -> CalendarMonth {
        self.month
    }

    pub fn cells(&self) -> &[DayCell] {
        &self.cells
    }

    pub fn cell(&self, day: NaiveDate) -> Option<&DayCell> {
        self.cells.iter().find(|cell| cell.date == day)
    }

    pub fn entries_on(&self, day: NaiveDate) -> &[EntryCell] {
        self.entries.get(&day).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn total_hours(&self, day: NaiveDate) -> f64 {
        self.entries_on(day).iter().map(|entry| entry.hours).sum()
    }

    pub fn find_entry(&self, entry_id: TimeEntryId) -> Option<&EntryCell> {
        self.entries
            .values()
            .flatten()
            .find(|entry| entry.id == entry_id)
    }

    pub fn phase(&self) -> DragPhase {
        self.controller.phase()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn feedback(&self) -> &F {
        &self.feedback
    }

    pub fn feedback_mut(&mut self) -> &mut F {
        &mut self.feedback
    }

    /// Any previous gesture is reset first, even when `entry_id` is unknown.
    pub fn pointer_down(&mut self, entry_id: TimeEntryId, at: Point) -> bool {
        self.controller.reset(&mut self.feedback);
        let Some(entry) = self.find_entry(entry_id).cloned() else {
            debug!(%entry_id, "pointer down on unknown time entry ignored");
            return false;
        };
        self.controller.on_pointer_down(entry, at, &mut self.feedback);
        true
    }

    pub fn pointer_move(&mut self, at: Point) -> MoveOutcome {
        self.controller.on_pointer_move(at, &mut self.feedback)
    }

    pub fn pointer_up(&mut self, at: Point) -> Option<TimeEntryId> {
        match self.controller.on_pointer_up(at, &mut self.feedback) {
            PointerUpOutcome::Activate(entry) => Some(entry.id),
            PointerUpOutcome::Idle | PointerUpOutcome::Cancelled(_) => None,
        }
    }

    /// Days outside the grid get no affordance.
    pub fn drag_over(&mut self, day: NaiveDate) -> Affordance {
        match self.cell(day).copied() {
            Some(cell) => self.controller.on_drop_candidate(&cell, &mut self.feedback),
            None => Affordance::None,
        }
    }

    pub fn drag_leave(&mut self, day: NaiveDate) {
        if let Some(cell) = self.cell(day).copied() {
            self.controller.on_drop_leave(&cell, &mut self.feedback);
        }
    }

    /// A day missing from the grid counts as dropping outside any target.
    pub fn drop_on(&mut self, day: Option<NaiveDate>) -> DropOutcome<TimeEntryId, NaiveDate> {
        let cell = day.and_then(|day| self.cell(day).copied());
        let service = &self.service;
        let mut mutate = |entry: &EntryCell, cell: &DayCell| {
            service.mutate_scheduled_day(entry.id, cell.date)
        };
        let outcome = self
            .controller
            .on_drop(cell.as_ref(), &mut mutate, &mut self.feedback);

        if outcome.is_reassigned() {
            if let Err(err) = self.refresh() {
                warn!(error = %err, "failed to reload cra calendar after move");
                self.feedback.load_failed(&err);
            }
        }
        outcome
    }

    pub fn cancel_gesture(&mut self) {
        self.controller.reset(&mut self.feedback);
    }
}

fn group_by_day(entries: Vec<TimeEntry>) -> BTreeMap<NaiveDate, Vec<EntryCell>> {
    let mut by_day: BTreeMap<NaiveDate, Vec<EntryCell>> = BTreeMap::new();
    for entry in entries {
        by_day.entry(entry.day).or_default().push(EntryCell::from(entry));
    }
    by_day
}

#[cfg(test)]
#[path = "tests/cra_tests.rs"]
mod tests;
