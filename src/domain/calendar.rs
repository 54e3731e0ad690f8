//! Month grid and day drill-down views derived from the task list.
//!
//! Every grid is a fixed 6x7 block, Sunday first. Filler days from the
//! neighbouring months never carry tasks.

use crate::domain::models::Task;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::Serialize;
use thiserror::Error;

pub const GRID_WEEKS: usize = 6;
pub const DAYS_PER_WEEK: usize = 7;
pub const GRID_CELLS: usize = GRID_WEEKS * DAYS_PER_WEEK;
pub const DAY_PREVIEW_LIMIT: usize = 3;
pub const HOURS_PER_DAY: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("month must be in 1..=12, got {0}")]
    InvalidMonth(u32),
    #[error("date out of range for {year}-{month:02}")]
    DateOutOfRange { year: i32, month: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub day: u32,
    pub is_current_month: bool,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayPreview<'a> {
    pub visible: &'a [Task],
    pub overflow: usize,
}

impl DayPreview<'_> {
    /// `+N more` label when tasks were cut from the preview.
    pub fn overflow_label(&self) -> Option<String> {
        (self.overflow > 0).then(|| format!("+{} more", self.overflow))
    }
}

impl DayCell {
    fn filler(date: NaiveDate) -> Self {
        Self {
            date,
            day: date.day(),
            is_current_month: false,
            tasks: Vec::new(),
        }
    }

    /// First `limit` tasks for the month view. The full list stays on the cell.
    pub fn preview(&self, limit: usize) -> DayPreview<'_> {
        let shown = self.tasks.len().min(limit);
        DayPreview {
            visible: &self.tasks[..shown],
            overflow: self.tasks.len() - shown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub cells: Vec<DayCell>,
}

impl MonthGrid {
    pub fn weeks(&self) -> impl Iterator<Item = &[DayCell]> {
        self.cells.chunks(DAYS_PER_WEEK)
    }

    pub fn current_month_cells(&self) -> impl Iterator<Item = &DayCell> {
        self.cells.iter().filter(|cell| cell.is_current_month)
    }

    pub fn cell(&self, date: NaiveDate) -> Option<&DayCell> {
        self.cells.iter().find(|cell| cell.date == date)
    }
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate, CalendarError> {
    if !(1..=12).contains(&month) {
        return Err(CalendarError::InvalidMonth(month));
    }
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(CalendarError::DateOutOfRange { year, month })
}

pub fn days_in_month(year: i32, month: u32) -> Result<u32, CalendarError> {
    let first = first_of_month(year, month)?;
    let next = first
        .checked_add_months(Months::new(1))
        .ok_or(CalendarError::DateOutOfRange { year, month })?;
    Ok(next.signed_duration_since(first).num_days() as u32)
}

/// Builds the 42-cell grid for `month` of `year`, bucketing each task on the
/// in-month days where it starts or ends.
pub fn build_month(year: i32, month: u32, tasks: &[Task]) -> Result<MonthGrid, CalendarError> {
    let out_of_range = CalendarError::DateOutOfRange { year, month };
    let first = first_of_month(year, month)?;
    let day_count = days_in_month(year, month)?;
    let leading = u64::from(first.weekday().num_days_from_sunday());

    let mut cells = Vec::with_capacity(GRID_CELLS);
    for offset in (1..=leading).rev() {
        let date = first
            .checked_sub_days(Days::new(offset))
            .ok_or_else(|| out_of_range.clone())?;
        cells.push(DayCell::filler(date));
    }

    for day in 1..=day_count {
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| out_of_range.clone())?;
        cells.push(DayCell {
            date,
            day,
            is_current_month: true,
            tasks: tasks
                .iter()
                .filter(|task| task.touches_date(date))
                .cloned()
                .collect(),
        });
    }

    let last = first
        .checked_add_days(Days::new(u64::from(day_count) - 1))
        .ok_or_else(|| out_of_range.clone())?;
    let trailing = GRID_CELLS - cells.len();
    for offset in 1..=trailing {
        let date = last
            .checked_add_days(Days::new(offset as u64))
            .ok_or_else(|| out_of_range.clone())?;
        cells.push(DayCell::filler(date));
    }

    Ok(MonthGrid { year, month, cells })
}

/// `count` consecutive month grids starting `months_before` months before
/// the centre month. Each grid is built independently.
pub fn build_window(
    center_year: i32,
    center_month: u32,
    months_before: u32,
    count: usize,
    tasks: &[Task],
) -> Result<Vec<MonthGrid>, CalendarError> {
    let center = first_of_month(center_year, center_month)?;
    let start = center
        .checked_sub_months(Months::new(months_before))
        .ok_or(CalendarError::DateOutOfRange {
            year: center_year,
            month: center_month,
        })?;

    (0..count)
        .map(|index| {
            let month_start = start
                .checked_add_months(Months::new(index as u32))
                .ok_or(CalendarError::DateOutOfRange {
                    year: center_year,
                    month: center_month,
                })?;
            build_month(month_start.year(), month_start.month(), tasks)
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySchedule {
    pub date: NaiveDate,
    /// Every task starting or ending on `date`, timed or not.
    pub all: Vec<Task>,
    /// Index = 24-hour start hour. Tasks without a parseable start time are absent.
    pub hours: Vec<Vec<Task>>,
}

impl DaySchedule {
    pub fn tasks_at_hour(&self, hour: u32) -> &[Task] {
        self.hours
            .get(hour as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn untimed(&self) -> impl Iterator<Item = &Task> {
        self.all.iter().filter(|task| task.start_hour().is_none())
    }
}

pub fn day_schedule(date: NaiveDate, tasks: &[Task]) -> DaySchedule {
    let all: Vec<Task> = tasks
        .iter()
        .filter(|task| task.touches_date(date))
        .cloned()
        .collect();

    let mut hours = vec![Vec::new(); HOURS_PER_DAY];
    for task in &all {
        if let Some(bucket) = task.start_hour().and_then(|hour| hours.get_mut(hour as usize)) {
            bucket.push(task.clone());
        }
    }

    DaySchedule { date, all, hours }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TaskDraft;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Tz;
    use proptest::prelude::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn task_between(id: &str, start: (u32, u32, u32), end: (u32, u32, u32)) -> Task {
        let draft = TaskDraft::new(
            id,
            "",
            Utc.with_ymd_and_hms(2024, start.0, start.1, start.2, 0, 0)
                .single()
                .expect("start"),
            Utc.with_ymd_and_hms(2024, end.0, end.1, end.2, 0, 0)
                .single()
                .expect("end"),
        );
        Task::from_draft(id, &draft, Utc::now(), Tz::UTC).expect("valid task")
    }

    #[test]
    fn february_2024_has_29_current_cells() {
        let grid = build_month(2024, 2, &[]).expect("grid");
        assert_eq!(grid.cells.len(), GRID_CELLS);
        assert_eq!(grid.current_month_cells().count(), 29);
        assert_eq!(grid.cells.iter().filter(|c| !c.is_current_month).count(), 13);
        // Feb 1st 2024 is a Thursday.
        assert_eq!(grid.cells[4].date, date(2024, 2, 1));
        assert_eq!(grid.cells[3].date, date(2024, 1, 31));
        assert_eq!(grid.cells[3].day, 31);
        assert_eq!(grid.cells[41].date, date(2024, 3, 9));
        assert_eq!(grid.weeks().count(), GRID_WEEKS);
    }

    #[test]
    fn month_starting_on_sunday_has_no_leading_filler() {
        // September 2024 starts on a Sunday.
        let grid = build_month(2024, 9, &[]).expect("grid");
        assert!(grid.cells[0].is_current_month);
        assert_eq!(grid.cells[0].date, date(2024, 9, 1));
        assert_eq!(grid.cells[30].date, date(2024, 10, 1));
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert_eq!(build_month(2024, 13, &[]), Err(CalendarError::InvalidMonth(13)));
        assert_eq!(build_month(2024, 0, &[]), Err(CalendarError::InvalidMonth(0)));
    }

    #[test]
    fn overnight_task_is_bucketed_on_both_days() {
        let flight = task_between("flight", (3, 21, 23), (3, 22, 6));
        let grid = build_month(2024, 3, std::slice::from_ref(&flight)).expect("grid");

        let start_cell = grid.cell(date(2024, 3, 21)).expect("start cell");
        let end_cell = grid.cell(date(2024, 3, 22)).expect("end cell");
        assert_eq!(start_cell.tasks, vec![flight.clone()]);
        assert_eq!(end_cell.tasks, vec![flight]);
        assert!(grid.cell(date(2024, 3, 23)).expect("cell").tasks.is_empty());
    }

    #[test]
    fn filler_days_never_carry_tasks() {
        // March 31st is the single leading filler day of April 2024.
        let task = task_between("end-of-march", (3, 31, 10), (3, 31, 11));
        let april = build_month(2024, 4, std::slice::from_ref(&task)).expect("grid");
        let filler = april.cell(date(2024, 3, 31)).expect("filler cell");
        assert!(!filler.is_current_month);
        assert!(filler.tasks.is_empty());
    }

    #[test]
    fn preview_caps_visible_tasks() {
        let tasks: Vec<Task> = (0..5)
            .map(|hour| task_between(&format!("t{hour}"), (5, 10, 8 + hour), (5, 10, 9 + hour)))
            .collect();
        let grid = build_month(2024, 5, &tasks).expect("grid");
        let cell = grid.cell(date(2024, 5, 10)).expect("cell");
        let preview = cell.preview(DAY_PREVIEW_LIMIT);

        assert_eq!(preview.visible.len(), 3);
        assert_eq!(preview.overflow, 2);
        assert_eq!(preview.overflow_label().as_deref(), Some("+2 more"));
        assert_eq!(cell.tasks.len(), 5);

        let quiet = grid.cell(date(2024, 5, 11)).expect("cell").preview(DAY_PREVIEW_LIMIT);
        assert_eq!(quiet.overflow_label(), None);
    }

    #[test]
    fn day_schedule_buckets_by_start_hour() {
        let flight = task_between("flight", (3, 21, 23), (3, 22, 6));
        let lunch = task_between("lunch", (3, 21, 12), (3, 21, 13));
        let mut untimed = task_between("untimed", (3, 21, 9), (3, 21, 10));
        untimed.start_time = None;

        let schedule = day_schedule(date(2024, 3, 21), &[flight.clone(), lunch.clone(), untimed]);
        assert_eq!(schedule.all.len(), 3);
        assert_eq!(schedule.tasks_at_hour(23), std::slice::from_ref(&flight));
        assert_eq!(schedule.tasks_at_hour(12), std::slice::from_ref(&lunch));
        assert!(schedule.tasks_at_hour(9).is_empty());
        assert_eq!(schedule.untimed().count(), 1);
        assert!(schedule.tasks_at_hour(24).is_empty());

        // On the end day the overnight task is listed under its start hour.
        let next_day = day_schedule(date(2024, 3, 22), std::slice::from_ref(&flight));
        assert_eq!(next_day.tasks_at_hour(23).len(), 1);
    }

    #[test]
    fn window_spans_consecutive_months() {
        let grids = build_window(2024, 1, 12, 24, &[]).expect("window");
        assert_eq!(grids.len(), 24);
        assert_eq!((grids[0].year, grids[0].month), (2023, 1));
        assert_eq!((grids[12].year, grids[12].month), (2024, 1));
        assert_eq!((grids[23].year, grids[23].month), (2024, 12));
    }

    proptest! {
        #[test]
        fn every_grid_has_42_cells(year in 1900i32..2200i32, month in 1u32..=12u32) {
            let grid = build_month(year, month, &[]).expect("grid");
            prop_assert_eq!(grid.cells.len(), GRID_CELLS);
            let expected = days_in_month(year, month).expect("days");
            prop_assert_eq!(grid.current_month_cells().count() as u32, expected);
            prop_assert_eq!(grid.cells[0].date.weekday().num_days_from_sunday(), 0);
            for pair in grid.cells.windows(2) {
                prop_assert_eq!(pair[0].date.succ_opt(), Some(pair[1].date));
            }
        }
    }
}
