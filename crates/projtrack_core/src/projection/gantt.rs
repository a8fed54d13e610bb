//! Gantt task projection and Gantt-driven partial edits.
//!
//! # Invariants
//! - A task always has both `start` and `end`: a missing end is derived as
//!   start + 7 days, or today..today + 7 days when start is unusable.
//! - `progress` is derived from status only: Completed=100,
//!   In Progress=50, otherwise 0.
//! - Editing progress always rewrites status (>=100 Completed, >0 In
//!   Progress, else New), even when the record was Pending.

use crate::model::project::{ProjectId, ProjectRecord, Status};
use crate::normalize::{format_date, gantt_style_tag, parse_lenient_date, GanttStyle};
use chrono::{Days, NaiveDate};
use serde::Serialize;

const DEFAULT_TASK_SPAN_DAYS: u64 = 7;

/// One bar on the Gantt chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GanttTask {
    pub id: ProjectId,
    pub name: String,
    pub start: String,
    pub end: String,
    pub progress: u8,
    pub dependencies: String,
    pub style_tag: Option<GanttStyle>,
    #[serde(rename = "brd")]
    pub reference_code: String,
    #[serde(rename = "pic")]
    pub owner: String,
    pub priority: String,
}

/// Partial update coming from the Gantt view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GanttEdit {
    pub start: Option<String>,
    pub end: Option<String>,
    pub progress: Option<i64>,
}

/// Progress percentage shown for a status.
pub fn progress_for_status(status: Status) -> u8 {
    match status {
        Status::Completed => 100,
        Status::InProgress => 50,
        Status::New | Status::Pending => 0,
    }
}

/// Status implied by an edited progress value.
pub fn status_for_progress(progress: i64) -> Status {
    if progress >= 100 {
        Status::Completed
    } else if progress > 0 {
        Status::InProgress
    } else {
        Status::New
    }
}

/// Builds Gantt tasks using `today` for records without usable dates.
pub fn gantt_tasks(records: &[ProjectRecord], today: NaiveDate) -> Vec<GanttTask> {
    records
        .iter()
        .map(|record| {
            let (start, end) = task_span(&record.submitted_on, &record.completed_on, today);
            let name = if record.title.is_empty() {
                record.brd_no.clone()
            } else {
                record.title.clone()
            };
            GanttTask {
                id: record.uid.clone(),
                name,
                start,
                end,
                progress: progress_for_status(record.status),
                dependencies: String::new(),
                style_tag: gantt_style_tag(&record.priority),
                reference_code: record.brd_no.clone(),
                owner: record.pic.clone(),
                priority: record.priority.clone(),
            }
        })
        .collect()
}

/// Applies a Gantt edit to one record in place.
pub fn apply_gantt_edit(record: &mut ProjectRecord, edit: &GanttEdit) {
    if let Some(start) = &edit.start {
        record.submitted_on = start.clone();
    }
    if let Some(end) = &edit.end {
        record.completed_on = end.clone();
    }
    if let Some(progress) = edit.progress {
        record.status = status_for_progress(progress);
    }
}

fn task_span(submitted_on: &str, completed_on: &str, today: NaiveDate) -> (String, String) {
    if !completed_on.is_empty() {
        return (submitted_on.to_string(), completed_on.to_string());
    }

    match parse_lenient_date(submitted_on).and_then(plus_span) {
        Some(end) => (submitted_on.to_string(), format_date(end)),
        None => (
            format_date(today),
            plus_span(today).map(format_date).unwrap_or_default(),
        ),
    }
}

fn plus_span(date: NaiveDate) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(DEFAULT_TASK_SPAN_DAYS))
}
