//! Vocabulary normalization for free-form spreadsheet text.
//!
//! # Responsibility
//! - Map arbitrary status text onto the four canonical statuses.
//! - Canonicalize priority text (trim only, no enumeration).
//! - Provide the per-consumer priority classifiers used by projections.
//! - Parse loosely formatted date cells.
//!
//! # Invariants
//! - Every function here is total: no input makes it fail or panic.
//! - Dashboard and Gantt priority classification stay independent; they are
//!   not folded into one shared priority enum.

use crate::model::project::Status;
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

const PROGRESS_VARIANTS: &[&str] = &[
    "inprogress",
    "on progress",
    "onprogress",
    "progress",
    "on-progress",
];

static YEAR_FIRST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})(?:$|[ T])").expect("valid year-first regex")
});
static YEAR_LAST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})[-/.](\d{1,2})[-/.](\d{4})(?:$|[ T])").expect("valid year-last regex")
});

/// Maps arbitrary status text to a canonical [`Status`].
///
/// Matching is case-insensitive and substring based; the first rule that
/// matches wins:
/// 1. contains `new` and not `in` -> `New`
/// 2. contains `in progress` or one of the progress spellings -> `In Progress`
/// 3. contains `pending` -> `Pending`
/// 4. contains `complete` or `done` -> `Completed`
/// 5. contains any canonical label -> that label
/// 6. otherwise `New`
pub fn normalize_status(input: Option<&str>) -> Status {
    let value = match input {
        Some(raw) => raw.trim().to_lowercase(),
        None => return Status::New,
    };
    if value.is_empty() {
        return Status::New;
    }

    if value.contains("new") && !value.contains("in") {
        return Status::New;
    }
    if value.contains("in progress")
        || PROGRESS_VARIANTS
            .iter()
            .any(|variant| value.contains(variant))
    {
        return Status::InProgress;
    }
    if value.contains("pending") {
        return Status::Pending;
    }
    if value.contains("complete") || value.contains("done") {
        return Status::Completed;
    }

    Status::ALL
        .iter()
        .copied()
        .find(|status| value.contains(&status.label().to_lowercase()))
        .unwrap_or(Status::New)
}

/// Canonicalizes priority text. Absent input becomes empty; anything else is
/// only trimmed.
pub fn normalize_priority(input: Option<&str>) -> String {
    input.map(|raw| raw.trim().to_string()).unwrap_or_default()
}

/// Dashboard priority bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriorityBucket {
    Low,
    Medium,
    High,
    Urgent,
}

impl PriorityBucket {
    /// Fixed dashboard order.
    pub const ALL: [PriorityBucket; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    /// Display label used as the dashboard key.
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Urgent => "Urgent",
        }
    }
}

/// Classifies priority text into a dashboard bucket.
///
/// Checks `Low`, `Medium`, `High`, `Urgent` in that order by
/// case-insensitive substring. Off-vocabulary text (`Critical`, empty)
/// yields `None` and is left out of the distribution.
pub fn dashboard_priority_bucket(priority: &str) -> Option<PriorityBucket> {
    let lowered = priority.to_lowercase();
    PriorityBucket::ALL
        .into_iter()
        .find(|bucket| lowered.contains(&bucket.label().to_lowercase()))
}

/// Gantt styling tag derived from priority text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GanttStyle {
    Urgent,
    High,
}

/// Classifies priority text into a Gantt styling tag.
///
/// `urgent` wins over `high`; anything else carries no tag.
pub fn gantt_style_tag(priority: &str) -> Option<GanttStyle> {
    let lowered = priority.to_lowercase();
    if lowered.contains("urgent") {
        Some(GanttStyle::Urgent)
    } else if lowered.contains("high") {
        Some(GanttStyle::High)
    } else {
        None
    }
}

/// Parses a date cell leniently.
///
/// Accepts `YYYY-MM-DD` (also `/` or `.` separated, with an optional time
/// suffix) and `MM/DD/YYYY`, falling back to day-first when the month is out
/// of range. Returns `None` for anything unparseable instead of failing.
pub fn parse_lenient_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(caps) = YEAR_FIRST_RE.captures(trimmed) {
        let year = caps[1].parse().ok()?;
        let month = caps[2].parse().ok()?;
        let day = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    if let Some(caps) = YEAR_LAST_RE.captures(trimmed) {
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;
        let year = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, first, second)
            .or_else(|| NaiveDate::from_ymd_opt(year, second, first));
    }

    NaiveDateTime::parse_from_str(trimmed, "%d %b %Y %H:%M:%S")
        .map(|dt| dt.date())
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d %b %Y"))
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%b %d, %Y"))
        .ok()
}

/// Formats a date in the canonical `YYYY-MM-DD` form.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
