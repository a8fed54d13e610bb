//! Timeline event projection.

use crate::model::project::ProjectRecord;
use crate::normalize::parse_lenient_date;
use chrono::NaiveDate;
use serde::Serialize;

/// Kind of timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Submit,
    Completed,
}

/// One dated event derived from a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEvent {
    /// Date text exactly as stored.
    pub date: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(rename = "brd")]
    pub reference_code: String,
    pub title: String,
    #[serde(rename = "pic")]
    pub owner: String,
    pub note: String,
}

impl TimelineEvent {
    fn from_record(record: &ProjectRecord, kind: EventKind, date: &str) -> Self {
        Self {
            date: date.to_string(),
            kind,
            reference_code: record.brd_no.clone(),
            title: record.title.clone(),
            owner: record.pic.clone(),
            note: record.notes.clone(),
        }
    }
}

/// Emits submit/completed events for every record, oldest first.
///
/// Events whose date does not parse sort as the earliest possible date, so
/// they lead the list. Ties keep record order.
pub fn timeline_events(records: &[ProjectRecord]) -> Vec<TimelineEvent> {
    let mut events: Vec<TimelineEvent> = records
        .iter()
        .flat_map(|record| {
            [
                (EventKind::Submit, &record.submitted_on),
                (EventKind::Completed, &record.completed_on),
            ]
            .into_iter()
            .filter(|(_, date)| !date.trim().is_empty())
            .map(move |(kind, date)| TimelineEvent::from_record(record, kind, date))
        })
        .collect();

    events.sort_by_cached_key(|event| parse_lenient_date(&event.date).unwrap_or(NaiveDate::MIN));
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(brd: &str, submitted_on: &str, completed_on: &str) -> ProjectRecord {
        let mut record = ProjectRecord::new();
        record.brd_no = brd.to_string();
        record.submitted_on = submitted_on.to_string();
        record.completed_on = completed_on.to_string();
        record
    }

    #[test]
    fn records_emit_zero_one_or_two_events() {
        let records = vec![
            record("A", "", ""),
            record("B", "2024-02-01", ""),
            record("C", "2024-01-01", "2024-03-01"),
        ];
        let events = timeline_events(&records);
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.reference_code != "A"));
    }

    #[test]
    fn events_sort_chronologically_with_unparseable_first() {
        let records = vec![
            record("late", "2024-05-01", ""),
            record("early", "2024-01-15", "2024-06-01"),
            record("junk", "someday", ""),
        ];
        let events = timeline_events(&records);
        let order: Vec<(&str, EventKind)> = events
            .iter()
            .map(|e| (e.reference_code.as_str(), e.kind))
            .collect();
        assert_eq!(
            order,
            vec![
                ("junk", EventKind::Submit),
                ("early", EventKind::Submit),
                ("late", EventKind::Submit),
                ("early", EventKind::Completed),
            ]
        );
        assert_eq!(events[0].date, "someday");
    }

    #[test]
    fn event_serializes_with_type_key() {
        let events = timeline_events(&[record("X", "2024-01-01", "")]);
        let json = serde_json::to_value(&events[0]).expect("event should serialize");
        assert_eq!(json["type"], "submit");
        assert_eq!(json["brd"], "X");
        assert_eq!(json["date"], "2024-01-01");
    }
}
