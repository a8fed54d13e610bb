//! Project record domain model.
//!
//! # Responsibility
//! - Define the canonical tracked-project record and its column schema.
//! - Map spreadsheet column names onto typed record fields.
//!
//! # Invariants
//! - `uid` is the only stable identity; `no` is display-only and is
//!   recomputed from position on every load/save.
//! - `status` is always one of the four canonical values.
//! - Columns outside the schema are carried in `extra` and never shadow a
//!   canonical field.

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub const COL_NO: &str = "No";
pub const COL_BRD_NO: &str = "BRD No";
pub const COL_TITLE: &str = "Project/Fitur";
pub const COL_LINK: &str = "Link BRD";
pub const COL_PIC: &str = "PIC";
pub const COL_CONTACT: &str = "Contact Person";
pub const COL_STATUS: &str = "Status";
pub const COL_PRIORITY: &str = "Priority";
pub const COL_SUBMITTED: &str = "Tanggal Submit";
pub const COL_COMPLETED: &str = "Tanggal Completed";
pub const COL_NOTES: &str = "Catatan";
/// Identity column, always persisted after the schema columns.
pub const COL_UID: &str = "uid";

/// Canonical schema columns in persisted order (identity excluded).
pub const SCHEMA_COLUMNS: [&str; 11] = [
    COL_NO,
    COL_BRD_NO,
    COL_TITLE,
    COL_LINK,
    COL_PIC,
    COL_CONTACT,
    COL_STATUS,
    COL_PRIORITY,
    COL_SUBMITTED,
    COL_COMPLETED,
    COL_NOTES,
];

/// Stable project identifier in its persisted (string) form.
pub type ProjectId = String;

/// Mints a fresh UUID-v4 identity.
pub fn new_project_id() -> ProjectId {
    Uuid::new_v4().to_string()
}

/// Canonical project status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    #[default]
    New,
    InProgress,
    Pending,
    Completed,
}

impl Status {
    /// Canonical statuses in display order.
    pub const ALL: [Status; 4] = [
        Status::New,
        Status::InProgress,
        Status::Pending,
        Status::Completed,
    ];

    /// Persisted label.
    pub fn label(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "In Progress",
            Self::Pending => "Pending",
            Self::Completed => "Completed",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// One tracked project row.
///
/// Serialized with the spreadsheet column names so JSON consumers see the
/// same keys as the workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    #[serde(rename = "No")]
    pub no: usize,
    #[serde(rename = "BRD No")]
    pub brd_no: String,
    #[serde(rename = "Project/Fitur")]
    pub title: String,
    #[serde(rename = "Link BRD")]
    pub link: String,
    #[serde(rename = "PIC")]
    pub pic: String,
    #[serde(rename = "Contact Person")]
    pub contact_person: String,
    #[serde(rename = "Status")]
    pub status: Status,
    #[serde(rename = "Priority")]
    pub priority: String,
    #[serde(rename = "Tanggal Submit")]
    pub submitted_on: String,
    #[serde(rename = "Tanggal Completed")]
    pub completed_on: String,
    #[serde(rename = "Catatan")]
    pub notes: String,
    pub uid: ProjectId,
    /// Ad hoc columns supplied by callers outside the canonical schema.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ProjectRecord {
    /// Creates an empty record with a freshly minted identity.
    pub fn new() -> Self {
        Self::with_id(new_project_id())
    }

    /// Creates an empty record with a caller-provided identity.
    pub fn with_id(uid: impl Into<ProjectId>) -> Self {
        Self {
            no: 0,
            brd_no: String::new(),
            title: String::new(),
            link: String::new(),
            pic: String::new(),
            contact_person: String::new(),
            status: Status::New,
            priority: String::new(),
            submitted_on: String::new(),
            completed_on: String::new(),
            notes: String::new(),
            uid: uid.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Reads a field by spreadsheet column name.
    ///
    /// Returns `None` for unknown columns that are not present in `extra`.
    pub fn get_field(&self, column: &str) -> Option<String> {
        let value = match column {
            COL_NO => self.no.to_string(),
            COL_BRD_NO => self.brd_no.clone(),
            COL_TITLE => self.title.clone(),
            COL_LINK => self.link.clone(),
            COL_PIC => self.pic.clone(),
            COL_CONTACT => self.contact_person.clone(),
            COL_STATUS => self.status.label().to_string(),
            COL_PRIORITY => self.priority.clone(),
            COL_SUBMITTED => self.submitted_on.clone(),
            COL_COMPLETED => self.completed_on.clone(),
            COL_NOTES => self.notes.clone(),
            COL_UID => self.uid.clone(),
            other => return self.extra.get(other).cloned(),
        };
        Some(value)
    }

    /// Writes a field by spreadsheet column name.
    ///
    /// Status and priority pass through the normalizer. `No` and the
    /// identity column are owned by the store and are ignored here. Unknown
    /// columns land in `extra`.
    pub fn set_field(&mut self, column: &str, value: impl Into<String>) {
        let value = value.into();
        match column {
            COL_NO | COL_UID => {}
            COL_BRD_NO => self.brd_no = value,
            COL_TITLE => self.title = value,
            COL_LINK => self.link = value,
            COL_PIC => self.pic = value,
            COL_CONTACT => self.contact_person = value,
            COL_STATUS => self.status = crate::normalize::normalize_status(Some(&value)),
            COL_PRIORITY => self.priority = crate::normalize::normalize_priority(Some(&value)),
            COL_SUBMITTED => self.submitted_on = value,
            COL_COMPLETED => self.completed_on = value,
            COL_NOTES => self.notes = value,
            other => {
                self.extra.insert(other.to_string(), value);
            }
        }
    }
}

impl Default for ProjectRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_has_uuid_identity_and_empty_fields() {
        let record = ProjectRecord::new();
        assert!(Uuid::parse_str(&record.uid).is_ok());
        assert_eq!(record.status, Status::New);
        assert!(record.brd_no.is_empty());
        assert!(record.priority.is_empty());
        assert!(record.extra.is_empty());
    }

    #[test]
    fn set_field_normalizes_status_and_priority() {
        let mut record = ProjectRecord::new();
        record.set_field(COL_STATUS, "done");
        record.set_field(COL_PRIORITY, "  High ");
        assert_eq!(record.status, Status::Completed);
        assert_eq!(record.priority, "High");
    }

    #[test]
    fn set_field_keeps_unknown_columns_and_ignores_owned_ones() {
        let mut record = ProjectRecord::with_id("fixed-id");
        record.set_field("Budget", "10k");
        record.set_field(COL_UID, "other-id");
        record.set_field(COL_NO, "42");
        assert_eq!(record.get_field("Budget").as_deref(), Some("10k"));
        assert_eq!(record.uid, "fixed-id");
        assert_eq!(record.no, 0);
        assert_eq!(record.get_field("Missing"), None);
    }

    #[test]
    fn record_serializes_with_column_names() {
        let mut record = ProjectRecord::with_id("abc");
        record.brd_no = "BRD1".to_string();
        record.status = Status::InProgress;
        record.extra.insert("Budget".to_string(), "5".to_string());

        let json = serde_json::to_value(&record).expect("record should serialize");
        assert_eq!(json["BRD No"], "BRD1");
        assert_eq!(json["Status"], "In Progress");
        assert_eq!(json["uid"], "abc");
        assert_eq!(json["Budget"], "5");
    }
}
