use projtrack_core::{
    ImportMode, ProjectService, ServiceError, Status, Table, TrackerConfig,
};
use rust_xlsxwriter::Workbook;
use tempfile::TempDir;

fn service_in(dir: &TempDir) -> ProjectService {
    ProjectService::new(&TrackerConfig::with_data_dir(dir.path()))
}

fn workbook_bytes(sheets: Vec<(&str, Vec<Vec<&str>>)>) -> Vec<u8> {
    let mut workbook = Workbook::new();
    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name).unwrap();
        for (row, cells) in rows.iter().enumerate() {
            for (col, value) in cells.iter().enumerate() {
                worksheet
                    .write_string(row as u32, col as u16, *value)
                    .unwrap();
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

fn two_row_batch() -> Vec<Vec<&'static str>> {
    vec![
        vec!["No", "brd_no", "project/fitur", "status", "Priority"],
        vec!["1", "BRD300", "Imported A", "on progress", " High "],
        vec!["2", "BRD301", "Imported B", "", ""],
    ]
}

#[test]
fn append_matches_columns_case_and_space_insensitively() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    let bytes = workbook_bytes(vec![("Sheet1", two_row_batch())]);

    let outcome = service.import_workbook(&bytes, "append", None).unwrap();
    assert_eq!(outcome.mode, ImportMode::Append);
    assert_eq!(outcome.imported, 2);
    assert!(outcome.backup.is_none());

    let records = service.list_records();
    assert_eq!(records.len(), 7);
    assert_eq!(records[5].brd_no, "BRD300");
    assert_eq!(records[6].brd_no, "BRD301");
    assert_eq!(records[5].title, "Imported A");
    assert_eq!(records[5].status, Status::InProgress);
    assert_eq!(records[5].priority, "High");
    assert_eq!(records[6].status, Status::New);
    assert_eq!(records[6].no, 7);
    assert_eq!(records[0].brd_no, "BRD101");
}

#[test]
fn replace_snapshots_before_discarding_rows() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    let seeded = service.list_records();
    assert_eq!(seeded.len(), 5);

    let bytes = workbook_bytes(vec![("Sheet1", two_row_batch())]);
    let outcome = service.import_workbook(&bytes, "REPLACE", None).unwrap();

    let backup = outcome.backup.expect("replace should snapshot the seeded store");
    assert!(backup.starts_with("replace_backup_"));
    assert_eq!(service.list_backups().unwrap(), vec![backup.clone()]);

    let records = service.list_records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].no, 1);
    assert!(records.iter().all(|r| seeded.iter().all(|s| s.uid != r.uid)));

    let snapshot = projtrack_core::sheet::read_table_from_bytes(
        &service.fetch_backup(&backup).unwrap(),
        None,
    )
    .unwrap();
    assert_eq!(snapshot.rows.len(), 5);
}

#[test]
fn replace_without_existing_workbook_proceeds_without_backup() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    assert!(!service.store().exists());

    let bytes = workbook_bytes(vec![("Sheet1", two_row_batch())]);
    let outcome = service.import_workbook(&bytes, "replace", None).unwrap();

    assert!(outcome.backup.is_none());
    assert_eq!(outcome.imported, 2);
    assert_eq!(service.list_records().len(), 2);
    assert!(service.list_backups().unwrap().is_empty());
}

#[test]
fn sheet_selector_accepts_index_or_name() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    let bytes = workbook_bytes(vec![
        ("Cover", vec![vec!["Title"], vec!["Quarterly import"]]),
        (
            "Data",
            vec![vec!["BRD No", "Project/Fitur"], vec!["BRD400", "From sheet"]],
        ),
    ]);

    let by_name = service
        .import_workbook(&bytes, "replace", Some("Data"))
        .unwrap();
    assert_eq!(by_name.imported, 1);
    assert_eq!(service.list_records()[0].brd_no, "BRD400");

    let by_index = service.import_workbook(&bytes, "append", Some("1")).unwrap();
    assert_eq!(by_index.imported, 1);
    assert_eq!(service.list_records().len(), 2);

    let missing = service.import_workbook(&bytes, "append", Some("Nope"));
    assert!(matches!(missing, Err(ServiceError::Import(_))));
}

#[test]
fn invalid_mode_and_empty_batch_are_validation_errors() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    let before = service.list_records();

    let bytes = workbook_bytes(vec![("Sheet1", two_row_batch())]);
    assert!(matches!(
        service.import_workbook(&bytes, "merge", None),
        Err(ServiceError::Validation(_))
    ));

    let header_only = workbook_bytes(vec![(
        "Sheet1",
        vec![vec!["BRD No", "Project/Fitur"], vec!["", ""]],
    )]);
    assert!(matches!(
        service.import_workbook(&header_only, "replace", None),
        Err(ServiceError::Validation(_))
    ));

    assert_eq!(service.list_records(), before);
    assert!(service.list_backups().unwrap().is_empty());
}

#[test]
fn unreadable_upload_leaves_store_untouched() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    let before = service.list_records();

    let result = service.import_workbook(b"garbage bytes", "replace", None);
    match result {
        Err(ServiceError::Import(detail)) => assert!(!detail.is_empty()),
        other => panic!("expected import error, got {other:?}"),
    }
    assert_eq!(service.list_records(), before);
}

#[test]
fn decoded_tables_import_through_the_same_rules() {
    let dir = TempDir::new().unwrap();
    let service = service_in(&dir);
    let table = Table {
        headers: vec!["BRD_NO".to_string(), "Catatan".to_string(), "uid".to_string()],
        rows: vec![vec![
            "BRD500".to_string(),
            "from api".to_string(),
            "source-id".to_string(),
        ]],
    };

    let outcome = service.import_batch(&table, "append").unwrap();
    assert_eq!(outcome.imported, 1);
    let last = service.list_records().pop().unwrap();
    assert_eq!(last.brd_no, "BRD500");
    assert_eq!(last.notes, "from api");
    assert_ne!(last.uid, "source-id");
}
