use projtrack_core::model::project::{COL_UID, SCHEMA_COLUMNS};
use projtrack_core::sheet::read_table_from_path;
use projtrack_core::{ProjectStore, Status};
use std::collections::HashSet;
use tempfile::TempDir;

fn store_in(dir: &TempDir) -> ProjectStore {
    ProjectStore::at_path(dir.path().join("projects.xlsx"))
}

#[test]
fn missing_workbook_is_seeded_with_five_records() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    assert!(!store.exists());

    let guard = store.lock();
    let records = store.load(&guard);

    assert!(store.exists());
    assert_eq!(records.len(), 5);
    let codes: Vec<&str> = records.iter().map(|r| r.brd_no.as_str()).collect();
    assert_eq!(codes, vec!["BRD101", "BRD102", "BRD103", "BRD104", "BRD105"]);
    assert_eq!(
        records.iter().map(|r| r.no).collect::<Vec<_>>(),
        vec![1, 2, 3, 4, 5]
    );
    assert_eq!(
        records.iter().filter(|r| !r.completed_on.is_empty()).count(),
        2
    );
    let ids: HashSet<&str> = records.iter().map(|r| r.uid.as_str()).collect();
    assert_eq!(ids.len(), 5);
}

#[test]
fn save_then_load_renumbers_and_roundtrips() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let guard = store.lock();

    let mut records = store.load(&guard);
    records.remove(1);
    records[0].status = Status::Pending;
    records[1].priority = "  High ".to_string();
    assert!(store.save(&guard, &mut records));

    let reloaded = store.load(&guard);
    assert_eq!(reloaded.len(), 4);
    assert_eq!(
        reloaded.iter().map(|r| r.no).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert_eq!(reloaded, records);
    assert_eq!(reloaded[0].status, Status::Pending);
    assert_eq!(reloaded[1].priority, "High");

    let mut again = reloaded.clone();
    assert!(store.save(&guard, &mut again));
    assert_eq!(store.load(&guard), reloaded);
}

#[test]
fn corrupt_workbook_loads_as_empty_collection() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    std::fs::write(store.workbook_file(), b"definitely not a workbook").unwrap();

    let guard = store.lock();
    assert!(store.try_load(&guard).is_err());
    assert!(store.load(&guard).is_empty());
    assert_eq!(
        std::fs::read(store.workbook_file()).unwrap(),
        b"definitely not a workbook"
    );
}

#[test]
fn save_reports_failure_instead_of_raising() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    std::fs::create_dir(store.workbook_file()).unwrap();

    let guard = store.lock();
    let mut records = vec![projtrack_core::ProjectRecord::new()];
    assert!(!store.save(&guard, &mut records));
    assert!(store.try_save(&guard, &mut records).is_err());
}

#[test]
fn extra_columns_are_written_but_dropped_on_reload() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let guard = store.lock();

    let mut records = store.load(&guard);
    records[0].set_field("Reviewer", "Dewi");
    assert!(store.save(&guard, &mut records));

    let table = read_table_from_path(store.workbook_file()).unwrap();
    let mut expected: Vec<String> = SCHEMA_COLUMNS.iter().map(|c| c.to_string()).collect();
    expected.push(COL_UID.to_string());
    expected.push("Reviewer".to_string());
    assert_eq!(table.headers, expected);
    let reviewer = table.column_index("Reviewer").unwrap();
    assert_eq!(table.cell(0, reviewer), "Dewi");

    let reloaded = store.load(&guard);
    assert!(reloaded.iter().all(|r| r.extra.is_empty()));
}

#[test]
fn blank_identities_in_file_are_repaired_on_load() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    let guard = store.lock();

    let mut records = store.load(&guard);
    let duplicate = records[0].uid.clone();
    records[1].uid = format!("  {duplicate} ");
    records[2].uid = String::new();
    assert!(store.save(&guard, &mut records));

    let reloaded = store.load(&guard);
    let ids: HashSet<&str> = reloaded.iter().map(|r| r.uid.as_str()).collect();
    assert_eq!(ids.len(), reloaded.len());
    assert_eq!(reloaded[0].uid, duplicate);
    assert!(reloaded.iter().all(|r| r.uid == r.uid.trim() && !r.uid.is_empty()));
}
