use pretty_assertions::assert_eq;
use serde_json::json;

use schoold::auth::{authenticate, AuthError};
use schoold::backup::{restore_snapshot, write_snapshot, BackupError};
use schoold::export::{render, ExportError, ExportFormat};
use schoold::filter::{derive_view, CategoryFilter, ListQuery, Summarize};
use schoold::models::user::merge_profile;
use schoold::models::{AccountStatus, Facility, FacilityStatus, Profile, Student, User};
use schoold::permissions::{PermissionSummary, StudentWrite};
use schoold::storage::{MemoryStorage, SqliteStorage, Storage};
use schoold::store::{record_from_params, Collection, Entity, StoreError};
use schoold::stores::Stores;

fn pupil(name: &str, class: &str) -> Student {
    let params = json!({
        "name": name,
        "class": class,
        "age": 10,
        "parent": "Guardian",
        "phone": "+256 700 000 000",
        "fees": "Pending",
    });
    record_from_params(params.as_object().expect("object")).expect("student")
}

fn date() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2024, 6, 1).expect("date")
}

#[test]
fn added_record_appears_exactly_once_in_unfiltered_list() {
    let mut storage = MemoryStorage::new();
    let mut students = Collection::<Student>::load(&storage);
    let added = students
        .add(&mut storage, pupil("Esther Akello", "P.3A"), 0)
        .expect("add");

    let view = derive_view(students.items(), &ListQuery::new());
    assert_eq!(view.records.iter().filter(|s| s.id == added.id).count(), 1);
    assert_eq!(view.matched, 9);
}

#[test]
fn filtering_twice_gives_the_same_result() {
    let storage = MemoryStorage::new();
    let students = Collection::<Student>::load(&storage);
    let query = ListQuery::new()
        .search(Some("na"))
        .facet("fees", CategoryFilter::parse(Some("Paid")));

    let once = query.apply(students.items());
    let twice = query.apply(&once);
    assert_eq!(once, twice);
    assert!(!once.is_empty());
}

#[test]
fn delete_removes_one_and_absent_id_is_not_found() {
    let mut storage = MemoryStorage::new();
    let mut students = Collection::<Student>::load(&storage);
    let before = students.items().len();

    students.delete(&mut storage, "SS005").expect("delete");
    assert_eq!(students.items().len(), before - 1);

    let err = students.delete(&mut storage, "SS005").unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    assert_eq!(students.items().len(), before - 1);
}

#[test]
fn csv_has_header_plus_one_line_per_record_and_empty_input_errors() {
    let storage = MemoryStorage::new();
    let students = Collection::<Student>::load(&storage);
    let payload = render(students.items(), ExportFormat::Csv, date()).expect("render");
    assert_eq!(payload.content.lines().count(), students.items().len() + 1);
    assert_eq!(payload.filename, "students_2024-06-01.csv");

    let none: Vec<Student> = Vec::new();
    let err = render(&none, ExportFormat::Csv, date()).unwrap_err();
    assert!(matches!(err, ExportError::Empty("student")));
    assert_eq!(err.to_string(), "No student records to export");
}

#[test]
fn sqlite_persist_and_reload_reproduces_collection() {
    let workspace = tempfile::tempdir().expect("workspace");
    let original = {
        let mut storage = SqliteStorage::open(workspace.path()).expect("open");
        let mut students = Collection::<Student>::load(&storage);
        let mut record = pupil("Brian \"BJ\" Okot", "P.2B");
        record.address = Some("Plot 4, Kampala Road".into());
        students.add(&mut storage, record, 0).expect("add");
        students.items().to_vec()
    };

    let storage = SqliteStorage::open(workspace.path()).expect("reopen");
    let reloaded = Collection::<Student>::load(&storage);
    assert_eq!(reloaded.items(), original.as_slice());
    assert_eq!(reloaded.revision(), 1);
}

#[test]
fn facility_stats_count_each_status() {
    let items = Facility::defaults();
    let statuses: Vec<FacilityStatus> = items.iter().map(|f| f.status).collect();
    assert_eq!(
        statuses,
        vec![
            FacilityStatus::Available,
            FacilityStatus::Occupied,
            FacilityStatus::Maintenance
        ]
    );
    let stats = Facility::summarize(&items);
    assert_eq!(
        (stats.total, stats.available, stats.occupied, stats.maintenance),
        (3, 1, 1, 1)
    );
}

#[test]
fn string_true_class_teacher_flag_matches_boolean() {
    let users = User::defaults();
    let robert = users.iter().find(|u| u.id == "4").expect("robert");
    let classes = json!({ "classesTaught": "[\"P.6A\",\"P.7B\"]" });

    let as_string: Profile = serde_json::from_value(json!({
        "isClassTeacher": "true",
        "classesTaught": classes["classesTaught"],
    }))
    .expect("profile");
    let as_bool = merge_profile(
        &Profile::default(),
        json!({ "isClassTeacher": true, "classesTaught": ["P.6A", "P.7B"] })
            .as_object()
            .expect("object"),
    );

    let a = PermissionSummary::derive(robert, &as_string);
    let b = PermissionSummary::derive(robert, &as_bool);
    assert_eq!(a, b);
    assert_eq!(a.student_write, StudentWrite::Queued);
    assert_eq!(a.student_write_for("P.5A"), StudentWrite::Denied);
}

#[test]
fn failed_write_keeps_data_in_memory_with_a_warning() {
    let mut storage = MemoryStorage::with_quota(256);
    let mut students = Collection::<Student>::load(&storage);
    let added = students
        .add(&mut storage, pupil("Overflow Kid", "P.1A"), 0)
        .expect("degraded add still succeeds");

    assert!(students.get(&added.id).is_some());
    assert!(students.degraded().is_some());
    assert!(storage.get("students").expect("get").is_none());

    let stores = Stores::load(&storage);
    assert_eq!(stores.students.items().len(), 8);
}

#[test]
fn stale_revision_is_rejected() {
    let mut storage = MemoryStorage::new();
    let mut first = Collection::<Student>::load(&storage);
    let mut second = Collection::<Student>::load(&storage);

    first
        .add(&mut storage, pupil("First Writer", "P.1A"), 0)
        .expect("first add");
    assert!(matches!(
        first.check_revision(Some(0)),
        Err(StoreError::Conflict { expected: 0, found: 1, .. })
    ));

    let err = second
        .add(&mut storage, pupil("Second Writer", "P.1A"), 0)
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));
    assert!(second.items().iter().any(|s| s.name == "First Writer"));
    assert!(!second.items().iter().any(|s| s.name == "Second Writer"));
}

#[test]
fn login_tells_bad_credentials_from_restricted_accounts() {
    let mut users = User::defaults();
    assert_eq!(
        authenticate(&users, "mary.smith@pupil.rising-stars.edu", "wrong").unwrap_err(),
        AuthError::InvalidCredentials
    );
    users[1].account_status = AccountStatus::Expelled;
    assert_eq!(
        authenticate(&users, "mary.smith@pupil.rising-stars.edu", "pupil123").unwrap_err(),
        AuthError::AccountRestricted {
            status: AccountStatus::Expelled
        }
    );
}

#[test]
fn snapshot_round_trip_and_unreadable_bundle_is_refused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let bundle = dir.path().join("school.zip");

    let mut source = MemoryStorage::new();
    let mut students = Collection::<Student>::load(&source);
    students
        .add(&mut source, pupil("Snapshot Kid", "P.4B"), 0)
        .expect("add");
    let summary = write_snapshot(&source, &bundle).expect("snapshot");
    assert_eq!(summary.entry_count, 1);

    let mut target = MemoryStorage::new();
    restore_snapshot(&bundle, &mut target).expect("restore");
    let restored = Collection::<Student>::load(&target);
    assert_eq!(restored.items(), students.items());

    let garbage = dir.path().join("garbage.zip");
    std::fs::write(&garbage, b"not a zip").expect("write garbage");
    let mut untouched = MemoryStorage::new();
    let err = restore_snapshot(&garbage, &mut untouched).unwrap_err();
    assert!(matches!(err, BackupError::Bundle(_)));
    assert!(untouched.keys().expect("keys").is_empty());
}
