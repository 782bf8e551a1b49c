use std::fs;

use bell_ringer::{store::AlarmStore, AlarmRule, Day, Error};

fn rule(time: &str, message: &str, days: &[Day]) -> AlarmRule {
    AlarmRule::new(time.parse().unwrap(), message, days.iter().copied())
}

#[test]
fn missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = AlarmStore::open(dir.path().join("alarms.json")).unwrap();
    assert!(store.is_empty());
    assert!(!store.path().exists());
}

#[test]
fn malformed_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alarms.json");
    fs::write(&path, "[{\"time\": \"8:00\", \"text\": \"\", \"days\": []}]").unwrap();
    assert!(matches!(
        AlarmStore::open(&path),
        Err(Error::ParseAlarms { .. })
    ));

    fs::write(&path, "not json").unwrap();
    assert!(matches!(
        AlarmStore::load(&path),
        Err(Error::ParseAlarms { .. })
    ));

    fs::write(&path, "[{\"time\": \"08:00\", \"text\": \"\", \"days\": [\"Someday\"]}]").unwrap();
    assert!(matches!(
        AlarmStore::load(&path),
        Err(Error::ParseAlarms { .. })
    ));
}

#[test]
fn reads_files_written_by_hand() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alarms.json");
    fs::write(
        &path,
        r#"[
            {"time": "08:00", "text": "First period", "days": ["Monday", "Wednesday", "Friday"]},
            {"time": "12:30", "text": "", "days": []}
        ]"#,
    )
    .unwrap();
    let store = AlarmStore::open(&path).unwrap();
    assert_eq!(
        store.rules(),
        [
            rule("08:00", "First period", &[Day::Monday, Day::Wednesday, Day::Friday]),
            rule("12:30", "", &[]),
        ]
    );
}

#[test]
fn added_rules_survive_reload_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("alarms.json");
    let mut store = AlarmStore::open(&path).unwrap();
    let first = rule("14:30", "Reminder", &[Day::Tuesday]);
    let second = rule("07:00", "Wake up", &[Day::Saturday, Day::Sunday]);
    store.add(first.clone()).unwrap();
    store.add(second.clone()).unwrap();

    assert_eq!(AlarmStore::load(&path).unwrap(), [first, second]);
}

#[test]
fn delete_out_of_range_leaves_store_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alarms.json");
    let mut store = AlarmStore::open(&path).unwrap();
    assert!(matches!(
        store.delete_at(0),
        Err(Error::OutOfRange { index: 0, len: 0 })
    ));

    store.add(rule("09:00", "Assembly", &[Day::Monday])).unwrap();
    let before = fs::read_to_string(&path).unwrap();
    assert!(matches!(
        store.delete_at(1),
        Err(Error::OutOfRange { index: 1, len: 1 })
    ));
    assert!(matches!(store.delete_at(usize::MAX), Err(Error::OutOfRange { .. })));
    assert_eq!(store.len(), 1);
    assert_eq!(fs::read_to_string(&path).unwrap(), before);
}

#[test]
fn delete_keeps_order_of_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alarms.json");
    let mut store = AlarmStore::open(&path).unwrap();
    let rules = [
        rule("08:00", "one", &[Day::Monday]),
        rule("09:00", "two", &[Day::Monday]),
        rule("10:00", "three", &[Day::Monday]),
        rule("11:00", "four", &[Day::Monday]),
    ];
    for r in &rules {
        store.add(r.clone()).unwrap();
    }

    let removed = store.delete_at(1).unwrap();
    assert_eq!(removed, rules[1]);
    let expected = [rules[0].clone(), rules[2].clone(), rules[3].clone()];
    assert_eq!(store.rules(), expected);
    assert_eq!(AlarmStore::load(&path).unwrap(), expected);
}

#[test]
fn failed_write_does_not_apply() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alarms.json");
    let mut broken = AlarmStore::open(&path).unwrap();
    broken.add(rule("10:00", "kept", &[])).unwrap();
    // with a directory in the way every save fails
    fs::remove_file(&path).unwrap();
    fs::create_dir(&path).unwrap();

    assert!(matches!(
        broken.add(rule("11:00", "dropped", &[])),
        Err(Error::WriteAlarms { .. })
    ));
    assert_eq!(broken.len(), 1);
    assert!(matches!(broken.delete_at(0), Err(Error::WriteAlarms { .. })));
    assert_eq!(broken.rules(), [rule("10:00", "kept", &[])]);
}

#[test]
fn seeds_only_when_nothing_is_stored() {
    let dir = tempfile::tempdir().unwrap();
    let seed = dir.path().join("bundled.json");
    let path = dir.path().join("user").join("alarms.json");
    fs::write(&seed, r#"[{"time": "08:15", "text": "Bell", "days": ["Monday"]}]"#).unwrap();

    assert!(AlarmStore::seed(&path, &seed).unwrap());
    assert_eq!(AlarmStore::load(&path).unwrap(), [rule("08:15", "Bell", &[Day::Monday])]);

    fs::write(&path, "[]").unwrap();
    assert!(!AlarmStore::seed(&path, &seed).unwrap());
    assert!(AlarmStore::load(&path).unwrap().is_empty());

    let missing_seed = dir.path().join("nope.json");
    let other = dir.path().join("other.json");
    assert!(!AlarmStore::seed(&other, &missing_seed).unwrap());
    assert!(!other.exists());
}
