use stats::{GroupId, Normalizer, StatsStore, StoreError};

fn trained(name: &str) -> Normalizer {
    let groups = vec![GroupId(0), GroupId(0), GroupId::NONE];
    let mut norm = Normalizer::with_options(name, 3, Some(groups), 0.02, 10.0).unwrap();
    norm.update(&[[0.1, 0.7, 3.0], [1.9, -0.3, 4.0], [0.37, 0.11, 5.0]])
        .unwrap();
    norm
}

#[test]
fn store_round_trips_through_a_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("normalizers.json");

    let s_norm = trained("s_norm");
    let a_norm = {
        let mut a = Normalizer::new("a_norm", 1);
        a.update(&[[0.5], [-0.25]]).unwrap();
        a
    };

    let mut store = StatsStore::new();
    store.insert(&s_norm);
    store.insert(&a_norm);
    store.write(&path).unwrap();

    let loaded = StatsStore::read(&path).unwrap();
    assert_eq!(loaded, store);
    assert_eq!(loaded.names().collect::<Vec<_>>(), vec!["a_norm", "s_norm"]);

    let mut fresh = Normalizer::with_options(
        "s_norm",
        3,
        Some(vec![GroupId(0), GroupId(0), GroupId::NONE]),
        0.02,
        10.0,
    )
    .unwrap();
    assert!(loaded.restore(&mut fresh).unwrap());
    assert_eq!(fresh.count(), s_norm.count());
    assert_eq!(fresh.mean(), s_norm.mean());
    assert_eq!(fresh.std(), s_norm.std());
}

#[test]
fn restore_skips_unknown_streams() {
    let store = StatsStore::new();
    let mut g_norm = Normalizer::new("g_norm", 2);
    assert!(!store.restore(&mut g_norm).unwrap());
    assert_eq!(g_norm.count(), 0);
}

#[test]
fn restore_reports_shape_problems_by_name() {
    let mut store = StatsStore::new();
    store.insert(&trained("s_norm"));
    let mut narrow = Normalizer::new("s_norm", 2);
    match store.restore(&mut narrow) {
        Err(StoreError::Normalizer { name, .. }) => assert_eq!(name, "s_norm"),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn missing_and_malformed_files_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        StatsStore::read(dir.path().join("absent.json")),
        Err(StoreError::Io { .. })
    ));

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{ not json").unwrap();
    assert!(matches!(StatsStore::read(&bad), Err(StoreError::Json(_))));
}
