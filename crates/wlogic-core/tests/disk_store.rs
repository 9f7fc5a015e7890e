// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]

use wlogic_core::{Backend, DataStore, EntityId, Model, ArgType, StoreError};

fn collect(store: &mut DataStore, name: &str) -> Vec<(Vec<EntityId>, Option<f64>)> {
    let p = store.partition(name).unwrap();
    let mut out = Vec::new();
    store
        .scan(&[p], &mut |f| out.push((f.args, f.value)))
        .unwrap();
    out
}

#[test]
fn disk_log_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = Model::new();
    let pred = model.add_predicate("Knows", &[ArgType::UniqueId, ArgType::UniqueId]).unwrap();
    {
        let mut store = DataStore::open(Backend::Disk, dir.path(), true).unwrap();
        let obs = store.partition("obs").unwrap();
        let tgt = store.partition("tgt").unwrap();
        store.insert_valued(obs, pred, 0.25, &[EntityId(0), EntityId(1)]).unwrap();
        store.insert(tgt, pred, &[EntityId(1), EntityId(0)]).unwrap();
        store.close().unwrap();
    }

    // Partition numbering follows first-use order, so ask in the same order.
    let mut store = DataStore::open(Backend::Disk, dir.path(), false).unwrap();
    assert_eq!(
        collect(&mut store, "obs"),
        vec![(vec![EntityId(0), EntityId(1)], Some(0.25))]
    );
    assert_eq!(
        collect(&mut store, "tgt"),
        vec![(vec![EntityId(1), EntityId(0)], None)]
    );
}

#[test]
fn truncate_discards_previous_log() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = Model::new();
    let pred = model.add_predicate("Knows", &[ArgType::UniqueId]).unwrap();
    {
        let mut store = DataStore::open(Backend::Disk, dir.path(), true).unwrap();
        let obs = store.partition("obs").unwrap();
        store.insert_valued(obs, pred, 1.0, &[EntityId(9)]).unwrap();
    }
    let mut store = DataStore::open(Backend::Disk, dir.path(), true).unwrap();
    assert!(collect(&mut store, "obs").is_empty());
}

#[test]
fn corrupt_header_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    {
        let mut store = DataStore::open(Backend::Disk, dir.path(), true).unwrap();
        store.close().unwrap();
    }
    std::fs::write(dir.path().join("facts.wlog"), b"NOPE\x01\x00").unwrap();
    let mut store = DataStore::open(Backend::Disk, dir.path(), false).unwrap();
    let p = store.partition("obs").unwrap();
    let err = store.scan(&[p], &mut |_| {}).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { offset: 0, .. }));
}

#[test]
fn memory_backend_ignores_directory() {
    let mut store =
        DataStore::open(Backend::Memory, std::path::Path::new("/nonexistent/dir"), true).unwrap();
    let p = store.partition("obs").unwrap();
    let mut model = Model::new();
    let pred = model.add_predicate("Knows", &[ArgType::UniqueId]).unwrap();
    store.insert(p, pred, &[EntityId(1)]).unwrap();
    assert_eq!(store.fact_count(), 1);
}

#[test]
fn truncated_tail_record_is_reported_as_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = Model::new();
    let pred = model.add_predicate("Knows", &[ArgType::UniqueId, ArgType::UniqueId]).unwrap();
    {
        let mut store = DataStore::open(Backend::Disk, dir.path(), true).unwrap();
        let obs = store.partition("obs").unwrap();
        store.insert_valued(obs, pred, 0.5, &[EntityId(0), EntityId(1)]).unwrap();
        store.insert_valued(obs, pred, 0.75, &[EntityId(1), EntityId(0)]).unwrap();
        store.close().unwrap();
    }
    let path = dir.path().join("facts.wlog");
    let len = std::fs::metadata(&path).unwrap().len();
    // header 6 + two records of 4 + 6 + 8 + 8 bytes; drop the last 3 bytes.
    assert_eq!(len, 6 + 2 * 26);
    std::fs::OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(len - 3)
        .unwrap();

    let mut store = DataStore::open(Backend::Disk, dir.path(), false).unwrap();
    let p = store.partition("obs").unwrap();
    let mut seen = 0;
    let err = store.scan(&[p], &mut |_| seen += 1).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { offset: 32, .. }), "{err:?}");
    assert_eq!(seen, 1);
}
