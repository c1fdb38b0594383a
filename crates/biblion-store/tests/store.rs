//! Transaction behaviour of a file-backed store

use std::sync::Arc;
use std::thread;

use biblion_core::{ColumnDef, TableSchema, Value};
use biblion_store::{PopulationLogEntry, Store, StoreError};

fn schema(name: &str) -> TableSchema {
    TableSchema::new(name, vec![ColumnDef::text("key"), ColumnDef::integer("n")])
}

#[test]
fn failed_batch_leaves_last_commit() {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&dir.path().join("store.duckdb")).unwrap();
    store.create_table(&schema("t")).unwrap();

    let mut batch = store.begin_batch().unwrap();
    for i in 0..5 {
        batch.insert_row("t", &[Value::text(format!("k{i}")), Value::Integer(i)]).unwrap();
    }
    batch.commit().unwrap();

    let result: Result<(), StoreError> = (|| {
        let mut batch = store.begin_batch()?;
        batch.insert_row("t", &[Value::text("k5"), Value::Integer(5)])?;
        // wrong arity fails inside the transaction
        batch.insert_row("t", &[Value::text("k6")])?;
        batch.commit()
    })();
    assert!(result.is_err());
    assert_eq!(store.row_count("t").unwrap(), 5);

    // the store stays usable after the rollback
    let mut batch = store.begin_batch().unwrap();
    batch.insert_row("t", &[Value::text("k5"), Value::Integer(5)]).unwrap();
    batch.commit().unwrap();
    assert_eq!(store.row_count("t").unwrap(), 6);
}

#[test]
fn concurrent_jobs_serialise_batches() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    store.create_table(&schema("a")).unwrap();
    store.create_table(&schema("b")).unwrap();

    let handles: Vec<_> = ["a", "b"]
        .into_iter()
        .map(|table| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for chunk in 0..10 {
                    let mut batch = store.begin_batch().unwrap();
                    for i in 0..20 {
                        batch
                            .insert_row(table, &[Value::text(table), Value::Integer(chunk * 20 + i)])
                            .unwrap();
                    }
                    batch.commit().unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(store.row_count("a").unwrap(), 200);
    assert_eq!(store.row_count("b").unwrap(), 200);
    let stray = store.query("SELECT count(*) FROM a WHERE key <> 'a'").unwrap();
    assert_eq!(stray[0][0], Value::Integer(0));
}

#[test]
fn first_log_entries_race_safely() {
    let store = Arc::new(Store::open_in_memory().unwrap());
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store.record_population(&PopulationLogEntry {
                    destination: format!("t{i}"),
                    source_table: "works".to_string(),
                    mode: "append".to_string(),
                    rows: i,
                })
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap().unwrap();
    }
    assert_eq!(store.population_log().unwrap().len(), 8);
}

#[test]
fn failed_commit_rolls_back() {
    let store = Store::open_in_memory().unwrap();
    store.create_table(&schema("t")).unwrap();

    let mut batch = store.begin_batch().unwrap();
    batch.insert_row("t", &[Value::text("k0"), Value::Integer(0)]).unwrap();
    // a runtime error aborts the transaction
    assert!(batch.execute("SELECT error('boom')").is_err());
    let _ = batch.commit();

    let mut batch = store.begin_batch().unwrap();
    batch.insert_row("t", &[Value::text("k1"), Value::Integer(1)]).unwrap();
    batch.commit().unwrap();
    let keys = store.query("SELECT key FROM t").unwrap();
    assert_eq!(keys, vec![vec![Value::text("k1")]]);
}
