use std::path::PathBuf;

use litekit::{Connection, Error, OpenMode};

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("litekit_{}_{name}.db", std::process::id()))
}

#[test]
fn a_created_database_reopens_read_only_for_reads_but_not_writes() {
    let path = scratch_path("reopen");
    let _ = std::fs::remove_file(&path);

    {
        let db = Connection::open(path.to_str().unwrap(), OpenMode::create_read_write()).unwrap();
        db.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")
            .unwrap();
        db.execute_batch("INSERT INTO t (name) VALUES ('kept')").unwrap();
    }

    let db = Connection::open(path.to_str().unwrap(), OpenMode::read_only()).unwrap();

    let mut stmt = db.prepare("SELECT name FROM t").unwrap();
    let mut rows = stmt.execute().unwrap();
    assert!(rows.has_row());
    assert_eq!(rows.read::<String>(), "kept");
    drop(rows);
    drop(stmt);

    let err = db.execute_batch("INSERT INTO t (name) VALUES ('denied')").unwrap_err();
    match err {
        Error::Query(msg) => assert!(msg.contains("readonly"), "message: {msg}"),
        other => panic!("unexpected error: {other}"),
    }

    drop(db);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn read_write_without_create_requires_an_existing_file() {
    let path = scratch_path("nocreate");
    let _ = std::fs::remove_file(&path);

    let err = Connection::open(path.to_str().unwrap(), OpenMode::read_write()).unwrap_err();
    assert!(matches!(err, Error::Open(_)), "unexpected error: {err}");
}

#[test]
fn the_memory_flag_opens_a_private_database_per_connection() {
    let mode = OpenMode {
        memory: true,
        ..OpenMode::default()
    };

    let first = Connection::open("scratch", mode).unwrap();
    first.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
    first.execute_batch("INSERT INTO t VALUES (1)").unwrap();

    // A second connection under the same name sees none of it.
    let second = Connection::open("scratch", mode).unwrap();
    let err = second.prepare("SELECT x FROM t").unwrap_err();
    assert!(matches!(err, Error::Prepare(_)), "unexpected error: {err}");
}
