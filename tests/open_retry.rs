mod common;

use adxlink::{Config, Container, LinkError, OpenMode, exists, open_container, open_with};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

#[test]
fn writer_lock_without_retry_is_reported_immediately() {
    let td = tempdir().unwrap();
    let p = common::annotated_in(td.path(), "a.adx");
    let held = Container::open(&p, OpenMode::ReadWrite).unwrap();

    assert!(matches!(
        open_with(&Config::default(), &p, OpenMode::ReadOnly),
        Err(LinkError::Locked(_))
    ));
    // Non-fatal: by path the locked container is unreachable, so "absent";
    // the holder's own handle still sees the link.
    assert!(!exists(&Config::default(), &p, "X").unwrap());
    assert!(exists(&Config::default(), &held, "X").unwrap());
}

#[test]
fn readers_share_the_container() {
    let td = tempdir().unwrap();
    let p = common::annotated_in(td.path(), "a.adx");
    let _a = Container::open(&p, OpenMode::ReadOnly).unwrap();
    let b = open_with(&Config::default(), &p, OpenMode::ReadOnly).unwrap();
    assert!(b.kind_of("obs").is_some());
}

#[test]
fn retry_waits_for_the_lock_to_clear() {
    let td = tempdir().unwrap();
    let p = common::annotated_in(td.path(), "a.adx");

    let (locked_tx, locked_rx) = mpsc::channel();
    let holder = {
        let p = p.clone();
        thread::spawn(move || {
            let c = Container::open(&p, OpenMode::ReadWrite).unwrap();
            locked_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(300));
            c.close().unwrap();
        })
    };
    locked_rx.recv().unwrap();

    let start = Instant::now();
    let c = open_container(&p, OpenMode::ReadOnly, 10.0, 0.05).unwrap();
    assert!(start.elapsed() >= Duration::from_millis(100));
    assert_eq!(c.shape("X").unwrap(), vec![20, 80]);
    holder.join().unwrap();
}

#[test]
fn exhausted_retry_is_fatal() {
    let td = tempdir().unwrap();
    let p = common::annotated_in(td.path(), "a.adx");
    let _held = Container::open(&p, OpenMode::ReadWrite).unwrap();
    let cfg = Config::with_retry(0.3, 0.05);

    let err = open_with(&cfg, &p, OpenMode::ReadOnly).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.code(), 70);
    assert!(matches!(err, LinkError::OpenTimeout { ref source, .. } if matches!(**source, LinkError::Locked(_))));

    // Fatal failures are not swallowed by the existence check.
    assert!(matches!(exists(&cfg, &p, "X"), Err(LinkError::OpenTimeout { .. })));
}

#[test]
fn missing_file_with_retry_still_times_out() {
    let td = tempdir().unwrap();
    let p = td.path().join("late.adx");
    let err = open_container(&p, OpenMode::ReadOnly, 0.2, 0.05).unwrap_err();
    assert!(matches!(err, LinkError::OpenTimeout { ref source, .. } if matches!(**source, LinkError::FileNotFound(_))));
}
