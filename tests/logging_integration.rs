use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use tempfile::tempdir;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt as tsfmt, registry};

use blob_backup::platform::open_log_file_secure_append;
use blob_backup::{resolve_destination_name, BackupError, NamePolicy};

/// Appends written bytes into a shared in-memory buffer.
#[derive(Clone)]
struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture<F: FnOnce()>(filter: &str, f: F) -> String {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let make_writer = {
        let buf = buf.clone();
        move || BufferWriter(buf.clone())
    };
    let layer = tsfmt::layer()
        .with_writer(make_writer)
        .with_ansi(false)
        .compact();
    let subscriber = registry().with(EnvFilter::new(filter)).with(layer);
    let dispatch = tracing::Dispatch::new(subscriber);
    tracing::dispatcher::with_default(&dispatch, f);
    let guard = buf.lock().unwrap();
    String::from_utf8_lossy(&guard[..]).to_string()
}

#[test]
fn resolver_logs_chosen_container_at_debug() {
    let ts = NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    let out = capture("debug", || {
        resolve_destination_name("mydata", &ts, &NamePolicy::default(), |_| {
            Ok::<bool, BackupError>(false)
        })
        .unwrap();
    });
    assert!(out.contains("20240315-0930-backup-mydata"), "contents={out}");
}

#[test]
fn secrets_never_reach_the_log() {
    let src = blob_backup::SourceContainer::new("srcacct", "mydata", "c3VwZXJzZWNyZXQ=");
    let out = capture("info", || {
        tracing::info!(source = ?src, "configured source");
    });
    assert!(out.contains("srcacct"));
    assert!(!out.contains("c3VwZXJzZWNyZXQ="), "contents={out}");
}

#[test]
fn json_events_carry_structured_fields() {
    let buf = Arc::new(Mutex::new(Vec::new()));
    let make_writer = {
        let buf = buf.clone();
        move || BufferWriter(buf.clone())
    };
    let layer = tsfmt::layer()
        .event_format(tsfmt::format().json())
        .with_writer(make_writer);
    let subscriber = registry().with(EnvFilter::new("info")).with(layer);
    let dispatch = tracing::Dispatch::new(subscriber);
    tracing::dispatcher::with_default(&dispatch, || {
        let err = BackupError::NameExhaustion {
            source_name: "mydata".into(),
            attempts: 3,
        };
        tracing::error!(code = err.code(), kind = err.kind(), source = "mydata", "Backup failed");
    });

    let text = String::from_utf8_lossy(&buf.lock().unwrap()[..]).to_string();
    let line = text.lines().next().expect("one event");
    let v: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(v["level"], "ERROR");
    assert_eq!(v["fields"]["code"], 20);
    assert_eq!(v["fields"]["source"], "mydata");
    assert_eq!(v["fields"]["message"], "Backup failed");
}

#[test]
fn file_logging_writes_to_custom_path() {
    let td = tempdir().expect("tempdir");
    let log_path = td.path().join("blob_backup_test.log");

    // The binary refuses file logging under a symlinked ancestor (common on macOS temp dirs).
    if blob_backup::path_has_symlink_ancestor(&log_path).unwrap() {
        eprintln!("Skipping file logging test: path has symlink ancestor: {}", log_path.display());
        return;
    }

    let file = open_log_file_secure_append(&log_path).expect("open_log_file_secure_append");
    let (writer, guard) = tracing_appender::non_blocking(file);
    let file_layer = tsfmt::layer()
        .with_writer(move || writer.clone())
        .with_target(false)
        .compact();
    let subscriber = registry().with(EnvFilter::new("info")).with(file_layer);
    let dispatch = tracing::Dispatch::new(subscriber);
    tracing::dispatcher::with_default(&dispatch, || {
        tracing::info!("file-logging-test: written");
    });
    drop(guard);

    let contents = std::fs::read_to_string(&log_path).expect("read log file");
    assert!(contents.contains("file-logging-test"), "contents={contents}");
}
