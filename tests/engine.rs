use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use serde::Serialize;
use tempfile::TempDir;

use logbook::{
    CallSite, Config, LogLevel, Logbook, ReadError, SNAPSHOT_IDENTIFIER, ROTATION_THRESHOLD_BYTES,
};

fn logbook(temp_dir: &TempDir) -> Logbook {
    Logbook::new(&Config::with_storage_dir(temp_dir.path()))
}

fn site(file: &str) -> CallSite {
    CallSite::new(file, "engine::tests", 1)
}

#[derive(Serialize)]
struct ObjA {
    name: String,
}

#[derive(Serialize)]
struct ObjB {
    values: Vec<u8>,
}

#[test]
fn test_start_message_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let book = logbook(&temp_dir);

    book.log_at(site("Sources/App/Foo.swift"), "start", None, LogLevel::Info)
        .unwrap();

    let entries = book.load_log_entries("Foo").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, "start");
    assert_eq!(entries[0].level, LogLevel::Info);
    assert!(!entries[0].is_snapshot);
    assert!(entries[0].object_name.is_none());
}

#[test]
fn test_rotation_keeps_file_under_threshold() {
    let temp_dir = TempDir::new().unwrap();
    let book = logbook(&temp_dir);

    // Eleven 1 MiB messages: 11 MiB in total
    let chunk = 1024 * 1024;
    for i in 0..11 {
        let message = format!("{:02}{}", i, "x".repeat(chunk - 2));
        book.log_at(site("Bar.rs"), message, None, LogLevel::Info)
            .unwrap();
    }

    let files = book.list_log_files().unwrap();
    let bar = files.iter().find(|f| f.identifier() == "Bar").unwrap();
    assert!(bar.size <= ROTATION_THRESHOLD_BYTES);

    let entries = book.load_log_entries("Bar").unwrap();
    assert!(entries.len() < 11);
    assert!(entries.last().unwrap().message.starts_with("10"));
    assert!(!entries.iter().any(|e| e.message.starts_with("00")));

    // Survivors are the most recent, still in order
    let first = entries[0].message[..2].parse::<usize>().unwrap();
    for (offset, entry) in entries.iter().enumerate() {
        assert_eq!(entry.message[..2].parse::<usize>().unwrap(), first + offset);
    }
}

#[test]
fn test_oversized_single_entry_is_kept() {
    let temp_dir = TempDir::new().unwrap();
    let book = Logbook::with_root_and_threshold(temp_dir.path().join("logging"), 256);

    book.log_at(site("Big.rs"), "small", None, LogLevel::Info).unwrap();
    let big = "y".repeat(4096);
    book.log_at(site("Big.rs"), big.clone(), None, LogLevel::Error)
        .unwrap();

    let entries = book.load_log_entries("Big").unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].message, big);
}

#[test]
fn test_concurrent_appends_to_one_destination() {
    let temp_dir = TempDir::new().unwrap();
    let book = Arc::new(logbook(&temp_dir));

    let threads = 16;
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let book = Arc::clone(&book);
            thread::spawn(move || {
                book.log_at(site("Shared.rs"), format!("thread {}", t), None, LogLevel::Info)
                    .unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let entries = book.load_log_entries("Shared").unwrap();
    assert_eq!(entries.len(), threads);
    for t in 0..threads {
        let expected = format!("thread {}", t);
        assert_eq!(entries.iter().filter(|e| e.message == expected).count(), 1);
    }
}

#[test]
fn test_concurrent_appends_to_many_destinations() {
    let temp_dir = TempDir::new().unwrap();
    let book = Arc::new(logbook(&temp_dir));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let book = Arc::clone(&book);
            thread::spawn(move || {
                let file = format!("Worker{}.rs", t);
                for i in 0..25 {
                    book.log_at(site(&file), format!("m{}", i), None, LogLevel::Debug)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let files = book.list_log_files().unwrap();
    assert_eq!(files.len(), 4);
    assert!(files.iter().all(|f| f.entry_count == 25));
    assert!(files.iter().all(|f| f.count(LogLevel::Debug) == 25));

    // Per-destination order follows append order
    let messages: Vec<_> = book
        .load_log_entries("Worker2")
        .unwrap()
        .into_iter()
        .map(|e| e.message)
        .collect();
    let expected: Vec<_> = (0..25).map(|i| format!("m{}", i)).collect();
    assert_eq!(messages, expected);
}

#[test]
fn test_reads_never_observe_partial_writes() {
    let temp_dir = TempDir::new().unwrap();
    // Small threshold so rotation runs while the reader is active
    let book = Arc::new(Logbook::with_root_and_threshold(
        temp_dir.path().join("logging"),
        64 * 1024,
    ));
    let appends = 150;
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let book = Arc::clone(&book);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let padding = "z".repeat(4000);
            for i in 0..appends {
                let message = format!("{:04} {}", i, padding);
                book.log_at(site("Shared.rs"), message, None, LogLevel::Info)
                    .unwrap();
            }
            done.store(true, Ordering::SeqCst);
        })
    };

    let mut newest_seen: Option<usize> = None;
    let mut loads = 0;
    loop {
        let finished = done.load(Ordering::SeqCst);
        let entries = book.load_log_entries("Shared").unwrap();
        loads += 1;

        let seqs: Vec<usize> = entries
            .iter()
            .map(|e| e.message[..4].parse().unwrap())
            .collect();
        // Every observed file is a contiguous run of the most recent appends
        for pair in seqs.windows(2) {
            assert_eq!(pair[1], pair[0] + 1);
        }
        if let Some(&newest) = seqs.last() {
            assert!(newest_seen.map_or(true, |seen| newest >= seen));
            newest_seen = Some(newest);
        }

        if finished {
            break;
        }
    }
    writer.join().unwrap();

    assert!(loads > 0);
    assert_eq!(newest_seen, Some(appends - 1));
    let files = book.list_log_files().unwrap();
    assert!(files[0].size <= 64 * 1024);
}

#[test]
fn test_repeated_loads_are_identical() {
    let temp_dir = TempDir::new().unwrap();
    let book = logbook(&temp_dir);

    book.log_at(site("Foo.rs"), "one", None, LogLevel::Warning)
        .unwrap();
    let first = book.load_log_entries("Foo").unwrap();
    let second = book.load_log_entries("Foo").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_snapshot_scenario() {
    let temp_dir = TempDir::new().unwrap();
    let book = logbook(&temp_dir);

    let written = book
        .try_snapshot(&[
            &ObjA {
                name: "a".to_string(),
            },
            &ObjB { values: vec![1, 2] },
        ])
        .unwrap();
    assert_eq!(written, 2);

    let entries = book.load_log_entries(SNAPSHOT_IDENTIFIER).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.is_snapshot));
    assert_eq!(entries[0].object_name.as_deref(), Some("ObjA"));
    assert_eq!(entries[1].object_name.as_deref(), Some("ObjB"));
    assert!(entries.iter().all(|e| e.object_data.is_some()));
}

#[test]
fn test_delete_and_clear() {
    let temp_dir = TempDir::new().unwrap();
    let book = logbook(&temp_dir);

    book.delete_log_file("DoesNotExist").unwrap();

    book.log_at(site("Foo.rs"), "a", None, LogLevel::Info).unwrap();
    book.log_at(site("Bar.rs"), "b", None, LogLevel::Info).unwrap();
    book.delete_log_file("Foo").unwrap();
    let names: Vec<_> = book
        .list_log_files()
        .unwrap()
        .into_iter()
        .map(|f| f.file_name)
        .collect();
    assert_eq!(names, vec!["Bar.json"]);

    book.clear_logs().unwrap();
    assert!(book.list_log_files().unwrap().is_empty());
    let stats = book.log_file_stats().unwrap();
    assert_eq!(stats.file_count, 0);
    assert_eq!(stats.total_size, 0);
}

#[test]
fn test_corrupt_file_is_reported_and_preserved() {
    let temp_dir = TempDir::new().unwrap();
    let book = logbook(&temp_dir);
    let path = temp_dir.path().join("logging").join("Foo.json");

    book.log_at(site("Foo.rs"), "ok", None, LogLevel::Info).unwrap();
    std::fs::write(&path, b"[{\"message\":\"cut off").unwrap();

    assert!(matches!(
        book.load_log_entries("Foo"),
        Err(ReadError::Corrupt(_))
    ));
    assert!(book.log_at(site("Foo.rs"), "more", None, LogLevel::Info).is_err());
    assert_eq!(std::fs::read(&path).unwrap(), b"[{\"message\":\"cut off");

    // Still counted in listings and stats
    let stats = book.log_file_stats().unwrap();
    assert_eq!(stats.file_count, 1);
    assert_eq!(stats.total_size, 20);
}
