//! Tests for Engine
//!
//! These tests verify:
//! - String and sorted set operations
//! - Kind exclusivity (WRONGTYPE, migration on write)
//! - Command execution and reply shapes
//! - Restore from snapshot on open
//! - Concurrent access patterns
//! - Engine lifecycle (open/close)

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use skipkv::config::{Config, SnapshotFormat};
use skipkv::engine::Engine;
use skipkv::protocol::{parse_line, CommandError, Reply};
use skipkv::ttl::TtlStatus;
use skipkv::SkipKvError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn test_config(dir: &TempDir, format: SnapshotFormat) -> Config {
    Config::builder()
        .data_dir(dir.path())
        .snapshot_format(format)
        .snapshot_interval(Duration::ZERO) // Only explicit snapshots
        .build()
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(test_config(&temp_dir, SnapshotFormat::Text)).unwrap();
    (temp_dir, engine)
}

fn run(engine: &Engine, line: &str) -> Reply {
    engine.execute(parse_line(line).unwrap()).unwrap()
}

// =============================================================================
// String Operation Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directory() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("mydb");

    let config = Config::builder()
        .data_dir(&data_dir)
        .snapshot_interval(Duration::ZERO)
        .build();
    let engine = Engine::open(config).unwrap();

    assert!(data_dir.exists());
    assert_eq!(engine.snapshot_path(), data_dir.join("backup.txt"));
    assert_eq!(engine.key_count(), 0);
}

#[test]
fn test_engine_set_get() {
    let (_temp, engine) = setup_temp_engine();

    engine.set("hello", "world", None).unwrap();
    assert_eq!(engine.get("hello").unwrap(), Some("world".to_string()));
    assert_eq!(engine.get("missing").unwrap(), None);
}

#[test]
fn test_engine_set_overwrite() {
    let (_temp, engine) = setup_temp_engine();

    engine.set("key", "value1", None).unwrap();
    engine.set("key", "value2", None).unwrap();

    assert_eq!(engine.get("key").unwrap(), Some("value2".to_string()));
    assert_eq!(engine.key_count(), 1);
}

#[test]
fn test_engine_del_counts_live_keys() {
    let (_temp, engine) = setup_temp_engine();

    engine.set("a", "1", None).unwrap();
    engine.zadd("z", &[(1, "m".to_string())]).unwrap();

    assert_eq!(engine.del(&["a", "z", "nope"]).unwrap(), 2);
    assert_eq!(engine.del(&["a"]).unwrap(), 0);
    assert_eq!(engine.key_count(), 0);
    assert_eq!(engine.ttl("a").unwrap(), TtlStatus::Missing);
}

#[test]
fn test_engine_ttl_states() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(engine.ttl("nosuchkey").unwrap().as_i64(), -2);

    engine.set("k", "v", None).unwrap();
    assert_eq!(engine.ttl("k").unwrap().as_i64(), -1);

    assert!(engine.expire("k", 100).unwrap());
    assert_eq!(engine.ttl("k").unwrap().as_i64(), 100);
}

// =============================================================================
// Sorted Set Operation Tests
// =============================================================================

#[test]
fn test_engine_zadd_zrange_zrank() {
    let (_temp, engine) = setup_temp_engine();

    let added = engine
        .zadd("myset", &[(1, "a".to_string()), (2, "b".to_string()), (3, "c".to_string())])
        .unwrap();
    assert_eq!(added, 3);

    let range = engine.zrange("myset", 0, -1).unwrap().unwrap();
    assert_eq!(
        range,
        vec![("a".to_string(), 1), ("b".to_string(), 2), ("c".to_string(), 3)]
    );
    assert_eq!(engine.zrank("myset", "b").unwrap(), Some(2));
    assert_eq!(engine.zrank("myset", "zz").unwrap(), Some(0));
    assert_eq!(engine.zrank("nosuchset", "a").unwrap(), None);
}

#[test]
fn test_engine_zadd_updates_score() {
    let (_temp, engine) = setup_temp_engine();

    engine.zadd("z", &[(1, "a".to_string()), (2, "b".to_string())]).unwrap();
    let added = engine.zadd("z", &[(5, "a".to_string())]).unwrap();

    assert_eq!(added, 0);
    assert_eq!(engine.zrank("z", "a").unwrap(), Some(2));
}

// =============================================================================
// Kind Exclusivity Tests
// =============================================================================

#[test]
fn test_engine_get_on_sorted_set_is_wrong_kind() {
    let (_temp, engine) = setup_temp_engine();

    engine.set("k", "v", None).unwrap();
    engine.zadd("k", &[(1, "m".to_string())]).unwrap();

    assert!(matches!(engine.get("k"), Err(SkipKvError::WrongKind)));
    assert_eq!(
        run(&engine, "GET k"),
        Reply::Error(CommandError::WrongType)
    );
}

#[test]
fn test_engine_zrange_on_string_is_wrong_kind() {
    let (_temp, engine) = setup_temp_engine();

    engine.set("s", "v", None).unwrap();
    assert_eq!(run(&engine, "ZRANGE s 0 -1"), Reply::Error(CommandError::WrongType));
    assert_eq!(run(&engine, "ZRANK s m"), Reply::Error(CommandError::WrongType));

    // Nothing changed
    assert_eq!(engine.get("s").unwrap(), Some("v".to_string()));
}

#[test]
fn test_engine_set_replaces_sorted_set() {
    let (_temp, engine) = setup_temp_engine();

    engine.zadd("k", &[(1, "m".to_string())]).unwrap();
    engine.set("k", "now a string", None).unwrap();

    assert_eq!(engine.get("k").unwrap(), Some("now a string".to_string()));
    assert!(matches!(engine.zrank("k", "m"), Err(SkipKvError::WrongKind)));
}

// =============================================================================
// Command Execution Tests
// =============================================================================

#[test]
fn test_engine_execute_scenario() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(run(&engine, "ZADD myset 1 a 2 b 3 c"), Reply::Ok);
    assert_eq!(
        run(&engine, "ZRANGE myset 0 -1 WITHSCORES"),
        Reply::Array(
            ["a", "1", "b", "2", "c", "3"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        )
    );
    assert_eq!(
        run(&engine, "ZRANGE myset 0 -1"),
        Reply::Array(vec!["a".to_string(), "b".to_string(), "c".to_string()])
    );
    assert_eq!(run(&engine, "ZRANK myset b"), Reply::Integer(2));
    assert_eq!(run(&engine, "ZRANK myset q"), Reply::Integer(0));
    assert_eq!(run(&engine, "ZRANGE nosuch 0 -1"), Reply::Nil);
}

#[test]
fn test_engine_execute_string_commands() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(run(&engine, "SET foo bar"), Reply::Ok);
    assert_eq!(run(&engine, "GET foo"), Reply::Bulk("bar".to_string()));
    assert_eq!(run(&engine, "TTL nosuchkey"), Reply::Integer(-2));
    assert_eq!(run(&engine, "DEL nosuchkey"), Reply::Integer(0));
    assert_eq!(run(&engine, "DEL foo"), Reply::Integer(1));
    assert_eq!(run(&engine, "GET foo"), Reply::Nil);
}

#[test]
fn test_engine_execute_del_multiple_reports_one() {
    let (_temp, engine) = setup_temp_engine();

    run(&engine, "SET a 1");
    run(&engine, "SET b 2");
    assert_eq!(run(&engine, "DEL a b"), Reply::Integer(1));
    assert_eq!(engine.key_count(), 0);
}

#[test]
fn test_engine_execute_expire_replies() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(run(&engine, "EXPIRE nosuch 10"), Reply::Nil);
    assert_eq!(run(&engine, "TTL nosuch"), Reply::Integer(-2));

    run(&engine, "SET k v");
    assert_eq!(run(&engine, "EXPIRE k 10"), Reply::Ok);
    assert_eq!(run(&engine, "EXPIRE k 0"), Reply::Ok);
    assert_eq!(run(&engine, "GET k"), Reply::Nil);
}

// =============================================================================
// Restore Tests
// =============================================================================

#[test]
fn test_engine_close_then_reopen_restores() {
    for format in [SnapshotFormat::Text, SnapshotFormat::Binary] {
        let temp_dir = TempDir::new().unwrap();

        {
            let engine = Engine::open(test_config(&temp_dir, format)).unwrap();
            engine.set("greeting", "hello", None).unwrap();
            engine.set("url", "http://example.com", None).unwrap();
            engine
                .zadd("board", &[(10, "x".to_string()), (-3, "y".to_string())])
                .unwrap();
            engine.close().unwrap();
        }

        let engine = Engine::open(test_config(&temp_dir, format)).unwrap();
        assert_eq!(engine.get("greeting").unwrap(), Some("hello".to_string()));
        assert_eq!(engine.get("url").unwrap(), Some("http://example.com".to_string()));
        assert_eq!(
            engine.zrange("board", 1, -1).unwrap().unwrap(),
            vec![("y".to_string(), -3), ("x".to_string(), 10)]
        );
        // Restored keys carry no expiry
        assert_eq!(engine.ttl("greeting").unwrap(), TtlStatus::Persistent);
    }
}

#[test]
fn test_engine_restore_disabled_starts_empty() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(test_config(&temp_dir, SnapshotFormat::Text)).unwrap();
        engine.set("k", "v", None).unwrap();
        engine.close().unwrap();
    }

    let config = Config::builder()
        .data_dir(temp_dir.path())
        .snapshot_interval(Duration::ZERO)
        .restore_on_open(false)
        .build();
    let engine = Engine::open(config).unwrap();
    assert_eq!(engine.get("k").unwrap(), None);
}

#[test]
fn test_engine_corrupt_snapshot_fails_open() {
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("backup.bin"), b"SKVS garbage").unwrap();

    let result = Engine::open(test_config(&temp_dir, SnapshotFormat::Binary));
    assert!(matches!(result, Err(SkipKvError::SnapshotCorrupt(_))));
}

// =============================================================================
// Close/Lifecycle Tests
// =============================================================================

#[test]
fn test_engine_close_is_idempotent() {
    let (_temp, engine) = setup_temp_engine();

    engine.set("k", "v", None).unwrap();
    engine.close().unwrap();
    engine.close().unwrap();

    assert!(engine.is_closed());
    assert!(engine.snapshot_path().exists());
    assert!(matches!(engine.set("k", "v2", None), Err(SkipKvError::Shutdown)));
    assert!(matches!(engine.get("k"), Err(SkipKvError::Shutdown)));
}

#[test]
fn test_engine_periodic_snapshot_writes_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .snapshot_interval(Duration::from_millis(50))
        .build();
    let engine = Engine::open(config).unwrap();
    engine.set("k", "v", None).unwrap();

    thread::sleep(Duration::from_millis(300));
    let contents = std::fs::read_to_string(engine.snapshot_path()).unwrap();
    assert!(contents.starts_with("k:v,"));
}

#[test]
fn test_engine_concurrent_snapshots_leave_valid_file() {
    for format in [SnapshotFormat::Text, SnapshotFormat::Binary] {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::builder()
            .data_dir(temp_dir.path())
            .snapshot_format(format)
            .snapshot_interval(Duration::from_millis(1))
            .build();

        {
            let engine = Arc::new(Engine::open(config.clone()).unwrap());
            for i in 0..200 {
                engine.set(&format!("key{}", i), &format!("value{}", i), None).unwrap();
            }
            engine.zadd("board", &[(1, "a".to_string()), (2, "b".to_string())]).unwrap();

            let mut handles = vec![];
            for _ in 0..4 {
                let engine_clone = Arc::clone(&engine);
                handles.push(thread::spawn(move || {
                    for _ in 0..20 {
                        engine_clone.snapshot().unwrap();
                    }
                }));
            }
            for handle in handles {
                handle.join().unwrap();
            }
            engine.close().unwrap();
        }

        let engine = Engine::open(config).unwrap();
        assert_eq!(engine.key_count(), 201);
        assert_eq!(engine.get("key199").unwrap(), Some("value199".to_string()));
        assert_eq!(engine.zrank("board", "b").unwrap(), Some(2));
    }
}

#[test]
fn test_engine_open_path_convenience() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open_path(temp_dir.path()).unwrap();

    assert_eq!(engine.data_dir(), temp_dir.path());
    assert_eq!(engine.config().read_workers, 3);
}

#[test]
fn test_engine_zero_read_workers_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .read_workers(0)
        .build();

    assert!(matches!(Engine::open(config), Err(SkipKvError::Config(_))));
}

// =============================================================================
// Concurrent Access Tests
// =============================================================================

#[test]
fn test_engine_concurrent_reads() {
    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    for i in 0..100 {
        engine.set(&format!("key{}", i), &format!("value{}", i), None).unwrap();
    }

    let mut handles = vec![];
    for _ in 0..4 {
        let engine_clone = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..100 {
                let result = engine_clone.get(&format!("key{}", i)).unwrap();
                assert_eq!(result, Some(format!("value{}", i)));
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_engine_concurrent_zadd_keeps_ranks_consistent() {
    let (_temp, engine) = setup_temp_engine();
    let engine = Arc::new(engine);

    let mut handles = vec![];
    for t in 0..4i64 {
        let engine_clone = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..50i64 {
                let member = format!("t{}-{}", t, i);
                engine_clone.zadd("board", &[(t * 1000 + i, member)]).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let all = engine.zrange("board", 1, -1).unwrap().unwrap();
    assert_eq!(all.len(), 200);
    for (i, (member, _)) in all.iter().enumerate() {
        assert_eq!(engine.zrank("board", member).unwrap(), Some(i + 1));
    }
}
