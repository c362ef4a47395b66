//! Router Tests
//!
//! Tests for command dispatch through the reader pool and writer.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use skipkv::config::Config;
use skipkv::engine::Engine;
use skipkv::protocol::{parse_line, CommandError, Reply};
use skipkv::{Router, SkipKvError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_router(read_workers: usize) -> (TempDir, Arc<Router>) {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .snapshot_interval(Duration::ZERO)
        .read_workers(read_workers)
        .build();
    let engine = Arc::new(Engine::open(config).unwrap());
    let router = Router::new(engine).unwrap();
    (temp_dir, Arc::new(router))
}

// =============================================================================
// Dispatch Tests
// =============================================================================

#[test]
fn test_router_basic_session() {
    let (_temp, router) = setup_router(2);

    assert_eq!(router.execute("SET foo bar").unwrap(), Reply::Ok);
    assert_eq!(router.execute("get foo").unwrap(), Reply::Bulk("bar".to_string()));
    assert_eq!(router.execute("ZADD myset 1 a 2 b 3 c").unwrap(), Reply::Ok);
    assert_eq!(router.execute("ZRANK myset b").unwrap(), Reply::Integer(2));
    assert_eq!(
        router.execute("ZRANGE myset 0 -1 WITHSCORES").unwrap().to_string(),
        "1) a\n2) 1\n3) b\n4) 2\n5) c\n6) 3"
    );
}

#[test]
fn test_router_malformed_lines_reply_with_catalog_errors() {
    let (_temp, router) = setup_router(1);

    assert_eq!(router.execute("").unwrap(), Reply::Error(CommandError::InvalidInput));
    assert_eq!(router.execute("FLY away").unwrap(), Reply::Error(CommandError::InvalidInput));
    assert_eq!(router.execute("SET k").unwrap(), Reply::Error(CommandError::InvalidSet));
    assert_eq!(router.execute("ZADD k 1").unwrap(), Reply::Error(CommandError::InvalidZAdd));

    // Nothing was written
    assert_eq!(router.engine().key_count(), 0);
}

#[test]
fn test_router_wrong_type_reply() {
    let (_temp, router) = setup_router(1);

    router.execute("SET k v").unwrap();
    router.execute("ZADD k 1 m").unwrap();
    assert_eq!(
        router.execute("GET k").unwrap().to_string(),
        "WRONGTYPE Operation against a key holding the wrong kind of value"
    );
}

#[test]
fn test_router_huge_expiry_keeps_writer_alive() {
    let (_temp, router) = setup_router(1);

    assert_eq!(router.execute("SET k v EX 18446744073709551615").unwrap(), Reply::Ok);
    assert_eq!(router.execute("SET other x").unwrap(), Reply::Ok);
    assert_eq!(
        router.execute("EXPIRE other 9223372036854775807").unwrap(),
        Reply::Ok
    );
    assert_eq!(router.execute("GET other").unwrap(), Reply::Bulk("x".to_string()));
    assert_eq!(router.execute("GET k").unwrap(), Reply::Bulk("v".to_string()));
    assert!(matches!(router.execute("TTL k").unwrap(), Reply::Integer(n) if n > 0));
}

#[test]
fn test_router_submit_returns_reply_channel() {
    let (_temp, router) = setup_router(1);

    let pending = router.submit(parse_line("SET a 1").unwrap()).unwrap();
    assert_eq!(pending.recv().unwrap().unwrap(), Reply::Ok);

    let pending = router.submit(parse_line("GET a").unwrap()).unwrap();
    assert_eq!(pending.recv().unwrap().unwrap(), Reply::Bulk("1".to_string()));
}

#[test]
fn test_router_writes_apply_in_submission_order() {
    let (_temp, router) = setup_router(2);

    let pending: Vec<_> = (0..100)
        .map(|i| router.submit(parse_line(&format!("SET k {}", i)).unwrap()).unwrap())
        .collect();
    for reply in pending {
        assert_eq!(reply.recv().unwrap().unwrap(), Reply::Ok);
    }

    assert_eq!(router.execute("GET k").unwrap(), Reply::Bulk("99".to_string()));
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_router_concurrent_clients() {
    let (_temp, router) = setup_router(4);

    let mut handles = vec![];
    for t in 0..4 {
        let router_clone = Arc::clone(&router);
        handles.push(thread::spawn(move || {
            for i in 0..50 {
                let key = format!("t{}-k{}", t, i);
                let line = format!("SET {} v{}", key, i);
                assert_eq!(router_clone.execute(&line).unwrap(), Reply::Ok);
                assert_eq!(
                    router_clone.execute(&format!("GET {}", key)).unwrap(),
                    Reply::Bulk(format!("v{}", i))
                );
                router_clone
                    .execute(&format!("ZADD board {} {}", t * 100 + i, key))
                    .unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(router.engine().key_count(), 201);
    match router.execute("ZRANGE board 1 -1").unwrap() {
        Reply::Array(members) => assert_eq!(members.len(), 200),
        other => panic!("Expected array, got {:?}", other),
    }
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_router_shutdown_rejects_new_commands() {
    let (_temp, router) = setup_router(2);

    router.execute("SET k v").unwrap();
    router.shutdown();
    router.shutdown();

    assert!(matches!(router.execute("GET k"), Err(SkipKvError::Shutdown)));
}

#[test]
fn test_router_reports_closed_engine() {
    let (_temp, router) = setup_router(1);

    router.engine().close().unwrap();
    assert!(matches!(router.execute("SET k v"), Err(SkipKvError::Shutdown)));
    assert!(matches!(router.execute("GET k"), Err(SkipKvError::Shutdown)));
}

#[test]
fn test_router_zero_workers_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp_dir.path())
        .snapshot_interval(Duration::ZERO)
        .build();
    let engine = Arc::new(Engine::open(config).unwrap());

    assert!(matches!(
        Router::with_workers(engine, 0),
        Err(SkipKvError::Config(_))
    ));
}
