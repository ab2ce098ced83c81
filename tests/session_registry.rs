// tests/session_registry.rs

use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use forge::errors::ForgeError;
use forge::fs::mock::MockFileSystem;
use forge::fs::{FileSystem, RealFileSystem};
use forge::session::lock;
use forge::session::{
    LockOptions, NewSession, ProcessProbe, SessionRegistry, SessionStatus, SignalProbe,
    LOCK_FILE, REGISTRY_DIR, REGISTRY_FILE,
};
use forge_test_utils::init_tracing;
use forge_test_utils::probes::StaticProbe;
use tempfile::tempdir;

fn new_session(item: &str) -> NewSession {
    NewSession::new("dev", "implement", format!("forge/{item}"), format!("/tmp/wt/{item}"))
        .with_work_item(item)
}

fn mock_registry(fs: &MockFileSystem, probe: StaticProbe) -> SessionRegistry {
    SessionRegistry::with_parts(
        "/repo",
        Arc::new(fs.clone()),
        Arc::new(probe),
        LockOptions {
            retries: 3,
            backoff: Duration::from_millis(1),
        },
    )
}

#[test]
fn test_missing_registry_reads_empty() {
    let dir = tempdir().unwrap();
    let registry = SessionRegistry::open(dir.path());

    assert!(registry.list().unwrap().is_empty());
    assert!(!registry.is_executing("req-001").unwrap());
    assert_eq!(
        registry.path(),
        dir.path().join(REGISTRY_DIR).join(REGISTRY_FILE)
    );
}

#[test]
fn test_register_persists_camel_case_json() {
    let dir = tempdir().unwrap();
    let registry = SessionRegistry::open(dir.path());

    let session = registry.register(new_session("req-001").with_pid(4242)).unwrap();
    assert_eq!(session.status, SessionStatus::Active);
    assert_eq!(session.pid, 4242);
    assert_eq!(session.id.len(), 36);

    let raw = std::fs::read_to_string(registry.path()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["version"], 1);
    let stored = &json["sessions"][0];
    assert_eq!(stored["workItem"], "req-001");
    assert_eq!(stored["worktreePath"], "/tmp/wt/req-001");
    assert_eq!(stored["status"], "active");
    assert!(stored["startedAt"].as_str().unwrap().contains('T'));

    // Lock released after the mutation.
    assert!(!dir.path().join(REGISTRY_DIR).join(LOCK_FILE).exists());
    assert_eq!(registry.get(&session.id).unwrap(), Some(session));
}

#[test]
fn test_two_concurrent_registrations_both_survive() {
    init_tracing();

    let dir = tempdir().unwrap();
    let root = dir.path().to_path_buf();

    let handles: Vec<_> = ["req-001", "req-002"]
        .into_iter()
        .map(|item| {
            let root = root.clone();
            thread::spawn(move || SessionRegistry::open(&root).register(new_session(item)))
        })
        .collect();
    for h in handles {
        h.join().unwrap().unwrap();
    }

    let sessions = SessionRegistry::open(&root).list().unwrap();
    assert_eq!(sessions.len(), 2);
    let ids: HashSet<&str> = sessions.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
}

#[test]
fn test_many_concurrent_registrations_lose_nothing() {
    let dir = tempdir().unwrap();
    let root = dir.path().to_path_buf();
    let options = LockOptions {
        retries: 200,
        backoff: Duration::from_millis(1),
    };

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let root = root.clone();
            thread::spawn(move || {
                SessionRegistry::open(&root)
                    .with_lock_options(options)
                    .register(new_session(&format!("req-{i:03}")))
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap().unwrap();
    }

    let sessions = SessionRegistry::open(&root).list().unwrap();
    assert_eq!(sessions.len(), 8);
    let items: HashSet<String> = sessions.iter().filter_map(|s| s.work_item.clone()).collect();
    assert_eq!(items.len(), 8);
}

#[test]
fn test_stale_detection_marks_only_dead_sessions() {
    init_tracing();

    let dir = tempdir().unwrap();
    let registry = SessionRegistry::open(dir.path());

    // A child we have already reaped: its pid no longer names a process.
    let mut child = std::process::Command::new("true").spawn().unwrap();
    let dead_pid = child.id();
    child.wait().unwrap();

    let alive = registry
        .register(new_session("req-001").with_pid(std::process::id()))
        .unwrap();
    let dead = registry.register(new_session("req-002").with_pid(dead_pid)).unwrap();

    let stale = registry.detect_stale_sessions().unwrap();
    assert_eq!(stale.len(), 1);
    assert_eq!(stale[0].id, dead.id);
    assert_eq!(stale[0].status, SessionStatus::Stale);

    let after = registry.list().unwrap();
    let status_of = |id: &str| after.iter().find(|s| s.id == id).unwrap().status;
    assert_eq!(status_of(&alive.id), SessionStatus::Active);
    assert_eq!(status_of(&dead.id), SessionStatus::Stale);

    // Already-stale sessions are not reported again.
    assert!(registry.detect_stale_sessions().unwrap().is_empty());
}

#[test]
fn test_signal_probe_rejects_group_pids() {
    assert!(SignalProbe.is_alive(std::process::id()));
    assert!(!SignalProbe.is_alive(0));
    assert!(!SignalProbe.is_alive(u32::MAX));
}

#[test]
fn test_prune_removes_stale_sessions() {
    let fs = MockFileSystem::new();
    let probe = StaticProbe::new([100, 200]);
    let registry = mock_registry(&fs, probe.clone());

    registry.register(new_session("req-001").with_pid(100)).unwrap();
    let gone = registry.register(new_session("req-002").with_pid(200)).unwrap();

    probe.kill(200);
    registry.detect_stale_sessions().unwrap();

    let pruned = registry.prune_stale().unwrap();
    assert_eq!(pruned.len(), 1);
    assert_eq!(pruned[0].id, gone.id);
    assert_eq!(registry.list().unwrap().len(), 1);
}

#[test]
fn test_is_executing_exact_match_on_active_sessions() {
    let fs = MockFileSystem::new();
    let registry = mock_registry(&fs, StaticProbe::new([1]));

    let s = registry.register(new_session("req-10").with_pid(1)).unwrap();

    assert!(registry.is_executing("req-10").unwrap());
    assert!(!registry.is_executing("req-1").unwrap());
    assert!(!registry.is_executing("req-100").unwrap());

    registry.update_status(&s.id, SessionStatus::Completing).unwrap();
    assert!(!registry.is_executing("req-10").unwrap());
}

#[test]
fn test_update_and_deregister() {
    let fs = MockFileSystem::new();
    let registry = mock_registry(&fs, StaticProbe::default());

    let s = registry.register(new_session("req-001")).unwrap();
    let updated = registry.update_status(&s.id, SessionStatus::Completing).unwrap();
    assert_eq!(updated.status, SessionStatus::Completing);

    match registry.update_status("missing", SessionStatus::Stale) {
        Err(ForgeError::UnknownSession(id)) => assert_eq!(id, "missing"),
        other => panic!("Expected UnknownSession error, got: {:?}", other),
    }

    assert_eq!(registry.deregister(&s.id).unwrap().map(|r| r.id), Some(s.id.clone()));
    assert_eq!(registry.deregister(&s.id).unwrap(), None);
    assert!(registry.list().unwrap().is_empty());
}

#[test]
fn test_abandoned_lock_is_force_removed() {
    init_tracing();

    let fs = MockFileSystem::new();
    let registry = mock_registry(&fs, StaticProbe::default());
    fs.add_file(registry.lock_path(), r#"{"pid": 1}"#);

    registry.register(new_session("req-001")).unwrap();

    assert_eq!(registry.list().unwrap().len(), 1);
    assert!(fs.contents(registry.lock_path()).is_none(), "lock not released");
}

#[test]
fn test_superseded_guard_leaves_new_holders_lock_in_place() {
    init_tracing();

    let mock = MockFileSystem::new();
    let fs: Arc<dyn FileSystem> = Arc::new(mock.clone());
    let path = Path::new("/repo/.forge/sessions.lock");
    let options = LockOptions {
        retries: 1,
        backoff: Duration::from_millis(1),
    };

    let slow = lock::acquire(&fs, path, &options).unwrap();
    // Retries run out, so the second writer takes the lock over.
    let taker = lock::acquire(&fs, path, &options).unwrap();
    assert_ne!(slow.token(), taker.token());

    drop(slow);
    let contents = mock.contents(path).expect("taker's lock file removed");
    assert!(contents.contains(&taker.token().to_string()));

    // A third writer's exclusive create still fails while the taker holds it.
    let err = mock.create_new(path, b"third").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);

    drop(taker);
    assert!(mock.contents(path).is_none(), "taker's guard did not release");

    let next = lock::acquire(&fs, path, &options).unwrap();
    assert!(mock.exists(path));
    drop(next);
}

#[test]
fn test_lock_backoff_saturates() {
    let options = LockOptions {
        retries: 5,
        backoff: Duration::MAX,
    };
    assert_eq!(options.backoff_for(1), Duration::MAX);
    assert_eq!(options.backoff_for(4), Duration::MAX);

    let options = LockOptions {
        retries: 5,
        backoff: Duration::from_millis(20),
    };
    assert_eq!(options.backoff_for(3), Duration::from_millis(60));
}

/// Filesystem whose lock file can never be created.
#[derive(Debug, Default)]
struct AlwaysLockedFs {
    inner: MockFileSystem,
}

impl FileSystem for AlwaysLockedFs {
    fn read_to_string(&self, path: &Path) -> anyhow::Result<String> {
        self.inner.read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> anyhow::Result<()> {
        self.inner.write(path, contents)
    }

    fn create_new(&self, path: &Path, _contents: &[u8]) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{:?} already exists", path),
        ))
    }

    fn remove_file(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn create_dir_all(&self, path: &Path) -> anyhow::Result<()> {
        self.inner.create_dir_all(path)
    }
}

#[test]
fn test_lock_exhaustion_is_fatal() {
    let registry = SessionRegistry::with_parts(
        "/repo",
        Arc::new(AlwaysLockedFs::default()),
        Arc::new(StaticProbe::default()),
        LockOptions {
            retries: 2,
            backoff: Duration::from_millis(1),
        },
    );

    match registry.register(new_session("req-001")) {
        Err(ForgeError::LockAcquisition { path, attempts }) => {
            assert_eq!(attempts, 3);
            assert!(path.ends_with(LOCK_FILE));
        }
        other => panic!("Expected LockAcquisition error, got: {:?}", other),
    }
}

#[test]
fn test_real_filesystem_write_is_atomic_replace() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");
    let fs = RealFileSystem;

    fs.write(&path, b"one").unwrap();
    fs.write(&path, b"two").unwrap();
    assert_eq!(fs.read_to_string(&path).unwrap(), "two");

    let leftovers: Vec<_> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1, "temp file left behind: {leftovers:?}");

    fs.create_new(&dir.path().join("lock"), b"x").unwrap();
    let err = fs.create_new(&dir.path().join("lock"), b"x").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
}
