//! Cross-process advisory locking for checkpoints and evidence logs
//! (spec.md §4.2, §4.7).
//!
//! The lock itself is an OS advisory lock (`fd-lock`) held on a sidecar
//! file; existence of the sidecar carries no meaning on its own, so two
//! processes racing to create it is harmless. Acquisition blocks with
//! bounded exponential backoff up to a caller-supplied timeout, then
//! surfaces `SdpError::LockTimeout` — this is the only retryable error in
//! the workspace (`sdp-utils::error::SdpError::is_retryable`).

use std::cell::RefCell;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use camino::Utf8Path;
use fd_lock::{RwLock, RwLockWriteGuard};
use sdp_utils::SdpError;
use serde::{Deserialize, Serialize};

// Thread-local override used only in tests to avoid sharing lock state
// across parallel test threads that exercise the same paths.
thread_local! {
    static TEST_BACKOFF_BASE: RefCell<Option<Duration>> = const { RefCell::new(None) };
}

const BACKOFF_BASE: Duration = Duration::from_millis(50);
const BACKOFF_CAP: Duration = Duration::from_secs(2);
const MAX_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockInfo {
    pid: u32,
    acquired_at_unix_secs: u64,
    resource: String,
}

/// A held lock. Dropping it releases the OS advisory lock; the sidecar
/// file itself is left in place for the next acquirer to reuse.
///
/// Holds a `'static` write guard obtained via `Box::leak` on the backing
/// `RwLock<File>` — the leaked allocation is one `File` per acquisition and
/// is reclaimed at process exit, acceptable for a short-lived-per-step
/// orchestrator (spec.md §5); this keeps the crate free of `unsafe`.
pub struct FileLockGuard {
    _guard: RwLockWriteGuard<'static, File>,
    resource: String,
}

impl FileLockGuard {
    #[must_use]
    pub fn resource(&self) -> &str {
        &self.resource
    }
}

impl std::fmt::Debug for FileLockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLockGuard").field("resource", &self.resource).finish()
    }
}

/// Acquire an advisory lock on `lock_path`, blocking with bounded
/// exponential backoff until `timeout` elapses.
///
/// `resource` is a human-readable label (e.g. the feature id) used only in
/// error messages and the sidecar's diagnostic payload.
pub fn acquire(lock_path: &Utf8Path, resource: &str, timeout: Duration) -> Result<FileLockGuard, SdpError> {
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(lock_path.as_std_path())?;
    let rw_lock: &'static mut RwLock<File> = Box::leak(Box::new(RwLock::new(file)));

    let start = Instant::now();
    let mut attempt: u32 = 0;
    loop {
        match rw_lock.try_write() {
            Ok(mut guard) => {
                write_diagnostic(&mut guard, resource);
                return Ok(FileLockGuard { _guard: guard, resource: resource.to_string() });
            }
            Err(_) => {
                if start.elapsed() >= timeout || attempt >= MAX_ATTEMPTS {
                    return Err(SdpError::LockTimeout {
                        resource: resource.to_string(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
                std::thread::sleep(backoff_delay(attempt));
                attempt += 1;
            }
        }
    }
}

/// `try_lock` without blocking; used by `sdp advance`'s `--skip-guard`-free
/// fast path where a caller wants to fail immediately rather than wait.
pub fn try_acquire(lock_path: &Utf8Path, resource: &str) -> Result<FileLockGuard, SdpError> {
    acquire(lock_path, resource, Duration::ZERO)
}

fn write_diagnostic(guard: &mut RwLockWriteGuard<'static, File>, resource: &str) {
    let info = LockInfo {
        pid: std::process::id(),
        acquired_at_unix_secs: SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0),
        resource: resource.to_string(),
    };
    if let Ok(json) = serde_json::to_vec(&info) {
        let file: &mut File = &mut *guard;
        let _ = file.set_len(0);
        let _ = std::io::Seek::seek(file, std::io::SeekFrom::Start(0));
        let _ = file.write_all(&json);
        let _ = file.sync_all();
    }
}

fn backoff_delay(attempt: u32) -> Duration {
    let base = TEST_BACKOFF_BASE.with(|tl| tl.borrow().unwrap_or(BACKOFF_BASE));
    let scaled = base.saturating_mul(1u32 << attempt.min(6));
    scaled.min(BACKOFF_CAP)
}

/// Override the backoff base delay for the current thread, for fast tests.
#[cfg(any(test, feature = "test-utils"))]
pub fn set_test_backoff_base(d: Duration) {
    TEST_BACKOFF_BASE.with(|tl| *tl.borrow_mut() = Some(d));
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    fn lock_path(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("F001.lock")).unwrap()
    }

    #[test]
    fn acquire_creates_sidecar_and_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);
        let guard = acquire(&path, "F001", Duration::from_millis(200)).unwrap();
        assert_eq!(guard.resource(), "F001");
        assert!(path.exists());
    }

    #[test]
    fn second_acquire_times_out_while_first_is_held() {
        set_test_backoff_base(Duration::from_millis(5));
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);
        let _first = acquire(&path, "F001", Duration::from_millis(200)).unwrap();

        let err = acquire(&path, "F001", Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, SdpError::LockTimeout { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn lock_is_reacquirable_after_guard_drops() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(&dir);
        {
            let _first = acquire(&path, "F001", Duration::from_millis(200)).unwrap();
        }
        let _second = acquire(&path, "F001", Duration::from_millis(200)).unwrap();
    }
}
