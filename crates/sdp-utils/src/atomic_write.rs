//! Atomic file writes: write to a sibling temp file, fsync, rename, fsync the
//! parent directory. This is the sole write path for checkpoints, evidence
//! sidecars, and locks — nothing in this workspace calls `fs::write` directly
//! on a path another process might be reading.

use camino::Utf8Path;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};

/// Write `content` to `path` atomically.
///
/// The temp file lives in the same directory as `path` so the final rename is
/// guaranteed to be on the same filesystem (a cross-filesystem rename is not
/// atomic). Both the temp file and the parent directory are fsynced before
/// and after the rename respectively, so a crash can never observe a
/// partially written target.
pub fn write_atomic(path: &Utf8Path, content: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory"))?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let temp_path = parent.join(format!(".{file_name}.tmp.{}", std::process::id()));

    {
        let mut temp_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        temp_file.write_all(content)?;
        temp_file.sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    sync_dir(parent)?;
    Ok(())
}

/// Append a single line (already newline-terminated by the caller) to
/// `path`, fsyncing the write. The caller is responsible for any locking —
/// this function only guarantees the bytes it writes reach disk.
pub fn append_atomic(path: &Utf8Path, line: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    file.write_all(line)?;
    file.sync_all()?;
    Ok(())
}

#[cfg(unix)]
fn sync_dir(dir: &Utf8Path) -> io::Result<()> {
    let dir_file = File::open(dir.as_std_path())?;
    dir_file.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Utf8Path) -> io::Result<()> {
    // Directory fsync has no equivalent on non-Unix targets; the rename
    // itself is still atomic there.
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn write_atomic_creates_file_with_exact_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("out.json")).unwrap();
        write_atomic(&path, b"{\"a\":1}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{\"a\":1}");
    }

    #[test]
    fn write_atomic_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("out.json")).unwrap();
        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn write_atomic_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("out.json")).unwrap();
        write_atomic(&path, b"x").unwrap();
        let entries: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("out.json")]);
    }

    #[test]
    fn append_atomic_appends_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("events.jsonl")).unwrap();
        append_atomic(&path, b"{\"n\":1}\n").unwrap();
        append_atomic(&path, b"{\"n\":2}\n").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"n\":1}\n{\"n\":2}\n");
    }
}
