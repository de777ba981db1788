//! JSON Lines file utilities
//!
//! Appends are flushed and synced per record. Whole-file rewrites go through
//! a temp file and a rename so a reader or a crash never sees half a file.
//! Writers from different processes serialize on a sidecar lock file, since
//! the rename swaps out the log's inode.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{de::DeserializeOwned, Serialize};
use tracing::warn;

use crate::error::AuditError;

/// Items parsed from a JSON Lines file
#[derive(Debug)]
pub struct JsonLines<T> {
    pub items: Vec<T>,
    /// Byte length of the well-formed prefix when the last line was torn
    pub torn_at: Option<u64>,
}

/// Exclusive lock on a JSON Lines file, released on drop
#[derive(Debug)]
pub struct FileLock {
    file: File,
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Path of the sidecar lock file guarding `path`
pub fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

/// Block until this process holds the exclusive lock for `path`
pub fn lock_exclusive(path: &Path) -> Result<FileLock, AuditError> {
    ensure_parent(path)?;
    let lock_file = lock_path(path);

    let file = OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_file)
        .map_err(|e| {
            AuditError::Storage(format!("Failed to open {}: {}", lock_file.display(), e))
        })?;

    FileExt::lock_exclusive(&file).map_err(|e| {
        AuditError::Storage(format!("Failed to lock {}: {}", lock_file.display(), e))
    })?;

    Ok(FileLock { file })
}

/// Parse a JSON Lines file, returning nothing if the file doesn't exist
///
/// Blank lines are skipped. An unparsable last line is an interrupted append:
/// it is left out and its offset reported in `torn_at`. Anywhere else a
/// malformed line is an error naming its line number.
pub fn load_json_lines<T, P>(path: P) -> Result<JsonLines<T>, AuditError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();

    if !path.exists() {
        return Ok(JsonLines {
            items: Vec::new(),
            torn_at: None,
        });
    }

    let bytes = fs::read(path)
        .map_err(|e| AuditError::Storage(format!("Failed to read {}: {}", path.display(), e)))?;

    let mut items = Vec::new();
    let mut start = 0;
    let mut line_number = 0;

    while start < bytes.len() {
        let end = bytes[start..]
            .iter()
            .position(|b| *b == b'\n')
            .map_or(bytes.len(), |i| start + i + 1);
        line_number += 1;
        let line = &bytes[start..end];

        if !line.iter().all(u8::is_ascii_whitespace) {
            match serde_json::from_slice(line) {
                Ok(item) => items.push(item),
                Err(e) if bytes[end..].iter().all(u8::is_ascii_whitespace) => {
                    warn!(
                        path = %path.display(),
                        line = line_number,
                        error = %e,
                        "Ignoring torn last line"
                    );
                    return Ok(JsonLines {
                        items,
                        torn_at: Some(start as u64),
                    });
                }
                Err(e) => {
                    return Err(AuditError::Storage(format!(
                        "Failed to parse {} line {}: {}",
                        path.display(),
                        line_number,
                        e
                    )))
                }
            }
        }

        start = end;
    }

    Ok(JsonLines {
        items,
        torn_at: None,
    })
}

/// Read every well-formed line of a JSON Lines file
pub fn read_json_lines<T, P>(path: P) -> Result<Vec<T>, AuditError>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    Ok(load_json_lines(path)?.items)
}

/// Cut a file back to `len` bytes, dropping whatever followed
pub fn truncate_json_lines<P: AsRef<Path>>(path: P, len: u64) -> Result<(), AuditError> {
    let path = path.as_ref();
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .map_err(|e| AuditError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    file.set_len(len)
        .and_then(|_| file.sync_data())
        .map_err(|e| AuditError::Storage(format!("Failed to truncate {}: {}", path.display(), e)))
}

/// Append one item as a JSON line, creating the file if needed
pub fn append_json_line<T, P>(path: P, item: &T) -> Result<(), AuditError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    ensure_parent(path)?;

    let line = serde_json::to_string(item)
        .map_err(|e| AuditError::Storage(format!("Failed to serialize record: {}", e)))?;

    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .map_err(|e| AuditError::Storage(format!("Failed to open {}: {}", path.display(), e)))?;

    seal_last_line(&mut file, path)?;

    writeln!(file, "{}", line)
        .map_err(|e| AuditError::Storage(format!("Failed to append record: {}", e)))?;

    file.flush()
        .map_err(|e| AuditError::Storage(format!("Failed to flush {}: {}", path.display(), e)))?;

    file.sync_data()
        .map_err(|e| AuditError::Storage(format!("Failed to sync {}: {}", path.display(), e)))?;

    Ok(())
}

/// Replace a JSON Lines file atomically (write to temp, then rename)
pub fn write_json_lines_atomic<T, P>(path: P, items: &[T]) -> Result<(), AuditError>
where
    T: Serialize,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    ensure_parent(path)?;

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = path.with_extension("jsonl.tmp");

    let file = File::create(&temp_path)
        .map_err(|e| AuditError::Storage(format!("Failed to create temp file: {}", e)))?;

    let mut writer = BufWriter::new(file);
    for item in items {
        serde_json::to_writer(&mut writer, item)
            .map_err(|e| AuditError::Storage(format!("Failed to serialize record: {}", e)))?;
        writer
            .write_all(b"\n")
            .map_err(|e| AuditError::Storage(format!("Failed to write temp file: {}", e)))?;
    }

    writer
        .flush()
        .map_err(|e| AuditError::Storage(format!("Failed to flush data: {}", e)))?;

    writer
        .get_ref()
        .sync_all()
        .map_err(|e| AuditError::Storage(format!("Failed to sync data: {}", e)))?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        AuditError::Storage(format!("Failed to rename temp file: {}", e))
    })?;

    Ok(())
}

/// Make sure the file ends on a line boundary before appending
///
/// A complete record missing only its newline gets one. An unterminated
/// fragment is cut off so the next line doesn't glue onto it.
fn seal_last_line(file: &mut File, path: &Path) -> Result<(), AuditError> {
    let io_err =
        |e: std::io::Error| AuditError::Storage(format!("Failed to repair {}: {}", path.display(), e));

    let len = file.metadata().map_err(io_err)?.len();
    if len == 0 {
        return Ok(());
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1)).map_err(io_err)?;
    file.read_exact(&mut last).map_err(io_err)?;
    if last[0] == b'\n' {
        return Ok(());
    }

    let mut contents = Vec::new();
    file.seek(SeekFrom::Start(0)).map_err(io_err)?;
    file.read_to_end(&mut contents).map_err(io_err)?;
    let tail_start = contents
        .iter()
        .rposition(|b| *b == b'\n')
        .map_or(0, |i| i + 1);

    if serde_json::from_slice::<serde_json::Value>(&contents[tail_start..]).is_ok() {
        file.write_all(b"\n").map_err(io_err)?;
    } else {
        warn!(
            path = %path.display(),
            dropped_bytes = contents.len() - tail_start,
            "Dropping partial line left by an interrupted append"
        );
        file.set_len(tail_start as u64).map_err(io_err)?;
    }

    Ok(())
}

fn ensure_parent(path: &Path) -> Result<(), AuditError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            AuditError::Storage(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }
    Ok(())
}
