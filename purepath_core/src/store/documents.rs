//! JSON document files with file locking.
//!
//! Documents are replaced atomically (temp file, fsync, rename), so a plain
//! read always sees a complete document. Read-modify-write cycles hold an
//! exclusive lock on a sidecar lock file for their whole duration.

use crate::{Error, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Load a document, or its default if the file doesn't exist yet.
///
/// Unlike a missing file, a corrupted one is an error: silently starting
/// from an empty document would drop every stored profile on the next save.
pub fn load<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        tracing::debug!("No document at {:?}, using empty default", path);
        return Ok(T::default());
    }

    let contents = std::fs::read_to_string(path)?;
    let doc = serde_json::from_str(&contents).map_err(|e| {
        tracing::warn!("Failed to parse document {:?}: {}", path, e);
        Error::Persistence(format!("corrupted document {}: {}", path.display(), e))
    })?;

    tracing::debug!("Loaded document from {:?}", path);
    Ok(doc)
}

/// Atomically replace a document
pub fn save<T: Serialize>(path: &Path, doc: &T) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::Other, "document path missing parent")
    })?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, doc)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| Error::Io(e.error))?;

    tracing::debug!("Saved document to {:?}", path);
    Ok(())
}

/// Run `f` while holding an exclusive lock on `lock_path`
pub fn with_exclusive_lock<R>(lock_path: &Path, f: impl FnOnce() -> Result<R>) -> Result<R> {
    if let Some(parent) = lock_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let lock = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(lock_path)?;
    lock.lock_exclusive()?;

    let result = f();

    // Released on drop as well; unlock explicitly so errors surface
    lock.unlock()?;
    result
}
