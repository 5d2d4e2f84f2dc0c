//! Whole-document JSON persistence.

use serde::Serialize;
use std::io;
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Serialize `value` as pretty JSON and replace `path` with it.
///
/// The document is written to a sibling `{name}.tmp` file and renamed over
/// the target, so readers never observe a half-written file. Missing parent
/// directories are created.
pub async fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    if !dir.as_os_str().is_empty() {
        tokio::fs::create_dir_all(dir).await?;
    }

    let tmp_path = dir.join(format!("{}.tmp", file_name.to_string_lossy()));
    if let Err(e) = write_synced(&tmp_path, &bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }

    tokio::fs::rename(&tmp_path, path).await
}

/// Write `bytes` plus a trailing newline and wait until they are on disk.
/// tokio reports a failed background write only on the next call on the
/// file, so `flush` must run before `sync_all`.
async fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.write_all(b"\n").await?;
    file.flush().await?;
    file.sync_all().await
}

/// Read a file, mapping "does not exist" to `None`.
pub async fn read_optional(path: &Path) -> io::Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}
