//! Streaming uploads to temporary storage with a size ceiling

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::io::{AsyncWriteExt, BufWriter};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Streamed-size interval between progress log lines
const LOG_EVERY: u64 = 100 * 1024 * 1024;

/// A fully written upload waiting to be processed
///
/// The file is deleted when this value is dropped, including when the
/// future holding it is cancelled.
#[derive(Debug)]
pub struct TempUpload {
    path: TempPath,
    /// Bytes written
    pub size: u64,
}

impl TempUpload {
    /// Location of the temp file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in megabytes, rounded to two decimals
    pub fn size_mb(&self) -> f64 {
        (self.size as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }

    /// Delete the temp file now, logging anything other than "already gone"
    pub fn discard(self) {
        let shown = self.path.display().to_string();
        match self.path.close() {
            Ok(()) => tracing::debug!("Removed temp file {}", shown),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove temp file {}: {}", shown, e),
        }
    }
}

/// Build `<temp_dir>/<uuid><.ext>` for a client-supplied filename
pub fn temp_path(temp_dir: &Path, filename: &str) -> PathBuf {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default();
    temp_dir.join(format!("{}{}", Uuid::new_v4(), ext))
}

/// Write `stream` to `dest`, aborting once more than `max_size` bytes arrive
///
/// The partial file is removed on any error, and also when this future is
/// dropped before completing.
pub async fn save_stream<S, E>(
    stream: S,
    dest: &Path,
    max_size: u64,
    buffer_size: usize,
) -> Result<TempUpload>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Display,
{
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let path = TempPath::from_path(dest);
    let file = tokio::fs::File::create(&path).await?;
    let mut writer = BufWriter::with_capacity(buffer_size.max(1), file);

    tracing::info!("Receiving upload into {}", dest.display());

    let size = write_chunks(stream, &mut writer, max_size).await?;
    writer.flush().await?;
    drop(writer);

    tracing::info!(
        "Saved upload {} ({:.2} MB)",
        dest.display(),
        size as f64 / (1024.0 * 1024.0)
    );
    Ok(TempUpload { path, size })
}

async fn write_chunks<S, E>(
    stream: S,
    writer: &mut BufWriter<tokio::fs::File>,
    max_size: u64,
) -> Result<u64>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    E: Display,
{
    futures_util::pin_mut!(stream);

    let mut total: u64 = 0;
    let mut next_log = LOG_EVERY;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| Error::BadRequest(format!("Failed to read upload: {}", e)))?;
        total += chunk.len() as u64;

        if total > max_size {
            tracing::warn!(
                "Upload rejected after {} bytes (limit {} bytes)",
                total,
                max_size
            );
            return Err(Error::SizeLimitExceeded {
                limit: max_size,
                observed: total,
            });
        }

        writer.write_all(&chunk).await?;

        if total >= next_log {
            tracing::info!("Received {} MB", total / (1024 * 1024));
            next_log += LOG_EVERY;
        }
    }

    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use std::time::Duration;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p)))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn test_temp_path_keeps_lowercase_extension() {
        let path = temp_path(Path::new("temp"), "Report.PDF");
        assert_eq!(path.parent(), Some(Path::new("temp")));
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("pdf"));

        let bare = temp_path(Path::new("temp"), "upload");
        assert!(bare.extension().is_none());
        assert_ne!(temp_path(Path::new("t"), "a.txt"), temp_path(Path::new("t"), "a.txt"));
    }

    #[tokio::test]
    async fn test_save_under_limit() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("up.txt");

        let upload = save_stream(chunks(&[b"hello ", b"world"]), &dest, 11, 4)
            .await
            .unwrap();
        assert_eq!(upload.size, 11);
        assert_eq!(upload.path(), dest.as_path());
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");

        upload.discard();
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_dropping_upload_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("dropped.txt");

        let upload = save_stream(chunks(&[b"data"]), &dest, 100, 8).await.unwrap();
        assert!(dest.exists());
        drop(upload);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_cancelled_save_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("stalled.bin");
        let stalled = chunks(&[b"first part"])
            .chain(stream::pending::<std::result::Result<Bytes, std::io::Error>>());

        let mut save = Box::pin(save_stream(stalled, &dest, 1024, 1));
        let waited = tokio::time::timeout(Duration::from_millis(50), save.as_mut()).await;
        assert!(waited.is_err());
        assert!(dest.exists());

        drop(save);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_over_limit_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("big.bin");

        let err = save_stream(chunks(&[b"12345", b"67890", b"x"]), &dest, 10, 2)
            .await
            .unwrap_err();
        match err {
            Error::SizeLimitExceeded { limit, observed } => {
                assert_eq!(limit, 10);
                assert_eq!(observed, 11);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_stream_error_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("broken.txt");
        let parts = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ]);

        let err = save_stream(parts, &dest, 100, 8).await.unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert!(!dest.exists());
    }

    #[test]
    fn test_size_mb_rounding() {
        let dir = tempfile::tempdir().unwrap();
        let upload = TempUpload {
            path: TempPath::from_path(dir.path().join("x")),
            size: 5 * 1024 * 1024 + 1024 * 1024 / 3,
        };
        assert_eq!(upload.size_mb(), 5.33);
    }
}
