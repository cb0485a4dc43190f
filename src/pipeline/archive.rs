//! ZIP archive output for a job
//!
//! The `zip` writer is synchronous, so every write hops onto the blocking pool.

use crate::error::{Error, Result};
use crate::types::JobId;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// File name of a job's archive inside the storage directory
pub fn archive_file_name(id: JobId) -> String {
    format!("job_{}.zip", id)
}

/// Extension (with leading dot) for a media type, falling back to the URL path
pub fn extension_for(content_type: &str, url: &str) -> String {
    let known = match content_type {
        "image/jpeg" | "image/jpg" | "image/pjpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "image/svg+xml" => Some("svg"),
        "application/pdf" => Some("pdf"),
        "application/zip" => Some("zip"),
        "application/json" => Some("json"),
        "text/plain" => Some("txt"),
        "text/csv" => Some("csv"),
        "text/html" => Some("html"),
        _ => None,
    };
    if let Some(ext) = known {
        return format!(".{ext}");
    }

    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .and_then(|name| {
            name.rsplit_once('.').and_then(|(stem, ext)| {
                let usable = !stem.is_empty()
                    && (1..=5).contains(&ext.len())
                    && ext.chars().all(|c| c.is_ascii_alphanumeric());
                usable.then(|| format!(".{}", ext.to_ascii_lowercase()))
            })
        })
        .unwrap_or_else(|| ".bin".to_string())
}

/// An archive being written for one job
pub struct ArchiveWriter {
    path: PathBuf,
    writer: Option<ZipWriter<File>>,
    entries: usize,
    last_stamp: i64,
}

impl ArchiveWriter {
    /// Create the storage directory and an empty archive for `id`
    pub async fn create(storage_dir: &Path, id: JobId) -> Result<Self> {
        tokio::fs::create_dir_all(storage_dir).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "failed to create storage directory '{}': {}",
                    storage_dir.display(),
                    e
                ),
            ))
        })?;

        let path = storage_dir.join(archive_file_name(id));
        let file = tokio::fs::File::create(&path).await.map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("failed to create archive file '{}': {}", path.display(), e),
            ))
        })?;

        Ok(Self {
            path,
            writer: Some(ZipWriter::new(file.into_std().await)),
            entries: 0,
            last_stamp: 0,
        })
    }

    /// Location of the archive on disk
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries committed so far
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Name for the next entry: `file_<unix-nanos><ext>`
    ///
    /// Timestamps are strictly increasing within one archive, so names never collide.
    pub fn next_entry_name(&mut self, content_type: &str, url: &str) -> String {
        let now = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        self.last_stamp = now.max(self.last_stamp + 1);
        format!("file_{}{}", self.last_stamp, extension_for(content_type, url))
    }

    /// Write one complete entry
    ///
    /// A failed write leaves nothing behind: the entry is dropped from the
    /// archive and later entries overwrite its bytes.
    pub async fn add_entry(&mut self, name: String, body: Vec<u8>) -> Result<()> {
        let mut writer = self
            .writer
            .take()
            .ok_or_else(|| Error::Other("archive writer is no longer available".to_string()))?;

        let (writer, result) = spawn_blocking(move || {
            let result = write_entry(&mut writer, &name, &body);
            (writer, result)
        })
        .await
        .map_err(|e| Error::Other(format!("archive write task failed: {}", e)))?;

        self.writer = Some(writer);
        result?;
        self.entries += 1;
        Ok(())
    }

    /// Write the central directory and close the file
    ///
    /// On failure the file is removed.
    pub async fn finish(mut self) -> Result<PathBuf> {
        let writer = self.writer.take();
        let result = spawn_blocking(move || -> Result<()> {
            let writer = writer.ok_or_else(|| {
                Error::Other("archive writer is no longer available".to_string())
            })?;
            let (file, end) = close_archive(writer)?;
            file.set_len(end)?;
            Ok(())
        })
        .await
        .map_err(|e| Error::Other(format!("archive finish task failed: {}", e)))
        .and_then(|r| r);

        match result {
            Ok(()) => Ok(self.path),
            Err(e) => {
                let _ = tokio::fs::remove_file(&self.path).await;
                Err(e)
            }
        }
    }

    /// Close and delete the archive
    pub async fn discard(mut self) -> Result<()> {
        // Dropping the writer closes the file handle before removal
        drop(self.writer.take());
        tokio::fs::remove_file(&self.path).await?;
        Ok(())
    }
}

fn write_entry<W: Write + Seek>(writer: &mut ZipWriter<W>, name: &str, body: &[u8]) -> Result<()> {
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(name, options)?;
    if let Err(e) = writer.write_all(body) {
        if writer.is_writing_file() {
            if let Err(abort) = writer.abort_file() {
                tracing::warn!(entry = name, error = %abort, "Failed to drop partial archive entry");
            }
        }
        return Err(e.into());
    }
    Ok(())
}

/// Write the central directory, returning the inner writer and the archive's end offset
///
/// Bytes past the end offset belong to aborted entries.
fn close_archive<W: Write + Seek>(writer: ZipWriter<W>) -> Result<(W, u64)> {
    let mut inner = writer.finish()?;
    let end = inner.stream_position()?;
    Ok((inner, end))
}
