//! Zip engine
//!
//! Decodes uploaded archives into sanitized `(path, bytes)` entries and builds
//! archives back from stored blobs. The `zip` crate is synchronous, so the
//! async entry points move the work onto the blocking pool.

pub mod path;

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub use path::{sanitize_path, PathError, SafePath};

/// Zip engine errors
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Unsupported entry path: {0}")]
    UnsupportedPath(String),

    #[error("Zip archive contained no files")]
    Empty,

    #[error("Decompressed archive exceeds {0} byte limit")]
    TooLarge(u64),

    #[error("Invalid zip archive: {0}")]
    Invalid(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Archive task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One file taken out of, or destined for, an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: SafePath,
    pub data: Vec<u8>,
}

/// Decode every file entry of `bytes`.
///
/// Directory entries are skipped. A single unsupported path fails the whole
/// archive, and so does an archive without any file entries. Entry data is
/// read against `budget`, the total decompressed size allowed for all entries
/// together; declared sizes in the archive are never trusted.
pub fn read_archive(bytes: &[u8], budget: u64) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::new();
    let mut remaining = budget;

    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        if file.is_dir() {
            continue;
        }

        let raw_name = file.name().to_string();
        let path = SafePath::parse(&raw_name)
            .map_err(|_| ArchiveError::UnsupportedPath(raw_name.clone()))?;

        let mut data = Vec::new();
        let read = (&mut file)
            .take(remaining.saturating_add(1))
            .read_to_end(&mut data)
            .map_err(|e| ArchiveError::Invalid(zip::result::ZipError::Io(e)))? as u64;
        if read > remaining {
            return Err(ArchiveError::TooLarge(budget));
        }
        remaining -= read;

        entries.push(ArchiveEntry { path, data });
    }

    if entries.is_empty() {
        return Err(ArchiveError::Empty);
    }

    Ok(entries)
}

/// Encode `entries` into a zip archive, in the given order
pub fn build_archive(entries: &[ArchiveEntry]) -> Result<Vec<u8>, ArchiveError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(entries.iter().any(|e| e.data.len() as u64 >= u32::MAX as u64));

    for entry in entries {
        writer.start_file(entry.path.as_str(), options)?;
        writer.write_all(&entry.data)?;
    }

    Ok(writer.finish()?.into_inner())
}

/// [`read_archive`] on the blocking pool
pub async fn extract(bytes: axum::body::Bytes, budget: u64) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    tokio::task::spawn_blocking(move || read_archive(&bytes, budget)).await?
}

/// [`build_archive`] on the blocking pool
pub async fn bundle(entries: Vec<ArchiveEntry>) -> Result<Vec<u8>, ArchiveError> {
    tokio::task::spawn_blocking(move || build_archive(&entries)).await?
}
