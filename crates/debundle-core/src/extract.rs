//! Payload extraction.
//!
//! [`Extractor`] copies or decompresses each parsed entry's payload out of
//! the host executable's byte buffer. Bundle 6.x payloads may be stored as
//! zlib streams; some producers emit headerless (raw) deflate instead, so a
//! failed zlib attempt falls back to raw deflate before giving up.
//!
//! Progress reporting goes through the [`ProgressSink`] trait so the core
//! stays free of console I/O and extraction is testable independent of
//! output formatting.

use crate::bundle::BundleFileEntry;
use crate::error::{Error, Result};
use flate2::read::{DeflateDecoder, ZlibDecoder};
use std::borrow::Cow;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Receives one unit of progress per extracted entry.
///
/// Implement this trait to surface extraction progress however the caller
/// wants (console lines, counters, nothing). All methods default to no-ops.
pub trait ProgressSink {
    /// Called once before extraction with the number of entries to process
    fn started(&mut self, total: usize) {
        let _ = total;
    }

    /// Called after each entry's payload has been written
    fn entry_extracted(&mut self, entry: &BundleFileEntry, payload: &[u8]) {
        let _ = (entry, payload);
    }
}

/// A no-op sink that discards all progress
pub struct NullSink;

impl ProgressSink for NullSink {}

/// A sink that counts extracted files and bytes
#[derive(Debug, Default)]
pub struct StatsSink {
    /// Number of entries written
    pub files_extracted: usize,
    /// Total payload bytes written
    pub bytes_written: u64,
}

impl ProgressSink for StatsSink {
    fn entry_extracted(&mut self, _entry: &BundleFileEntry, payload: &[u8]) {
        self.files_extracted += 1;
        self.bytes_written += payload.len() as u64;
    }
}

/// Extracts entry payloads from a borrowed host-executable buffer.
#[derive(Debug, Clone)]
pub struct Extractor<'a> {
    data: &'a [u8],
}

impl<'a> Extractor<'a> {
    /// Creates an extractor over the host executable's bytes
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// Returns an entry's payload, decompressing it when stored compressed.
    ///
    /// Raw payloads borrow from the source buffer; compressed payloads are
    /// decompressed into an owned buffer.
    pub fn read_payload(&self, entry: &BundleFileEntry) -> Result<Cow<'a, [u8]>> {
        if entry.is_compressed() {
            let compressed = self.slice(entry.offset, entry.compressed_size)?;
            let payload = decompress(compressed, &entry.relative_path)?;
            if payload.len() as i64 != entry.size {
                debug!(
                    "'{}': decompressed to {} bytes, manifest says {}",
                    entry.relative_path,
                    payload.len(),
                    entry.size
                );
            }
            Ok(Cow::Owned(payload))
        } else {
            Ok(Cow::Borrowed(self.slice(entry.offset, entry.size)?))
        }
    }

    /// Extracts all entries, in manifest order, into `output_dir`.
    ///
    /// One file is created or overwritten per entry. There is no atomic
    /// replace: an interrupted run may leave a partial file, and entries
    /// already written stay on disk when a later entry fails.
    pub fn extract_all(
        &self,
        entries: &[BundleFileEntry],
        output_dir: &Path,
        sink: &mut dyn ProgressSink,
    ) -> Result<()> {
        fs::create_dir_all(output_dir)
            .map_err(|source| Error::directory_create(output_dir, source))?;

        sink.started(entries.len());

        for entry in entries {
            let dest = entry_destination(output_dir, &entry.relative_path)?;
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)
                    .map_err(|source| Error::directory_create(parent, source))?;
            }

            let payload = self.read_payload(entry)?;
            fs::write(&dest, &payload).map_err(|source| Error::file_write(&dest, source))?;

            trace!(
                "extracted '{}' ({} bytes) to {}",
                entry.relative_path,
                payload.len(),
                dest.display()
            );
            sink.entry_extracted(entry, &payload);
        }

        Ok(())
    }

    fn slice(&self, offset: i64, len: i64) -> Result<&'a [u8]> {
        // offset and len are validated positive at entry construction
        let start = offset as usize;
        let requested = len as usize;
        let available = self.data.len().saturating_sub(start);
        if available < requested {
            return Err(Error::unexpected_eof(start, requested, available));
        }
        Ok(&self.data[start..start + requested])
    }
}

/// Maps a `/`-separated manifest path onto a host path under `output_dir`.
///
/// Rejects `..` components so a hostile manifest cannot write outside the
/// output directory.
fn entry_destination(output_dir: &Path, relative_path: &str) -> Result<PathBuf> {
    let mut dest = output_dir.to_path_buf();
    for component in relative_path.split('/') {
        if component.is_empty() || component == "." {
            continue;
        }
        if component == ".." {
            return Err(Error::path_traversal(relative_path));
        }
        dest.push(component);
    }
    Ok(dest)
}

fn decompress(compressed: &[u8], relative_path: &str) -> Result<Vec<u8>> {
    let mut payload = Vec::new();

    let mut zlib = ZlibDecoder::new(compressed);
    if zlib.read_to_end(&mut payload).is_ok() {
        return Ok(payload);
    }

    trace!("'{}': zlib failed, retrying as raw deflate", relative_path);
    payload.clear();
    let mut raw = DeflateDecoder::new(compressed);
    match raw.read_to_end(&mut payload) {
        Ok(_) => Ok(payload),
        Err(source) => Err(Error::decompression(relative_path, source)),
    }
}
