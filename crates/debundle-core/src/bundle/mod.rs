//! Bundle parsing and extraction.
//!
//! A [`Bundle`] is the parsed form of a single-file .NET executable: the
//! host's bytes, the manifest header and the ordered list of file entries.
//! The whole executable is read into memory once and the same buffer backs
//! both manifest parsing and payload extraction.
//!
//! ## Parse flow
//!
//! 1. [`crate::locator::find_bundle_offset`] yields the manifest offset
//!    (or the caller supplies one)
//! 2. [`BundleHeader::parse`] consumes the fixed header
//! 3. [`BundleFileEntry::parse`] runs `embedded_files_count` times
//! 4. [`Bundle::extract_to`] copies or decompresses each payload to disk

mod entry;
mod header;

use crate::error::{Error, Result};
use crate::extract::{Extractor, ProgressSink};
use crate::locator;
use crate::reader::ByteReader;
use bytes::Bytes;
use std::path::Path;
use tracing::debug;

pub use entry::{BundleFileEntry, FileType};
pub use header::{BundleHeader, Location};

/// A parsed single-file bundle.
///
/// Owns the host executable's bytes alongside the parsed manifest. Nothing
/// here is mutated after construction.
#[derive(Debug, Clone)]
pub struct Bundle {
    data: Bytes,
    offset: u64,
    header: BundleHeader,
    entries: Vec<BundleFileEntry>,
}

impl Bundle {
    /// Parses a bundle manifest at `offset` within `data`.
    ///
    /// Any header or entry failure aborts the parse; no partial state is
    /// returned.
    pub fn parse(data: impl Into<Bytes>, offset: u64) -> Result<Self> {
        let data = data.into();
        let mut reader = ByteReader::new(&data);
        reader.seek(offset as usize);

        let header = BundleHeader::parse(&mut reader)?;
        debug!(
            "bundle '{}', version {}.{}, {} embedded files",
            header.bundle_id,
            header.major_version,
            header.minor_version,
            header.embedded_files_count
        );

        let mut entries = Vec::with_capacity(header.embedded_files_count as usize);
        for _ in 0..header.embedded_files_count {
            let entry = BundleFileEntry::parse(&mut reader, header.major_version)?;
            debug!(
                "embedded file '{}', size {}, type {}",
                entry.relative_path, entry.size, entry.file_type
            );
            entries.push(entry);
        }

        Ok(Self {
            data,
            offset,
            header,
            entries,
        })
    }

    /// Reads an executable and parses the bundle at an explicit offset
    pub fn from_file_at(path: impl AsRef<Path>, offset: u64) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| Error::file_read(path, source))?;
        Self::parse(data, offset)
    }

    /// Reads an executable, locates the bundle by signature scan and parses it.
    ///
    /// Fails with [`Error::MarkerNotFound`] when the scan comes up empty or
    /// yields an offset outside the file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|source| Error::file_read(path, source))?;
        let located = locator::find_bundle_offset(&data).ok_or(Error::MarkerNotFound)?;
        let offset = u64::try_from(located).map_err(|_| Error::MarkerNotFound)?;
        Self::parse(data, offset)
    }

    /// The manifest offset this bundle was parsed at
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// The parsed manifest header
    pub fn header(&self) -> &BundleHeader {
        &self.header
    }

    /// The parsed file entries, in manifest order
    pub fn entries(&self) -> &[BundleFileEntry] {
        &self.entries
    }

    /// Returns an entry's payload without writing it anywhere
    pub fn read_payload(&self, entry: &BundleFileEntry) -> Result<std::borrow::Cow<'_, [u8]>> {
        Extractor::new(&self.data).read_payload(entry)
    }

    /// Extracts every embedded file into `output_dir`, in manifest order
    pub fn extract_to(&self, output_dir: impl AsRef<Path>, sink: &mut dyn ProgressSink) -> Result<()> {
        Extractor::new(&self.data).extract_all(&self.entries, output_dir.as_ref(), sink)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::StatsSink;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn push_path_string(buf: &mut Vec<u8>, text: &str) {
        buf.push(text.len() as u8);
        buf.extend_from_slice(text.as_bytes());
    }

    fn push_entry(buf: &mut Vec<u8>, offset: i64, size: i64, compressed: i64, type_byte: u8, path: &str) {
        buf.extend_from_slice(&offset.to_le_bytes());
        buf.extend_from_slice(&size.to_le_bytes());
        buf.extend_from_slice(&compressed.to_le_bytes());
        buf.push(type_byte);
        push_path_string(buf, path);
    }

    /// Lays out a v6 host image: payload bytes first, manifest after them.
    /// Returns the image and the manifest offset.
    fn synthetic_bundle(payloads: &[(&str, &[u8])]) -> (Vec<u8>, u64) {
        let mut data = vec![0u8; 64];
        let mut placed = Vec::new();
        for (path, payload) in payloads {
            placed.push((*path, data.len() as i64, payload.len() as i64));
            data.extend_from_slice(payload);
        }

        let manifest_offset = data.len() as u64;
        data.extend_from_slice(&6u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&(placed.len() as i32).to_le_bytes());
        push_path_string(&mut data, "x");
        data.extend_from_slice(&[0u8; 32]); // two empty locations
        data.extend_from_slice(&0u64.to_le_bytes());
        for (path, offset, size) in placed {
            push_entry(&mut data, offset, size, 0, 1, path);
        }

        (data, manifest_offset)
    }

    #[test]
    fn test_end_to_end_extraction() {
        let (data, offset) = synthetic_bundle(&[("a/b.bin", b"HELLO")]);
        let bundle = Bundle::parse(data, offset).unwrap();

        assert_eq!(bundle.header().bundle_id, "x");
        assert_eq!(bundle.header().embedded_files_count, 1);
        assert_eq!(bundle.entries().len(), 1);
        assert_eq!(bundle.entries()[0].relative_path, "a/b.bin");

        let out = TempDir::new().unwrap();
        let mut stats = StatsSink::default();
        bundle.extract_to(out.path(), &mut stats).unwrap();

        let written = std::fs::read(out.path().join("a").join("b.bin")).unwrap();
        assert_eq!(written, b"HELLO");
        assert_eq!(stats.files_extracted, 1);
        assert_eq!(stats.bytes_written, 5);
    }

    #[test]
    fn test_multiple_entries_parse_in_order() {
        let (data, offset) = synthetic_bundle(&[
            ("app.dll", b"one"),
            ("lib/dep.dll", b"second"),
            ("app.deps.json", b"{}"),
        ]);
        let bundle = Bundle::parse(data, offset).unwrap();

        let paths: Vec<&str> = bundle
            .entries()
            .iter()
            .map(|e| e.relative_path.as_str())
            .collect();
        assert_eq!(paths, vec!["app.dll", "lib/dep.dll", "app.deps.json"]);

        let payload = bundle.read_payload(&bundle.entries()[1]).unwrap();
        assert_eq!(&*payload, b"second");
    }

    #[test]
    fn test_bad_entry_aborts_parse() {
        let (mut data, offset) = synthetic_bundle(&[("a.bin", b"HELLO")]);
        // corrupt the entry's offset field to zero
        let entry_start = data.len() - (8 + 8 + 8 + 1 + 1 + "a.bin".len());
        data[entry_start..entry_start + 8].copy_from_slice(&0i64.to_le_bytes());

        assert!(matches!(
            Bundle::parse(data, offset),
            Err(Error::InvalidEntry { offset: 0, .. })
        ));
    }

    #[test]
    fn test_parse_at_wrong_offset_fails() {
        let (data, offset) = synthetic_bundle(&[("a.bin", b"HELLO")]);
        let err = Bundle::parse(data, offset + 2).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidHeader { .. } | Error::UnexpectedEof { .. }
        ));
    }

    #[test]
    fn test_from_file_without_marker() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("plain.exe");
        std::fs::write(&exe, vec![0u8; 512]).unwrap();

        assert!(matches!(
            Bundle::from_file(&exe),
            Err(Error::MarkerNotFound)
        ));
    }

    #[test]
    fn test_from_file_at_round_trip() {
        let (data, offset) = synthetic_bundle(&[("a.bin", b"HELLO")]);
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("bundled.exe");
        std::fs::write(&exe, &data).unwrap();

        let bundle = Bundle::from_file_at(&exe, offset).unwrap();
        assert_eq!(bundle.offset(), offset);
        assert_eq!(bundle.entries().len(), 1);
    }
}
