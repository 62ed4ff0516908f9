//! File entry parsing.
//!
//! Each entry names one embedded file: where its payload sits in the host
//! executable, how large it is, an optional compressed size (bundle 6.x
//! only) and its role in the application.

use crate::error::{Error, Result};
use crate::reader::ByteReader;

/// Role of an embedded file within the application.
///
/// Decoded from a single byte. Values a newer SDK may emit decode to
/// [`FileType::Unknown`] rather than failing, so manifests from future
/// producers still parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FileType {
    /// Unrecognized entry type
    Unknown = 0,
    /// Managed assembly
    Assembly = 1,
    /// Native library or executable
    NativeBinary = 2,
    /// The application's `deps.json`
    DepsJson = 3,
    /// The application's `runtimeconfig.json`
    RuntimeConfigJson = 4,
    /// Debug symbols
    Symbols = 5,
    /// Sentinel marking the end of the type range; never valid on an entry
    Last = 6,
}

impl From<u8> for FileType {
    fn from(value: u8) -> Self {
        match value {
            0 => FileType::Unknown,
            1 => FileType::Assembly,
            2 => FileType::NativeBinary,
            3 => FileType::DepsJson,
            4 => FileType::RuntimeConfigJson,
            5 => FileType::Symbols,
            6 => FileType::Last,
            _ => FileType::Unknown,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FileType::Unknown => "unknown",
            FileType::Assembly => "assembly",
            FileType::NativeBinary => "native-binary",
            FileType::DepsJson => "deps-json",
            FileType::RuntimeConfigJson => "runtime-config-json",
            FileType::Symbols => "symbols",
            FileType::Last => "last",
        };
        f.write_str(name)
    }
}

/// One embedded file record from the manifest.
///
/// Entries are parsed sequentially, `embedded_files_count` times, and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFileEntry {
    /// Absolute byte offset of the payload in the host executable
    pub offset: i64,
    /// Uncompressed payload size in bytes
    pub size: i64,
    /// Stored (compressed) size; `-1` when the format carries none
    pub compressed_size: i64,
    /// Role of the embedded file
    pub file_type: FileType,
    /// Destination path, `/`-separated
    pub relative_path: String,
}

impl BundleFileEntry {
    /// Parses one entry at the reader's current position.
    ///
    /// The record shape depends on `major_version`: bundle 6.x carries a
    /// `compressed_size` field, older versions do not and the field is set
    /// to the `-1` sentinel. The constructed entry must satisfy
    /// `offset > 0 && size > 0 && compressed_size >= 0 && file_type != Last`,
    /// otherwise [`Error::InvalidEntry`] carries all four fields back.
    ///
    /// Note that the sentinel never satisfies `compressed_size >= 0`, so a
    /// non-6.x entry always fails validation; see DESIGN.md.
    pub fn parse(reader: &mut ByteReader<'_>, major_version: u32) -> Result<Self> {
        let offset = reader.read_i64()?;
        let size = reader.read_i64()?;

        let compressed_size = if major_version == 6 {
            reader.read_i64()?
        } else {
            -1
        };

        let file_type = FileType::from(reader.read_u8()?);
        let relative_path = reader.read_path_string()?;

        let entry = Self {
            offset,
            size,
            compressed_size,
            file_type,
            relative_path,
        };

        if !entry.is_valid() {
            return Err(Error::InvalidEntry {
                offset: entry.offset,
                size: entry.size,
                compressed_size: entry.compressed_size,
                file_type: entry.file_type,
            });
        }

        Ok(entry)
    }

    fn is_valid(&self) -> bool {
        self.offset > 0
            && self.size > 0
            && self.compressed_size >= 0
            && self.file_type != FileType::Last
    }

    /// Returns true if the payload is stored deflate-compressed
    pub fn is_compressed(&self) -> bool {
        self.compressed_size > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn encode_entry(
        offset: i64,
        size: i64,
        compressed: Option<i64>,
        type_byte: u8,
        path: &str,
    ) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&offset.to_le_bytes());
        buf.extend_from_slice(&size.to_le_bytes());
        if let Some(compressed) = compressed {
            buf.extend_from_slice(&compressed.to_le_bytes());
        }
        buf.push(type_byte);
        buf.push(path.len() as u8);
        buf.extend_from_slice(path.as_bytes());
        buf
    }

    #[test]
    fn test_parse_v6_entry() {
        let data = encode_entry(0x400, 1234, Some(600), 1, "lib/app.dll");
        let mut reader = ByteReader::new(&data);
        let entry = BundleFileEntry::parse(&mut reader, 6).unwrap();

        assert_eq!(entry.offset, 0x400);
        assert_eq!(entry.size, 1234);
        assert_eq!(entry.compressed_size, 600);
        assert_eq!(entry.file_type, FileType::Assembly);
        assert_eq!(entry.relative_path, "lib/app.dll");
        assert!(entry.is_compressed());
    }

    #[test]
    fn test_parse_v6_uncompressed_entry() {
        let data = encode_entry(0x400, 1234, Some(0), 3, "app.deps.json");
        let mut reader = ByteReader::new(&data);
        let entry = BundleFileEntry::parse(&mut reader, 6).unwrap();
        assert_eq!(entry.compressed_size, 0);
        assert!(!entry.is_compressed());
    }

    #[test]
    fn test_v2_entries_are_always_rejected() {
        // Bundle 2.x records carry no compressed_size field; the parser pins
        // it to -1, which the `compressed_size >= 0` validity rule rejects.
        let data = encode_entry(0x400, 1234, None, 1, "lib/app.dll");
        let mut reader = ByteReader::new(&data);
        let err = BundleFileEntry::parse(&mut reader, 2).unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidEntry {
                offset: 0x400,
                size: 1234,
                compressed_size: -1,
                file_type: FileType::Assembly,
            }
        ));
    }

    #[test]
    fn test_unknown_type_byte_decodes_to_unknown() {
        let data = encode_entry(8, 8, Some(0), 0xC3, "x");
        let mut reader = ByteReader::new(&data);
        let entry = BundleFileEntry::parse(&mut reader, 6).unwrap();
        assert_eq!(entry.file_type, FileType::Unknown);
    }

    #[test]
    fn test_last_type_is_rejected() {
        let data = encode_entry(8, 8, Some(0), 6, "x");
        let mut reader = ByteReader::new(&data);
        assert!(matches!(
            BundleFileEntry::parse(&mut reader, 6),
            Err(Error::InvalidEntry {
                file_type: FileType::Last,
                ..
            })
        ));
    }

    #[test]
    fn test_nonpositive_offset_and_size_are_rejected() {
        for (offset, size) in [(0i64, 5i64), (-3, 5), (8, 0), (8, -1)] {
            let data = encode_entry(offset, size, Some(0), 1, "x");
            let mut reader = ByteReader::new(&data);
            assert!(
                BundleFileEntry::parse(&mut reader, 6).is_err(),
                "entry with offset {offset}, size {size} should be invalid"
            );
        }
    }

    #[test]
    fn test_file_type_round_trip() {
        for byte in 0u8..=6 {
            let file_type = FileType::from(byte);
            assert_eq!(file_type as u8, byte);
        }
        assert_eq!(FileType::from(7), FileType::Unknown);
        assert_eq!(FileType::from(0xFF), FileType::Unknown);
    }
}
