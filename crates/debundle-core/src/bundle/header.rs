//! Bundle header parsing.
//!
//! The manifest opens with a fixed-shape header: two version fields, the
//! embedded file count, the bundle identifier, two auxiliary location
//! records and a flags word. The version/count triple is validated before
//! any variable-length read so a corrupt prefix cannot drive a runaway
//! path-length read.

use crate::error::{Error, Result};
use crate::reader::ByteReader;

/// An `(offset, size)` pair pointing at a region of the host executable.
///
/// The header carries two of these, for `deps.json` and
/// `runtimeconfig.json`. They are informational as far as extraction is
/// concerned; both files also appear as regular entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    /// Absolute byte offset of the region, zero when absent
    pub offset: i64,
    /// Size of the region in bytes
    pub size: i64,
}

impl Location {
    /// Returns true if this location points at an actual region
    pub fn is_valid(&self) -> bool {
        self.offset != 0
    }

    /// Reads a location as two consecutive little-endian `i64`s
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            offset: reader.read_i64()?,
            size: reader.read_i64()?,
        })
    }
}

/// The fixed-shape manifest header.
///
/// Parsed once per run and immutable thereafter. `major_version` decides the
/// shape of the file entries that follow (bundle 6.x adds a per-entry
/// compressed size).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleHeader {
    /// Bundle format major version (2 or 6)
    pub major_version: u32,
    /// Bundle format minor version (always 0)
    pub minor_version: u32,
    /// Number of file entries following the header
    pub embedded_files_count: i32,
    /// Identifier the SDK stamped into the bundle at publish time
    pub bundle_id: String,
    /// Location of the embedded `deps.json`
    pub deps_json_location: Location,
    /// Location of the embedded `runtimeconfig.json`
    pub runtime_config_json_location: Location,
    /// Header flags word
    pub flags: u64,
}

impl BundleHeader {
    /// Parses a header at the reader's current position.
    ///
    /// Fails with [`Error::InvalidHeader`] carrying the parsed values when
    /// the version/count combination is invalid; in that case no bytes past
    /// the three fixed fields are consumed.
    pub fn parse(reader: &mut ByteReader<'_>) -> Result<Self> {
        let major_version = reader.read_u32()?;
        let minor_version = reader.read_u32()?;
        let embedded_files_count = reader.read_i32()?;

        if embedded_files_count <= 0
            || minor_version != 0
            || !matches!(major_version, 2 | 6)
        {
            return Err(Error::InvalidHeader {
                major: major_version,
                minor: minor_version,
                count: embedded_files_count,
            });
        }

        let bundle_id = reader.read_path_string()?;
        let deps_json_location = Location::parse(reader)?;
        let runtime_config_json_location = Location::parse(reader)?;
        let flags = reader.read_u64()?;

        Ok(Self {
            major_version,
            minor_version,
            embedded_files_count,
            bundle_id,
            deps_json_location,
            runtime_config_json_location,
            flags,
        })
    }
}
