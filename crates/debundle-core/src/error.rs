//! Error types for the debundle-core library.
//!
//! This module provides comprehensive error handling using the `thiserror` crate,
//! with detailed error variants for different failure modes.

use crate::bundle::FileType;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for debundle operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all debundle operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to write output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create output directory
    #[error("failed to create directory '{path}': {source}")]
    DirectoryCreate {
        /// Path to the directory that failed to create
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Path traversal attempt detected (security error)
    #[error("path traversal detected: '{path}' would escape output directory")]
    PathTraversal {
        /// The suspicious path
        path: PathBuf,
    },

    /// Fewer bytes available than a read requested
    #[error(
        "unexpected end of stream at offset {offset}: requested {requested} bytes, {available} available"
    )]
    UnexpectedEof {
        /// Read position where the shortfall occurred
        offset: usize,
        /// Number of bytes the read asked for
        requested: usize,
        /// Number of bytes actually remaining
        available: usize,
    },

    /// A path-string length prefix continued past its two-byte maximum
    #[error("bundle path length encoded beyond two bytes")]
    PathLengthOverflow,

    /// A path-string length prefix decoded to a value outside `[1, 4095]`
    #[error("invalid bundle path length: {length}")]
    InvalidPathLength {
        /// The decoded length
        length: usize,
    },

    /// A path string contained invalid UTF-8
    #[error("invalid utf-8 in bundle path string: {source}")]
    PathDecode {
        /// Underlying decode error
        #[source]
        source: std::str::Utf8Error,
    },

    /// Header version/count combination failed validation
    #[error(
        "failed to parse bundle header. Version: {major}.{minor}, embedded file count: {count}"
    )]
    InvalidHeader {
        /// Parsed major version
        major: u32,
        /// Parsed minor version
        minor: u32,
        /// Parsed embedded file count
        count: i32,
    },

    /// File entry field combination failed validation
    #[error(
        "failed to parse bundle file entry. Offset: {offset}, size: {size}, compressed size: {compressed_size}, type: {file_type}"
    )]
    InvalidEntry {
        /// Parsed payload offset
        offset: i64,
        /// Parsed payload size
        size: i64,
        /// Parsed compressed size (`-1` when the format carries none)
        compressed_size: i64,
        /// Parsed file type tag
        file_type: FileType,
    },

    /// The bundle signature marker was not found in the executable
    #[error("bundle signature marker not found in executable")]
    MarkerNotFound,

    /// Both zlib and raw-deflate decompression attempts failed
    #[error("failed to decompress '{path}': not a zlib or raw deflate stream")]
    Decompression {
        /// Relative path of the entry that failed
        path: String,
        /// Error from the raw-deflate fallback attempt
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new directory creation error
    pub fn directory_create(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::DirectoryCreate {
            path: path.into(),
            source,
        }
    }

    /// Creates a new path traversal error
    pub fn path_traversal(path: impl Into<PathBuf>) -> Self {
        Self::PathTraversal { path: path.into() }
    }

    /// Creates a new end-of-stream error
    pub fn unexpected_eof(offset: usize, requested: usize, available: usize) -> Self {
        Self::UnexpectedEof {
            offset,
            requested,
            available,
        }
    }

    /// Creates a new decompression error
    pub fn decompression(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Decompression {
            path: path.into(),
            source,
        }
    }

    /// Returns true if this error only means "this executable is not a bundle"
    /// and a multi-file scan should skip the file rather than abort
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MarkerNotFound | Self::InvalidHeader { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidHeader {
            major: 3,
            minor: 1,
            count: 0,
        };
        assert!(err.to_string().contains("Version: 3.1"));
        assert!(err.to_string().contains("count: 0"));
    }

    #[test]
    fn test_eof_display() {
        let err = Error::unexpected_eof(10, 8, 3);
        assert!(err.to_string().contains("offset 10"));
        assert!(err.to_string().contains("requested 8"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(Error::MarkerNotFound.is_recoverable());
        assert!(!Error::path_traversal("/test").is_recoverable());
    }
}
