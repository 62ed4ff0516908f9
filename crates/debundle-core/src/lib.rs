//! # debundle-core
//!
//! A library for locating, parsing and extracting self-contained .NET
//! single-file bundles.
//!
//! Single-file published .NET applications wrap their assemblies, native
//! libraries, configuration JSON and symbols inside a binary manifest
//! appended to a native host stub. This crate provides the core
//! functionality for:
//!
//! - Locating the manifest's byte offset via a signature scan
//! - Parsing the manifest header and variable-length file entries
//! - Extracting each entry's payload, raw or deflate-compressed, to disk
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`locator`]: Signature scan for the manifest offset
//! - [`reader`]: Little-endian primitive reads and the path-string format
//! - [`bundle`]: Header/entry parsing and the [`Bundle`] run context
//! - [`extract`]: Payload extraction and progress reporting
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use debundle_core::{Bundle, NullSink};
//!
//! // Locate and parse the bundle inside a published executable
//! let bundle = Bundle::from_file("./publish/my_app.exe")?;
//! println!("{} embedded files", bundle.entries().len());
//!
//! // Extract everything
//! bundle.extract_to("./out", &mut NullSink)?;
//! # Ok::<(), debundle_core::Error>(())
//! ```
//!
//! ## Extensibility
//!
//! The [`ProgressSink`] trait decouples progress reporting from extraction,
//! keeping the core free of console I/O.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod bundle;
pub mod error;
pub mod extract;
pub mod locator;
pub mod reader;

// Re-export primary types for convenience
pub use bundle::{Bundle, BundleFileEntry, BundleHeader, FileType, Location};
pub use error::{Error, Result};
pub use extract::{Extractor, NullSink, ProgressSink, StatsSink};
pub use locator::find_bundle_offset;
pub use reader::ByteReader;

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum byte length of a bundle path string
pub const MAX_PATH_LENGTH: usize = 4095;
