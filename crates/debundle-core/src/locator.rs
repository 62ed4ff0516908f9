//! Signature scan for locating the bundle manifest inside a host executable.
//!
//! Single-file .NET apphosts carry the manifest offset in a small footer
//! structure that sits immediately before a fixed ASCII marker (the tail of
//! the placeholder GUID the SDK patches at publish time). Locating the
//! manifest therefore means:
//!
//! 1. Read the PE header pointer at `0x3C` and the machine type behind it
//! 2. Pick the footer size for that architecture
//! 3. Scan the raw bytes for the marker
//! 4. Read the little-endian `i32` stored `footer` bytes before the match
//!
//! The returned offset is a hint, not a guarantee: callers must validate it
//! by attempting a header parse.

use tracing::{debug, trace};

/// ASCII marker preceding the stored bundle offset in published apphosts
const BUNDLE_MARKER: &[u8] = b"38cc827-e34f-4453-9df4-1e796e9f1d07";

/// Byte offset of the PE header pointer in the DOS stub
const PE_POINTER_OFFSET: usize = 0x3C;

/// COFF machine type for 32-bit x86
const MACHINE_I386: u16 = 0x14C;

/// Bytes between the stored offset and the marker, per stub architecture
const FOOTER_SIZE_X86: usize = 0x1 + 0x8 + 0x20 + 0x8;
const FOOTER_SIZE_X64: usize = 0x1 + 0x10 + 0x20 + 0x8;

/// Scans a host executable's bytes for the bundle manifest offset.
///
/// Returns `None` when the input is too short, the marker is absent, or the
/// computed read position falls outside the buffer. A returned offset may
/// still point at garbage; it is only trusted once a header parses at it.
pub fn find_bundle_offset(data: &[u8]) -> Option<i32> {
    if data.len() < 0x40 {
        return None;
    }

    let pe_offset = read_u32_at(data, PE_POINTER_OFFSET)? as usize;
    let machine = read_u16_at(data, pe_offset.checked_add(4)?)?;

    let footer_size = if machine == MACHINE_I386 {
        FOOTER_SIZE_X86
    } else {
        FOOTER_SIZE_X64
    };
    trace!(
        "machine type {:#06x}, footer size {}",
        machine,
        footer_size
    );

    let marker_pos = find_subsequence(data, BUNDLE_MARKER)?;
    trace!("found bundle marker at position {}", marker_pos);

    let target = marker_pos.checked_sub(footer_size)?;
    if target + 4 > data.len() {
        return None;
    }

    let offset = i32::from_le_bytes([
        data[target],
        data[target + 1],
        data[target + 2],
        data[target + 3],
    ]);
    debug!("bundle offset {:#x} read at position {}", offset, target);
    Some(offset)
}

fn read_u16_at(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset + 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

fn read_u32_at(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Find a subsequence within a byte slice
fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
