//! Payload carving from a self-extracting installer binary.
//!
//! The installer is a shell-script header followed by a ZIP archive; the
//! payload starts at the first local-file-header signature. The input is
//! memory-mapped and scanned with a SIMD substring search, so multi-GiB
//! installers do not pull the whole file through the heap.

use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use memchr::memmem;
use memmap2::Mmap;

/// ZIP local-file-header signature that opens the embedded payload.
pub const ZIP_SIGNATURE: &[u8; 4] = b"PK\x03\x04";

/// Error carving the payload out of an installer binary.
#[derive(Debug)]
pub enum PayloadError {
    Io(io::Error),
    /// The installer contains no ZIP local-file-header signature.
    SignatureNotFound,
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "payload I/O error: {e}"),
            Self::SignatureNotFound => write!(f, "no ZIP signature found in installer"),
        }
    }
}

impl std::error::Error for PayloadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::SignatureNotFound => None,
        }
    }
}

impl From<io::Error> for PayloadError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// Offset of the first ZIP signature in `data`, if any.
pub fn find_zip_signature(data: &[u8]) -> Option<usize> {
    memmem::find(data, ZIP_SIGNATURE)
}

/// Write everything from the first ZIP signature onward into `output`.
///
/// Returns the signature offset within the installer.
pub fn carve_payload(installer: &Path, output: &Path) -> Result<u64, PayloadError> {
    let file = File::open(installer)?;
    if file.metadata()?.len() == 0 {
        return Err(PayloadError::SignatureNotFound);
    }
    // Read-only map; the installer is never mutated.
    let map = unsafe { Mmap::map(&file)? };

    let offset = find_zip_signature(&map).ok_or(PayloadError::SignatureNotFound)?;

    let mut out = File::create(output)?;
    out.write_all(&map[offset..])?;
    Ok(offset as u64)
}
