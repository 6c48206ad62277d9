//! Error types for PE image parsing.

use thiserror::Error;

/// Error type for PE image parsing.
///
/// Every variant is a reported, recoverable condition; the caller decides
/// whether to print a diagnostic, fall back, or abort.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The file does not start with the "MZ" DOS magic.
    #[error("not a PE image: expected MZ magic, got {actual:02x?}")]
    NotPe { actual: [u8; 2] },

    /// Unexpected end of file during a structured read.
    #[error("truncated file: wanted {wanted} bytes at offset {offset:#x} while reading {what}")]
    Truncated {
        offset: u64,
        wanted: usize,
        what: &'static str,
    },

    /// The optional header declares zero data directories.
    #[error("optional header declares no data directories")]
    NoDataDirectories,

    /// The export data-directory entry is absent or empty.
    #[error("image has no export table")]
    NoExportTable,

    /// An RVA fell inside no section's in-memory extent.
    #[error("RVA {rva:#x} ({what}) is not mapped by any section")]
    UnmappedDirectory { rva: u32, what: &'static str },

    /// I/O error other than end-of-file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Converts an I/O failure during a sized read at `offset` into the
    /// matching parse error: end-of-file becomes `Truncated`, everything
    /// else stays an I/O error.
    pub(crate) fn from_read(
        err: std::io::Error,
        offset: u64,
        wanted: usize,
        what: &'static str,
    ) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::Truncated {
                offset,
                wanted,
                what,
            }
        } else {
            Self::Io(err)
        }
    }
}
