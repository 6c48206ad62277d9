//! Positioned reads over a seekable source.
//!
//! Every helper is an explicit seek-then-read pair; no call relies on the
//! cursor position left behind by a previous one, so reads can be reordered
//! freely.

use byteorder::{LittleEndian, ReadBytesExt};

use crate::ParseError;

use std::io::{Read, Seek, SeekFrom};

/// Positioned little-endian reads for any `Read + Seek` source.
///
/// End-of-file during any read surfaces as [`ParseError::Truncated`] carrying
/// the offset and a short description of the field being read.
pub trait ReadAt: Read + Seek {
    /// Reads exactly `buf.len()` bytes at `offset`.
    fn read_bytes_at(
        &mut self,
        offset: u64,
        buf: &mut [u8],
        what: &'static str,
    ) -> Result<(), ParseError> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_exact(buf)
            .map_err(|e| ParseError::from_read(e, offset, buf.len(), what))
    }

    /// Reads a little-endian `u16` at `offset`.
    fn read_u16_at(&mut self, offset: u64, what: &'static str) -> Result<u16, ParseError> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_u16::<LittleEndian>()
            .map_err(|e| ParseError::from_read(e, offset, 2, what))
    }

    /// Reads a little-endian `u32` at `offset`.
    fn read_u32_at(&mut self, offset: u64, what: &'static str) -> Result<u32, ParseError> {
        self.seek(SeekFrom::Start(offset))?;
        self.read_u32::<LittleEndian>()
            .map_err(|e| ParseError::from_read(e, offset, 4, what))
    }

    /// Reads a null-terminated string starting at `offset`, excluding the
    /// terminator. The accumulation is bounded by the source itself:
    /// end-of-file before a terminator is `Truncated`, never an endless
    /// loop. Bytes decode lossily as UTF-8.
    fn read_cstring_at(&mut self, offset: u64, what: &'static str) -> Result<String, ParseError> {
        self.seek(SeekFrom::Start(offset))?;
        let mut bytes = Vec::new();
        loop {
            let byte = self
                .read_u8()
                .map_err(|e| ParseError::from_read(e, offset, bytes.len() + 1, what))?;
            if byte == 0 {
                break;
            }
            bytes.push(byte);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl<R: Read + Seek> ReadAt for R {}
