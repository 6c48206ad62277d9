//! Section-table records.

use crate::reader::ReadAt;
use crate::ParseError;

use std::borrow::Cow;
use std::io::{Read, Seek};

/// On-disk size of one section-table record.
pub const SECTION_HEADER_SIZE: u64 = 40;

/// Section characteristics flags.
pub const IMAGE_SCN_CNT_CODE: u32 = 0x0000_0020;
pub const IMAGE_SCN_CNT_INITIALIZED_DATA: u32 = 0x0000_0040;
pub const IMAGE_SCN_CNT_UNINITIALIZED_DATA: u32 = 0x0000_0080;
pub const IMAGE_SCN_MEM_EXECUTE: u32 = 0x2000_0000;
pub const IMAGE_SCN_MEM_READ: u32 = 0x4000_0000;
pub const IMAGE_SCN_MEM_WRITE: u32 = 0x8000_0000;

/// One 40-byte section-table record.
///
/// `virtual_address` and `pointer_to_raw_data` place the same bytes in two
/// unrelated address spaces (loaded memory vs. the file on disk); nothing
/// ties the two together except this record.
#[derive(Debug, Clone)]
pub struct SectionHeader {
    /// Raw name bytes, null-padded.
    pub name: [u8; 8],
    /// In-memory size before alignment padding.
    pub virtual_size: u32,
    /// In-memory placement (RVA).
    pub virtual_address: u32,
    /// On-disk size.
    pub size_of_raw_data: u32,
    /// On-disk placement.
    pub pointer_to_raw_data: u32,
    pub pointer_to_relocations: u32,
    pub pointer_to_linenumbers: u32,
    pub number_of_relocations: u16,
    pub number_of_linenumbers: u16,
    /// Flag word, see the `IMAGE_SCN_*` constants.
    pub characteristics: u32,
}

impl SectionHeader {
    /// Reads one record at `offset`, fields in on-disk order.
    pub fn read_from<R: Read + Seek>(src: &mut R, offset: u64) -> Result<Self, ParseError> {
        let mut record = [0u8; SECTION_HEADER_SIZE as usize];
        src.read_bytes_at(offset, &mut record, "section header")?;

        let mut name = [0u8; 8];
        name.copy_from_slice(&record[0..8]);

        Ok(Self {
            name,
            virtual_size: u32::from_le_bytes([record[8], record[9], record[10], record[11]]),
            virtual_address: u32::from_le_bytes([record[12], record[13], record[14], record[15]]),
            size_of_raw_data: u32::from_le_bytes([record[16], record[17], record[18], record[19]]),
            pointer_to_raw_data: u32::from_le_bytes([
                record[20], record[21], record[22], record[23],
            ]),
            pointer_to_relocations: u32::from_le_bytes([
                record[24], record[25], record[26], record[27],
            ]),
            pointer_to_linenumbers: u32::from_le_bytes([
                record[28], record[29], record[30], record[31],
            ]),
            number_of_relocations: u16::from_le_bytes([record[32], record[33]]),
            number_of_linenumbers: u16::from_le_bytes([record[34], record[35]]),
            characteristics: u32::from_le_bytes([record[36], record[37], record[38], record[39]]),
        })
    }

    /// Section name with trailing padding stripped, decoded lossily.
    pub fn name_str(&self) -> Cow<'_, str> {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.name.len());
        String::from_utf8_lossy(&self.name[..end])
    }

    /// Returns true if this section holds code.
    pub fn is_code(&self) -> bool {
        self.characteristics & IMAGE_SCN_CNT_CODE != 0
    }

    /// Returns true if this section holds initialized data.
    pub fn is_initialized_data(&self) -> bool {
        self.characteristics & IMAGE_SCN_CNT_INITIALIZED_DATA != 0
    }

    /// Returns true if this section holds uninitialized data.
    pub fn is_uninitialized_data(&self) -> bool {
        self.characteristics & IMAGE_SCN_CNT_UNINITIALIZED_DATA != 0
    }

    /// Returns true if this section is executable.
    pub fn is_executable(&self) -> bool {
        self.characteristics & IMAGE_SCN_MEM_EXECUTE != 0
    }

    /// Returns true if this section is readable.
    pub fn is_readable(&self) -> bool {
        self.characteristics & IMAGE_SCN_MEM_READ != 0
    }

    /// Returns true if this section is writable.
    pub fn is_writable(&self) -> bool {
        self.characteristics & IMAGE_SCN_MEM_WRITE != 0
    }

    /// Compact `CIURWX` flag rendering, one column per characteristics flag.
    pub fn flags_string(&self) -> String {
        let mut flags = String::with_capacity(6);
        flags.push(if self.is_code() { 'C' } else { '-' });
        flags.push(if self.is_initialized_data() { 'I' } else { '-' });
        flags.push(if self.is_uninitialized_data() { 'U' } else { '-' });
        flags.push(if self.is_readable() { 'R' } else { '-' });
        flags.push(if self.is_writable() { 'W' } else { '-' });
        flags.push(if self.is_executable() { 'X' } else { '-' });
        flags
    }
}

/// Reads `count` consecutive records starting at `start_offset`.
///
/// Field values are taken as-is; nothing here rejects a section whose sizes
/// or pointers exceed the file. Callers that need robustness check at the
/// point of use.
pub fn read_section_table<R: Read + Seek>(
    src: &mut R,
    start_offset: u64,
    count: u16,
) -> Result<Vec<SectionHeader>, ParseError> {
    let mut sections = Vec::with_capacity(count as usize);
    for i in 0..u64::from(count) {
        sections.push(SectionHeader::read_from(
            src,
            start_offset + i * SECTION_HEADER_SIZE,
        )?);
    }
    Ok(sections)
}
