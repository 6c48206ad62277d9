//! DOS and PE header fields.
//!
//! Only the fields the export walk needs are decoded. Every offset is
//! explicit: relative to the file start for the DOS header, relative to
//! `e_lfanew` for the PE header. Offsets follow the PE32 layout; PE32+
//! images are out of scope.

use crate::reader::ReadAt;
use crate::ParseError;

use std::io::{Read, Seek};

/// DOS header magic ("MZ").
pub const DOS_MAGIC: [u8; 2] = *b"MZ";
/// Offset of `e_lfanew` within the DOS header.
pub const DOS_LFANEW_OFFSET: u64 = 0x3C;

/// PE signature word ("PE\0\0").
pub const PE_SIGNATURE: u32 = 0x0000_4550;

/// Field offsets relative to `e_lfanew` (PE32 layout).
pub const NUMBER_OF_SECTIONS_OFFSET: u64 = 0x06;
pub const IMAGE_BASE_OFFSET: u64 = 0x34;
pub const SECTION_ALIGNMENT_OFFSET: u64 = 0x38;
pub const NUMBER_OF_RVA_AND_SIZES_OFFSET: u64 = 0x74;
/// Offset of the data-directory array relative to `e_lfanew`.
pub const DATA_DIRECTORIES_OFFSET: u64 = 0x78;

/// Index of the export entry in the data-directory array.
pub const DIRECTORY_ENTRY_EXPORT: usize = 0;

/// DOS header: the magic and the PE header pointer.
#[derive(Debug, Clone)]
pub struct DosHeader {
    /// Magic bytes at file start.
    pub magic: [u8; 2],
    /// File offset of the PE header.
    pub e_lfanew: u32,
}

impl DosHeader {
    /// Reads the DOS magic and `e_lfanew`. A file whose first two bytes are
    /// not "MZ" fails with [`ParseError::NotPe`] before any further read.
    pub fn read_from<R: Read + Seek>(src: &mut R) -> Result<Self, ParseError> {
        let mut magic = [0u8; 2];
        src.read_bytes_at(0, &mut magic, "DOS magic")?;
        if magic != DOS_MAGIC {
            return Err(ParseError::NotPe { actual: magic });
        }
        let e_lfanew = src.read_u32_at(DOS_LFANEW_OFFSET, "e_lfanew")?;
        Ok(Self { magic, e_lfanew })
    }
}

/// The PE-header field subset the export walk needs.
#[derive(Debug, Clone)]
pub struct PeHeader {
    /// Signature word found at `e_lfanew`; kept for display, not validated.
    pub signature: u32,
    /// Number of section-table records.
    pub number_of_sections: u16,
    /// Preferred load address.
    pub image_base: u32,
    /// Section alignment as stored in the optional header. May be zero or
    /// otherwise unusable; [`SectionMap`](crate::SectionMap) applies the
    /// fallback.
    pub section_alignment: u32,
    /// Length of the data-directory array.
    pub number_of_rva_and_sizes: u32,
}

impl PeHeader {
    /// Reads the header fields at their fixed offsets from `pe_offset`
    /// (the value of `e_lfanew`).
    pub fn read_from<R: Read + Seek>(src: &mut R, pe_offset: u64) -> Result<Self, ParseError> {
        let signature = src.read_u32_at(pe_offset, "PE signature")?;
        let number_of_sections =
            src.read_u16_at(pe_offset + NUMBER_OF_SECTIONS_OFFSET, "section count")?;
        let image_base = src.read_u32_at(pe_offset + IMAGE_BASE_OFFSET, "image base")?;
        let section_alignment =
            src.read_u32_at(pe_offset + SECTION_ALIGNMENT_OFFSET, "section alignment")?;
        let number_of_rva_and_sizes = src.read_u32_at(
            pe_offset + NUMBER_OF_RVA_AND_SIZES_OFFSET,
            "data directory count",
        )?;
        Ok(Self {
            signature,
            number_of_sections,
            image_base,
            section_alignment,
            number_of_rva_and_sizes,
        })
    }
}

/// Data directory entry: an (RVA, size) pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataDirectory {
    pub rva: u32,
    pub size: u32,
}

/// Reads `count` directory entries starting at `offset`.
///
/// The count comes straight from the optional header and is not clamped; an
/// oversized value runs into end-of-file and reports `Truncated` rather
/// than being trusted.
pub fn read_data_directories<R: Read + Seek>(
    src: &mut R,
    offset: u64,
    count: u32,
) -> Result<Vec<DataDirectory>, ParseError> {
    let mut directories = Vec::new();
    for i in 0..u64::from(count) {
        let entry_offset = offset + i * 8;
        let rva = src.read_u32_at(entry_offset, "data directory rva")?;
        let size = src.read_u32_at(entry_offset + 4, "data directory size")?;
        directories.push(DataDirectory { rva, size });
    }
    Ok(directories)
}

/// Conventional name of a well-known data-directory index.
pub fn directory_name(index: usize) -> Option<&'static str> {
    match index {
        0 => Some("Export"),
        1 => Some("Import"),
        2 => Some("Resource"),
        3 => Some("Exception"),
        4 => Some("Security"),
        5 => Some("Base relocation"),
        6 => Some("Debug"),
        7 => Some("Architecture"),
        8 => Some("Global pointer"),
        9 => Some("TLS"),
        10 => Some("Load config"),
        11 => Some("Bound import"),
        12 => Some("IAT"),
        13 => Some("Delay import"),
        14 => Some("CLR runtime"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    fn dos_stub(e_lfanew: u32) -> Vec<u8> {
        let mut data = vec![0u8; 0x40];
        data[0] = b'M';
        data[1] = b'Z';
        data[0x3C..0x40].copy_from_slice(&e_lfanew.to_le_bytes());
        data
    }

    #[test]
    fn test_dos_header_reads_lfanew() {
        let mut cur = Cursor::new(dos_stub(0x80));
        let dos = DosHeader::read_from(&mut cur).unwrap();
        assert_eq!(dos.magic, DOS_MAGIC);
        assert_eq!(dos.e_lfanew, 0x80);
    }

    #[test]
    fn test_wrong_magic_is_rejected_without_reading_further() {
        // two bytes only: touching e_lfanew would report Truncated instead
        let mut cur = Cursor::new(b"ZM".to_vec());
        let err = DosHeader::read_from(&mut cur).unwrap_err();
        assert!(matches!(
            err,
            ParseError::NotPe {
                actual: [b'Z', b'M']
            }
        ));
    }

    #[test]
    fn test_short_file_is_truncated() {
        let mut cur = Cursor::new(b"MZ".to_vec());
        let err = DosHeader::read_from(&mut cur).unwrap_err();
        assert!(matches!(err, ParseError::Truncated { .. }));
    }

    #[test]
    fn test_pe_header_fields_sit_at_fixed_offsets() {
        let lfanew = 0x80usize;
        let mut data = vec![0u8; 0x100];
        data[lfanew..lfanew + 4].copy_from_slice(&PE_SIGNATURE.to_le_bytes());
        data[lfanew + 0x06..lfanew + 0x08].copy_from_slice(&7u16.to_le_bytes());
        data[lfanew + 0x34..lfanew + 0x38].copy_from_slice(&0x0040_0000u32.to_le_bytes());
        data[lfanew + 0x38..lfanew + 0x3C].copy_from_slice(&0x1000u32.to_le_bytes());
        data[lfanew + 0x74..lfanew + 0x78].copy_from_slice(&16u32.to_le_bytes());

        let header = PeHeader::read_from(&mut Cursor::new(data), 0x80).unwrap();
        assert_eq!(header.signature, PE_SIGNATURE);
        assert_eq!(header.number_of_sections, 7);
        assert_eq!(header.image_base, 0x0040_0000);
        assert_eq!(header.section_alignment, 0x1000);
        assert_eq!(header.number_of_rva_and_sizes, 16);
    }

    #[test]
    fn test_oversized_directory_count_hits_end_of_file() {
        let data = vec![0u8; 0x40];
        let err = read_data_directories(&mut Cursor::new(data), 0x20, u32::MAX).unwrap_err();
        assert!(matches!(err, ParseError::Truncated { .. }));
    }

    #[test]
    fn test_directory_entries_decode_as_rva_size_pairs() {
        let mut data = vec![0u8; 0x20];
        data[0..4].copy_from_slice(&0x1000u32.to_le_bytes());
        data[4..8].copy_from_slice(&0x200u32.to_le_bytes());
        data[8..12].copy_from_slice(&0x3000u32.to_le_bytes());

        let dirs = read_data_directories(&mut Cursor::new(data), 0, 2).unwrap();
        assert_eq!(dirs.len(), 2);
        assert_eq!((dirs[0].rva, dirs[0].size), (0x1000, 0x200));
        assert_eq!((dirs[1].rva, dirs[1].size), (0x3000, 0));
    }
}
