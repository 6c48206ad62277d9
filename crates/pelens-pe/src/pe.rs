//! Whole-image parse: headers, section map, export table.

use crate::exports::{read_export_table, ExportIndex, ExportTable};
use crate::headers::{
    read_data_directories, DataDirectory, DosHeader, PeHeader, DATA_DIRECTORIES_OFFSET,
    DIRECTORY_ENTRY_EXPORT,
};
use crate::section::{read_section_table, SECTION_HEADER_SIZE};
use crate::translate::SectionMap;
use crate::ParseError;

use std::io::{Read, Seek};

/// A parsed image: both headers, the data-directory table, the section
/// map, and the export table when the image carries one.
#[derive(Debug, Clone)]
pub struct PeImage {
    pub dos: DosHeader,
    pub header: PeHeader,
    pub data_directories: Vec<DataDirectory>,
    pub sections: SectionMap,
    /// `None` when the export directory entry is absent or zero.
    pub exports: Option<ExportTable>,
}

impl PeImage {
    /// Parses an image from `src`.
    ///
    /// All reads are explicit seek-then-read pairs against `src`, which is
    /// borrowed exclusively for the duration of the call. Nothing is
    /// cached between calls; parsing the same handle twice re-reads the
    /// file both times.
    pub fn parse<R: Read + Seek>(src: &mut R) -> Result<Self, ParseError> {
        let dos = DosHeader::read_from(src)?;
        let pe_offset = u64::from(dos.e_lfanew);
        let header = PeHeader::read_from(src, pe_offset)?;

        if header.number_of_rva_and_sizes == 0 {
            return Err(ParseError::NoDataDirectories);
        }
        let directories_offset = pe_offset + DATA_DIRECTORIES_OFFSET;
        let data_directories =
            read_data_directories(src, directories_offset, header.number_of_rva_and_sizes)?;

        let table_offset = directories_offset + 8 * u64::from(header.number_of_rva_and_sizes);
        let table = read_section_table(src, table_offset, header.number_of_sections)?;
        let sections = SectionMap::new(table, header.section_alignment);

        // count >= 1 was checked above, so entry 0 exists
        let export_entry = data_directories[DIRECTORY_ENTRY_EXPORT];
        let exports = if export_entry.rva != 0 && export_entry.size != 0 {
            let file_offset = sections.to_file_offset(export_entry.rva).ok_or(
                ParseError::UnmappedDirectory {
                    rva: export_entry.rva,
                    what: "export directory",
                },
            )?;
            Some(read_export_table(src, file_offset, &sections)?)
        } else {
            None
        };

        Ok(Self {
            dos,
            header,
            data_directories,
            sections,
            exports,
        })
    }

    /// The export index, or [`ParseError::NoExportTable`] when the image
    /// exports nothing.
    pub fn export_index(&self) -> Result<&ExportIndex, ParseError> {
        match &self.exports {
            Some(table) => Ok(&table.index),
            None => Err(ParseError::NoExportTable),
        }
    }

    /// True when the stored section alignment was unusable and the
    /// default took its place.
    pub fn alignment_fell_back(&self) -> bool {
        self.sections.alignment() != self.header.section_alignment
    }

    /// File offset just past the section table, where section raw data
    /// usually begins.
    pub fn end_of_headers(&self) -> u64 {
        u64::from(self.dos.e_lfanew)
            + DATA_DIRECTORIES_OFFSET
            + 8 * u64::from(self.header.number_of_rva_and_sizes)
            + SECTION_HEADER_SIZE * u64::from(self.header.number_of_sections)
    }
}

/// Parses `src` and returns the export index alone.
///
/// Fails with [`ParseError::NoExportTable`] when the image has no export
/// directory; callers that can live without one should use
/// [`PeImage::parse`] and inspect `exports` instead.
pub fn parse_export_index<R: Read + Seek>(src: &mut R) -> Result<ExportIndex, ParseError> {
    let image = PeImage::parse(src)?;
    match image.exports {
        Some(table) => Ok(table.index),
        None => Err(ParseError::NoExportTable),
    }
}
