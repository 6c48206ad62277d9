//! RVA-to-file-offset translation over the section table.

use crate::section::SectionHeader;

/// Fallback when the optional header's section alignment is unusable.
pub const DEFAULT_SECTION_ALIGNMENT: u32 = 0x1000;

/// Rounds `value` up to the next multiple of `align`; already-aligned
/// values pass through unchanged.
///
/// `align` must be a nonzero power of two; the mask arithmetic is not
/// valid for other values. [`SectionMap::new`] guarantees this for every
/// alignment it uses.
pub fn align_up(value: u64, align: u64) -> u64 {
    let mask = align - 1;
    (value + mask) & !mask
}

/// The section table plus the alignment used to size in-memory extents.
///
/// One of these scopes all RVA translation for a single parse: components
/// take it by reference instead of sharing any ambient state.
#[derive(Debug, Clone)]
pub struct SectionMap {
    sections: Vec<SectionHeader>,
    alignment: u32,
}

impl SectionMap {
    /// Builds a map over `sections`, in file order.
    ///
    /// An `alignment` that is zero or not a power of two is unusable for
    /// extent rounding and falls back to [`DEFAULT_SECTION_ALIGNMENT`].
    pub fn new(sections: Vec<SectionHeader>, alignment: u32) -> Self {
        let alignment = if alignment.is_power_of_two() {
            alignment
        } else {
            DEFAULT_SECTION_ALIGNMENT
        };
        Self {
            sections,
            alignment,
        }
    }

    /// The alignment in effect, after any fallback.
    pub fn alignment(&self) -> u32 {
        self.alignment
    }

    /// The sections backing this map, in file order.
    pub fn sections(&self) -> &[SectionHeader] {
        &self.sections
    }

    /// Index of the first section whose in-memory extent contains `rva`.
    ///
    /// A section's extent is `[virtual_address, virtual_address +
    /// align_up(virtual_size, alignment))`. Entries are scanned in file
    /// order and the first hit wins; the format assumes extents do not
    /// overlap, and this map does not check that they don't. `None` is the
    /// normal outcome for an RVA in an unmapped gap.
    pub fn resolve_section(&self, rva: u32) -> Option<usize> {
        let rva = u64::from(rva);
        self.sections.iter().position(|section| {
            let start = u64::from(section.virtual_address);
            let end = start
                + align_up(
                    u64::from(section.virtual_size),
                    u64::from(self.alignment),
                );
            (start..end).contains(&rva)
        })
    }

    /// Translates `rva` to a file offset through its containing section.
    ///
    /// The offset is `rva - virtual_address + pointer_to_raw_data` of the
    /// resolved section; `None` when no section maps the RVA.
    pub fn to_file_offset(&self, rva: u32) -> Option<u64> {
        let section = &self.sections[self.resolve_section(rva)?];
        Some(
            u64::from(rva) - u64::from(section.virtual_address)
                + u64::from(section.pointer_to_raw_data),
        )
    }
}
