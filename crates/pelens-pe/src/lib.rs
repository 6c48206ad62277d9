//! # pelens-pe
//!
//! Reader for the export directory of PE images.
//!
//! The crate walks a file through any `Read + Seek` handle with explicit
//! seek-then-read pairs: DOS header, PE header, data directories, section
//! table, then the export directory and its three tables. RVAs are
//! translated to file offsets through the section map, exported names are
//! collected into a name-keyed [`ExportIndex`], and every failure surfaces
//! as a typed [`ParseError`]. Hostile inputs produce errors, never panics.
//!
//! ```no_run
//! use std::fs::File;
//!
//! # fn main() -> Result<(), pelens_pe::ParseError> {
//! let mut file = File::open("demo.dll")?;
//! let index = pelens_pe::parse_export_index(&mut file)?;
//! for entry in index.iter() {
//!     println!("{:<6} {:#x} {}", entry.ordinal, entry.address, entry.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod exports;
pub mod headers;
pub mod pe;
pub mod reader;
pub mod section;
pub mod translate;

pub use error::ParseError;
pub use exports::{ExportDirectory, ExportEntry, ExportIndex, ExportTable};
pub use headers::{directory_name, DataDirectory, DosHeader, PeHeader};
pub use pe::{parse_export_index, PeImage};
pub use reader::ReadAt;
pub use section::SectionHeader;
pub use translate::{align_up, SectionMap, DEFAULT_SECTION_ALIGNMENT};
