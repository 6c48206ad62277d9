//! pelens - inspect the export table of a PE image
//!
//! Usage:
//!   pelens <image>                 List all exports
//!   pelens <image> lookup <name>   Look up one export by name
//!   pelens <image> sections        List section headers
//!   pelens <image> directories     List data directories
//!   pelens <image> info            Show header summary

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pelens_pe::{directory_name, ExportEntry, PeImage, SectionHeader};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pelens")]
#[command(about = "Inspect the export table of a PE image", long_about = None)]
struct Cli {
    /// Path to the PE file
    image: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,

    /// Emit JSON instead of aligned text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List every export, name-ordered (the default)
    Exports,
    /// List section headers
    Sections,
    /// List the data-directory array
    Directories,
    /// Show header summary
    Info,
    /// Look up a single export by name
    Lookup {
        /// Exported name, matched exactly
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let file = File::open(&cli.image)
        .with_context(|| format!("Failed to open image: {}", cli.image.display()))?;
    let mut reader = BufReader::new(file);
    let image = PeImage::parse(&mut reader)
        .with_context(|| format!("Failed to parse {}", cli.image.display()))?;

    match cli.command {
        Some(Commands::Sections) => print_sections(&image, cli.json)?,
        Some(Commands::Directories) => print_directories(&image, cli.json)?,
        Some(Commands::Info) => print_info(&image),
        Some(Commands::Lookup { name }) => lookup(&image, &name, cli.json)?,
        Some(Commands::Exports) | None => print_exports(&image, cli.json)?,
    }

    Ok(())
}

fn print_exports(image: &PeImage, json: bool) -> Result<()> {
    let Some(table) = &image.exports else {
        if json {
            println!("[]");
        } else {
            println!("No export table present");
        }
        return Ok(());
    };

    if json {
        let records: Vec<ExportRecord> = table.index.iter().map(ExportRecord::from).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    match &table.module_name {
        Some(module) => println!(
            "Exports from {} ({} names, {} functions)",
            module, table.directory.number_of_names, table.directory.number_of_functions
        ),
        None => println!(
            "Exports ({} names, {} functions)",
            table.directory.number_of_names, table.directory.number_of_functions
        ),
    }
    println!();

    if table.index.is_empty() {
        println!("Export table is empty");
        return Ok(());
    }

    println!("{:<8} {:<12} Name", "Ordinal", "Address");
    println!("{}", "-".repeat(48));
    for entry in table.index.iter() {
        println!("{:<8} {:<#12x} {}", entry.ordinal, entry.address, entry.name);
    }

    Ok(())
}

fn print_sections(image: &PeImage, json: bool) -> Result<()> {
    if json {
        let records: Vec<SectionRecord> = image
            .sections
            .sections()
            .iter()
            .map(SectionRecord::from)
            .collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!(
        "{:<4} {:<10} {:<12} {:<12} {:<12} {:<12} {}",
        "Idx", "Name", "VirtAddr", "VirtSize", "RawPtr", "RawSize", "Flags"
    );
    println!("{}", "-".repeat(74));
    for (idx, section) in image.sections.sections().iter().enumerate() {
        println!(
            "{:<4} {:<10} {:<#12x} {:<#12x} {:<#12x} {:<#12x} {}",
            idx,
            section.name_str(),
            section.virtual_address,
            section.virtual_size,
            section.pointer_to_raw_data,
            section.size_of_raw_data,
            section.flags_string()
        );
    }

    Ok(())
}

fn print_directories(image: &PeImage, json: bool) -> Result<()> {
    let records: Vec<DirectoryRecord> = image
        .data_directories
        .iter()
        .enumerate()
        .map(|(index, entry)| DirectoryRecord {
            index,
            label: directory_name(index),
            rva: entry.rva,
            size: entry.size,
            file_offset: if entry.rva == 0 {
                None
            } else {
                image.sections.to_file_offset(entry.rva)
            },
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    println!(
        "{:<4} {:<16} {:<12} {:<12} {}",
        "Idx", "Entry", "RVA", "Size", "FileOffset"
    );
    println!("{}", "-".repeat(56));
    for record in &records {
        let offset = match record.file_offset {
            Some(offset) => format!("{:#x}", offset),
            None => "-".to_string(),
        };
        println!(
            "{:<4} {:<16} {:<#12x} {:<#12x} {}",
            record.index,
            record.label.unwrap_or(""),
            record.rva,
            record.size,
            offset
        );
    }

    Ok(())
}

fn print_info(image: &PeImage) {
    println!("Image Information");
    println!("=================");
    println!("e_lfanew:          {:#x}", image.dos.e_lfanew);
    println!("PE signature:      {:#010x}", image.header.signature);
    println!("Image base:        {:#x}", image.header.image_base);
    if image.alignment_fell_back() {
        println!(
            "Section alignment: {:#x} (stored {:#x} is unusable)",
            image.sections.alignment(),
            image.header.section_alignment
        );
    } else {
        println!("Section alignment: {:#x}", image.sections.alignment());
    }
    println!("Header end:        {:#x}", image.end_of_headers());
    println!("Sections:          {}", image.header.number_of_sections);
    println!("Data directories:  {}", image.header.number_of_rva_and_sizes);

    match &image.exports {
        Some(table) => {
            if let Some(module) = &table.module_name {
                println!("Export module:     {}", module);
            }
            println!("Exports:           {}", table.index.len());
        }
        None => println!("Exports:           none"),
    }
}

fn lookup(image: &PeImage, name: &str, json: bool) -> Result<()> {
    let index = image
        .export_index()
        .context("cannot look up a name in an image without exports")?;
    let Some(entry) = index.get(name) else {
        bail!("no export named '{}'", name);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&ExportRecord::from(entry))?);
    } else {
        println!(
            "{} -> ordinal {}, address {:#x}",
            entry.name, entry.ordinal, entry.address
        );
    }

    Ok(())
}

#[derive(Serialize)]
struct ExportRecord<'a> {
    name: &'a str,
    ordinal: u16,
    address: u32,
}

impl<'a> From<&'a ExportEntry> for ExportRecord<'a> {
    fn from(entry: &'a ExportEntry) -> Self {
        Self {
            name: &entry.name,
            ordinal: entry.ordinal,
            address: entry.address,
        }
    }
}

#[derive(Serialize)]
struct SectionRecord {
    name: String,
    virtual_address: u32,
    virtual_size: u32,
    pointer_to_raw_data: u32,
    size_of_raw_data: u32,
    flags: String,
}

impl From<&SectionHeader> for SectionRecord {
    fn from(section: &SectionHeader) -> Self {
        Self {
            name: section.name_str().into_owned(),
            virtual_address: section.virtual_address,
            virtual_size: section.virtual_size,
            pointer_to_raw_data: section.pointer_to_raw_data,
            size_of_raw_data: section.size_of_raw_data,
            flags: section.flags_string(),
        }
    }
}

#[derive(Serialize)]
struct DirectoryRecord {
    index: usize,
    label: Option<&'static str>,
    rva: u32,
    size: u32,
    file_offset: Option<u64>,
}
