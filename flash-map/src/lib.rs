//! Host-side view of the BrainFPV RE1 flash layout.
//!
//! Reads the same static tables the firmware is built with, so the output always matches what
//! the board registers at boot.

pub mod error;

mod csv;

use std::fmt::Write as _;
use std::path::Path;

use brainre1_board::board;
use brainre1_board::{FlashChip, PartitionTable};

pub use crate::csv::PartitionRow;
pub use error::Error;

/// The chips and partition table of one board revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashMap {
    pub chips: [&'static FlashChip; 2],
    pub table: &'static PartitionTable,
}

impl FlashMap {
    pub fn for_revision(board_revision: u32) -> Self {
        Self {
            chips: [&board::FLASH_CHIP_INTERNAL, &board::FLASH_CHIP_EXTERNAL],
            table: board::partition_table(board_revision),
        }
    }

    /// Validates both chips and the partition table.
    pub fn check(&self) -> Result<(), Error> {
        for chip in self.chips {
            chip.validate()?;
        }
        self.table.validate()?;
        Ok(())
    }

    pub fn rows(&self) -> impl Iterator<Item = PartitionRow> + '_ {
        self.table.iter().map(|p| PartitionRow {
            label: p.label.into(),
            chip: p.chip.id.into(),
            first_sector: p.first_sector,
            last_sector: p.last_sector,
            offset: p.chip_offset,
            size: p.size,
        })
    }

    /// Human readable listing of the chip geometry followed by the partitions.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for chip in self.chips {
            let _ = writeln!(
                out,
                "{} flash: {} sectors, {} bytes, page {}",
                chip.id,
                chip.sector_count(),
                chip.capacity(),
                chip.page_size
            );
            for range in chip.sectors {
                let _ = writeln!(
                    out,
                    "  sectors {:>4}-{:<4} {:>7} bytes each",
                    range.base_sector, range.last_sector, range.sector_size
                );
            }
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:<10} {:<8} {:>9} {:>10} {:>10}",
            "label", "chip", "sectors", "offset", "size"
        );
        for row in self.rows() {
            let _ = writeln!(
                out,
                "{:<10} {:<8} {:>4}-{:<4} {:#010x} {:>10}",
                row.label, row.chip, row.first_sector, row.last_sector, row.offset, row.size
            );
        }
        out
    }

    pub fn to_csv(&self) -> Result<String, Error> {
        csv::write_csv_content(self)
    }

    pub fn to_csv_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Error> {
        csv::write_csv(self, path)
    }
}
