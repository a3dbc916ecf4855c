//! Logical flash partitions and the partition table.
//!
//! A [`Partition`] names an inclusive sector range on one [`FlashChip`] and carries the byte
//! offset and size derived from it. The board tables spell out offset and size literally, so
//! [`Partition::validate`] recomputes both from the chip geometry and reports any disagreement.

use crate::error::Error;
use crate::flash::FlashChip;

/// Labels storage clients use to look up their region.
#[derive(
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    strum::EnumIter,
    strum::FromRepr,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Clone,
    Copy,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum PartitionLabel {
    Bootloader,
    Firmware,
    Settings,
    Waypoints,
    Log,
}

#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Partition {
    pub label: PartitionLabel,
    pub chip: &'static FlashChip,
    pub first_sector: u16,
    /// Inclusive.
    pub last_sector: u16,
    /// Byte offset of `first_sector` from the chip base.
    pub chip_offset: u32,
    pub size: u32,
}

impl Partition {
    /// Builds a partition with offset and size computed from the chip geometry.
    ///
    /// Panics (at compile time in a const context) if the sectors are not on the chip.
    pub const fn from_sectors(
        label: PartitionLabel,
        chip: &'static FlashChip,
        first_sector: u16,
        last_sector: u16,
    ) -> Self {
        let chip_offset = match chip.sector_offset(first_sector) {
            Some(offset) => offset,
            None => panic!("first sector is not on the chip"),
        };
        let size = match chip.span_size(first_sector, last_sector) {
            Some(size) => size,
            None => panic!("sector range is not on the chip"),
        };
        Self {
            label,
            chip,
            first_sector,
            last_sector,
            chip_offset,
            size,
        }
    }

    /// Chip offset one past the last byte of the partition.
    #[inline]
    pub const fn end(&self) -> u32 {
        self.chip_offset + self.size
    }

    /// `true` if `len` bytes at the partition-relative `offset` lie inside the partition.
    pub const fn contains(&self, offset: u32, len: u32) -> bool {
        match offset.checked_add(len) {
            Some(end) => end <= self.size,
            None => false,
        }
    }

    /// `true` if both partitions live on the same chip and share a sector.
    pub const fn overlaps(&self, other: &Partition) -> bool {
        self.chip.id as u8 == other.chip.id as u8
            && self.first_sector <= other.last_sector
            && other.first_sector <= self.last_sector
    }

    /// Checks the sector range against the chip and the declared offset and size against the
    /// range.
    pub const fn validate(&self) -> Result<(), Error> {
        if self.first_sector > self.last_sector
            || self.last_sector as u32 >= self.chip.sector_count()
        {
            return Err(Error::SectorOutOfRange(self.label));
        }
        match self.chip.sector_offset(self.first_sector) {
            Some(offset) if offset == self.chip_offset => {}
            _ => return Err(Error::OffsetMismatch(self.label)),
        }
        match self.chip.span_size(self.first_sector, self.last_sector) {
            Some(size) if size == self.size => {}
            _ => return Err(Error::SizeMismatch(self.label)),
        }
        Ok(())
    }
}

/// The registered set of partitions.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PartitionTable(&'static [Partition]);

impl PartitionTable {
    pub const fn new(partitions: &'static [Partition]) -> Self {
        Self(partitions)
    }

    #[inline]
    pub const fn as_slice(&self) -> &'static [Partition] {
        self.0
    }

    #[inline]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static Partition> {
        self.0.iter()
    }

    /// Resolves a label to its partition.
    pub fn find(&self, label: PartitionLabel) -> Result<&'static Partition, Error> {
        self.0
            .iter()
            .find(|partition| partition.label == label)
            .ok_or(Error::PartitionNotFound(label))
    }

    /// Validates every chip and partition, then checks that labels are unique and that no two
    /// partitions on the same chip overlap.
    pub const fn validate(&self) -> Result<(), Error> {
        let partitions = self.0;
        let mut i = 0;
        while i < partitions.len() {
            let partition = &partitions[i];
            if let Err(e) = partition.chip.validate() {
                return Err(e);
            }
            if let Err(e) = partition.validate() {
                return Err(e);
            }

            let mut j = i + 1;
            while j < partitions.len() {
                let other = &partitions[j];
                if partition.label as u8 == other.label as u8 {
                    return Err(Error::DuplicateLabel(other.label));
                }
                if partition.overlaps(other) {
                    return Err(Error::Overlap(partition.label, other.label));
                }
                j += 1;
            }
            i += 1;
        }
        Ok(())
    }
}

impl IntoIterator for &PartitionTable {
    type Item = &'static Partition;
    type IntoIter = core::slice::Iter<'static, Partition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
