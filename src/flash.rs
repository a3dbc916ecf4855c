//! Flash chip geometry.
//!
//! A chip is described by an ordered list of [`SectorRange`]s. Sector sizes may differ between
//! ranges (the STM32F4 internal flash mixes 16 KiB, 64 KiB and 128 KiB sectors), so every byte
//! offset is found by walking the list and accumulating range sizes.
//!
//! All lookups are `const fn` so the board tables can be checked at compile time.

use crate::error::Error;

pub const FLASH_SECTOR_4KB: u32 = 4 * 1024;
pub const FLASH_SECTOR_16KB: u32 = 16 * 1024;
pub const FLASH_SECTOR_64KB: u32 = 64 * 1024;
pub const FLASH_SECTOR_128KB: u32 = 128 * 1024;

/// Physical flash devices present on the board.
#[derive(strum::Display, strum::IntoStaticStr, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum ChipId {
    /// MCU embedded flash.
    Internal,
    /// SPI NOR flash behind the JEDEC driver.
    External,
}

/// A run of equally sized sectors, `base_sector..=last_sector`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SectorRange {
    pub base_sector: u16,
    pub last_sector: u16,
    pub sector_size: u32,
}

impl SectorRange {
    pub const fn new(base_sector: u16, last_sector: u16, sector_size: u32) -> Self {
        Self {
            base_sector,
            last_sector,
            sector_size,
        }
    }

    #[inline]
    pub const fn sector_count(&self) -> u32 {
        if self.last_sector < self.base_sector {
            0
        } else {
            (self.last_sector - self.base_sector) as u32 + 1
        }
    }

    #[inline]
    pub const fn byte_len(&self) -> u32 {
        self.sector_count() * self.sector_size
    }

    #[inline]
    pub const fn contains(&self, sector: u16) -> bool {
        sector >= self.base_sector && sector <= self.last_sector
    }
}

/// Static description of one flash device.
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashChip {
    pub id: ChipId,
    /// Program granularity in bytes.
    pub page_size: u32,
    pub sectors: &'static [SectorRange],
}

impl FlashChip {
    /// Total number of sectors on the chip.
    pub const fn sector_count(&self) -> u32 {
        let mut count = 0;
        let mut i = 0;
        while i < self.sectors.len() {
            count += self.sectors[i].sector_count();
            i += 1;
        }
        count
    }

    /// Size of the chip in bytes.
    pub const fn capacity(&self) -> u32 {
        let mut bytes = 0;
        let mut i = 0;
        while i < self.sectors.len() {
            bytes += self.sectors[i].byte_len();
            i += 1;
        }
        bytes
    }

    /// Size of `sector` in bytes, `None` if the chip has no such sector.
    pub const fn sector_size(&self, sector: u16) -> Option<u32> {
        let mut i = 0;
        while i < self.sectors.len() {
            let range = &self.sectors[i];
            if range.contains(sector) {
                return Some(range.sector_size);
            }
            i += 1;
        }
        None
    }

    /// Byte offset of `sector` from the chip base: the sum of the sizes of all sectors before it.
    pub const fn sector_offset(&self, sector: u16) -> Option<u32> {
        let mut offset = 0;
        let mut i = 0;
        while i < self.sectors.len() {
            let range = &self.sectors[i];
            if range.contains(sector) {
                return Some(offset + (sector - range.base_sector) as u32 * range.sector_size);
            }
            offset += range.byte_len();
            i += 1;
        }
        None
    }

    /// Bytes covered by `first..=last`.
    pub const fn span_size(&self, first: u16, last: u16) -> Option<u32> {
        if first > last {
            return None;
        }
        let start = match self.sector_offset(first) {
            Some(start) => start,
            None => return None,
        };
        let end = match (self.sector_offset(last), self.sector_size(last)) {
            (Some(offset), Some(size)) => offset + size,
            _ => return None,
        };
        Some(end - start)
    }

    /// Sector containing the byte at `offset`.
    pub const fn sector_at(&self, offset: u32) -> Option<u16> {
        let mut base = 0;
        let mut i = 0;
        while i < self.sectors.len() {
            let range = &self.sectors[i];
            let len = range.byte_len();
            if offset < base + len {
                return Some(range.base_sector + ((offset - base) / range.sector_size) as u16);
            }
            base += len;
            i += 1;
        }
        None
    }

    /// `true` if `offset` is the start of a sector or the end of the chip.
    pub const fn is_sector_boundary(&self, offset: u32) -> bool {
        if offset == self.capacity() {
            return true;
        }
        match self.sector_at(offset) {
            Some(sector) => match self.sector_offset(sector) {
                Some(start) => start == offset,
                None => false,
            },
            None => false,
        }
    }

    /// Checks that the ranges start at sector 0, are sorted, contiguous and have non-zero sizes,
    /// and that the whole chip is addressable with a `u32` byte offset.
    ///
    /// The other lookups assume a validated chip and do unchecked arithmetic.
    pub const fn validate(&self) -> Result<(), Error> {
        if self.sectors.is_empty() {
            return Err(Error::ChipLayout);
        }
        let mut next_sector: u32 = 0;
        let mut bytes: u32 = 0;
        let mut i = 0;
        while i < self.sectors.len() {
            let range = &self.sectors[i];
            if range.sector_size == 0
                || range.last_sector < range.base_sector
                || range.base_sector as u32 != next_sector
            {
                return Err(Error::ChipLayout);
            }
            let len = match range.sector_count().checked_mul(range.sector_size) {
                Some(len) => len,
                None => return Err(Error::ChipLayout),
            };
            bytes = match bytes.checked_add(len) {
                Some(bytes) => bytes,
                None => return Err(Error::ChipLayout),
            };
            next_sector = range.last_sector as u32 + 1;
            i += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIXED: FlashChip = FlashChip {
        id: ChipId::Internal,
        page_size: 16,
        sectors: &[
            SectorRange::new(0, 3, FLASH_SECTOR_16KB),
            SectorRange::new(4, 4, FLASH_SECTOR_64KB),
            SectorRange::new(5, 7, FLASH_SECTOR_128KB),
        ],
    };

    #[test]
    fn walks_heterogeneous_ranges() {
        assert_eq!(MIXED.sector_count(), 8);
        assert_eq!(MIXED.capacity(), 512 * 1024);
        assert_eq!(MIXED.sector_offset(0), Some(0));
        assert_eq!(MIXED.sector_offset(4), Some(4 * FLASH_SECTOR_16KB));
        assert_eq!(MIXED.sector_offset(5), Some(131_072));
        assert_eq!(MIXED.sector_offset(7), Some(131_072 + 2 * FLASH_SECTOR_128KB));
        assert_eq!(MIXED.sector_offset(8), None);
        assert_eq!(MIXED.sector_size(4), Some(FLASH_SECTOR_64KB));
        assert_eq!(MIXED.span_size(3, 5), Some(16_384 + 65_536 + 131_072));
        assert_eq!(MIXED.span_size(5, 4), None);
    }

    #[test]
    fn inverse_lookup() {
        assert_eq!(MIXED.sector_at(0), Some(0));
        assert_eq!(MIXED.sector_at(16_383), Some(0));
        assert_eq!(MIXED.sector_at(16_384), Some(1));
        assert_eq!(MIXED.sector_at(65_536), Some(4));
        assert_eq!(MIXED.sector_at(131_072 + 131_071), Some(5));
        assert_eq!(MIXED.sector_at(MIXED.capacity()), None);

        assert!(MIXED.is_sector_boundary(65_536));
        assert!(!MIXED.is_sector_boundary(65_536 + 4096));
        assert!(MIXED.is_sector_boundary(MIXED.capacity()));
    }

    #[test]
    fn rejects_gaps_and_unsorted_ranges() {
        assert_eq!(MIXED.validate(), Ok(()));

        let gap = FlashChip {
            id: ChipId::External,
            page_size: 256,
            sectors: const {
                &[
                    SectorRange::new(0, 3, FLASH_SECTOR_4KB),
                    SectorRange::new(5, 7, FLASH_SECTOR_4KB),
                ]
            },
        };
        assert_eq!(gap.validate(), Err(Error::ChipLayout));

        let offset_start = FlashChip {
            id: ChipId::External,
            page_size: 256,
            sectors: const { &[SectorRange::new(1, 3, FLASH_SECTOR_4KB)] },
        };
        assert_eq!(offset_start.validate(), Err(Error::ChipLayout));

        let empty = FlashChip {
            id: ChipId::External,
            page_size: 256,
            sectors: &[],
        };
        assert_eq!(empty.validate(), Err(Error::ChipLayout));
    }

    #[test]
    fn rejects_chips_past_4gib() {
        // 65536 x 128 KiB = 8 GiB in one range
        let huge_range = FlashChip {
            id: ChipId::External,
            page_size: 256,
            sectors: const { &[SectorRange::new(0, u16::MAX, FLASH_SECTOR_128KB)] },
        };
        assert_eq!(huge_range.validate(), Err(Error::ChipLayout));

        // each range fits, the sum does not
        let huge_sum = FlashChip {
            id: ChipId::External,
            page_size: 256,
            sectors: const {
                &[
                    SectorRange::new(0, 16_383, FLASH_SECTOR_128KB),
                    SectorRange::new(16_384, 32_767, FLASH_SECTOR_128KB),
                ]
            },
        };
        assert_eq!(huge_sum.validate(), Err(Error::ChipLayout));

        // exactly 4 GiB minus one sector still fits
        let largest = FlashChip {
            id: ChipId::External,
            page_size: 256,
            sectors: const { &[SectorRange::new(0, 32_766, FLASH_SECTOR_128KB)] },
        };
        assert_eq!(largest.validate(), Ok(()));
    }
}
