//! A partition seen as a flash device of its own.

use crate::partition::Partition;
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WindowError<E> {
    /// The access reaches past the end of the partition.
    #[error("access outside of partition")]
    OutOfBounds,

    /// Erase range does not start and end on a sector boundary of the chip.
    #[error("erase range not aligned to sectors")]
    NotAligned,

    #[error("flash driver error")]
    Flash(E),
}

impl<E: NorFlashError> NorFlashError for WindowError<E> {
    fn kind(&self) -> NorFlashErrorKind {
        match self {
            WindowError::OutOfBounds => NorFlashErrorKind::OutOfBounds,
            WindowError::NotAligned => NorFlashErrorKind::NotAligned,
            WindowError::Flash(e) => e.kind(),
        }
    }
}

/// Borrows a chip driver and exposes one partition of it. Offsets are relative to the start of
/// the partition.
pub struct PartitionFlash<'a, F> {
    flash: &'a mut F,
    partition: &'static Partition,
}

impl<'a, F> PartitionFlash<'a, F> {
    /// `flash` must be the driver of `partition.chip`.
    pub fn new(flash: &'a mut F, partition: &'static Partition) -> Self {
        Self { flash, partition }
    }

    pub fn partition(&self) -> &'static Partition {
        self.partition
    }
}

impl<F: ErrorType> PartitionFlash<'_, F> {
    fn chip_offset(&self, offset: u32, len: usize) -> Result<u32, WindowError<F::Error>> {
        let Ok(len) = u32::try_from(len) else {
            return Err(WindowError::OutOfBounds);
        };
        if self.partition.contains(offset, len) {
            Ok(self.partition.chip_offset + offset)
        } else {
            Err(WindowError::OutOfBounds)
        }
    }
}

impl<F: NorFlash> PartitionFlash<'_, F> {
    /// Erases every sector of the partition.
    pub fn erase_all(&mut self) -> Result<(), WindowError<F::Error>> {
        self.erase(0, self.partition.size)
    }
}

impl<F: ErrorType> ErrorType for PartitionFlash<'_, F> {
    type Error = WindowError<F::Error>;
}

impl<F: ReadNorFlash> ReadNorFlash for PartitionFlash<'_, F> {
    const READ_SIZE: usize = F::READ_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        let offset = self.chip_offset(offset, bytes.len())?;
        self.flash.read(offset, bytes).map_err(WindowError::Flash)
    }

    fn capacity(&self) -> usize {
        self.partition.size as usize
    }
}

impl<F: NorFlash> NorFlash for PartitionFlash<'_, F> {
    const WRITE_SIZE: usize = F::WRITE_SIZE;
    const ERASE_SIZE: usize = F::ERASE_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        if from > to || to > self.partition.size {
            return Err(WindowError::OutOfBounds);
        }
        let chip = self.partition.chip;
        let from = self.partition.chip_offset + from;
        let to = self.partition.chip_offset + to;
        if !chip.is_sector_boundary(from) || !chip.is_sector_boundary(to) {
            return Err(WindowError::NotAligned);
        }
        self.flash.erase(from, to).map_err(WindowError::Flash)
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        let offset = self.chip_offset(offset, bytes.len())?;
        self.flash.write(offset, bytes).map_err(WindowError::Flash)
    }
}
