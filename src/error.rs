use crate::partition::PartitionLabel;
use thiserror::Error;

/// Errors found in a flash layout or while resolving a partition. A layout error means the static
/// tables disagree with the chip geometry; they are caught at compile time for the built-in
/// tables and again when a table is registered at boot.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// Sector ranges of a chip are empty, unsorted, not contiguous, not starting at sector 0 or
    /// have a zero sector size.
    #[error("invalid chip sector layout")]
    ChipLayout,

    /// No partition with this label has been registered.
    #[error("partition not found: {0}")]
    PartitionNotFound(PartitionLabel),

    /// `first_sector > last_sector` or the range runs past the end of the chip.
    #[error("sector range out of bounds: {0}")]
    SectorOutOfRange(PartitionLabel),

    /// The declared size differs from the sum of the covered sector sizes.
    #[error("size does not match sector range: {0}")]
    SizeMismatch(PartitionLabel),

    /// The declared chip offset differs from the offset of the first sector.
    #[error("offset does not match first sector: {0}")]
    OffsetMismatch(PartitionLabel),

    /// Two partitions on the same chip share at least one sector.
    #[error("partitions overlap: {0} and {1}")]
    Overlap(PartitionLabel, PartitionLabel),

    /// A label appears more than once in the table.
    #[error("duplicate partition label: {0}")]
    DuplicateLabel(PartitionLabel),
}

/// A boot step that failed. Every fault is terminal; [`Fault::blink_code`] is the number of alarm
/// LED pulses shown while the board is halted.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Fault {
    /// SPI or I2C adapter could not be brought up.
    #[error("bus init failed")]
    BusInit,

    /// Internal I2C bus is held low by a device and could not be cleared.
    #[error("internal i2c bus locked")]
    I2cBusLocked,

    /// Flash chip init, partition table registration or a settings mount failed.
    #[error("flash init failed")]
    Flash,

    /// The partition table failed validation while being registered.
    #[error("invalid flash layout: {0}")]
    Layout(Error),

    /// Bootloader partition missing, or erasing/writing it failed.
    #[error("bootloader update failed")]
    Bootloader,

    /// BMI160 gyro/accel did not respond.
    #[error("gyro init failed")]
    Gyro,

    /// BMP280 barometer did not respond.
    #[error("baro init failed")]
    Baro,

    /// USB descriptor or core init failed.
    #[error("usb init failed")]
    Usb,

    /// The stream log filesystem could not be mounted.
    #[error("stream log mount failed")]
    StreamLog,

    /// The logging COM channel could not be opened on the stream log.
    #[error("logging channel init failed")]
    LogChannel,
}

impl Fault {
    /// Number of alarm LED pulses identifying this fault.
    ///
    /// * 1 - flash chip or filesystem
    /// * 2 - BMI160 or bootloader update
    /// * 3 - internal I2C bus locked
    /// * 4 - BMP280
    /// * 7 - bus or USB init
    /// * 8 - stream log mount
    /// * 9 - logging channel
    pub const fn blink_code(&self) -> u8 {
        match self {
            Fault::Flash | Fault::Layout(_) => 1,
            Fault::Gyro | Fault::Bootloader => 2,
            Fault::I2cBusLocked => 3,
            Fault::Baro => 4,
            Fault::BusInit | Fault::Usb => 7,
            Fault::StreamLog => 8,
            Fault::LogChannel => 9,
        }
    }
}

impl From<Error> for Fault {
    fn from(value: Error) -> Self {
        Fault::Layout(value)
    }
}
