//! Self-update of the bootloader from a payload embedded in the firmware image.
//!
//! The installed bootloader is compared with the payload by CRC-32 over the payload length. Only
//! a mismatch touches flash: the partition is erased and the payload written at offset 0.

use crate::error::Fault;
use crate::flash::ChipId;
use crate::hw::LedId;
use crate::led;
use crate::partition::{PartitionLabel, PartitionTable};
use crate::platform::{AlignedOps, Crc, Drivers};
use crate::window::PartitionFlash;
use alloc::vec;
#[cfg(feature = "defmt")]
use defmt::{info, trace};
use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};

pub const UPDATE_BLINKS: u8 = 10;
pub const UPDATE_BLINK_MS: u32 = 50;

const READ_CHUNK: usize = 256;

/// CRC-32 over the first `len` bytes of `flash`.
pub fn flash_crc32<C: Crc, F: NorFlash>(flash: &mut F, len: usize) -> Result<u32, F::Error> {
    let mut buf = vec![0u8; F::align_read(READ_CHUNK)];
    let mut crc = 0;
    let mut offset = 0;
    while offset < len {
        let take = (len - offset).min(buf.len());
        let chunk = &mut buf[..F::align_read(take)];
        flash.read(offset as u32, chunk)?;
        crc = C::crc32(crc, &chunk[..take]);
        offset += take;
    }
    Ok(crc)
}

/// Writes `bytes` at `offset`, padding the tail with 0xFF up to the write granularity.
pub fn write_padded<F: NorFlash>(flash: &mut F, offset: u32, bytes: &[u8]) -> Result<(), F::Error> {
    #[cfg(feature = "defmt")]
    trace!("write_padded @{:#08x}: [{}]", offset, bytes.len());

    if bytes.len().is_multiple_of(F::WRITE_SIZE) {
        return flash.write(offset, bytes);
    }

    let pivot = F::align_write_floor(bytes.len());
    let (header, trailer) = bytes.split_at(pivot);
    if !header.is_empty() {
        flash.write(offset, header)?;
    }

    // erased flash already reads 0xFF
    if trailer.iter().any(|&b| b != 0xFF) {
        let mut buf = vec![0xFFu8; F::WRITE_SIZE];
        buf[..trailer.len()].copy_from_slice(trailer);
        flash.write(offset + pivot as u32, &buf)?;
    }
    Ok(())
}

/// Installs `payload` into the bootloader partition unless it is already there.
///
/// Returns `true` if flash was rewritten. The alarm LED is lit while writing and blinks
/// [`UPDATE_BLINKS`] times afterwards.
pub fn update<D: Drivers>(
    drivers: &mut D,
    flash: &mut D::InternalFlash,
    table: &PartitionTable,
    payload: &[u8],
) -> Result<bool, Fault> {
    let partition = table
        .find(PartitionLabel::Bootloader)
        .map_err(|_| Fault::Bootloader)?;
    if partition.chip.id != ChipId::Internal {
        return Err(Fault::Bootloader);
    }

    let mut window = PartitionFlash::new(flash, partition);
    if payload.len() > window.capacity() {
        return Err(Fault::Bootloader);
    }

    let installed =
        flash_crc32::<D, _>(&mut window, payload.len()).map_err(|_| Fault::Bootloader)?;
    let wanted = D::crc32(0, payload);
    if installed == wanted {
        #[cfg(feature = "defmt")]
        trace!("bootloader up to date, crc {:#010x}", installed);
        return Ok(false);
    }

    #[cfg(feature = "defmt")]
    info!("updating bootloader: crc {:#010x} -> {:#010x}", installed, wanted);

    drivers.led_set(LedId::Alarm, true);
    window.erase_all().map_err(|_| Fault::Bootloader)?;
    write_padded(&mut window, 0, payload).map_err(|_| Fault::Bootloader)?;
    drivers.led_set(LedId::Alarm, false);

    led::blink(drivers, UPDATE_BLINKS, UPDATE_BLINK_MS, UPDATE_BLINK_MS);
    Ok(true)
}
