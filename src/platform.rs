//! Seams between the board tables and the peripheral drivers of the target.
//!
//! The board crate never touches registers. Every bring-up step goes through [`Drivers`], which
//! the firmware implements on top of its HAL and which the host tests implement with a recorder.

use crate::flash::FlashChip;
use crate::hw::{
    AdcConfig, Bmi160Config, Bmp280Config, I2cConfig, JedecConfig, LedConfig, LedId, LogfsConfig,
    RtcConfig, ServoConfig, SpiConfig, StreamfsConfig, TimerInstance, UsartInstance, UsbCdcConfig,
    UsbConfig, UsbDescriptor, UsbHidConfig,
};
use crate::partition::{Partition, PartitionTable};
use crate::settings::{HidFunction, HwSettings, RxPortFunction, SerialFunction, VcpFunction};
use alloc::boxed::Box;
use embedded_storage::nor_flash::NorFlash;

/// CRC-32 (IEEE, as computed by zlib) over `data`, continuing from `init`.
pub trait Crc {
    fn crc32(init: u32, data: &[u8]) -> u32;
}

impl<T: Crc> Crc for &mut T {
    fn crc32(init: u32, data: &[u8]) -> u32 {
        T::crc32(init, data)
    }
}

pub trait AlignedOps: NorFlash {
    fn align_read(size: usize) -> usize {
        align_ceil(size, Self::READ_SIZE)
    }

    fn align_write_ceil(size: usize) -> usize {
        align_ceil(size, Self::WRITE_SIZE)
    }

    fn align_write_floor(size: usize) -> usize {
        align_floor(size, Self::WRITE_SIZE)
    }
}

#[inline(always)]
const fn align_ceil(size: usize, alignment: usize) -> usize {
    if alignment.is_power_of_two() {
        size.saturating_add(alignment - 1) & !(alignment - 1)
    } else {
        size.saturating_add(alignment - 1) / alignment * alignment
    }
}

#[inline(always)]
const fn align_floor(size: usize, alignment: usize) -> usize {
    if alignment.is_power_of_two() {
        size & !(alignment - 1)
    } else {
        size / alignment * alignment
    }
}

impl<T: NorFlash> AlignedOps for T {}

/// Peripheral driver entry points used by [`Board::init`](crate::Board::init).
///
/// Handles returned by the `*_init` and `*_mount` methods are owned by the caller; nothing here
/// hands out global state. Methods without a `Result` cannot fail on this hardware or have their
/// failures handled inside the driver.
pub trait Drivers: Crc {
    /// Driver failure. The board only distinguishes success from failure; the value is logged.
    type Error: core::fmt::Debug;

    type SpiBus;
    type I2cAdapter;
    type InternalFlash: NorFlash;
    type ExternalFlash: NorFlash;
    /// Mounted log-structured filesystem.
    type Logfs;
    /// Mounted append-only stream log.
    type Streamfs;
    type Com;
    type Usb;
    type Adc;
    type Gyro;
    type Baro;
    type Servos;

    // timing and signalling
    fn delay_init(&mut self);
    fn wait_ms(&mut self, ms: u32);
    fn led_init(&mut self, leds: &'static [LedConfig]);
    fn led_set(&mut self, led: LedId, on: bool);
    fn watchdog_init(&mut self, timeout_ms: u32);
    fn watchdog_clear(&mut self);
    fn debugger_attached(&self) -> bool;

    // buses
    fn spi_init(&mut self, cfg: &'static SpiConfig) -> Result<Self::SpiBus, Self::Error>;
    fn i2c_init(&mut self, cfg: &'static I2cConfig) -> Result<Self::I2cAdapter, Self::Error>;
    /// Clocks out a slave holding SDA low. Fails if the bus stays locked.
    fn i2c_check_clear(&mut self, i2c: &mut Self::I2cAdapter) -> Result<(), Self::Error>;

    // flash
    fn internal_flash_init(
        &mut self,
        chip: &'static FlashChip,
    ) -> Result<Self::InternalFlash, Self::Error>;
    /// Probes the JEDEC ID and takes ownership of the SPI bus.
    fn jedec_flash_init(
        &mut self,
        spi: Self::SpiBus,
        chip: &'static FlashChip,
        cfg: &'static JedecConfig,
    ) -> Result<Self::ExternalFlash, Self::Error>;
    /// Makes the table available to the flash filesystems. Called once, after validation.
    fn register_partitions(&mut self, table: &'static PartitionTable);
    fn logfs_mount(
        &mut self,
        flash: &mut Self::ExternalFlash,
        partition: &'static Partition,
        cfg: &'static LogfsConfig,
    ) -> Result<Self::Logfs, Self::Error>;
    fn logfs_format(&mut self, fs: &mut Self::Logfs) -> Result<(), Self::Error>;
    fn streamfs_mount(
        &mut self,
        flash: &mut Self::ExternalFlash,
        partition: &'static Partition,
        cfg: &'static StreamfsConfig,
    ) -> Result<Self::Streamfs, Self::Error>;
    /// Opens a COM channel writing into the stream log. The buffers are moved into the channel.
    fn com_init(
        &mut self,
        fs: &mut Self::Streamfs,
        rx: Box<[u8]>,
        tx: Box<[u8]>,
    ) -> Result<Self::Com, Self::Error>;

    // system
    fn clear_reset_flags(&mut self);
    fn load_hw_settings(&mut self) -> HwSettings;
    /// Replaces hardware and module settings with their defaults.
    fn reset_settings_to_defaults(&mut self);
    fn rtc_init(&mut self, cfg: &'static RtcConfig);
    fn timer_init(&mut self, timer: TimerInstance);
    /// Number of boots since the counter was last cleared by a completed boot.
    fn boot_count(&mut self) -> u16;
    fn set_boot_count(&mut self, count: u16);
    fn boot_fault_alarm(&mut self, raised: bool);

    // sensors
    fn sensors_init(&mut self);
    fn adc_init(&mut self, cfg: &'static AdcConfig) -> Self::Adc;
    fn bmi160_init(
        &mut self,
        spi: &mut Self::SpiBus,
        cfg: &'static Bmi160Config,
    ) -> Result<Self::Gyro, Self::Error>;
    fn bmp280_init(
        &mut self,
        i2c: &mut Self::I2cAdapter,
        cfg: &'static Bmp280Config,
    ) -> Result<Self::Baro, Self::Error>;

    // usb
    fn usb_board_data_init(&mut self);
    fn usb_descriptor_init(&mut self, descriptor: UsbDescriptor) -> Result<(), Self::Error>;
    fn usb_init(&mut self, cfg: &'static UsbConfig) -> Result<Self::Usb, Self::Error>;
    fn usb_configure_cdc(
        &mut self,
        usb: &mut Self::Usb,
        function: VcpFunction,
        cfg: &'static UsbCdcConfig,
    );
    fn usb_configure_hid(
        &mut self,
        usb: &mut Self::Usb,
        function: HidFunction,
        cfg: &'static UsbHidConfig,
    );
    /// Attaches the USB hook so the host sees the advertised interfaces.
    fn usb_activate(&mut self, usb: &mut Self::Usb);

    // ports
    fn configure_rx_port(&mut self, function: RxPortFunction, timer: TimerInstance, inputs: u8);
    fn configure_serial_port(&mut self, function: SerialFunction, usart: UsartInstance);
    fn servo_init(&mut self, cfg: &'static ServoConfig) -> Self::Servos;
}
