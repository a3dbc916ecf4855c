//! Board bring-up.
//!
//! [`Board::init`] runs every step once, in a fixed order, and stops at the first failure. The
//! stage reached so far is reported together with the [`Fault`] so the caller can show a blink
//! code or, on the host, assert on it.

use crate::board;
use crate::bootloader;
use crate::error::Fault;
use crate::flash::ChipId;
use crate::hw::{LogfsConfig, UsbDescriptor};
use crate::led;
use crate::partition::{Partition, PartitionLabel, PartitionTable};
use crate::platform::Drivers;
use crate::settings::{self, BootCount, HwSettings, MultiPortFunction};
use alloc::vec;
use core::fmt::Debug;
#[cfg(feature = "debug-logs")]
use core::fmt::Formatter;
#[cfg(feature = "defmt")]
use defmt::{info, trace, warn};
use thiserror::Error;

/// Milestones of the boot sequence, in order.
#[derive(
    strum::Display,
    strum::IntoStaticStr,
    strum::EnumIter,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Clone,
    Copy,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[strum(serialize_all = "kebab-case")]
pub enum BootStage {
    Cold,
    PeripheralsUp,
    FlashMounted,
    BootloaderUpdated,
    SensorsUp,
    IoConfigured,
    Ready,
}

/// Boot options that are not part of the static board tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootConfig {
    /// Passed to the table lookups. The RE1 has a single revision.
    pub board_revision: u32,
    /// Bootloader image to install if the one in flash differs.
    pub bootloader_payload: Option<&'static [u8]>,
    /// Format the settings filesystem and leave the watchdog off.
    pub erase_settings: bool,
    pub usb_descriptor: UsbDescriptor,
}

impl Default for BootConfig {
    fn default() -> Self {
        Self {
            board_revision: 0,
            bootloader_payload: None,
            erase_settings: cfg!(feature = "erase-flash"),
            usb_descriptor: board::USB_DESCRIPTOR,
        }
    }
}

/// A boot that stopped. `stage` is the last milestone completed before `fault`.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[error("{fault} (after {stage})")]
pub struct BootFailure {
    pub stage: BootStage,
    pub fault: Fault,
}

impl BootFailure {
    pub const fn blink_code(&self) -> u8 {
        self.fault.blink_code()
    }
}

/// What a successful boot did besides creating handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootReport {
    pub stage: BootStage,
    pub bootloader_updated: bool,
    pub boot_count: BootCount,
    pub watchdog_enabled: bool,
    pub usb_descriptor: UsbDescriptor,
    pub servo_outputs: u8,
}

/// Every peripheral handle created during boot.
pub struct Board<D: Drivers> {
    pub report: BootReport,
    pub settings: HwSettings,
    pub partitions: &'static PartitionTable,
    pub spi_gyro: D::SpiBus,
    pub i2c_internal: D::I2cAdapter,
    pub internal_flash: D::InternalFlash,
    pub external_flash: D::ExternalFlash,
    pub settings_fs: D::Logfs,
    pub waypoints_fs: D::Logfs,
    pub adc: D::Adc,
    pub gyro: D::Gyro,
    pub baro: D::Baro,
    pub usb: D::Usb,
    pub servos: D::Servos,
    pub streamfs: D::Streamfs,
    pub logging: D::Com,
}

#[cfg(feature = "debug-logs")]
impl<D: Drivers> Debug for Board<D> {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Board")
            .field("report", &self.report)
            .field("settings", &self.settings)
            .field("partitions", &self.partitions.len())
            .finish_non_exhaustive()
    }
}

fn advance(stage: &mut BootStage, next: BootStage) {
    #[cfg(feature = "defmt")]
    info!("boot: {} -> {}", *stage, next);

    *stage = next;
}

/// Turns a driver result into a boot step result, logging the driver error.
trait OrFault<T> {
    fn or_fault(self, stage: BootStage, fault: Fault) -> Result<T, BootFailure>;
}

impl<T, E: Debug> OrFault<T> for Result<T, E> {
    fn or_fault(self, stage: BootStage, fault: Fault) -> Result<T, BootFailure> {
        self.map_err(|_e| {
            #[cfg(feature = "defmt")]
            warn!("{} failed: {}", fault, defmt::Debug2Format(&_e));

            BootFailure { stage, fault }
        })
    }
}

fn check_layout(table: &PartitionTable, stage: BootStage) -> Result<(), BootFailure> {
    table.validate().map_err(|e| BootFailure {
        stage,
        fault: e.into(),
    })
}

fn external_partition(
    table: &PartitionTable,
    label: PartitionLabel,
    fault: Fault,
) -> Result<&'static Partition, Fault> {
    let partition = table.find(label).map_err(|_| fault)?;
    if partition.chip.id != ChipId::External {
        return Err(fault);
    }
    Ok(partition)
}

fn mount_logfs<D: Drivers>(
    drivers: &mut D,
    flash: &mut D::ExternalFlash,
    table: &PartitionTable,
    label: PartitionLabel,
    cfg: &'static LogfsConfig,
) -> Result<D::Logfs, Fault> {
    let partition = external_partition(table, label, Fault::Flash)?;

    #[cfg(feature = "defmt")]
    trace!("mount logfs {} @{:#08x}", label, partition.chip_offset);

    drivers
        .logfs_mount(flash, partition, cfg)
        .map_err(|_| Fault::Flash)
}

fn init_usb<D: Drivers>(
    drivers: &mut D,
    descriptor: UsbDescriptor,
    settings: &HwSettings,
) -> Result<D::Usb, D::Error> {
    drivers.usb_board_data_init();
    drivers.usb_descriptor_init(descriptor)?;
    let mut usb = drivers.usb_init(&board::USB_MAIN)?;

    let (vcp, hid) = settings.usb_functions(descriptor);
    drivers.usb_configure_cdc(&mut usb, vcp, &board::USB_CDC);
    drivers.usb_configure_hid(&mut usb, hid, board::usb_hid(descriptor));
    if descriptor.has_hid() || descriptor.has_cdc() {
        drivers.usb_activate(&mut usb);
    }
    Ok(usb)
}

impl<D: Drivers> Board<D> {
    /// Brings the board up from reset.
    pub fn init(drivers: &mut D, config: &BootConfig) -> Result<Self, BootFailure> {
        let mut stage = BootStage::Cold;

        drivers.delay_init();
        drivers.led_init(board::led_config(config.board_revision));
        let mut spi_gyro = drivers
            .spi_init(&board::SPI_GYRO)
            .or_fault(stage, Fault::BusInit)?;
        let spi_flash = drivers
            .spi_init(&board::SPI_FLASH)
            .or_fault(stage, Fault::BusInit)?;
        let mut i2c_internal = drivers
            .i2c_init(&board::I2C_INTERNAL)
            .or_fault(stage, Fault::BusInit)?;
        drivers
            .i2c_check_clear(&mut i2c_internal)
            .or_fault(stage, Fault::I2cBusLocked)?;
        advance(&mut stage, BootStage::PeripheralsUp);

        let mut internal_flash = drivers
            .internal_flash_init(&board::FLASH_CHIP_INTERNAL)
            .or_fault(stage, Fault::Flash)?;
        let mut external_flash = drivers
            .jedec_flash_init(spi_flash, &board::FLASH_CHIP_EXTERNAL, &board::FLASH_S25FL127)
            .or_fault(stage, Fault::Flash)?;

        let partitions = board::partition_table(config.board_revision);
        check_layout(partitions, stage)?;
        drivers.register_partitions(partitions);

        let mut settings_fs = mount_logfs(
            drivers,
            &mut external_flash,
            partitions,
            PartitionLabel::Settings,
            &board::FLASHFS_SETTINGS,
        )
        .map_err(|fault| BootFailure { stage, fault })?;
        let waypoints_fs = mount_logfs(
            drivers,
            &mut external_flash,
            partitions,
            PartitionLabel::Waypoints,
            &board::FLASHFS_WAYPOINTS,
        )
        .map_err(|fault| BootFailure { stage, fault })?;
        if config.erase_settings {
            drivers
                .logfs_format(&mut settings_fs)
                .or_fault(stage, Fault::Flash)?;
        }
        advance(&mut stage, BootStage::FlashMounted);

        let mut bootloader_updated = false;
        if let Some(payload) = config.bootloader_payload {
            bootloader_updated =
                bootloader::update(drivers, &mut internal_flash, partitions, payload)
                    .map_err(|fault| BootFailure { stage, fault })?;
            advance(&mut stage, BootStage::BootloaderUpdated);
        }

        drivers.clear_reset_flags();
        let mut settings = drivers.load_hw_settings();
        drivers.rtc_init(&board::RTC_MAIN);
        let watchdog_enabled = !config.erase_settings && !drivers.debugger_attached();
        if watchdog_enabled {
            drivers.watchdog_init(board::WATCHDOG_TIMEOUT_MS);
        }
        for &timer in board::INPUT_TIMERS.iter().chain(&board::OUTPUT_TIMERS) {
            drivers.timer_init(timer);
        }
        let boot_count = settings::check_boot_count(drivers);
        if let BootCount::Exceeded(_) = boot_count {
            settings = HwSettings::default();
        }

        drivers.watchdog_clear();
        drivers.wait_ms(50);
        drivers.sensors_init();
        let adc = drivers.adc_init(&board::ADC);
        let gyro = drivers
            .bmi160_init(&mut spi_gyro, &board::BMI160)
            .or_fault(stage, Fault::Gyro)?;
        // i2c sensor init is slow
        drivers.watchdog_clear();
        let baro = drivers
            .bmp280_init(&mut i2c_internal, &board::BMP280)
            .or_fault(stage, Fault::Baro)?;
        advance(&mut stage, BootStage::SensorsUp);

        let usb = init_usb(drivers, config.usb_descriptor, &settings)
            .or_fault(stage, Fault::Usb)?;

        drivers.configure_rx_port(settings.rx_port, board::PPM_TIMER, board::PPM_NUM_INPUTS);
        drivers.configure_serial_port(settings.serial_port, board::SERIAL_PORT_USART);
        if let Some(function) = settings.multi_port.serial() {
            drivers.configure_serial_port(function, board::MULTI_PORT_USART);
        }
        let servo_cfg = match settings.multi_port {
            MultiPortFunction::Pwm => &board::SERVO_ALL,
            _ => &board::SERVO_SHARED,
        };
        let servos = drivers.servo_init(servo_cfg);
        advance(&mut stage, BootStage::IoConfigured);

        let log = external_partition(partitions, PartitionLabel::Log, Fault::StreamLog)
            .map_err(|fault| BootFailure { stage, fault })?;
        let mut streamfs = drivers
            .streamfs_mount(&mut external_flash, log, &board::STREAMFS_LOG)
            .or_fault(stage, Fault::StreamLog)?;
        let rx = vec![0u8; board::LOG_BUFFER_LEN].into_boxed_slice();
        let tx = vec![0u8; board::LOG_BUFFER_LEN].into_boxed_slice();
        let logging = drivers
            .com_init(&mut streamfs, rx, tx)
            .or_fault(stage, Fault::LogChannel)?;
        advance(&mut stage, BootStage::Ready);

        let report = BootReport {
            stage,
            bootloader_updated,
            boot_count,
            watchdog_enabled,
            usb_descriptor: config.usb_descriptor,
            servo_outputs: servo_cfg.outputs,
        };

        #[cfg(feature = "defmt")]
        info!("{} ready: {}", board::BOARD_NAME, report);

        Ok(Self {
            report,
            settings,
            partitions,
            spi_gyro,
            i2c_internal,
            internal_flash,
            external_flash,
            settings_fs,
            waypoints_fs,
            adc,
            gyro,
            baro,
            usb,
            servos,
            streamfs,
            logging,
        })
    }

    /// [`Board::init`], halting with the fault's blink code on failure.
    pub fn init_or_halt(drivers: &mut D, config: &BootConfig) -> Self {
        match Self::init(drivers, config) {
            Ok(board) => board,
            Err(failure) => led::halt(drivers, failure.blink_code()),
        }
    }
}
