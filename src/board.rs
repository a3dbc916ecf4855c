//! Static hardware definitions for the BrainFPV RE1.
//!
//! STM32F446 with a Spansion S25FL127 on SPI3. Flash geometry and JEDEC IDs are contracts with
//! the physical parts and must only change together with the bill of materials.

use crate::flash::{
    ChipId, FLASH_SECTOR_4KB, FLASH_SECTOR_16KB, FLASH_SECTOR_64KB, FLASH_SECTOR_128KB, FlashChip,
    SectorRange,
};
use crate::hw::{
    AdcConfig, AdcInstance, Bmi160Config, Bmp280Config, Bmp280Oversampling, DmaConfig,
    DmaController, DmaDirection, DmaIrqFlags, DmaPriority, DmaStream, ExtiConfig, GpioPort,
    HmcMagConfig, I2cConfig, I2cDutyCycle, I2cInstance, Irq, IrqChannel, IrqPriority, IrqTarget,
    JedecConfig, LedConfig, LedId, LogfsConfig, MagBias, MagGain, MagMode, MagOutputRate,
    Orientation, Phase, PinConfig, PinMode, Polarity, Pull, PwmChannel, RtcClockSource, RtcConfig,
    ServoConfig, Speed, SpiConfig, SpiInstance, StreamfsConfig, TimerInstance, Trigger,
    UsartInstance, UsbCdcConfig, UsbConfig, UsbDescriptor, UsbHidConfig, Vector,
    VideoLevelConfig,
};
use crate::partition::{Partition, PartitionLabel, PartitionTable};

pub const BOARD_NAME: &str = "BrainFPV RE1";
pub const SYSCLK_HZ: u32 = 180_000_000;

pub const WATCHDOG_TIMEOUT_MS: u32 = 250;

/// Consecutive unfinished boots after which hardware settings are reset to defaults.
pub const MAX_FAILED_BOOTS: u16 = 3;

/// RX and TX buffer size of the flash logging channel.
pub const LOG_BUFFER_LEN: usize = 256;

pub const PPM_NUM_INPUTS: u8 = 12;

// -- LEDs --------------------------------------------------------------------------------------

pub static LEDS: [LedConfig; 2] = [
    LedConfig {
        id: LedId::Heartbeat,
        pin: PinConfig::new(GpioPort::C, 9, PinMode::Output).pull(Pull::Down),
        active_high: false,
    },
    LedConfig {
        id: LedId::Alarm,
        pin: PinConfig::new(GpioPort::C, 8, PinMode::Output).pull(Pull::Down),
        active_high: false,
    },
];

pub fn led_config(_board_revision: u32) -> &'static [LedConfig] {
    &LEDS
}

// -- Flash -------------------------------------------------------------------------------------

static STM32F4_SECTORS: [SectorRange; 3] = [
    SectorRange::new(0, 3, FLASH_SECTOR_16KB),
    SectorRange::new(4, 4, FLASH_SECTOR_64KB),
    SectorRange::new(5, 7, FLASH_SECTOR_128KB),
];

pub static FLASH_CHIP_INTERNAL: FlashChip = FlashChip {
    id: ChipId::Internal,
    // 128-bit rows
    page_size: 16,
    sectors: &STM32F4_SECTORS,
};

static S25FL127_SECTORS: [SectorRange; 1] = [SectorRange::new(0, 2047, FLASH_SECTOR_4KB)];

pub static FLASH_CHIP_EXTERNAL: FlashChip = FlashChip {
    id: ChipId::External,
    page_size: 256,
    sectors: &S25FL127_SECTORS,
};

pub const JEDEC_MANUFACTURER_SPANSION: u8 = 0x01;

pub static FLASH_S25FL127: JedecConfig = JedecConfig {
    expect_manufacturer: JEDEC_MANUFACTURER_SPANSION,
    expect_memory_type: 0x40,
    expect_capacity: 0x17,
    sector_erase: 0x20,
};

// Sectors 2-4 of the internal flash are not allocated.
static PARTITIONS: [Partition; 5] = [
    Partition {
        label: PartitionLabel::Bootloader,
        chip: &FLASH_CHIP_INTERNAL,
        first_sector: 0,
        last_sector: 1,
        chip_offset: 0,
        size: 2 * FLASH_SECTOR_16KB,
    },
    Partition {
        label: PartitionLabel::Firmware,
        chip: &FLASH_CHIP_INTERNAL,
        first_sector: 5,
        last_sector: 7,
        chip_offset: 4 * FLASH_SECTOR_16KB + FLASH_SECTOR_64KB,
        size: (7 - 5 + 1) * FLASH_SECTOR_128KB,
    },
    Partition {
        label: PartitionLabel::Settings,
        chip: &FLASH_CHIP_EXTERNAL,
        first_sector: 0,
        last_sector: 15,
        chip_offset: 0,
        size: 16 * FLASH_SECTOR_4KB,
    },
    Partition {
        label: PartitionLabel::Waypoints,
        chip: &FLASH_CHIP_EXTERNAL,
        first_sector: 16,
        last_sector: 31,
        chip_offset: 16 * FLASH_SECTOR_4KB,
        size: (31 - 16 + 1) * FLASH_SECTOR_4KB,
    },
    Partition {
        label: PartitionLabel::Log,
        chip: &FLASH_CHIP_EXTERNAL,
        first_sector: 32,
        last_sector: 2047,
        chip_offset: 32 * FLASH_SECTOR_4KB,
        size: (2047 - 32 + 1) * FLASH_SECTOR_4KB,
    },
];

pub static PARTITION_TABLE: PartitionTable = PartitionTable::new(&PARTITIONS);

const _: () = assert!(
    FLASH_CHIP_INTERNAL.validate().is_ok(),
    "internal flash sector ranges must be contiguous"
);
const _: () = assert!(
    FLASH_CHIP_EXTERNAL.validate().is_ok(),
    "external flash sector ranges must be contiguous"
);
const _: () = assert!(
    PARTITION_TABLE.validate().is_ok(),
    "partitions must be in bounds, consistent and disjoint"
);

/// Partition table for the given hardware revision. RE1 has a single layout.
pub fn partition_table(_board_revision: u32) -> &'static PartitionTable {
    &PARTITION_TABLE
}

pub static FLASHFS_SETTINGS: LogfsConfig = LogfsConfig {
    fs_magic: 0x3bb141cf,
    // 64 * slot size
    arena_size: 0x0000_4000,
    slot_size: 0x0000_0100,
};

pub static FLASHFS_WAYPOINTS: LogfsConfig = LogfsConfig {
    fs_magic: 0x9a365a64,
    arena_size: 0x0000_4000,
    slot_size: 0x0000_0040,
};

pub static STREAMFS_LOG: StreamfsConfig = StreamfsConfig {
    fs_magic: 0x89abceef,
    arena_size: 0x0000_1000,
    write_size: 0x0000_0100,
};

// -- SPI ---------------------------------------------------------------------------------------

const fn spi_dma_stream(stream: u8, direction: DmaDirection) -> DmaStream {
    DmaStream {
        controller: DmaController::Dma1,
        stream,
        channel: 0,
        direction,
        priority: DmaPriority::Medium,
    }
}

/// SPI3, external flash. PCLK1 45 MHz / 8 = 5.6 MHz.
pub static SPI_FLASH: SpiConfig = SpiConfig {
    instance: SpiInstance::Spi3,
    alternate: 6,
    polarity: Polarity::IdleHigh,
    phase: Phase::CaptureOnSecondTransition,
    prescaler: 8,
    crc_polynomial: 7,
    use_crc: false,
    dma: DmaConfig {
        // RX stream raises the interrupt
        irq: Irq::new(IrqChannel::Dma1Stream2, IrqPriority::High),
        flags: DmaIrqFlags::ALL,
        rx: spi_dma_stream(2, DmaDirection::PeripheralToMemory),
        tx: Some(spi_dma_stream(7, DmaDirection::MemoryToPeripheral)),
    },
    sclk: PinConfig::new(GpioPort::C, 10, PinMode::Alternate(6)).speed(Speed::Mhz100),
    miso: PinConfig::new(GpioPort::C, 11, PinMode::Alternate(6)),
    mosi: PinConfig::new(GpioPort::C, 12, PinMode::Alternate(6)),
    slave_selects: &[PinConfig::new(GpioPort::A, 15, PinMode::Output).pull(Pull::Up)],
};

/// SPI1, BMI160. Polled, so the DMA interrupt stays unused.
pub static SPI_GYRO: SpiConfig = SpiConfig {
    instance: SpiInstance::Spi1,
    alternate: 5,
    polarity: Polarity::IdleHigh,
    phase: Phase::CaptureOnSecondTransition,
    prescaler: 16,
    crc_polynomial: 7,
    use_crc: false,
    dma: DmaConfig {
        irq: Irq::new(IrqChannel::Dma2Stream0, IrqPriority::High),
        flags: DmaIrqFlags::ALL,
        rx: DmaStream {
            controller: DmaController::Dma2,
            stream: 0,
            channel: 3,
            direction: DmaDirection::PeripheralToMemory,
            priority: DmaPriority::Medium,
        },
        tx: Some(DmaStream {
            controller: DmaController::Dma2,
            stream: 3,
            channel: 3,
            direction: DmaDirection::MemoryToPeripheral,
            priority: DmaPriority::Medium,
        }),
    },
    sclk: PinConfig::new(GpioPort::A, 5, PinMode::Alternate(5)).speed(Speed::Mhz100),
    miso: PinConfig::new(GpioPort::A, 6, PinMode::Alternate(5)),
    mosi: PinConfig::new(GpioPort::A, 7, PinMode::Alternate(5)),
    slave_selects: &[PinConfig::new(GpioPort::A, 4, PinMode::Output).pull(Pull::Up)],
};

// -- I2C ---------------------------------------------------------------------------------------

pub static I2C_INTERNAL: I2cConfig = I2cConfig {
    instance: I2cInstance::I2c1,
    alternate: 4,
    own_address: 0,
    ack: true,
    duty_cycle: I2cDutyCycle::Ratio2,
    clock_speed_hz: 400_000,
    transfer_timeout_ms: 50,
    scl: PinConfig::new(GpioPort::B, 8, PinMode::Alternate(4)).open_drain(),
    sda: PinConfig::new(GpioPort::B, 9, PinMode::Alternate(4)).open_drain(),
    event_irq: Irq::new(IrqChannel::I2c1Event, IrqPriority::Highest),
    error_irq: Irq::new(IrqChannel::I2c1Error, IrqPriority::Highest),
};

// -- USB ---------------------------------------------------------------------------------------

pub static USB_MAIN: UsbConfig = UsbConfig {
    irq: Irq::new(IrqChannel::OtgFs, IrqPriority::Highest),
    vsense: PinConfig::new(GpioPort::A, 9, PinMode::Input)
        .open_drain()
        .speed(Speed::Mhz25),
};

#[cfg(feature = "usb-cdc")]
pub const USB_DESCRIPTOR: UsbDescriptor = UsbDescriptor::HidCdc;
#[cfg(not(feature = "usb-cdc"))]
pub const USB_DESCRIPTOR: UsbDescriptor = UsbDescriptor::HidOnly;

pub static USB_CDC: UsbCdcConfig = UsbCdcConfig {
    ctrl_if: 0,
    ctrl_tx_ep: 2,
    data_if: 1,
    data_rx_ep: 3,
    data_tx_ep: 3,
};

/// HID interface numbering depends on whether the CDC interfaces precede it.
pub const fn usb_hid_config(descriptor: UsbDescriptor) -> UsbHidConfig {
    match descriptor {
        UsbDescriptor::HidOnly => UsbHidConfig {
            data_if: 0,
            data_rx_ep: 1,
            data_tx_ep: 1,
        },
        UsbDescriptor::HidCdc => UsbHidConfig {
            data_if: 2,
            data_rx_ep: 1,
            data_tx_ep: 1,
        },
    }
}

static USB_HID_ONLY: UsbHidConfig = usb_hid_config(UsbDescriptor::HidOnly);
static USB_HID_CDC: UsbHidConfig = usb_hid_config(UsbDescriptor::HidCdc);

pub fn usb_hid(descriptor: UsbDescriptor) -> &'static UsbHidConfig {
    match descriptor {
        UsbDescriptor::HidOnly => &USB_HID_ONLY,
        UsbDescriptor::HidCdc => &USB_HID_CDC,
    }
}

// -- ADC ---------------------------------------------------------------------------------------

pub static ADC: AdcConfig = AdcConfig {
    master: AdcInstance::Adc1,
    dma: DmaConfig {
        irq: Irq::new(IrqChannel::Dma2Stream4, IrqPriority::Low),
        flags: DmaIrqFlags::ALL,
        rx: DmaStream {
            controller: DmaController::Dma2,
            stream: 4,
            channel: 0,
            direction: DmaDirection::PeripheralToMemory,
            priority: DmaPriority::High,
        },
        tx: None,
    },
};

// -- RTC ---------------------------------------------------------------------------------------

/// The 16 MHz HSE divided by 16 gives 1 MHz, divided again by 16 in the RTC to a nominal
/// 62.5 kHz.
pub static RTC_MAIN: RtcConfig = RtcConfig {
    clock_source: RtcClockSource::HseDiv16,
    prescaler: 100,
    irq: Irq::new(IrqChannel::RtcWakeup, IrqPriority::Mid),
};

// -- Sensors -----------------------------------------------------------------------------------

pub static EXTI_BMI160: ExtiConfig = ExtiConfig {
    line: 13,
    pin: PinConfig::new(GpioPort::C, 13, PinMode::Input)
        .open_drain()
        .speed(Speed::Mhz2),
    irq: Irq::new(IrqChannel::Exti15_10, IrqPriority::Mid),
    trigger: Trigger::Rising,
};

pub static BMI160: Bmi160Config = Bmi160Config {
    exti: &EXTI_BMI160,
    orientation: Orientation::Top0Deg,
    odr_hz: 1600,
    accel_range_g: 8,
    gyro_range_dps: 2000,
    temperature_interleaving: 50,
};

pub static BMP280: Bmp280Config = Bmp280Config {
    oversampling: Bmp280Oversampling::HighResolution,
    temperature_interleaving: 1,
};

const HMC_EXTERNAL: HmcMagConfig = HmcMagConfig {
    output_rate: MagOutputRate::Hz75,
    bias: MagBias::Normal,
    gain: MagGain::Ga1_9,
    mode: MagMode::Single,
    orientation: Orientation::Top0Deg,
};

/// Optional magnetometers on the external I2C port.
pub static HMC5883_EXTERNAL: HmcMagConfig = HMC_EXTERNAL;
pub static HMC5983_EXTERNAL: HmcMagConfig = HMC_EXTERNAL;

// -- OSD ---------------------------------------------------------------------------------------

/// Black and white reference levels of the video overlay, TIM1 channels 1 and 3.
pub static VIDEO_LEVELS: VideoLevelConfig = VideoLevelConfig {
    timer: TimerInstance::Tim1,
    counter_hz: 25_500_000,
    period: 255,
    black: PwmChannel {
        channel: 1,
        pin: PinConfig::new(GpioPort::A, 8, PinMode::Alternate(1)),
        compare: 30,
    },
    white: PwmChannel {
        channel: 3,
        pin: PinConfig::new(GpioPort::A, 10, PinMode::Alternate(1)),
        compare: 110,
    },
};

// -- Timers, ports, servos ---------------------------------------------------------------------

/// Captures the PPM input on the receiver port.
pub const PPM_TIMER: TimerInstance = TimerInstance::Tim12;
pub static INPUT_TIMERS: [TimerInstance; 1] = [PPM_TIMER];
pub static OUTPUT_TIMERS: [TimerInstance; 3] =
    [TimerInstance::Tim1, TimerInstance::Tim3, TimerInstance::Tim5];

pub const SERIAL_PORT_USART: UsartInstance = UsartInstance::Usart1;
pub const MULTI_PORT_USART: UsartInstance = UsartInstance::Usart6;

/// Six outputs while the multi-function port runs a serial protocol.
pub static SERVO_SHARED: ServoConfig = ServoConfig {
    outputs: 6,
    update_hz: 50,
};

/// All eight outputs when the multi-function port is given to PWM.
pub static SERVO_ALL: ServoConfig = ServoConfig {
    outputs: 8,
    update_hz: 50,
};

// -- Interrupt routing -------------------------------------------------------------------------

pub static VECTORS: [Vector; 8] = [
    Vector {
        channel: IrqChannel::Dma1Stream2,
        target: IrqTarget::SpiFlash,
    },
    Vector {
        channel: IrqChannel::Dma2Stream0,
        target: IrqTarget::SpiGyro,
    },
    Vector {
        channel: IrqChannel::I2c1Event,
        target: IrqTarget::I2cInternalEvent,
    },
    Vector {
        channel: IrqChannel::I2c1Error,
        target: IrqTarget::I2cInternalError,
    },
    Vector {
        channel: IrqChannel::Dma2Stream4,
        target: IrqTarget::AdcDma,
    },
    Vector {
        channel: IrqChannel::RtcWakeup,
        target: IrqTarget::Rtc,
    },
    Vector {
        channel: IrqChannel::OtgFs,
        target: IrqTarget::Usb,
    },
    Vector {
        channel: IrqChannel::Exti15_10,
        target: IrqTarget::Bmi160,
    },
];

/// Driver instance servicing `channel`.
pub fn vector_target(channel: IrqChannel) -> Option<IrqTarget> {
    VECTORS
        .iter()
        .find(|vector| vector.channel == channel)
        .map(|vector| vector.target)
}
