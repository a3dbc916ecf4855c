//! Peripheral descriptor types.
//!
//! Plain data mirroring what the STM32F4 peripheral drivers need at init: register block,
//! pin muxing, DMA stream assignment and NVIC priority. The values for this board live in
//! [`crate::board`]; these types only give them shape.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GpioPort {
    A,
    B,
    C,
    D,
    H,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    Input,
    Output,
    /// Alternate function number.
    Alternate(u8),
    Analog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputType {
    PushPull,
    OpenDrain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    None,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    Mhz2,
    Mhz25,
    Mhz50,
    Mhz100,
}

/// One GPIO line and the way it is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    pub port: GpioPort,
    pub pin: u8,
    pub mode: PinMode,
    pub output: OutputType,
    pub pull: Pull,
    pub speed: Speed,
}

impl PinConfig {
    pub const fn new(port: GpioPort, pin: u8, mode: PinMode) -> Self {
        Self {
            port,
            pin,
            mode,
            output: OutputType::PushPull,
            pull: Pull::None,
            speed: Speed::Mhz50,
        }
    }

    pub const fn open_drain(mut self) -> Self {
        self.output = OutputType::OpenDrain;
        self
    }

    pub const fn pull(mut self, pull: Pull) -> Self {
        self.pull = pull;
        self
    }

    pub const fn speed(mut self, speed: Speed) -> Self {
        self.speed = speed;
        self
    }
}

/// NVIC preemption levels. Lower numbers preempt higher ones; Low sits below the RTOS kernel,
/// everything else above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum IrqPriority {
    Highest = 4,
    High = 5,
    Mid = 8,
    Low = 12,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqChannel {
    Dma1Stream2,
    Dma2Stream0,
    Dma2Stream4,
    I2c1Event,
    I2c1Error,
    OtgFs,
    RtcWakeup,
    Exti15_10,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Irq {
    pub channel: IrqChannel,
    pub priority: IrqPriority,
    pub sub_priority: u8,
}

impl Irq {
    pub const fn new(channel: IrqChannel, priority: IrqPriority) -> Self {
        Self {
            channel,
            priority,
            sub_priority: 0,
        }
    }
}

/// Driver instance an interrupt vector is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqTarget {
    SpiFlash,
    SpiGyro,
    I2cInternalEvent,
    I2cInternalError,
    AdcDma,
    Rtc,
    Usb,
    Bmi160,
}

/// A hardware vector bound to the driver instance that services it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Vector {
    pub channel: IrqChannel,
    pub target: IrqTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaController {
    Dma1,
    Dma2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaDirection {
    PeripheralToMemory,
    MemoryToPeripheral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaPriority {
    Low,
    Medium,
    High,
    VeryHigh,
}

/// A DMA stream/channel pair, byte-wide, memory increment, normal mode, FIFO disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaStream {
    pub controller: DmaController,
    pub stream: u8,
    pub channel: u8,
    pub direction: DmaDirection,
    pub priority: DmaPriority,
}

/// Interrupt flags enabled on the stream that raises the DMA interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaIrqFlags {
    pub transfer_complete: bool,
    pub transfer_error: bool,
    pub half_transfer: bool,
}

impl DmaIrqFlags {
    pub const ALL: Self = Self {
        transfer_complete: true,
        transfer_error: true,
        half_transfer: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DmaConfig {
    pub irq: Irq,
    pub flags: DmaIrqFlags,
    pub rx: DmaStream,
    pub tx: Option<DmaStream>,
}

#[derive(
    strum::Display, strum::EnumIter, strum::FromRepr, Debug, Clone, Copy, PartialEq, Eq,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum LedId {
    Heartbeat = 0,
    Alarm = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LedConfig {
    pub id: LedId,
    pub pin: PinConfig,
    pub active_high: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SpiInstance {
    Spi1,
    Spi3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Polarity {
    IdleLow,
    IdleHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    CaptureOnFirstTransition,
    CaptureOnSecondTransition,
}

/// SPI master, full duplex, 8-bit, MSB first, software NSS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiConfig {
    pub instance: SpiInstance,
    pub alternate: u8,
    pub polarity: Polarity,
    pub phase: Phase,
    /// Peripheral clock divider, a power of two between 2 and 256.
    pub prescaler: u16,
    pub crc_polynomial: u16,
    pub use_crc: bool,
    pub dma: DmaConfig,
    pub sclk: PinConfig,
    pub miso: PinConfig,
    pub mosi: PinConfig,
    pub slave_selects: &'static [PinConfig],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cInstance {
    I2c1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cDutyCycle {
    /// Tlow/Thigh = 2
    Ratio2,
    /// Tlow/Thigh = 16/9
    Ratio16To9,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cConfig {
    pub instance: I2cInstance,
    pub alternate: u8,
    pub own_address: u8,
    pub ack: bool,
    pub duty_cycle: I2cDutyCycle,
    pub clock_speed_hz: u32,
    pub transfer_timeout_ms: u32,
    pub scl: PinConfig,
    pub sda: PinConfig,
    pub event_irq: Irq,
    pub error_irq: Irq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UsbConfig {
    pub irq: Irq,
    /// VBUS sense input.
    pub vsense: PinConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UsbCdcConfig {
    pub ctrl_if: u8,
    pub ctrl_tx_ep: u8,
    pub data_if: u8,
    pub data_rx_ep: u8,
    pub data_tx_ep: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UsbHidConfig {
    pub data_if: u8,
    pub data_rx_ep: u8,
    pub data_tx_ep: u8,
}

/// USB interfaces advertised in the device descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsbDescriptor {
    HidOnly,
    HidCdc,
}

impl UsbDescriptor {
    pub const fn has_hid(&self) -> bool {
        true
    }

    pub const fn has_cdc(&self) -> bool {
        matches!(self, UsbDescriptor::HidCdc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcInstance {
    Adc1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AdcConfig {
    pub master: AdcInstance,
    pub dma: DmaConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RtcClockSource {
    HseDiv16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RtcConfig {
    pub clock_source: RtcClockSource,
    /// Wakeup prescaler; 100 cycles of the 62.5 kHz RTC clock give a 625 Hz tick.
    pub prescaler: u16,
    pub irq: Irq,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Trigger {
    Rising,
    Falling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtiConfig {
    pub line: u8,
    pub pin: PinConfig,
    pub irq: Irq,
    pub trigger: Trigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Orientation {
    Top0Deg,
    Top90Deg,
    Top180Deg,
    Top270Deg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bmi160Config {
    pub exti: &'static ExtiConfig,
    pub orientation: Orientation,
    pub odr_hz: u16,
    pub accel_range_g: u8,
    pub gyro_range_dps: u16,
    /// Read temperature once every this many samples.
    pub temperature_interleaving: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bmp280Oversampling {
    UltraLowPower,
    LowPower,
    Standard,
    HighResolution,
    UltraHighResolution,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Bmp280Config {
    pub oversampling: Bmp280Oversampling,
    pub temperature_interleaving: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MagOutputRate {
    Hz0_75,
    Hz1_5,
    Hz3,
    Hz7_5,
    Hz15,
    Hz30,
    Hz75,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MagBias {
    Normal,
    Positive,
    Negative,
}

/// Full-scale range in gauss.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MagGain {
    Ga0_88,
    Ga1_3,
    Ga1_9,
    Ga2_5,
    Ga4_0,
    Ga4_7,
    Ga5_6,
    Ga8_1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MagMode {
    Continuous,
    Single,
    Idle,
}

/// HMC5883 / HMC5983 magnetometer on the external I2C port. Both parts share the register
/// layout, so one descriptor type serves either.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HmcMagConfig {
    pub output_rate: MagOutputRate,
    pub bias: MagBias,
    pub gain: MagGain,
    pub mode: MagMode,
    pub orientation: Orientation,
}

/// One compare channel driving a fixed duty cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PwmChannel {
    pub channel: u8,
    pub pin: PinConfig,
    /// Compare value, out of `period + 1` counts.
    pub compare: u16,
}

/// PWM outputs setting the OSD black and white video levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VideoLevelConfig {
    pub timer: TimerInstance,
    /// Target counter clock.
    pub counter_hz: u32,
    pub period: u16,
    pub black: PwmChannel,
    pub white: PwmChannel,
}

impl VideoLevelConfig {
    /// Timer prescaler register value for a core clock of `sysclk_hz`. Rounds the divider down,
    /// so the counter runs at or above `counter_hz`.
    pub const fn prescaler(&self, sysclk_hz: u32) -> u16 {
        let divider = sysclk_hz / self.counter_hz;
        if divider == 0 { 0 } else { (divider - 1) as u16 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerInstance {
    Tim1,
    Tim3,
    Tim5,
    Tim12,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UsartInstance {
    Usart1,
    Usart6,
}

/// Servo output bank. The last two outputs share pins with the multi-function port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoConfig {
    pub outputs: u8,
    pub update_hz: u16,
}

/// Expected JEDEC ID and erase opcode of the external flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct JedecConfig {
    pub expect_manufacturer: u8,
    pub expect_memory_type: u8,
    pub expect_capacity: u8,
    pub sector_erase: u8,
}

/// Log-structured filesystem parameters for one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LogfsConfig {
    pub fs_magic: u32,
    pub arena_size: u32,
    pub slot_size: u32,
}

/// Append-only stream filesystem parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StreamfsConfig {
    pub fs_magic: u32,
    pub arena_size: u32,
    pub write_size: u32,
}
