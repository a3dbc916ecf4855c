#![allow(dead_code)]

// filename according to https://doc.rust-lang.org/book/ch11-03-test-organization.html
use brainre1_board::hw::{
    AdcConfig, Bmi160Config, Bmp280Config, I2cConfig, I2cInstance, JedecConfig, LedConfig, LedId,
    LogfsConfig, RtcConfig, ServoConfig, SpiConfig, SpiInstance, StreamfsConfig, TimerInstance,
    UsartInstance, UsbCdcConfig, UsbConfig, UsbDescriptor, UsbHidConfig,
};
use brainre1_board::settings::{
    HidFunction, HwSettings, RxPortFunction, SerialFunction, VcpFunction,
};
use brainre1_board::{Crc, Drivers, FlashChip, Partition, PartitionLabel, PartitionTable};
use embedded_storage::nor_flash::{
    ErrorType, NorFlash, NorFlashError, NorFlashErrorKind, ReadNorFlash,
};

pub const FLASH_SECTOR_SIZE: usize = 4096;
pub const WORD_SIZE: usize = 4;

pub fn crc32(data: &[u8]) -> u32 {
    unsafe { libz_sys::crc32(0, data.as_ptr(), data.len() as u32) as u32 }
}

#[derive(Default)]
pub struct Flash {
    pub buf: Vec<u8>,
    pub fail_after_operation: usize,
    pub operations: Vec<Operation>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Operation {
    Read { offset: u32, len: usize },
    Write { offset: u32, len: usize },
    Erase { offset: u32, len: usize },
}

impl Flash {
    pub fn new(pages: usize) -> Self {
        Self {
            buf: vec![0xffu8; FLASH_SECTOR_SIZE * pages],
            fail_after_operation: usize::MAX,
            ..Default::default()
        }
    }

    pub fn new_with_fault(pages: usize, fail_after_operation: usize) -> Self {
        Self {
            buf: vec![0xffu8; FLASH_SECTOR_SIZE * pages],
            fail_after_operation,
            ..Default::default()
        }
    }

    /// Erased flash the size of `chip`.
    pub fn for_chip(chip: &FlashChip) -> Self {
        Self::new(chip.capacity() as usize / FLASH_SECTOR_SIZE)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn disable_faults(&mut self) {
        self.fail_after_operation = usize::MAX;
    }

    pub fn erases(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Erase { .. }))
            .count()
    }

    pub fn writes(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| matches!(op, Operation::Write { .. }))
            .count()
    }

    pub fn dump_operations(&self) {
        println!("Operations:");
        for op in &self.operations {
            println!("  {:?}", op);
        }
    }
}

#[derive(Debug, PartialEq)]
pub struct FlashError;

impl NorFlashError for FlashError {
    fn kind(&self) -> NorFlashErrorKind {
        NorFlashErrorKind::Other
    }
}

impl ErrorType for Flash {
    type Error = FlashError;
}

impl ReadNorFlash for Flash {
    const READ_SIZE: usize = WORD_SIZE;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::READ_SIZE as _));

        println!(
            "    flash: read:  0x{offset:06X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );
        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashError);
        }
        self.operations.push(Operation::Read {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        bytes.copy_from_slice(&self.buf[offset..offset + bytes.len()]);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.buf.len()
    }
}

impl NorFlash for Flash {
    const WRITE_SIZE: usize = WORD_SIZE;

    const ERASE_SIZE: usize = FLASH_SECTOR_SIZE;

    fn erase(&mut self, from: u32, to: u32) -> Result<(), Self::Error> {
        assert!(from.is_multiple_of(Self::ERASE_SIZE as _));
        assert!(to.is_multiple_of(Self::ERASE_SIZE as _));

        println!(
            "    flash: erase: {from:06X} - {to:06X} #{:>2}",
            self.operations.len()
        );

        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashError);
        }

        self.operations.push(Operation::Erase {
            offset: from,
            len: (to - from) as usize,
        });

        self.buf[from as usize..to as usize].fill(0xff);
        Ok(())
    }

    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        assert!(offset.is_multiple_of(Self::WRITE_SIZE as _));
        assert!(bytes.len().is_multiple_of(Self::WRITE_SIZE as _));

        println!(
            "    flash: write: 0x{offset:06X}[0x{:04X}] #{:>2}",
            bytes.len(),
            self.operations.len()
        );

        if self.operations.len() >= self.fail_after_operation {
            println!("    flash: FAULT");
            return Err(FlashError);
        }
        assert!(!bytes.is_empty());

        self.operations.push(Operation::Write {
            offset,
            len: bytes.len(),
        });

        let offset = offset as usize;
        for (i, &val) in bytes.iter().enumerate() {
            // NOR flash can only flip bits from 1 to 0
            self.buf[offset + i] &= val;
        }
        Ok(())
    }
}

/// One driver entry point as seen by the mock.
#[derive(Debug, PartialEq, Clone)]
pub enum Call {
    DelayInit,
    WaitMs(u32),
    LedInit(usize),
    Led(LedId, bool),
    WatchdogInit(u32),
    WatchdogClear,
    SpiInit(SpiInstance),
    I2cInit(I2cInstance),
    I2cCheckClear,
    InternalFlashInit,
    JedecFlashInit(SpiInstance),
    RegisterPartitions(usize),
    LogfsMount(PartitionLabel),
    LogfsFormat(PartitionLabel),
    StreamfsMount(PartitionLabel),
    ComInit { rx: usize, tx: usize },
    ClearResetFlags,
    LoadHwSettings,
    ResetSettings,
    RtcInit,
    TimerInit(TimerInstance),
    ReadBootCount,
    SetBootCount(u16),
    BootFaultAlarm(bool),
    SensorsInit,
    AdcInit,
    Bmi160Init,
    Bmp280Init,
    UsbBoardDataInit,
    UsbDescriptorInit(UsbDescriptor),
    UsbInit,
    UsbConfigureCdc(VcpFunction),
    UsbConfigureHid(HidFunction, u8),
    UsbActivate,
    ConfigureRxPort(RxPortFunction),
    ConfigureSerialPort(SerialFunction, UsartInstance),
    ServoInit(u8),
}

#[derive(Debug, PartialEq)]
pub struct DriverError(pub Call);

/// Records every driver call. A fallible call fails if it equals an entry of `failing`.
pub struct MockDrivers {
    pub calls: Vec<Call>,
    pub failing: Vec<Call>,
    pub settings: HwSettings,
    pub boot_count: u16,
    pub debugger: bool,
    /// Handed out by `internal_flash_init`, so tests can preload an installed image.
    pub internal_flash: Option<Flash>,
    pub registered: Option<&'static PartitionTable>,
}

impl Default for MockDrivers {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            failing: Vec::new(),
            settings: HwSettings::default(),
            boot_count: 0,
            debugger: false,
            internal_flash: None,
            registered: None,
        }
    }
}

impl MockDrivers {
    pub fn failing(call: Call) -> Self {
        Self {
            failing: vec![call],
            ..Default::default()
        }
    }

    fn record(&mut self, call: Call) -> Result<(), DriverError> {
        let failed = self.failing.contains(&call);
        self.calls.push(call.clone());
        if failed {
            Err(DriverError(call))
        } else {
            Ok(())
        }
    }

    /// Index of the first occurrence of `call`.
    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls.iter().position(|c| c == call)
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }

    /// Number of times the alarm LED was switched on.
    pub fn alarm_pulses(&self) -> usize {
        self.count(&Call::Led(LedId::Alarm, true))
    }
}

impl Crc for MockDrivers {
    fn crc32(init: u32, data: &[u8]) -> u32 {
        unsafe { libz_sys::crc32(init as u64, data.as_ptr(), data.len() as u32) as u32 }
    }
}

impl Drivers for MockDrivers {
    type Error = DriverError;

    type SpiBus = SpiInstance;
    type I2cAdapter = I2cInstance;
    type InternalFlash = Flash;
    type ExternalFlash = Flash;
    type Logfs = PartitionLabel;
    type Streamfs = PartitionLabel;
    type Com = (usize, usize);
    type Usb = UsbDescriptor;
    type Adc = ();
    type Gyro = ();
    type Baro = ();
    type Servos = u8;

    fn delay_init(&mut self) {
        self.calls.push(Call::DelayInit);
    }

    fn wait_ms(&mut self, ms: u32) {
        self.calls.push(Call::WaitMs(ms));
    }

    fn led_init(&mut self, leds: &'static [LedConfig]) {
        self.calls.push(Call::LedInit(leds.len()));
    }

    fn led_set(&mut self, led: LedId, on: bool) {
        self.calls.push(Call::Led(led, on));
    }

    fn watchdog_init(&mut self, timeout_ms: u32) {
        self.calls.push(Call::WatchdogInit(timeout_ms));
    }

    fn watchdog_clear(&mut self) {
        self.calls.push(Call::WatchdogClear);
    }

    fn debugger_attached(&self) -> bool {
        self.debugger
    }

    fn spi_init(&mut self, cfg: &'static SpiConfig) -> Result<Self::SpiBus, Self::Error> {
        self.record(Call::SpiInit(cfg.instance))?;
        Ok(cfg.instance)
    }

    fn i2c_init(&mut self, cfg: &'static I2cConfig) -> Result<Self::I2cAdapter, Self::Error> {
        self.record(Call::I2cInit(cfg.instance))?;
        Ok(cfg.instance)
    }

    fn i2c_check_clear(&mut self, _i2c: &mut Self::I2cAdapter) -> Result<(), Self::Error> {
        self.record(Call::I2cCheckClear)
    }

    fn internal_flash_init(
        &mut self,
        chip: &'static FlashChip,
    ) -> Result<Self::InternalFlash, Self::Error> {
        self.record(Call::InternalFlashInit)?;
        Ok(self
            .internal_flash
            .take()
            .unwrap_or_else(|| Flash::for_chip(chip)))
    }

    fn jedec_flash_init(
        &mut self,
        spi: Self::SpiBus,
        chip: &'static FlashChip,
        _cfg: &'static JedecConfig,
    ) -> Result<Self::ExternalFlash, Self::Error> {
        self.record(Call::JedecFlashInit(spi))?;
        Ok(Flash::for_chip(chip))
    }

    fn register_partitions(&mut self, table: &'static PartitionTable) {
        self.calls.push(Call::RegisterPartitions(table.len()));
        self.registered = Some(table);
    }

    fn logfs_mount(
        &mut self,
        _flash: &mut Self::ExternalFlash,
        partition: &'static Partition,
        _cfg: &'static LogfsConfig,
    ) -> Result<Self::Logfs, Self::Error> {
        self.record(Call::LogfsMount(partition.label))?;
        Ok(partition.label)
    }

    fn logfs_format(&mut self, fs: &mut Self::Logfs) -> Result<(), Self::Error> {
        self.record(Call::LogfsFormat(*fs))
    }

    fn streamfs_mount(
        &mut self,
        _flash: &mut Self::ExternalFlash,
        partition: &'static Partition,
        _cfg: &'static StreamfsConfig,
    ) -> Result<Self::Streamfs, Self::Error> {
        self.record(Call::StreamfsMount(partition.label))?;
        Ok(partition.label)
    }

    fn com_init(
        &mut self,
        _fs: &mut Self::Streamfs,
        rx: Box<[u8]>,
        tx: Box<[u8]>,
    ) -> Result<Self::Com, Self::Error> {
        self.record(Call::ComInit {
            rx: rx.len(),
            tx: tx.len(),
        })?;
        Ok((rx.len(), tx.len()))
    }

    fn clear_reset_flags(&mut self) {
        self.calls.push(Call::ClearResetFlags);
    }

    fn load_hw_settings(&mut self) -> HwSettings {
        self.calls.push(Call::LoadHwSettings);
        self.settings
    }

    fn reset_settings_to_defaults(&mut self) {
        self.calls.push(Call::ResetSettings);
        self.settings = HwSettings::default();
    }

    fn rtc_init(&mut self, _cfg: &'static RtcConfig) {
        self.calls.push(Call::RtcInit);
    }

    fn timer_init(&mut self, timer: TimerInstance) {
        self.calls.push(Call::TimerInit(timer));
    }

    fn boot_count(&mut self) -> u16 {
        self.calls.push(Call::ReadBootCount);
        self.boot_count
    }

    fn set_boot_count(&mut self, count: u16) {
        self.calls.push(Call::SetBootCount(count));
        self.boot_count = count;
    }

    fn boot_fault_alarm(&mut self, raised: bool) {
        self.calls.push(Call::BootFaultAlarm(raised));
    }

    fn sensors_init(&mut self) {
        self.calls.push(Call::SensorsInit);
    }

    fn adc_init(&mut self, _cfg: &'static AdcConfig) -> Self::Adc {
        self.calls.push(Call::AdcInit);
    }

    fn bmi160_init(
        &mut self,
        spi: &mut Self::SpiBus,
        _cfg: &'static Bmi160Config,
    ) -> Result<Self::Gyro, Self::Error> {
        assert_eq!(*spi, SpiInstance::Spi1);
        self.record(Call::Bmi160Init)
    }

    fn bmp280_init(
        &mut self,
        _i2c: &mut Self::I2cAdapter,
        _cfg: &'static Bmp280Config,
    ) -> Result<Self::Baro, Self::Error> {
        self.record(Call::Bmp280Init)
    }

    fn usb_board_data_init(&mut self) {
        self.calls.push(Call::UsbBoardDataInit);
    }

    fn usb_descriptor_init(&mut self, descriptor: UsbDescriptor) -> Result<(), Self::Error> {
        self.record(Call::UsbDescriptorInit(descriptor))
    }

    fn usb_init(&mut self, _cfg: &'static UsbConfig) -> Result<Self::Usb, Self::Error> {
        self.record(Call::UsbInit)?;
        Ok(UsbDescriptor::HidCdc)
    }

    fn usb_configure_cdc(
        &mut self,
        _usb: &mut Self::Usb,
        function: VcpFunction,
        _cfg: &'static UsbCdcConfig,
    ) {
        self.calls.push(Call::UsbConfigureCdc(function));
    }

    fn usb_configure_hid(
        &mut self,
        _usb: &mut Self::Usb,
        function: HidFunction,
        cfg: &'static UsbHidConfig,
    ) {
        self.calls.push(Call::UsbConfigureHid(function, cfg.data_if));
    }

    fn usb_activate(&mut self, _usb: &mut Self::Usb) {
        self.calls.push(Call::UsbActivate);
    }

    fn configure_rx_port(&mut self, function: RxPortFunction, timer: TimerInstance, inputs: u8) {
        assert_eq!(timer, TimerInstance::Tim12);
        assert_eq!(inputs, 12);
        self.calls.push(Call::ConfigureRxPort(function));
    }

    fn configure_serial_port(&mut self, function: SerialFunction, usart: UsartInstance) {
        self.calls.push(Call::ConfigureSerialPort(function, usart));
    }

    fn servo_init(&mut self, cfg: &'static ServoConfig) -> Self::Servos {
        self.calls.push(Call::ServoInit(cfg.outputs));
        cfg.outputs
    }
}
