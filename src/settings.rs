//! Persisted hardware settings and the failed-boot counter.

use crate::board::MAX_FAILED_BOOTS;
use crate::hw::UsbDescriptor;
use crate::platform::Drivers;
#[cfg(feature = "defmt")]
use defmt::{trace, warn};

/// Receiver port. Only PPM input is wired on this board.
#[derive(
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::FromRepr,
    Debug,
    Default,
    PartialEq,
    Eq,
    Clone,
    Copy,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[strum(serialize_all = "lowercase")]
#[repr(u8)]
pub enum RxPortFunction {
    Disabled,
    #[default]
    Ppm,
}

/// Protocols a USART port can run.
#[derive(
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::FromRepr,
    Debug,
    Default,
    PartialEq,
    Eq,
    Clone,
    Copy,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[strum(serialize_all = "kebab-case")]
#[repr(u8)]
pub enum SerialFunction {
    Disabled,
    #[default]
    Telemetry,
    Gps,
    Dsm,
    Sbus,
    HottSumd,
    HottSumh,
    FrskySensorHub,
    FrskySport,
    LightTelemetry,
    MavlinkTx,
    DebugConsole,
    ComBridge,
}

/// The multi-function port drives the two extra servo outputs or runs as a second USART.
#[derive(
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::FromRepr,
    Debug,
    Default,
    PartialEq,
    Eq,
    Clone,
    Copy,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[strum(serialize_all = "kebab-case")]
#[repr(u8)]
pub enum MultiPortFunction {
    #[default]
    Pwm,
    Disabled,
    Telemetry,
    Gps,
    Dsm,
    Sbus,
    HottSumd,
    HottSumh,
    FrskySensorHub,
    FrskySport,
    LightTelemetry,
    MavlinkTx,
    DebugConsole,
    ComBridge,
}

impl MultiPortFunction {
    /// The protocol to run on the USART, `None` when the port is used for PWM.
    pub const fn serial(&self) -> Option<SerialFunction> {
        Some(match self {
            MultiPortFunction::Pwm => return None,
            MultiPortFunction::Disabled => SerialFunction::Disabled,
            MultiPortFunction::Telemetry => SerialFunction::Telemetry,
            MultiPortFunction::Gps => SerialFunction::Gps,
            MultiPortFunction::Dsm => SerialFunction::Dsm,
            MultiPortFunction::Sbus => SerialFunction::Sbus,
            MultiPortFunction::HottSumd => SerialFunction::HottSumd,
            MultiPortFunction::HottSumh => SerialFunction::HottSumh,
            MultiPortFunction::FrskySensorHub => SerialFunction::FrskySensorHub,
            MultiPortFunction::FrskySport => SerialFunction::FrskySport,
            MultiPortFunction::LightTelemetry => SerialFunction::LightTelemetry,
            MultiPortFunction::MavlinkTx => SerialFunction::MavlinkTx,
            MultiPortFunction::DebugConsole => SerialFunction::DebugConsole,
            MultiPortFunction::ComBridge => SerialFunction::ComBridge,
        })
    }
}

#[derive(
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::FromRepr,
    Debug,
    Default,
    PartialEq,
    Eq,
    Clone,
    Copy,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[strum(serialize_all = "kebab-case")]
#[repr(u8)]
pub enum VcpFunction {
    #[default]
    Disabled,
    Telemetry,
    ComBridge,
    DebugConsole,
}

#[derive(
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::FromRepr,
    Debug,
    Default,
    PartialEq,
    Eq,
    Clone,
    Copy,
)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[strum(serialize_all = "kebab-case")]
#[repr(u8)]
pub enum HidFunction {
    Disabled,
    #[default]
    Telemetry,
    RcTransmitter,
}

/// Port assignment read from the settings filesystem at boot.
#[derive(Debug, Default, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HwSettings {
    pub rx_port: RxPortFunction,
    pub serial_port: SerialFunction,
    pub multi_port: MultiPortFunction,
    pub usb_vcp_port: VcpFunction,
    pub usb_hid_port: HidFunction,
}

impl HwSettings {
    /// VCP and HID functions with every interface missing from `descriptor` forced to disabled.
    pub const fn usb_functions(&self, descriptor: UsbDescriptor) -> (VcpFunction, HidFunction) {
        let vcp = if descriptor.has_cdc() {
            self.usb_vcp_port
        } else {
            VcpFunction::Disabled
        };
        let hid = if descriptor.has_hid() {
            self.usb_hid_port
        } else {
            HidFunction::Disabled
        };
        (vcp, hid)
    }
}

/// Outcome of the failed-boot check.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootCount {
    /// Counter was below the limit and has been incremented to this value.
    Counted(u16),
    /// Too many unfinished boots. Settings were reset and the boot-fault alarm raised.
    Exceeded(u16),
}

/// Bumps the failed-boot counter, or falls back to default settings once it reaches
/// [`MAX_FAILED_BOOTS`].
///
/// The counter is cleared by the application once it has been running long enough, so it only
/// grows across boots that crash early.
pub fn check_boot_count<D: Drivers>(drivers: &mut D) -> BootCount {
    let count = drivers.boot_count();
    if count < MAX_FAILED_BOOTS {
        let count = count + 1;
        drivers.set_boot_count(count);
        drivers.boot_fault_alarm(false);

        #[cfg(feature = "defmt")]
        trace!("boot count: {}", count);

        BootCount::Counted(count)
    } else {
        drivers.reset_settings_to_defaults();
        drivers.boot_fault_alarm(true);

        #[cfg(feature = "defmt")]
        warn!("{} failed boots, settings reset to defaults", count);

        BootCount::Exceeded(count)
    }
}
