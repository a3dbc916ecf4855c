//! Alarm LED signalling for boot faults and bootloader updates.

use crate::board::WATCHDOG_TIMEOUT_MS;
use crate::hw::LedId;
use crate::platform::Drivers;
#[cfg(feature = "defmt")]
use defmt::error;

pub const CODE_PULSE_MS: u32 = 200;
pub const CODE_GAP_MS: u32 = 1000;
/// Longest wait between two watchdog kicks while a code is shown.
pub const KICK_SLICE_MS: u32 = 200;

const _: () = assert!(KICK_SLICE_MS < WATCHDOG_TIMEOUT_MS);

/// Pulses the alarm LED `count` times, `on_ms` on and `off_ms` off.
pub fn blink<D: Drivers>(drivers: &mut D, count: u8, on_ms: u32, off_ms: u32) {
    for _ in 0..count {
        drivers.led_set(LedId::Alarm, true);
        drivers.wait_ms(on_ms);
        drivers.led_set(LedId::Alarm, false);
        drivers.wait_ms(off_ms);
    }
}

/// Waits `ms` in slices of at most [`KICK_SLICE_MS`], clearing the watchdog before each slice.
pub fn wait_kicked<D: Drivers>(drivers: &mut D, ms: u32) {
    let mut left = ms;
    while left > 0 {
        let slice = left.min(KICK_SLICE_MS);
        drivers.watchdog_clear();
        drivers.wait_ms(slice);
        left -= slice;
    }
}

/// One round of a blink code: `code` pulses, then a pause. The watchdog stays fed throughout.
pub fn signal_code<D: Drivers>(drivers: &mut D, code: u8) {
    for _ in 0..code {
        drivers.led_set(LedId::Alarm, true);
        wait_kicked(drivers, CODE_PULSE_MS);
        drivers.led_set(LedId::Alarm, false);
        wait_kicked(drivers, CODE_PULSE_MS);
    }
    wait_kicked(drivers, CODE_GAP_MS);
}

/// Shows `code` on the alarm LED forever.
pub fn halt<D: Drivers>(drivers: &mut D, code: u8) -> ! {
    #[cfg(feature = "defmt")]
    error!("boot halted, code {}", code);

    drivers.led_set(LedId::Heartbeat, false);
    loop {
        signal_code(drivers, code);
    }
}
