//! ESP32 time adapter.
//!
//! Implements [`ClockPort`] for the controller.
//!
//! - **`target_os = "espidf"`**: uptime from `esp_timer_get_time()`
//!   (microsecond precision, monotonic); wall clock from `gettimeofday()`
//!   broken down with `localtime_r()` in the configured `TZ`.
//! - **`not(target_os = "espidf")`**: uptime from `std::time::Instant`;
//!   the wall clock is reported as unsynchronised.

use crate::app::ports::ClockPort;
use crate::clock::{Millis, WallClock};
#[cfg(target_os = "espidf")]
use crate::clock::EpochSecs;

/// Anything earlier than 2020-01-01 means SNTP has not synced yet.
#[cfg(target_os = "espidf")]
const EPOCH_2020: i64 = 1_577_836_800;

/// Time adapter for the ESP32 platform.
pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        // SAFETY: esp_timer is initialised by the ESP-IDF startup code.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    #[cfg(target_os = "espidf")]
    fn local_time(&self) -> Option<WallClock> {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return None;
        }
        if i64::from(tv.tv_sec) < EPOCH_2020 {
            return None;
        }
        let secs = tv.tv_sec as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        if !(0..=23).contains(&tm.tm_hour)
            || !(0..=59).contains(&tm.tm_min)
            || !(0..=6).contains(&tm.tm_wday)
            || !(0..=365).contains(&tm.tm_yday)
        {
            return None;
        }
        Some(WallClock {
            epoch: EpochSecs(secs as u64),
            // tm_wday is 0 = Sunday; the clock convention is 1 = Sunday.
            weekday: tm.tm_wday as u8 + 1,
            day_of_year: tm.tm_yday as u16 + 1,
            hour: tm.tm_hour as u8,
            minute: tm.tm_min as u8,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn local_time(&self) -> Option<WallClock> {
        None
    }
}

impl ClockPort for Esp32TimeAdapter {
    fn uptime_ms(&self) -> Millis {
        Millis(self.uptime_us() / 1000)
    }

    fn wall_clock(&self) -> Option<WallClock> {
        self.local_time()
    }
}
