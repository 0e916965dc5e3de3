//! Host time adapters.
//!
//! - [`LocalClock`] implements the [`Clock`] port with the system's local
//!   wall-clock time (the daily feed time is a local time of day).
//! - [`StdDelay`] implements `embedded-hal`'s [`DelayNs`] over
//!   `std::thread::sleep` for the motor drivers.

use std::thread;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use embedded_hal::delay::DelayNs;

use crate::app::ports::Clock;

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Blocking delay for real hardware.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdDelay;

impl DelayNs for StdDelay {
    fn delay_ns(&mut self, ns: u32) {
        thread::sleep(Duration::from_nanos(u64::from(ns)));
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}
