//! Application core: domain orchestration, zero direct I/O.
//!
//! This module holds the feed cycle and the control loop.  All
//! interaction with hardware, storage and the clock happens through
//! **port traits** defined in [`ports`], keeping this layer fully
//! testable without real peripherals.

pub mod controller;
pub mod events;
pub mod ports;
pub mod service;
pub mod status;
