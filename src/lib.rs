//! Automated pet feeder library.
//!
//! Exposes the scheduling, recovery and motor-sequencing logic for the
//! `petfeeder` binary and for integration testing.  Hardware access is
//! confined to [`adapters`]; everything else runs on the host with mock
//! ports.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod recovery;
pub mod scheduler;
pub mod shutdown;
pub mod state;
