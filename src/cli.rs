use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Automated pet feeder
#[derive(Parser, Debug)]
#[command(name = "petfeeder", version, about = "Automated pet feeder")]
pub struct Args {
    /// Path to the config file
    #[arg(short = 'c', long = "config", value_name = "PATH", default_value_os = "petfeeder.json")]
    pub config: PathBuf,

    /// Drive in-memory pins instead of sysfs GPIO/PWM
    #[arg(long, global = true)]
    pub simulate: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the feeder service (default)
    Run,

    /// Perform a number of manual feeds back to back
    Test {
        /// Number of feeds [default: test.iterations]
        #[arg(long)]
        iterations: Option<u32>,
        /// Seconds between feeds [default: test.interval_secs]
        #[arg(long, value_name = "SECS")]
        interval: Option<u64>,
    },

    /// Rotate the motor a fixed number of steps without recording a feed
    Calibrate {
        /// Steps to drive [default: motor.calibration_steps]
        #[arg(long, allow_negative_numbers = true)]
        steps: Option<i32>,
    },

    /// Print the recorded feed history and the next scheduled feed
    Status,

    /// Schedule a feed a few seconds from now and wait for it to fire
    ScheduleTest {
        /// Seconds until the trigger [default: test.schedule_delay_secs]
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..86_400))]
        delay: Option<u64>,
    },

    /// Simulate a missed feed and let startup recovery handle it
    ///
    /// Runs against a scratch state file; the real history is untouched.
    RecoveryTest {
        /// How late the simulated feed is, in seconds
        #[arg(
            long,
            value_name = "SECS",
            default_value_t = 300,
            value_parser = clap::value_parser!(u64).range(1..86_400)
        )]
        late: u64,
    },
}
