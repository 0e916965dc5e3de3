//! Unified error types for the feeder.
//!
//! A single [`Error`] enum that every subsystem converts into, keeping the
//! control loop's error handling uniform.  Each variant carries the
//! attempted operation and the underlying cause so a log line is enough to
//! diagnose a failure without a debugger.

use core::fmt;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the feeder funnels into this type.
#[derive(Debug)]
pub enum Error {
    /// An actuator output could not be driven.
    Actuator(ActuatorError),
    /// The persisted feed state could not be read or written.
    Storage(StorageError),
    /// A feed invoked by the scheduler failed.
    ScheduleJob {
        label: String,
        source: Box<Error>,
    },
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::ScheduleJob { label, source } => {
                write!(f, "scheduled job '{label}' failed: {source}")
            }
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Actuator(e) => Some(e),
            Self::Storage(e) => Some(e),
            Self::ScheduleJob { source, .. } => Some(source.as_ref()),
            Self::Config(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

/// An I/O failure while driving the motor (the `ActuatorFault` kind).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorError {
    /// Setting a digital output failed.
    OutputWrite { channel: usize, cause: String },
    /// Writing a PWM duty cycle failed.
    DutyWrite { cause: String },
    /// The output could not be claimed or configured at startup.
    Init { what: String, cause: String },
}

impl ActuatorError {
    pub fn output(channel: usize, cause: impl fmt::Debug) -> Self {
        Self::OutputWrite {
            channel,
            cause: format!("{cause:?}"),
        }
    }

    pub fn duty(cause: impl fmt::Debug) -> Self {
        Self::DutyWrite {
            cause: format!("{cause:?}"),
        }
    }
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutputWrite { channel, cause } => {
                write!(f, "setting output {channel} failed: {cause}")
            }
            Self::DutyWrite { cause } => write!(f, "PWM duty write failed: {cause}"),
            Self::Init { what, cause } => write!(f, "initialising {what} failed: {cause}"),
        }
    }
}

impl std::error::Error for ActuatorError {}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Storage errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum StorageError {
    /// The state record exists but is unreadable or invalid.
    Corrupt { path: PathBuf, cause: String },
    /// The state record could not be opened for reading.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The new state record could not be persisted.
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StorageError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. })
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupt { path, cause } => {
                write!(f, "state file {} is corrupt: {cause}", path.display())
            }
            Self::Read { path, source } => {
                write!(f, "reading state file {} failed: {source}", path.display())
            }
            Self::Write { path, source } => {
                write!(f, "writing state file {} failed: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Corrupt { .. } => None,
            Self::Read { source, .. } | Self::Write { source, .. } => Some(source),
        }
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// The config file is not valid JSON for [`FeederConfig`](crate::config::FeederConfig).
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "reading {} failed: {source}", path.display()),
            Self::Parse { path, source } => write!(f, "parsing {} failed: {source}", path.display()),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::ValidationFailed(_) => None,
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
