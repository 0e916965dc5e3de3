//! Feeder configuration parameters
//!
//! All tunable parameters for the feeder.  Loaded once at startup from a
//! JSON file (or defaults) and then passed by reference into every
//! component; nothing reads ambient global state.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins;

/// Core feeder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeederConfig {
    // --- Actuator ---
    pub motor: MotorConfig,
    pub servo: ServoConfig,

    // --- Schedule ---
    /// Local time-of-day of the daily feed ("HH:MM", 24-hour).
    #[serde(with = "hhmm")]
    pub feed_time: NaiveTime,
    /// Motor repetitions performed by one feed cycle.
    pub feeds_per_day: u32,

    // --- Recovery ---
    pub recovery: RecoveryConfig,

    // --- Timing ---
    /// Control loop heartbeat (seconds).
    pub heartbeat_secs: u64,
    pub test: TestConfig,

    // --- Persistence / runtime ---
    /// Persisted [`FeedState`](crate::state::FeedState) location.
    pub state_path: PathBuf,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Drive in-memory pins instead of sysfs GPIO/PWM.
    pub simulate: bool,
}

/// Which actuator the feeder drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorKind {
    Stepper,
    Servo,
}

/// Rotation direction for positive step counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotorConfig {
    pub kind: MotorKind,
    /// Stepper coil GPIOs, IN1..IN4.
    pub pins: [u8; 4],
    /// Activation-pattern cycles per repetition.
    pub steps_per_feed: u32,
    /// Delay after each phase activation (milliseconds).
    pub step_delay_ms: u32,
    pub direction: Direction,
    /// Cycles in one full output-shaft rotation (calibration run).
    pub calibration_steps: u32,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            kind: MotorKind::Stepper,
            pins: pins::STEPPER_COIL_GPIOS,
            steps_per_feed: pins::STEPPER_CYCLES_PER_REV / 4,
            step_delay_ms: 2,
            direction: Direction::Clockwise,
            calibration_steps: pins::STEPPER_CYCLES_PER_REV,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoConfig {
    pub pin: u8,
    pub pwm_chip: u8,
    pub pwm_channel: u8,
    pub frequency_hz: u32,
    pub min_duty_percent: f32,
    pub max_duty_percent: f32,
    /// Degrees swept per increment.
    pub step_angle: u16,
    /// Time held at each position (milliseconds).
    pub hold_ms: u32,
}

impl Default for ServoConfig {
    fn default() -> Self {
        Self {
            pin: pins::SERVO_GPIO,
            pwm_chip: pins::SERVO_PWM_CHIP,
            pwm_channel: pins::SERVO_PWM_CHANNEL,
            frequency_hz: pins::SERVO_FREQ_HZ,
            min_duty_percent: pins::SERVO_MIN_DUTY_PERCENT,
            max_duty_percent: pins::SERVO_MAX_DUTY_PERCENT,
            step_angle: 30,
            hold_ms: 1000,
        }
    }
}

/// What to do about a feed missed within the recovery window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryMode {
    /// Perform the missed feed immediately.
    Feed,
    /// Log only.
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub enabled: bool,
    pub mode: RecoveryMode,
    /// Maximum lateness (seconds) at which a missed feed is still recovered.
    pub max_delay_secs: u64,
    /// Re-evaluate on every heartbeat, not only at startup.
    pub on_heartbeat: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: RecoveryMode::Feed,
            max_delay_secs: 3600,
            on_heartbeat: true,
        }
    }
}

/// Parameters of the one-shot test commands.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub heartbeat_secs: u64,
    pub iterations: u32,
    pub interval_secs: u64,
    /// Lead time before the schedule test's trigger fires.
    pub schedule_delay_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: 1,
            iterations: 5,
            interval_secs: 10,
            schedule_delay_secs: 5,
        }
    }
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            motor: MotorConfig::default(),
            servo: ServoConfig::default(),

            feed_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap_or_default(),
            feeds_per_day: 1,

            recovery: RecoveryConfig::default(),

            heartbeat_secs: 60,
            test: TestConfig::default(),

            state_path: PathBuf::from("feeder_state.json"),
            log_level: "info".to_string(),
            simulate: false,
        }
    }
}

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl FeederConfig {
    /// Load and validate the config file at `path`.
    ///
    /// A missing file yields [`FeederConfig::default()`]; an unreadable,
    /// unparsable or out-of-range file is an error.
    pub fn load(path: &Path) -> Result<(Self, ConfigSource), ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok((Self::default(), ConfigSource::Defaults));
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let config = Self::from_json(&text).map_err(|e| match e {
            JsonConfigError::Parse(source) => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            JsonConfigError::Invalid(e) => e,
        })?;
        Ok((config, ConfigSource::File(path.to_path_buf())))
    }

    fn from_json(text: &str) -> Result<Self, JsonConfigError> {
        let config: Self = serde_json::from_str(text).map_err(JsonConfigError::Parse)?;
        config.validate().map_err(JsonConfigError::Invalid)?;
        Ok(config)
    }

    /// Range-check every field.  Invalid values are rejected, not clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feeds_per_day == 0 {
            return Err(ConfigError::ValidationFailed("feeds_per_day must be >= 1"));
        }
        if self.motor.steps_per_feed == 0 || self.motor.steps_per_feed > i32::MAX as u32 {
            return Err(ConfigError::ValidationFailed(
                "motor.steps_per_feed must be 1–2147483647",
            ));
        }
        if self.motor.calibration_steps == 0 || self.motor.calibration_steps > i32::MAX as u32 {
            return Err(ConfigError::ValidationFailed(
                "motor.calibration_steps must be 1–2147483647",
            ));
        }
        if self.heartbeat_secs == 0 || self.test.heartbeat_secs == 0 {
            return Err(ConfigError::ValidationFailed("heartbeat intervals must be >= 1s"));
        }
        if self.test.iterations == 0 {
            return Err(ConfigError::ValidationFailed("test.iterations must be >= 1"));
        }
        let servo = &self.servo;
        if !(servo.min_duty_percent > 0.0
            && servo.min_duty_percent < servo.max_duty_percent
            && servo.max_duty_percent <= 100.0)
        {
            return Err(ConfigError::ValidationFailed(
                "servo duty range must satisfy 0 < min < max <= 100",
            ));
        }
        if !(1..=180).contains(&servo.step_angle) {
            return Err(ConfigError::ValidationFailed("servo.step_angle must be 1–180"));
        }
        if servo.frequency_hz == 0 {
            return Err(ConfigError::ValidationFailed("servo.frequency_hz must be >= 1"));
        }
        if i64::try_from(self.recovery.max_delay_secs).is_err() {
            return Err(ConfigError::ValidationFailed("recovery.max_delay_secs is too large"));
        }
        Ok(())
    }
}

enum JsonConfigError {
    Parse(serde_json::Error),
    Invalid(ConfigError),
}

/// `feed_time` is written as `"HH:MM"` on disk.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub const FORMAT: &str = "%H:%M";

    pub fn parse(s: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(s.trim(), FORMAT)
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).map_err(|e| de::Error::custom(format!("feed_time {raw:?} is not HH:MM: {e}")))
    }
}
