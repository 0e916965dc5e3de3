//! Linux sysfs GPIO and PWM outputs.
//!
//! - [`SysfsPin`] implements [`OutputPin`] on `/sys/class/gpio/gpioN`.
//! - [`SysfsPwm`] implements [`SetDutyCycle`] on
//!   `/sys/class/pwm/pwmchipN/pwmC`.
//!
//! Both export their line on construction and unexport it on drop.  The
//! sysfs root is a parameter so tests can point it at a temp directory.
//!
//! Pins are configured as BCM numbers.  Since kernel 6.6 the Pi's
//! gpiochip no longer starts at 0 (it is 512 on a Pi 4), so the sysfs
//! line is the BCM number plus the base of the SoC gpiochip.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};
use log::{debug, info, warn};

use crate::error::ActuatorError;

pub const GPIO_ROOT: &str = "/sys/class/gpio";
pub const PWM_ROOT: &str = "/sys/class/pwm";

/// Labels of the SoC pin controllers whose lines are BCM-numbered.
const SOC_CHIP_LABELS: &[&str] = &[
    "pinctrl-bcm2835",
    "pinctrl-bcm2711",
    "pinctrl-bcm2712",
    "pinctrl-rp1",
];

/// udev may need a moment to fix permissions on a freshly exported line.
const EXPORT_RETRIES: u32 = 20;
const EXPORT_RETRY_DELAY: Duration = Duration::from_millis(10);

/// A failed sysfs attribute write.
#[derive(Debug)]
pub struct SysfsError {
    pub path: PathBuf,
    pub source: io::Error,
}

impl core::fmt::Display for SysfsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.source)
    }
}

impl std::error::Error for SysfsError {}

impl digital::Error for SysfsError {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

impl pwm::Error for SysfsError {
    fn kind(&self) -> pwm::ErrorKind {
        pwm::ErrorKind::Other
    }
}

fn write_attr(path: &Path, value: &str) -> Result<(), SysfsError> {
    fs::write(path, value).map_err(|source| SysfsError {
        path: path.to_path_buf(),
        source,
    })
}

/// Write an attribute of a line that may have just been exported.
fn write_attr_after_export(path: &Path, value: &str) -> Result<(), SysfsError> {
    let mut attempt = 0;
    loop {
        match write_attr(path, value) {
            Err(e)
                if attempt < EXPORT_RETRIES
                    && matches!(
                        e.source.kind(),
                        ErrorKind::PermissionDenied | ErrorKind::NotFound
                    ) =>
            {
                attempt += 1;
                thread::sleep(EXPORT_RETRY_DELAY);
            }
            other => return other,
        }
    }
}

fn init_err(what: String, e: SysfsError) -> ActuatorError {
    ActuatorError::Init {
        what,
        cause: e.to_string(),
    }
}

// ───────────────────────────────────────────────────────────────
// GPIO
// ───────────────────────────────────────────────────────────────

/// Base of the gpiochip carrying the BCM lines under `root`.
///
/// Prefers a chip whose label names the SoC controller, then the lowest
/// base present.  With no chips listed the numbering is taken as-is.
pub fn soc_gpio_base(root: &Path) -> u32 {
    let Ok(entries) = fs::read_dir(root) else {
        return 0;
    };
    let mut chips: Vec<(u32, String)> = entries
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with("gpiochip"))
        .filter_map(|e| {
            let dir = e.path();
            let base = fs::read_to_string(dir.join("base")).ok()?.trim().parse().ok()?;
            let label = fs::read_to_string(dir.join("label")).unwrap_or_default();
            Some((base, label.trim().to_string()))
        })
        .collect();
    chips.sort();
    let chosen = chips
        .iter()
        .find(|(_, label)| SOC_CHIP_LABELS.contains(&label.as_str()))
        .or_else(|| chips.first());
    match chosen {
        Some((base, label)) => {
            debug!("GPIO: using gpiochip base {} ({})", base, label);
            *base
        }
        None => 0,
    }
}

pub struct SysfsPin {
    root: PathBuf,
    gpio: u8,
    line_no: u32,
    value: PathBuf,
}

impl SysfsPin {
    /// Export BCM `gpio`, configure it as an output and drive it low.
    pub fn open(root: impl Into<PathBuf>, gpio: u8) -> Result<Self, ActuatorError> {
        let root = root.into();
        let line_no = soc_gpio_base(&root) + u32::from(gpio);
        let line = root.join(format!("gpio{line_no}"));
        let what = format!("GPIO{gpio}");
        if !line.exists() {
            write_attr(&root.join("export"), &line_no.to_string())
                .map_err(|e| init_err(what.clone(), e))?;
        }
        // "low" sets the direction to output with an initial low level.
        write_attr_after_export(&line.join("direction"), "low").map_err(|e| init_err(what, e))?;
        info!("GPIO{}: exported as sysfs line {}", gpio, line_no);
        Ok(Self {
            root,
            gpio,
            line_no,
            value: line.join("value"),
        })
    }

    pub fn gpio(&self) -> u8 {
        self.gpio
    }

    /// Kernel line number backing this pin.
    pub fn line_no(&self) -> u32 {
        self.line_no
    }
}

impl digital::ErrorType for SysfsPin {
    type Error = SysfsError;
}

impl OutputPin for SysfsPin {
    fn set_low(&mut self) -> Result<(), SysfsError> {
        write_attr(&self.value, "0")
    }

    fn set_high(&mut self) -> Result<(), SysfsError> {
        write_attr(&self.value, "1")
    }
}

impl Drop for SysfsPin {
    fn drop(&mut self) {
        if let Err(e) = write_attr(&self.root.join("unexport"), &self.line_no.to_string()) {
            debug!("GPIO{}: unexport failed: {}", self.gpio, e);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// PWM
// ───────────────────────────────────────────────────────────────

pub struct SysfsPwm {
    chip: PathBuf,
    channel: u8,
    line: PathBuf,
    period_ns: u64,
}

impl SysfsPwm {
    /// Export `channel` on `pwmchip{chip}`, set the period for
    /// `frequency_hz` with zero duty, and enable the output.
    pub fn open(
        root: impl Into<PathBuf>,
        chip: u8,
        channel: u8,
        frequency_hz: u32,
    ) -> Result<Self, ActuatorError> {
        let chip_dir = root.into().join(format!("pwmchip{chip}"));
        let line = chip_dir.join(format!("pwm{channel}"));
        let what = format!("pwmchip{chip}/pwm{channel}");
        if !line.exists() {
            write_attr(&chip_dir.join("export"), &channel.to_string())
                .map_err(|e| init_err(what.clone(), e))?;
        }
        let period_ns = 1_000_000_000 / u64::from(frequency_hz.max(1));
        write_attr_after_export(&line.join("duty_cycle"), "0")
            .and_then(|()| write_attr(&line.join("period"), &period_ns.to_string()))
            .and_then(|()| write_attr(&line.join("enable"), "1"))
            .map_err(|e| init_err(what.clone(), e))?;
        info!("{}: enabled at {} Hz", what, frequency_hz);
        Ok(Self {
            chip: chip_dir,
            channel,
            line,
            period_ns,
        })
    }
}

impl pwm::ErrorType for SysfsPwm {
    type Error = SysfsError;
}

impl SetDutyCycle for SysfsPwm {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), SysfsError> {
        let duty_ns = self.period_ns * u64::from(duty) / u64::from(u16::MAX);
        write_attr(&self.line.join("duty_cycle"), &duty_ns.to_string())
    }
}

impl Drop for SysfsPwm {
    fn drop(&mut self) {
        let disabled = write_attr(&self.line.join("enable"), "0");
        let unexported = write_attr(&self.chip.join("unexport"), &self.channel.to_string());
        if let Err(e) = disabled.and(unexported) {
            warn!("PWM channel {}: teardown failed: {}", self.channel, e);
        }
    }
}
