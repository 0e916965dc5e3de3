//! Hardware adapter: bridges real or simulated outputs to [`MotorPort`].
//!
//! Builds the configured motor driver over either sysfs outputs or
//! in-memory simulated ones.  This is the only module that decides which
//! physical lines the feeder touches; the drivers stay generic over
//! `embedded-hal`.

use core::convert::Infallible;

use embedded_hal::digital::{self, OutputPin};
use embedded_hal::pwm::{self, SetDutyCycle};
use log::{info, trace};

use crate::app::ports::MotorPort;
use crate::config::{FeederConfig, MotorKind};
use crate::drivers::servo::{ServoMotor, ServoParams};
use crate::drivers::stepper::StepperMotor;
use crate::error::ActuatorError;

use super::sysfs::{GPIO_ROOT, PWM_ROOT, SysfsError, SysfsPin, SysfsPwm};
use super::time::StdDelay;

// ── Simulated outputs ─────────────────────────────────────────

/// In-memory output line for `--simulate` runs.
#[derive(Debug)]
pub struct SimPin {
    gpio: u8,
    high: bool,
}

impl SimPin {
    pub fn new(gpio: u8) -> Self {
        Self { gpio, high: false }
    }

    pub fn is_high(&self) -> bool {
        self.high
    }
}

impl digital::ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        trace!("SIM GPIO{} = 0", self.gpio);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = true;
        trace!("SIM GPIO{} = 1", self.gpio);
        Ok(())
    }
}

/// In-memory PWM channel for `--simulate` runs.
#[derive(Debug, Default)]
pub struct SimPwm {
    duty: u16,
}

impl SimPwm {
    pub fn duty(&self) -> u16 {
        self.duty
    }
}

impl pwm::ErrorType for SimPwm {
    type Error = Infallible;
}

impl SetDutyCycle for SimPwm {
    fn max_duty_cycle(&self) -> u16 {
        u16::MAX
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Infallible> {
        self.duty = duty;
        trace!("SIM PWM duty = {}/{}", duty, u16::MAX);
        Ok(())
    }
}

// ── Backend selection ─────────────────────────────────────────

fn infallible<T>(r: Result<T, Infallible>) -> T {
    match r {
        Ok(v) => v,
        Err(never) => match never {},
    }
}

/// An output line, real or simulated.
pub enum GpioPin {
    Sysfs(SysfsPin),
    Sim(SimPin),
}

impl digital::ErrorType for GpioPin {
    type Error = SysfsError;
}

impl OutputPin for GpioPin {
    fn set_low(&mut self) -> Result<(), SysfsError> {
        match self {
            Self::Sysfs(pin) => pin.set_low(),
            Self::Sim(pin) => Ok(infallible(pin.set_low())),
        }
    }

    fn set_high(&mut self) -> Result<(), SysfsError> {
        match self {
            Self::Sysfs(pin) => pin.set_high(),
            Self::Sim(pin) => Ok(infallible(pin.set_high())),
        }
    }
}

/// A PWM channel, real or simulated.
pub enum PwmChannel {
    Sysfs(SysfsPwm),
    Sim(SimPwm),
}

impl pwm::ErrorType for PwmChannel {
    type Error = SysfsError;
}

impl SetDutyCycle for PwmChannel {
    fn max_duty_cycle(&self) -> u16 {
        match self {
            Self::Sysfs(p) => p.max_duty_cycle(),
            Self::Sim(p) => p.max_duty_cycle(),
        }
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), SysfsError> {
        match self {
            Self::Sysfs(p) => p.set_duty_cycle(duty),
            Self::Sim(p) => Ok(infallible(p.set_duty_cycle(duty))),
        }
    }
}

// ── Motor ─────────────────────────────────────────────────────

/// The configured motor, ready for the feed controller.
pub enum MotorAdapter {
    Stepper(StepperMotor<GpioPin, StdDelay>),
    Servo(ServoMotor<PwmChannel, StdDelay>),
}

impl MotorAdapter {
    /// Claim the configured outputs and build the driver.
    ///
    /// Any failure to claim an output is returned; callers treat it as
    /// fatal at startup.
    pub fn from_config(config: &FeederConfig) -> Result<Self, ActuatorError> {
        let simulate = config.simulate;
        match config.motor.kind {
            MotorKind::Stepper => {
                let [a, b, c, d] = config.motor.pins;
                let coils = [
                    open_pin(a, simulate)?,
                    open_pin(b, simulate)?,
                    open_pin(c, simulate)?,
                    open_pin(d, simulate)?,
                ];
                info!(
                    "Motor: stepper on GPIO {:?}{}",
                    config.motor.pins,
                    if simulate { " (simulated)" } else { "" }
                );
                let motor = StepperMotor::new(
                    coils,
                    StdDelay,
                    config.motor.step_delay_ms,
                    config.motor.direction,
                )?;
                Ok(Self::Stepper(motor))
            }
            MotorKind::Servo => {
                let s = &config.servo;
                let channel = if simulate {
                    PwmChannel::Sim(SimPwm::default())
                } else {
                    PwmChannel::Sysfs(SysfsPwm::open(
                        PWM_ROOT,
                        s.pwm_chip,
                        s.pwm_channel,
                        s.frequency_hz,
                    )?)
                };
                info!(
                    "Motor: servo on GPIO{} (pwmchip{}/pwm{}, {} Hz){}",
                    s.pin,
                    s.pwm_chip,
                    s.pwm_channel,
                    s.frequency_hz,
                    if simulate { " (simulated)" } else { "" }
                );
                let motor = ServoMotor::new(
                    channel,
                    StdDelay,
                    ServoParams::from(s),
                    config.motor.direction,
                )?;
                Ok(Self::Servo(motor))
            }
        }
    }
}

fn open_pin(gpio: u8, simulate: bool) -> Result<GpioPin, ActuatorError> {
    if simulate {
        Ok(GpioPin::Sim(SimPin::new(gpio)))
    } else {
        SysfsPin::open(GPIO_ROOT, gpio).map(GpioPin::Sysfs)
    }
}

impl MotorPort for MotorAdapter {
    fn rotate(&mut self, steps: i32) -> Result<(), ActuatorError> {
        match self {
            Self::Stepper(m) => m.rotate(steps),
            Self::Servo(m) => m.rotate(steps),
        }
    }

    fn release(&mut self) -> Result<(), ActuatorError> {
        match self {
            Self::Stepper(m) => m.release(),
            Self::Servo(m) => m.release(),
        }
    }
}
