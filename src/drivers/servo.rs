//! Hobby-servo dispenser driver (SG90 class) on a PWM channel.
//!
//! One increment sweeps the paddle from home by `step_angle` degrees,
//! holds, sweeps back and holds again.  Home is 0° for clockwise and
//! 180° for counter-clockwise.  Releasing sets the duty to zero so the
//! servo stops holding position.

use embedded_hal::delay::DelayNs;
use embedded_hal::pwm::SetDutyCycle;
use log::{debug, warn};

use crate::app::ports::MotorPort;
use crate::config::{Direction, ServoConfig};
use crate::error::ActuatorError;

/// Duty cycles are set in basis points of the period.
const DUTY_DENOM: u16 = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct ServoParams {
    pub min_duty_percent: f32,
    pub max_duty_percent: f32,
    pub step_angle: u16,
    pub hold_ms: u32,
}

impl From<&ServoConfig> for ServoParams {
    fn from(c: &ServoConfig) -> Self {
        Self {
            min_duty_percent: c.min_duty_percent,
            max_duty_percent: c.max_duty_percent,
            step_angle: c.step_angle.min(180),
            hold_ms: c.hold_ms,
        }
    }
}

impl ServoParams {
    /// Duty (basis points) that positions the horn at `angle` degrees.
    pub fn duty_for_angle(&self, angle: u16) -> u16 {
        let angle = f32::from(angle.min(180));
        let percent =
            self.min_duty_percent + (self.max_duty_percent - self.min_duty_percent) * angle / 180.0;
        (percent * 100.0).round().clamp(0.0, f32::from(DUTY_DENOM)) as u16
    }
}

pub struct ServoMotor<P: SetDutyCycle, D: DelayNs> {
    pwm: P,
    delay: D,
    params: ServoParams,
    direction: Direction,
    energized: bool,
}

impl<P: SetDutyCycle, D: DelayNs> ServoMotor<P, D> {
    pub fn new(
        pwm: P,
        delay: D,
        params: ServoParams,
        direction: Direction,
    ) -> Result<Self, ActuatorError> {
        let mut servo = Self {
            pwm,
            delay,
            params,
            direction,
            energized: true,
        };
        servo.de_energize()?;
        Ok(servo)
    }

    fn set_angle(&mut self, angle: u16) -> Result<(), ActuatorError> {
        self.energized = true;
        let duty = self.params.duty_for_angle(angle);
        self.pwm
            .set_duty_cycle_fraction(duty, DUTY_DENOM)
            .map_err(ActuatorError::duty)
    }

    fn drive(&mut self, steps: i32) -> Result<(), ActuatorError> {
        let direction = if steps < 0 {
            self.direction.reversed()
        } else {
            self.direction
        };
        let (home, open) = match direction {
            Direction::Clockwise => (0, self.params.step_angle),
            Direction::CounterClockwise => (180, 180 - self.params.step_angle),
        };
        for _ in 0..steps.unsigned_abs() {
            self.set_angle(open)?;
            self.delay.delay_ms(self.params.hold_ms);
            self.set_angle(home)?;
            self.delay.delay_ms(self.params.hold_ms);
        }
        Ok(())
    }

    fn de_energize(&mut self) -> Result<(), ActuatorError> {
        match self.pwm.set_duty_cycle_fully_off() {
            Ok(()) => {
                self.energized = false;
                Ok(())
            }
            Err(e) => {
                warn!("Servo: release failed: {:?}", e);
                Err(ActuatorError::duty(e))
            }
        }
    }
}

impl<P: SetDutyCycle, D: DelayNs> MotorPort for ServoMotor<P, D> {
    fn rotate(&mut self, steps: i32) -> Result<(), ActuatorError> {
        debug!("Servo: rotate {} increments of {}°", steps, self.params.step_angle);
        let driven = self.drive(steps);
        let released = self.de_energize();
        driven.and(released)
    }

    fn release(&mut self) -> Result<(), ActuatorError> {
        self.de_energize()
    }
}

impl<P: SetDutyCycle, D: DelayNs> Drop for ServoMotor<P, D> {
    fn drop(&mut self) {
        if self.energized {
            let _ = self.de_energize();
        }
    }
}
