//! 4-phase unipolar stepper driver (28BYJ-48 through a ULN2003 board).
//!
//! One increment is one full pass through the two-coil activation
//! pattern, with the configured delay after every phase:
//!
//! ```text
//!   phase   IN1 IN2 IN3 IN4
//!     0      1   1   0   0
//!     1      0   1   1   0
//!     2      0   0   1   1
//!     3      1   0   0   1
//! ```
//!
//! Counter-clockwise walks the table bottom-up.
//!
//! ## Release contract
//!
//! Every `rotate` ends with all coils driven low, whether the sequence
//! completed or an output failed halfway.  Dropping the driver releases
//! too.  The driver never retries a failed output.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{OutputPin, PinState};
use log::{debug, warn};

use crate::app::ports::MotorPort;
use crate::config::Direction;
use crate::error::ActuatorError;

pub const PHASES: usize = 4;

pub const PHASE_SEQUENCE: [[bool; 4]; PHASES] = [
    [true, true, false, false],
    [false, true, true, false],
    [false, false, true, true],
    [true, false, false, true],
];

pub struct StepperMotor<P: OutputPin, D: DelayNs> {
    coils: [P; 4],
    delay: D,
    step_delay_ms: u32,
    direction: Direction,
    energized: bool,
}

impl<P: OutputPin, D: DelayNs> StepperMotor<P, D> {
    /// Take ownership of the coil outputs and drive them all low.
    pub fn new(
        coils: [P; 4],
        delay: D,
        step_delay_ms: u32,
        direction: Direction,
    ) -> Result<Self, ActuatorError> {
        let mut motor = Self {
            coils,
            delay,
            step_delay_ms,
            direction,
            energized: true,
        };
        motor.de_energize()?;
        Ok(motor)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_energized(&self) -> bool {
        self.energized
    }

    fn drive(&mut self, steps: i32) -> Result<(), ActuatorError> {
        let direction = if steps < 0 {
            self.direction.reversed()
        } else {
            self.direction
        };
        for _ in 0..steps.unsigned_abs() {
            for phase in 0..PHASES {
                let pattern = match direction {
                    Direction::Clockwise => PHASE_SEQUENCE[phase],
                    Direction::CounterClockwise => PHASE_SEQUENCE[PHASES - 1 - phase],
                };
                self.apply(pattern)?;
                self.delay.delay_ms(self.step_delay_ms);
            }
        }
        Ok(())
    }

    fn apply(&mut self, pattern: [bool; 4]) -> Result<(), ActuatorError> {
        self.energized = true;
        for (channel, (coil, on)) in self.coils.iter_mut().zip(pattern).enumerate() {
            coil.set_state(PinState::from(on))
                .map_err(|e| ActuatorError::output(channel, e))?;
        }
        Ok(())
    }

    /// Drive every coil low.  All coils are attempted even if one fails;
    /// the first failure is returned.
    fn de_energize(&mut self) -> Result<(), ActuatorError> {
        let mut first_err = None;
        for (channel, coil) in self.coils.iter_mut().enumerate() {
            if let Err(e) = coil.set_low() {
                warn!("Stepper: coil {} release failed: {:?}", channel, e);
                first_err.get_or_insert(ActuatorError::output(channel, e));
            }
        }
        match first_err {
            None => {
                self.energized = false;
                Ok(())
            }
            Some(e) => Err(e),
        }
    }
}

impl<P: OutputPin, D: DelayNs> MotorPort for StepperMotor<P, D> {
    fn rotate(&mut self, steps: i32) -> Result<(), ActuatorError> {
        debug!("Stepper: rotate {} cycles ({:?})", steps, self.direction);
        let driven = self.drive(steps);
        let released = self.de_energize();
        driven.and(released)
    }

    fn release(&mut self) -> Result<(), ActuatorError> {
        self.de_energize()
    }
}

impl<P: OutputPin, D: DelayNs> Drop for StepperMotor<P, D> {
    fn drop(&mut self) {
        if self.energized {
            let _ = self.de_energize();
        }
    }
}
