//! Default GPIO / PWM assignments for the feeder board (BCM numbering).
//!
//! Single source of truth for the defaults in [`FeederConfig`](crate::config::FeederConfig).
//! A config file may override any of them.

// ---------------------------------------------------------------------------
// Stepper motor (28BYJ-48 via ULN2003 driver board)
// ---------------------------------------------------------------------------

/// ULN2003 inputs IN1..IN4, in coil order.
pub const STEPPER_COIL_GPIOS: [u8; 4] = [17, 18, 27, 22];

/// Activation-pattern cycles for one output-shaft revolution
/// (2048 full steps / 4 phases per cycle).
pub const STEPPER_CYCLES_PER_REV: u32 = 512;

// ---------------------------------------------------------------------------
// Servo motor (SG90 class, hardware PWM0)
// ---------------------------------------------------------------------------

/// GPIO 18 carries PWM0 on the 40-pin header.
pub const SERVO_GPIO: u8 = 18;
/// sysfs PWM chip exposing PWM0.
pub const SERVO_PWM_CHIP: u8 = 0;
/// Channel of PWM0 on that chip.
pub const SERVO_PWM_CHANNEL: u8 = 0;
/// Standard hobby-servo frame rate.
pub const SERVO_FREQ_HZ: u32 = 50;
/// Duty cycle (percent) at 0°.
pub const SERVO_MIN_DUTY_PERCENT: f32 = 2.5;
/// Duty cycle (percent) at 180°.
pub const SERVO_MAX_DUTY_PERCENT: f32 = 12.5;
