//! Motor drivers.  Both are generic over `embedded-hal` 1.0 traits and
//! implement [`MotorPort`](crate::app::ports::MotorPort).

pub mod servo;
pub mod stepper;
