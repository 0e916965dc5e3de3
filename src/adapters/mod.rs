//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter      | Implements          | Connects to                  |
//! |--------------|---------------------|------------------------------|
//! | `hardware`   | MotorPort           | stepper / servo driver       |
//! | `sysfs`      | OutputPin           | `/sys/class/gpio`            |
//! |              | SetDutyCycle        | `/sys/class/pwm`             |
//! | `state_file` | FeedStore           | JSON file, atomic replace    |
//! | `log_sink`   | EventSink           | `log` facade                 |
//! | `time`       | Clock, DelayNs      | local wall clock, sleep      |

pub mod hardware;
pub mod log_sink;
pub mod state_file;
pub mod sysfs;
pub mod time;
