//! Errors reported by setup and by the interrupt handlers.

use core::fmt;

use embedded_hal::digital::ErrorKind;

/// Rejected configuration values, reported by [`Config::validate`](crate::Config::validate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum ConfigError {
    /// The HC-SR04 needs a trigger pulse of at least 10us. Carries the requested width.
    PulseTooShort(u32),
    /// The busy-waited pulse may not exceed [`MAX_PULSE_WIDTH_US`](crate::MAX_PULSE_WIDTH_US)
    /// so it ends well within one tick. Carries the requested width.
    PulseTooLong(u32),
    /// A schedule period of zero ticks would never emit a pulse.
    ZeroSchedulePeriod,
    /// The smoothing factor must lie in (0, 1].
    SmoothingOutOfRange,
    /// A plausibility ceiling of zero would reject every echo.
    ZeroEchoCeiling,
}

/// Errors reported by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum Error {
    InvalidConfig(ConfigError),
    /// Driving a trigger line failed.
    Trigger(ErrorKind),
    /// Reading an echo line failed.
    Echo(ErrorKind),
    /// Channel selectors are 1 (left), 2 (center) and 3 (right).
    NoSuchChannel(i32),
    /// [`Ultrasound::setup`](crate::Ultrasound::setup) already handed out the handlers.
    AlreadySetUp,
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::InvalidConfig(e)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::PulseTooShort(us) => {
                write!(f, "trigger pulse of {}us is shorter than 10us", us)
            }
            ConfigError::PulseTooLong(us) => {
                write!(f, "trigger pulse of {}us would block the tick interrupt", us)
            }
            ConfigError::ZeroSchedulePeriod => f.write_str("schedule period must be at least one tick"),
            ConfigError::SmoothingOutOfRange => f.write_str("smoothing factor must lie in (0, 1]"),
            ConfigError::ZeroEchoCeiling => f.write_str("echo ceiling must be greater than zero"),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidConfig(e) => write!(f, "invalid configuration: {}", e),
            Error::Trigger(kind) => write!(f, "error driving trigger pin: {}", kind),
            Error::Echo(kind) => write!(f, "error reading echo pin: {}", kind),
            Error::NoSuchChannel(id) => write!(f, "no ultrasonic channel {}", id),
            Error::AlreadySetUp => f.write_str("ultrasound handlers were already handed out"),
        }
    }
}

impl core::error::Error for Error {}
