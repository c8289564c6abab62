//! Driver configuration and its defaults.

use crate::error::ConfigError;

/// HC-SR04 datasheet minimum trigger pulse.
pub const MIN_PULSE_WIDTH_US: u32 = 10;

/// Trigger pulse width used unless configured otherwise.
pub const DEFAULT_PULSE_WIDTH_US: u32 = MIN_PULSE_WIDTH_US;

/// Ticks between trigger pulses. At the reference tick of 10ms this gives the
/// 60ms measurement cycle the HC-SR04 datasheet asks for.
pub const DEFAULT_SCHEDULE_PERIOD: u32 = 6;

/// Weight given to each new echo duration by the smoothing filter.
pub const DEFAULT_SMOOTHING: f64 = 0.5;

/// Reference interval of the periodic tick interrupt.
pub const TICK_INTERVAL_US: u32 = 10_000;

/// Longest accepted trigger pulse. The pulse is busy-waited inside the tick
/// interrupt and has to end well before the next tick.
pub const MAX_PULSE_WIDTH_US: u32 = 1_000;

/// The configuration for the sensor array.
///
/// `Config::default()` reproduces the reference wiring: 10us pulses, a pulse
/// every [`DEFAULT_SCHEDULE_PERIOD`] ticks, smoothing factor 0.5 and no echo
/// plausibility check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    /// High time of each trigger pulse, busy-waited inside the tick handler.
    pub pulse_width_us: u32,
    /// Number of ticks between two trigger pulses.
    pub schedule_period: u32,
    /// Smoothing factor of every channel's filter, in (0, 1].
    pub smoothing: f64,
    /// When set, echo durations above this many microseconds are dropped
    /// instead of being fed to the filter. A sensor that sees nothing holds
    /// its echo high for about 38ms, so 38_000 is a sensible ceiling.
    pub max_echo_us: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pulse_width_us: DEFAULT_PULSE_WIDTH_US,
            schedule_period: DEFAULT_SCHEDULE_PERIOD,
            smoothing: DEFAULT_SMOOTHING,
            max_echo_us: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pulse_width_us < MIN_PULSE_WIDTH_US {
            return Err(ConfigError::PulseTooShort(self.pulse_width_us));
        }
        if self.pulse_width_us > MAX_PULSE_WIDTH_US {
            return Err(ConfigError::PulseTooLong(self.pulse_width_us));
        }
        if self.schedule_period == 0 {
            return Err(ConfigError::ZeroSchedulePeriod);
        }
        // written so that NaN is rejected too
        if !(self.smoothing > 0.0 && self.smoothing <= 1.0) {
            return Err(ConfigError::SmoothingOutOfRange);
        }
        if self.max_echo_us == Some(0) {
            return Err(ConfigError::ZeroEchoCeiling);
        }
        Ok(())
    }

    /// Time between two trigger pulses in microseconds, assuming the
    /// reference tick interval.
    pub fn trigger_interval_us(&self) -> u64 {
        self.schedule_period as u64 * TICK_INTERVAL_US as u64
    }
}
