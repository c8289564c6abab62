//! Synchronized trigger pulses on a fixed tick.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, OutputPin};

use crate::config::Config;
use crate::error::Error;
use crate::CHANNELS;

/// Emits one trigger pulse on all sensors every `schedule_period` ticks.
///
/// Move it into the periodic timer interrupt (10ms in the reference setup)
/// and call [`PulseScheduler::on_timer_tick`] on every firing. The pulse is
/// busy-waited, so the pulse width must stay far below the tick interval.
pub struct PulseScheduler<TRIGPIN, DELAY> {
    triggers: [TRIGPIN; CHANNELS],
    delay: DELAY,
    pulse_width_us: u32,
    schedule_period: u32,
    ticks: u32,
    pulses: u32,
}

impl<TRIGPIN, DELAY> PulseScheduler<TRIGPIN, DELAY>
where
    TRIGPIN: OutputPin,
    DELAY: DelayNs,
{
    /// Takes trigger pins that are already driven low, see [`crate::Ultrasound::setup`].
    pub(crate) fn new(triggers: [TRIGPIN; CHANNELS], delay: DELAY, config: &Config) -> Self {
        Self {
            triggers,
            delay,
            pulse_width_us: config.pulse_width_us,
            schedule_period: config.schedule_period,
            ticks: 0,
            pulses: 0,
        }
    }

    /// Count one tick and pulse the triggers when the schedule period is
    /// reached. Returns whether a pulse was emitted.
    pub fn on_timer_tick(&mut self) -> Result<bool, Error> {
        self.ticks += 1;
        if self.ticks < self.schedule_period {
            return Ok(false);
        }
        self.ticks = 0;
        self.pulse()?;
        Ok(true)
    }

    /// Drive all triggers high, hold for the pulse width, drive them low.
    ///
    /// All lines are driven low even if raising one of them failed.
    fn pulse(&mut self) -> Result<(), Error> {
        let mut result = Ok(());
        for trigger in self.triggers.iter_mut() {
            if let Err(e) = trigger.set_high() {
                result = result.and(Err(Error::Trigger(e.kind())));
            }
        }

        if result.is_ok() {
            self.delay.delay_us(self.pulse_width_us);
        }

        for trigger in self.triggers.iter_mut() {
            if let Err(e) = trigger.set_low() {
                result = result.and(Err(Error::Trigger(e.kind())));
            }
        }

        if result.is_ok() {
            self.pulses = self.pulses.wrapping_add(1);
            defmt::trace!("trigger pulse {=u32}", self.pulses);
        } else {
            defmt::warn!("trigger pulse failed");
        }
        result
    }

    /// Ticks left until the next pulse.
    pub fn ticks_until_pulse(&self) -> u32 {
        self.schedule_period - self.ticks
    }

    /// Number of pulses emitted since setup.
    pub fn pulses_emitted(&self) -> u32 {
        self.pulses
    }

    pub fn schedule_period(&self) -> u32 {
        self.schedule_period
    }

    pub fn pulse_width_us(&self) -> u32 {
        self.pulse_width_us
    }
}
