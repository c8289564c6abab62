//! # hcsr04-triplex
//!
//! Interrupt driven driver for three HC-SR04 ultrasonic distance sensors sharing one
//! microcontroller.
//!
//! A periodic timer interrupt multiplexes the trigger pulses: every `schedule_period` ticks
//! all three sensors get a synchronized 10us trigger pulse. Each sensor's echo line raises a
//! both-edges interrupt; the rising edge starts a measurement, the falling edge ends it and
//! feeds the echo length into that channel's exponential smoothing filter. Foreground code reads
//! the latest smoothed distance whenever it likes.
//!
//! The channel state lives in an [`Ultrasound`], which is `const` constructible and meant to be
//! placed in a `static`. [`Ultrasound::setup`] hands out the [`PulseScheduler`] for the timer
//! interrupt and one [`EchoTimer`] per echo interrupt. Reads and writes of a channel each take a
//! short critical section, so a reader sees either the previous or the new smoothed value.
//!
//! # Example
//!
//! ```rust, ignore
//! #![no_std]
//! #![no_main]
//!
//! use defmt::*;
//! use embassy_executor::Spawner;
//! use embassy_rp::gpio::{Input, Level, Output, Pull};
//! use embassy_time::{Delay, Duration, Instant, Ticker, Timer};
//! use hcsr04_triplex::{ChannelId, Config, DistanceUnit, Now, Ultrasound, TICK_INTERVAL_US};
//! use {defmt_rtt as _, panic_probe as _};
//!
//! static SENSORS: Ultrasound = Ultrasound::new();
//!
//! #[derive(Clone)]
//! struct EmbassyClock;
//!
//! impl Now for EmbassyClock {
//!     fn now_micros(&self) -> u64 {
//!         Instant::now().as_micros()
//!     }
//! }
//!
//! #[embassy_executor::main]
//! async fn main(spawner: Spawner) {
//!     let p = embassy_rp::init(Default::default());
//!
//!     let triggers = [
//!         Output::new(p.PIN_14, Level::Low),
//!         Output::new(p.PIN_12, Level::Low),
//!         Output::new(p.PIN_10, Level::Low),
//!     ];
//!     let echoes = [
//!         Input::new(p.PIN_15, Pull::Down),
//!         Input::new(p.PIN_13, Pull::Down),
//!         Input::new(p.PIN_11, Pull::Down),
//!     ];
//!
//!     let (scheduler, timers) = unwrap!(SENSORS.setup(Config::default(), triggers, echoes, EmbassyClock, Delay));
//!     // spawn one task per echo timer calling `timer.run().await`
//!     // and one task ticking `scheduler.on_timer_tick()` every TICK_INTERVAL_US
//!
//!     loop {
//!         info!("Center distance: {} cm", SENSORS.distance(ChannelId::Center, DistanceUnit::Centimeters));
//!         Timer::after(Duration::from_millis(500)).await;
//!     }
//! }
//! ```
//!
//! See `demos/` for a complete firmware.

#![cfg_attr(not(test), no_std)]

use core::cell::Cell;

mod config;
mod distance;
mod echo;
mod error;
mod filter;
mod scheduler;
#[cfg(test)]
mod test_support;

use critical_section::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, InputPin, OutputPin};

pub use config::{
    Config, DEFAULT_PULSE_WIDTH_US, DEFAULT_SCHEDULE_PERIOD, DEFAULT_SMOOTHING, MAX_PULSE_WIDTH_US,
    MIN_PULSE_WIDTH_US, TICK_INTERVAL_US,
};
pub use distance::{
    convert, convert_compensated, microseconds_to_centimeters, microseconds_to_inches,
    speed_of_sound, DistanceUnit, TemperatureUnit, INVALID_CHANNEL_DURATION, MICROSECONDS_PER_CM,
    MICROSECONDS_PER_INCH,
};
pub use echo::{EchoChannel, EchoEvent, EchoPhase, EchoTimer};
pub use error::{ConfigError, Error};
pub use filter::EchoFilter;
pub use scheduler::PulseScheduler;

/// Number of sensors driven by one [`Ultrasound`].
pub const CHANNELS: usize = 3;

pub trait Now {
    /// The time elapsed since startup in microseconds
    fn now_micros(&self) -> u64;
}

/// Selects one of the three sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum ChannelId {
    Left,
    Center,
    Right,
}

impl ChannelId {
    pub const ALL: [ChannelId; CHANNELS] = [ChannelId::Left, ChannelId::Center, ChannelId::Right];

    fn index(self) -> usize {
        match self {
            ChannelId::Left => 0,
            ChannelId::Center => 1,
            ChannelId::Right => 2,
        }
    }
}

/// Channels are numbered 1 (left), 2 (center) and 3 (right).
impl TryFrom<u8> for ChannelId {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ChannelId::Left),
            2 => Ok(ChannelId::Center),
            3 => Ok(ChannelId::Right),
            other => Err(Error::NoSuchChannel(i32::from(other))),
        }
    }
}

/// Wide selector, so any integer reaches the sentinel paths.
impl TryFrom<i32> for ChannelId {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map_err(|_| Error::NoSuchChannel(value))
            .and_then(ChannelId::try_from)
    }
}

impl From<ChannelId> for u8 {
    fn from(id: ChannelId) -> Self {
        id.index() as u8 + 1
    }
}

/// Owner of the three sensor channels.
pub struct Ultrasound {
    channels: [EchoChannel; CHANNELS],
    taken: Mutex<Cell<bool>>,
}

impl Ultrasound {
    pub const fn new() -> Self {
        Self {
            channels: [EchoChannel::new(), EchoChannel::new(), EchoChannel::new()],
            taken: Mutex::new(Cell::new(false)),
        }
    }

    /// Prepare the sensors and hand out their interrupt handlers.
    ///
    /// Validates `config`, drives every trigger low and resets all channels.
    /// Pins are given in channel order: left, center, right. The returned
    /// scheduler belongs in the periodic timer interrupt, each timer in the
    /// both-edges interrupt of its echo pin. Pulsing starts with the first
    /// tick.
    ///
    /// The handlers are handed out once. Any later call returns
    /// [`Error::AlreadySetUp`] and leaves the channels untouched, so every
    /// channel keeps a single writer.
    #[allow(clippy::type_complexity)]
    pub fn setup<TRIGPIN, ECHOPIN, CLOCK, DELAY>(
        &self,
        config: Config,
        mut triggers: [TRIGPIN; CHANNELS],
        echoes: [ECHOPIN; CHANNELS],
        clock: CLOCK,
        delay: DELAY,
    ) -> Result<
        (
            PulseScheduler<TRIGPIN, DELAY>,
            [EchoTimer<'_, ECHOPIN, CLOCK>; CHANNELS],
        ),
        Error,
    >
    where
        TRIGPIN: OutputPin,
        ECHOPIN: InputPin,
        CLOCK: Now + Clone,
        DELAY: DelayNs,
    {
        config.validate()?;
        self.claim()?;

        for trigger in triggers.iter_mut() {
            if let Err(e) = trigger.set_low() {
                self.release();
                return Err(Error::Trigger(e.kind()));
            }
        }

        for channel in &self.channels {
            channel.configure(config.smoothing, config.max_echo_us);
        }

        let scheduler = PulseScheduler::new(triggers, delay, &config);
        let [left, center, right] = echoes;
        let [left_channel, center_channel, right_channel] = &self.channels;
        let timers = [
            EchoTimer::new(left, clock.clone(), left_channel),
            EchoTimer::new(center, clock.clone(), center_channel),
            EchoTimer::new(right, clock, right_channel),
        ];

        defmt::info!(
            "ultrasound ready: {=u32}us pulse every {=u32} ticks",
            config.pulse_width_us,
            config.schedule_period
        );
        Ok((scheduler, timers))
    }

    fn claim(&self) -> Result<(), Error> {
        critical_section::with(|cs| {
            let taken = self.taken.borrow(cs);
            if taken.get() {
                return Err(Error::AlreadySetUp);
            }
            taken.set(true);
            Ok(())
        })
    }

    fn release(&self) {
        critical_section::with(|cs| self.taken.borrow(cs).set(false));
    }

    /// Whether [`Ultrasound::setup`] already handed out the handlers.
    pub fn is_set_up(&self) -> bool {
        critical_section::with(|cs| self.taken.borrow(cs).get())
    }

    pub fn channel(&self, id: ChannelId) -> &EchoChannel {
        &self.channels[id.index()]
    }

    /// Smoothed echo duration of a channel selected by number, or
    /// [`INVALID_CHANNEL_DURATION`] for anything but 1, 2 and 3.
    pub fn duration(&self, channel: i32) -> f64 {
        match ChannelId::try_from(channel) {
            Ok(id) => self.channel(id).duration_us(),
            Err(_) => {
                defmt::warn!("no ultrasonic channel {=i32}", channel);
                INVALID_CHANNEL_DURATION
            }
        }
    }

    /// Distance in centimeters seen by channel 1 (left), 2 (center) or 3
    /// (right). Any other selector yields the conversion of a -1us echo.
    pub fn get_distance(&self, channel: i32) -> f64 {
        microseconds_to_centimeters(self.duration(channel))
    }

    /// Inch version of [`Ultrasound::get_distance`].
    pub fn get_distance_inches(&self, channel: i32) -> f64 {
        microseconds_to_inches(self.duration(channel))
    }

    pub fn distance(&self, id: ChannelId, unit: DistanceUnit) -> f64 {
        convert(self.channel(id).duration_us(), unit)
    }

    pub fn try_distance(&self, channel: i32, unit: DistanceUnit) -> Result<f64, Error> {
        let id = ChannelId::try_from(channel)?;
        Ok(self.distance(id, unit))
    }

    /// Distance of a channel, or `None` until its first echo was measured.
    pub fn reading(&self, id: ChannelId, unit: DistanceUnit) -> Option<f64> {
        self.channel(id)
            .reading_us()
            .map(|duration| convert(duration, unit))
    }

    /// Distance using a speed of sound adjusted for the air temperature.
    pub fn distance_compensated(
        &self,
        id: ChannelId,
        unit: DistanceUnit,
        temperature: f64,
        temperature_unit: TemperatureUnit,
    ) -> f64 {
        convert_compensated(self.channel(id).duration_us(), unit, temperature, temperature_unit)
    }
}

impl Default for Ultrasound {
    fn default() -> Self {
        Self::new()
    }
}
