//! Echo pulse timing.
//!
//! Every channel runs a two state machine driven by the edges of its echo
//! line: a rising edge starts a measurement, the following falling edge ends
//! it and feeds the pulse length into the channel's [`EchoFilter`].
//!
//! The state of a channel lives in an [`EchoChannel`], meant to be placed in
//! a `static` so interrupt handlers and foreground code can both reach it.
//! Only the channel's [`EchoTimer`] writes it.

use core::cell::RefCell;
use core::convert::Infallible;

use critical_section::Mutex;
use embedded_hal::digital::{Error as _, InputPin};
use embedded_hal_async::digital::Wait;

use crate::error::Error;
use crate::filter::EchoFilter;
use crate::Now;

/// Where a channel is in its echo measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum EchoPhase {
    /// Waiting for the echo line to rise.
    Idle,
    /// Echo line is high, waiting for it to fall.
    Measuring,
}

/// What a single edge did to a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum EchoEvent {
    /// Rising edge, measurement started.
    Started,
    /// Falling edge, the pulse length was fed to the filter.
    Completed { duration_us: u64 },
    /// Falling edge, but the pulse was longer than the configured ceiling.
    Rejected { duration_us: u64 },
    /// Falling edge without a preceding rising edge.
    Spurious,
}

#[derive(Debug, Clone, Copy)]
struct ChannelState {
    phase: EchoPhase,
    echo_start: u64,
    echo_end: Option<u64>,
    max_echo_us: Option<u64>,
    samples: u32,
    filter: EchoFilter,
}

impl ChannelState {
    const INITIAL: Self = Self {
        phase: EchoPhase::Idle,
        echo_start: 0,
        echo_end: None,
        max_echo_us: None,
        samples: 0,
        filter: EchoFilter::DEFAULT,
    };
}

/// Timestamps and smoothed echo duration of one sensor.
pub struct EchoChannel {
    state: Mutex<RefCell<ChannelState>>,
}

impl EchoChannel {
    pub const fn new() -> Self {
        Self {
            state: Mutex::new(RefCell::new(ChannelState::INITIAL)),
        }
    }

    /// Drop all measurement state and install a fresh filter.
    pub(crate) fn configure(&self, smoothing: f64, max_echo_us: Option<u64>) {
        critical_section::with(|cs| {
            self.state.borrow(cs).replace(ChannelState {
                max_echo_us,
                filter: EchoFilter::new(smoothing),
                ..ChannelState::INITIAL
            });
        });
    }

    /// Advance the state machine for an edge observed at `now_us` that left
    /// the echo line `high` or low.
    pub(crate) fn record_edge(&self, high: bool, now_us: u64) -> EchoEvent {
        critical_section::with(|cs| {
            let mut state = self.state.borrow_ref_mut(cs);
            if high {
                // a rising edge while measuring means the falling one was missed
                state.echo_end = None;
                state.echo_start = now_us;
                state.phase = EchoPhase::Measuring;
                return EchoEvent::Started;
            }

            if state.phase == EchoPhase::Idle {
                return EchoEvent::Spurious;
            }

            state.echo_end = Some(now_us);
            state.phase = EchoPhase::Idle;
            // a clock wrap between the edges is not detected
            let duration_us = now_us.wrapping_sub(state.echo_start);
            if state.max_echo_us.is_some_and(|max| duration_us > max) {
                return EchoEvent::Rejected { duration_us };
            }
            state.filter.filter(duration_us as f64);
            state.samples = state.samples.wrapping_add(1);
            EchoEvent::Completed { duration_us }
        })
    }

    /// Smoothed echo duration in microseconds, `0.0` until the first echo.
    pub fn duration_us(&self) -> f64 {
        critical_section::with(|cs| self.state.borrow_ref(cs).filter.output())
    }

    /// Smoothed echo duration, `None` until the first echo completed.
    pub fn reading_us(&self) -> Option<f64> {
        critical_section::with(|cs| {
            let state = self.state.borrow_ref(cs);
            state.filter.is_primed().then(|| state.filter.output())
        })
    }

    pub fn phase(&self) -> EchoPhase {
        critical_section::with(|cs| self.state.borrow_ref(cs).phase)
    }

    /// Start and end of the last echo. The end is `None` while a measurement
    /// is in flight.
    pub fn timestamps(&self) -> (u64, Option<u64>) {
        critical_section::with(|cs| {
            let state = self.state.borrow_ref(cs);
            (state.echo_start, state.echo_end)
        })
    }

    /// Number of echoes fed to the filter since setup.
    pub fn samples(&self) -> u32 {
        critical_section::with(|cs| self.state.borrow_ref(cs).samples)
    }
}

impl Default for EchoChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// Edge handler of one channel.
///
/// Owns the echo input and a clock, and holds the only write access to its
/// [`EchoChannel`]. Call [`EchoTimer::on_edge`] from the echo pin's
/// both-edges interrupt, or drive it with [`EchoTimer::run`] on HALs that
/// expose pin interrupts through `embedded_hal_async::digital::Wait`.
pub struct EchoTimer<'a, ECHOPIN, CLOCK> {
    echo: ECHOPIN,
    clock: CLOCK,
    channel: &'a EchoChannel,
}

impl<'a, ECHOPIN, CLOCK> EchoTimer<'a, ECHOPIN, CLOCK>
where
    ECHOPIN: InputPin,
    CLOCK: Now,
{
    pub(crate) fn new(echo: ECHOPIN, clock: CLOCK, channel: &'a EchoChannel) -> Self {
        Self { echo, clock, channel }
    }

    /// Handle an edge on the echo line.
    ///
    /// The timestamp is taken before the pin is read so the measurement does
    /// not include the pin access.
    pub fn on_edge(&mut self) -> Result<EchoEvent, Error> {
        let now = self.clock.now_micros();
        let high = self.echo.is_high().map_err(|e| Error::Echo(e.kind()))?;
        let event = self.channel.record_edge(high, now);
        match event {
            EchoEvent::Completed { duration_us } => defmt::trace!("echo of {=u64}us", duration_us),
            EchoEvent::Rejected { duration_us } => {
                defmt::warn!("dropping implausible echo of {=u64}us", duration_us)
            }
            EchoEvent::Spurious => defmt::debug!("falling echo edge without rising edge"),
            EchoEvent::Started => {}
        }
        Ok(event)
    }

    pub fn channel(&self) -> &'a EchoChannel {
        self.channel
    }
}

impl<ECHOPIN, CLOCK> EchoTimer<'_, ECHOPIN, CLOCK>
where
    ECHOPIN: InputPin + Wait,
    CLOCK: Now,
{
    /// Handle echo edges forever. Only returns if the pin fails.
    pub async fn run(&mut self) -> Result<Infallible, Error> {
        loop {
            self.echo
                .wait_for_any_edge()
                .await
                .map_err(|e| Error::Echo(e.kind()))?;
            self.on_edge()?;
        }
    }
}
