//! Simulated clock and embedded-hal pin mocks shared by the unit tests.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use defmt_rtt as _;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};
use embedded_hal_async::digital::Wait;

use crate::{Now, CHANNELS};

// timestamp provider
static COUNT: AtomicU32 = AtomicU32::new(0);
defmt::timestamp!("{=u32:us}", COUNT.fetch_add(1, Ordering::Relaxed));

/// Microsecond clock that only moves when told to.
#[derive(Clone, Default)]
pub struct SimClock {
    nanos: Arc<AtomicU64>,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_us(&self, us: u64) {
        self.advance_ns(us * 1_000);
    }

    pub fn advance_ns(&self, ns: u64) {
        self.nanos.fetch_add(ns, Ordering::SeqCst);
    }

    pub fn now_us(&self) -> u64 {
        self.nanos.load(Ordering::SeqCst) / 1_000
    }
}

impl Now for SimClock {
    fn now_micros(&self) -> u64 {
        self.now_us()
    }
}

/// Busy wait that advances the simulated clock instead of spinning.
pub struct DelayMock {
    clock: SimClock,
}

impl DelayMock {
    pub fn new(clock: SimClock) -> Self {
        Self { clock }
    }
}

impl DelayNs for DelayMock {
    fn delay_ns(&mut self, ns: u32) {
        self.clock.advance_ns(ns as u64);
    }
}

/// Level of a simulated echo line, plus an optional script of future edges
/// consumed by `Wait::wait_for_any_edge`.
#[derive(Clone, Default)]
pub struct EchoLine {
    high: Arc<AtomicBool>,
    failing: Arc<AtomicBool>,
    script: Arc<Mutex<VecDeque<(u64, bool)>>>,
    clock: Option<SimClock>,
}

impl EchoLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Line whose edges are replayed from `edges`: each entry advances the
    /// clock by the given microseconds, then sets the level. Waiting past the
    /// last edge fails, which ends any edge loop.
    pub fn scripted(clock: &SimClock, edges: &[(u64, bool)]) -> Self {
        Self {
            script: Arc::new(Mutex::new(edges.iter().copied().collect())),
            clock: Some(clock.clone()),
            ..Self::default()
        }
    }

    pub fn set(&self, high: bool) {
        self.high.store(high, Ordering::SeqCst);
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn pin(&self) -> EchoPin {
        EchoPin { line: self.clone() }
    }
}

pub struct EchoPin {
    line: EchoLine,
}

impl ErrorType for EchoPin {
    type Error = ErrorKind;
}

impl InputPin for EchoPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        if self.line.failing.load(Ordering::SeqCst) {
            return Err(ErrorKind::Other);
        }
        Ok(self.line.high.load(Ordering::SeqCst))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl Wait for EchoPin {
    async fn wait_for_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn wait_for_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn wait_for_rising_edge(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn wait_for_falling_edge(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn wait_for_any_edge(&mut self) -> Result<(), Self::Error> {
        let next = self.line.script.lock().unwrap().pop_front();
        let (advance_us, high) = next.ok_or(ErrorKind::Other)?;
        if let Some(clock) = &self.line.clock {
            clock.advance_us(advance_us);
        }
        self.line.set(high);
        Ok(())
    }
}

/// One recorded level change on a trigger line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub pin: usize,
    pub high: bool,
    pub at_us: u64,
}

const NO_FAILURE: usize = usize::MAX;

/// Three trigger lines recording every level change with its time.
#[derive(Clone)]
pub struct TriggerBank {
    clock: SimClock,
    levels: Arc<[AtomicBool; CHANNELS]>,
    transitions: Arc<Mutex<Vec<Transition>>>,
    fail_high: Arc<AtomicUsize>,
}

impl TriggerBank {
    pub fn new(clock: SimClock) -> Self {
        Self {
            clock,
            levels: Arc::new([const { AtomicBool::new(false) }; CHANNELS]),
            transitions: Arc::new(Mutex::new(Vec::new())),
            fail_high: Arc::new(AtomicUsize::new(NO_FAILURE)),
        }
    }

    pub fn pins(&self) -> [TriggerPin; CHANNELS] {
        core::array::from_fn(|index| TriggerPin {
            index,
            bank: self.clone(),
        })
    }

    /// Make `set_high` fail on one pin.
    pub fn fail_high(&self, pin: usize) {
        self.fail_high.store(pin, Ordering::SeqCst);
    }

    pub fn transitions(&self) -> Vec<Transition> {
        self.transitions.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.transitions.lock().unwrap().clear();
    }

    pub fn all_low(&self) -> bool {
        self.levels.iter().all(|level| !level.load(Ordering::SeqCst))
    }

    /// Times at which all three lines went high.
    pub fn pulse_starts(&self) -> Vec<u64> {
        self.transitions()
            .iter()
            .filter(|t| t.high && t.pin == 0)
            .map(|t| t.at_us)
            .collect()
    }
}

pub struct TriggerPin {
    index: usize,
    bank: TriggerBank,
}

impl TriggerPin {
    fn drive(&mut self, high: bool) {
        let bank = &self.bank;
        let previous = bank.levels[self.index].swap(high, Ordering::SeqCst);
        if previous != high {
            bank.transitions.lock().unwrap().push(Transition {
                pin: self.index,
                high,
                at_us: bank.clock.now_us(),
            });
        }
    }
}

impl ErrorType for TriggerPin {
    type Error = ErrorKind;
}

impl OutputPin for TriggerPin {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.bank.fail_high.load(Ordering::SeqCst) == self.index {
            return Err(ErrorKind::Other);
        }
        self.drive(true);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false);
        Ok(())
    }
}
