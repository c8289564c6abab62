//! # Three multiplexed sensors
//! Drives three HC-SR04 sensors (left, front, right) on a Pico 2 W. A 10ms ticker triggers all three
//! sensors together every 60ms, the echo lines are timed by GPIO edge interrupts and the smoothed
//! distances are logged twice a second.
//!
//! ## Note
//!
//! Most of the hc-sr04 sensors are rated for 5V. The echo pins must be connected through a voltage
//! divider to bring the 5V echo down to the 3.3V the controller tolerates. The trigger pins can be
//! connected directly.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_time::{Delay, Duration, Instant, Ticker, Timer};
use hcsr04_triplex::{
    ChannelId, Config, DistanceUnit, EchoTimer, Now, PulseScheduler, Ultrasound, TICK_INTERVAL_US,
};
use {defmt_rtt as _, panic_probe as _};

static SENSORS: Ultrasound = Ultrasound::new();

/// Clock handed to the echo timers, returns microseconds since boot.
#[derive(Clone)]
struct EmbassyClock;

impl Now for EmbassyClock {
    fn now_micros(&self) -> u64 {
        Instant::now().as_micros()
    }
}

type Scheduler = PulseScheduler<Output<'static>, Delay>;
type Echo = EchoTimer<'static, Input<'static>, EmbassyClock>;

#[embassy_executor::task]
async fn trigger(mut scheduler: Scheduler) {
    let mut ticker = Ticker::every(Duration::from_micros(TICK_INTERVAL_US as u64));
    loop {
        ticker.next().await;
        if let Err(e) = scheduler.on_timer_tick() {
            warn!("trigger: {}", e);
        }
    }
}

#[embassy_executor::task(pool_size = 3)]
async fn echo(mut timer: Echo) {
    // pin errors are infallible on embassy-rp, this only returns on a bug
    if let Err(e) = timer.run().await {
        error!("echo timer stopped: {}", e);
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("Running!");

    let triggers = [
        Output::new(p.PIN_14, Level::Low),
        Output::new(p.PIN_12, Level::Low),
        Output::new(p.PIN_10, Level::Low),
    ];
    let echoes = [
        Input::new(p.PIN_15, Pull::Down),
        Input::new(p.PIN_13, Pull::Down),
        Input::new(p.PIN_11, Pull::Down),
    ];

    let config = Config {
        // a sensor that sees nothing holds its echo for about 38ms
        max_echo_us: Some(38_000),
        ..Config::default()
    };

    let (scheduler, timers) = unwrap!(SENSORS.setup(config, triggers, echoes, EmbassyClock, Delay));

    for timer in timers {
        unwrap!(spawner.spawn(echo(timer)));
    }
    unwrap!(spawner.spawn(trigger(scheduler)));

    loop {
        Timer::after_millis(500).await;
        for id in ChannelId::ALL {
            match SENSORS.reading(id, DistanceUnit::Centimeters) {
                Some(distance) => info!("{} distance: {} cm", id, distance),
                None => info!("{} distance: no echo yet", id),
            }
        }
    }
}
