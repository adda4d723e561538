//! Per-question countdown.
//!
//! The clock is the only timing primitive in the engine. It is polled
//! cooperatively through [`Clock::next_event`]; no background task exists,
//! so a stopped countdown cannot deliver events into a discarded session.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{interval_at, Instant, Interval};

use crate::error::EngineError;

/// Ticks at or below this many seconds (and above one) are flagged as low time.
pub const LOW_TIME_THRESHOLD_SECS: u32 = 5;

/// Something the countdown reports after one elapsed second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// One second elapsed and time remains.
    Tick { remaining: u32, low_time: bool },
    /// The countdown reached zero. Reported once per countdown.
    Expired,
}

/// Whether `remaining` falls in the escalating-feedback window.
pub fn is_low_time(remaining: u32) -> bool {
    remaining > 1 && remaining <= LOW_TIME_THRESHOLD_SECS
}

/// Pure countdown state shared by every clock implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    remaining: u32,
    expired: bool,
}

impl Countdown {
    pub fn new(duration_secs: u32) -> Self {
        Self {
            remaining: duration_secs,
            expired: false,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Account for one elapsed second.
    pub fn elapse_second(&mut self) -> Option<ClockEvent> {
        if self.expired {
            return None;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.expired = true;
            Some(ClockEvent::Expired)
        } else {
            Some(ClockEvent::Tick {
                remaining: self.remaining,
                low_time: is_low_time(self.remaining),
            })
        }
    }
}

/// A restartable one-question countdown.
#[async_trait]
pub trait Clock: Send {
    /// Begin a countdown of `duration_secs`.
    ///
    /// Starting while a countdown is live is a programming error: it panics
    /// in debug builds and returns [`EngineError::TimerOverlap`] otherwise.
    fn start(&mut self, duration_secs: u32) -> Result<(), EngineError>;

    /// Cancel the live countdown, if any. Idempotent.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Seconds left on the live countdown.
    fn remaining(&self) -> Option<u32>;

    /// Wait for the next second to elapse. Returns `None` when no countdown
    /// is live. After `Expired` the countdown stops by itself.
    async fn next_event(&mut self) -> Option<ClockEvent>;
}

fn guard_overlap(running: bool) -> Result<(), EngineError> {
    if running {
        debug_assert!(!running, "timer overlap: start() called on a live countdown");
        tracing::error!("timer overlap: start() called on a live countdown");
        return Err(EngineError::TimerOverlap);
    }
    Ok(())
}

/// Wall-clock countdown driven by `tokio::time`.
///
/// Must be started from within a tokio runtime.
pub struct IntervalClock {
    period: Duration,
    active: Option<(Countdown, Interval)>,
}

impl IntervalClock {
    pub fn new() -> Self {
        Self::with_period(Duration::from_secs(1))
    }

    /// Use a custom tick period (one "second" of countdown per period).
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            active: None,
        }
    }
}

impl Default for IntervalClock {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Clock for IntervalClock {
    fn start(&mut self, duration_secs: u32) -> Result<(), EngineError> {
        guard_overlap(self.is_running())?;
        let interval = interval_at(Instant::now() + self.period, self.period);
        self.active = Some((Countdown::new(duration_secs), interval));
        Ok(())
    }

    fn stop(&mut self) {
        self.active = None;
    }

    fn is_running(&self) -> bool {
        self.active.is_some()
    }

    fn remaining(&self) -> Option<u32> {
        self.active.as_ref().map(|(c, _)| c.remaining())
    }

    async fn next_event(&mut self) -> Option<ClockEvent> {
        let (countdown, interval) = self.active.as_mut()?;
        interval.tick().await;
        let event = countdown.elapse_second();
        if countdown.is_expired() {
            self.active = None;
        }
        event
    }
}

/// Deterministic clock for tests: every `next_event` call elapses one
/// second immediately.
#[derive(Debug, Default)]
pub struct ManualClock {
    active: Option<Countdown>,
    state: Arc<ManualClockState>,
}

#[derive(Debug, Default)]
struct ManualClockState {
    starts: AtomicU32,
    stops: AtomicU32,
    running: AtomicBool,
}

/// Read-only view of a [`ManualClock`] that outlives moving the clock into
/// a sequencer.
#[derive(Debug, Clone)]
pub struct ManualClockHandle(Arc<ManualClockState>);

impl ManualClockHandle {
    pub fn starts(&self) -> u32 {
        self.0.starts.load(Ordering::Relaxed)
    }

    /// Countdowns cancelled by `stop` while still live. Expiry is not a stop.
    pub fn stops(&self) -> u32 {
        self.0.stops.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.0.running.load(Ordering::Relaxed)
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> ManualClockHandle {
        ManualClockHandle(Arc::clone(&self.state))
    }

    /// Number of countdowns started so far.
    pub fn starts(&self) -> u32 {
        self.state.starts.load(Ordering::Relaxed)
    }

    fn set_active(&mut self, active: Option<Countdown>) {
        self.state.running.store(active.is_some(), Ordering::Relaxed);
        self.active = active;
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn start(&mut self, duration_secs: u32) -> Result<(), EngineError> {
        guard_overlap(self.is_running())?;
        self.set_active(Some(Countdown::new(duration_secs)));
        self.state.starts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self) {
        if self.active.is_some() {
            self.state.stops.fetch_add(1, Ordering::Relaxed);
        }
        self.set_active(None);
    }

    fn is_running(&self) -> bool {
        self.active.is_some()
    }

    fn remaining(&self) -> Option<u32> {
        self.active.as_ref().map(Countdown::remaining)
    }

    async fn next_event(&mut self) -> Option<ClockEvent> {
        let countdown = self.active.as_mut()?;
        let event = countdown.elapse_second();
        if countdown.is_expired() {
            self.set_active(None);
        }
        event
    }
}
