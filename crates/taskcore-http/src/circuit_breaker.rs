//! A lock-free circuit breaker, adapted from the teacher's
//! `riptide-reliability::circuit_breaker`: atomics and a semaphore rather
//! than a mutex, three states (Closed/Open/HalfOpen), testable via a
//! [`Clock`] seam.

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering::Relaxed};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl From<u8> for State {
    fn from(v: u8) -> Self {
        match v {
            1 => State::Open,
            2 => State::HalfOpen,
            _ => State::Closed,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub failure_threshold: u32,
    pub open_cooldown_ms: u64,
    pub half_open_max_in_flight: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            open_cooldown_ms: 30_000,
            half_open_max_in_flight: 3,
        }
    }
}

pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now_ms(&self) -> u64;
}

#[derive(Default, Debug)]
pub struct RealClock;

impl Clock for RealClock {
    fn now_ms(&self) -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        let duration = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    state: AtomicU8,
    failures: AtomicU32,
    successes: AtomicU32,
    open_until_ms: AtomicU64,
    half_open_permits: Arc<Semaphore>,
    cfg: Config,
    clock: Arc<dyn Clock>,
}

impl CircuitBreaker {
    pub fn new(cfg: Config, clock: Arc<dyn Clock>) -> Self {
        let permit_count = cfg.half_open_max_in_flight as usize;
        Self {
            state: AtomicU8::new(State::Closed as u8),
            failures: AtomicU32::new(0),
            successes: AtomicU32::new(0),
            open_until_ms: AtomicU64::new(0),
            half_open_permits: Arc::new(Semaphore::new(permit_count)),
            cfg,
            clock,
        }
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state.load(Relaxed).into()
    }

    /// `Ok(permit)` if the call may proceed (`permit` is `Some` only in
    /// HalfOpen, where it gates concurrency); `Err` short-circuits.
    pub fn try_acquire(&self) -> Result<Option<OwnedSemaphorePermit>, &'static str> {
        match self.state() {
            State::Closed => Ok(None),
            State::Open => {
                let now = self.clock.now_ms();
                if now >= self.open_until_ms.load(Relaxed) {
                    self.state.store(State::HalfOpen as u8, Relaxed);
                    self.try_acquire()
                } else {
                    Err("circuit open")
                }
            }
            State::HalfOpen => match Arc::clone(&self.half_open_permits).try_acquire_owned() {
                Ok(permit) => Ok(Some(permit)),
                Err(_) => Err("half-open saturated"),
            },
        }
    }

    #[inline]
    pub fn on_success(&self) {
        match self.state() {
            State::Closed => {
                self.failures.store(0, Relaxed);
            }
            State::HalfOpen => {
                self.state.store(State::Closed as u8, Relaxed);
                self.failures.store(0, Relaxed);
                self.successes.store(0, Relaxed);
                let deficit = (self.cfg.half_open_max_in_flight as usize).saturating_sub(self.half_open_permits.available_permits());
                if deficit > 0 {
                    self.half_open_permits.add_permits(deficit);
                }
            }
            State::Open => {}
        }
    }

    #[inline]
    pub fn on_failure(&self) {
        match self.state() {
            State::Closed => {
                if self.failures.fetch_add(1, Relaxed) + 1 >= self.cfg.failure_threshold {
                    self.trip_open();
                }
            }
            State::HalfOpen => self.trip_open(),
            State::Open => {}
        }
    }

    fn trip_open(&self) {
        self.state.store(State::Open as u8, Relaxed);
        self.successes.store(0, Relaxed);
        self.failures.store(0, Relaxed);
        self.open_until_ms.store(self.clock.now_ms() + self.cfg.open_cooldown_ms, Relaxed);
        let def = self.cfg.half_open_max_in_flight as usize;
        let avail = self.half_open_permits.available_permits();
        if avail < def {
            self.half_open_permits.add_permits(def - avail);
        }
    }
}
