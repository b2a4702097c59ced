//! Time source and cancellation for the shard-completion wait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Monotonic clock the window polls against.
pub trait Clock {
    /// Time since an arbitrary fixed origin.
    fn now(&self) -> Duration;
    fn sleep(&mut self, d: Duration);
}

#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&mut self, d: Duration) {
        std::thread::sleep(d);
    }
}

type SleepHook = Box<dyn FnMut(Duration) + Send>;

/// Virtual clock: `sleep` advances time instantly.
///
/// An optional hook runs after every sleep with the new time, which lets a
/// test drop shard files "while" the window waits.
#[derive(Default)]
pub struct ManualClock {
    now: Duration,
    slept: Vec<Duration>,
    hook: Option<SleepHook>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(hook: impl FnMut(Duration) + Send + 'static) -> Self {
        Self {
            hook: Some(Box::new(hook)),
            ..Self::default()
        }
    }

    pub fn advance(&mut self, d: Duration) {
        self.now += d;
    }

    /// Every sleep requested so far.
    pub fn sleeps(&self) -> &[Duration] {
        &self.slept
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now
    }

    fn sleep(&mut self, d: Duration) {
        self.now += d;
        self.slept.push(d);
        if let Some(h) = self.hook.as_mut() {
            h(self.now);
        }
    }
}

/// Shared stop flag; clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Clear a previous cancellation so the window can be advanced again.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}
