//! Time source for the convergence waiter
//!
//! Production code sleeps on the tokio timer. Tests inject `ManualClock`,
//! whose `sleep` advances virtual time instantly so deadline behaviour can be
//! exercised without wall-clock delay.

use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Source of "now" and of delays
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current instant
    fn now(&self) -> Instant;

    /// Suspend the caller for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation backed by `tokio::time`
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
pub(crate) use manual::ManualClock;

#[cfg(test)]
mod manual {
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    use async_trait::async_trait;

    use super::Clock;

    /// Virtual clock: `sleep` returns immediately after advancing time
    pub(crate) struct ManualClock {
        origin: Instant,
        elapsed: Mutex<Duration>,
        sleeps: Mutex<Vec<Duration>>,
    }

    impl ManualClock {
        pub(crate) fn new() -> Self {
            Self {
                origin: Instant::now(),
                elapsed: Mutex::new(Duration::ZERO),
                sleeps: Mutex::new(Vec::new()),
            }
        }

        /// Total virtual time that has passed
        pub(crate) fn elapsed(&self) -> Duration {
            *self.elapsed.lock().expect("mutex should not be poisoned")
        }

        /// Every sleep requested so far, in order
        pub(crate) fn sleeps(&self) -> Vec<Duration> {
            self.sleeps
                .lock()
                .expect("mutex should not be poisoned")
                .clone()
        }
    }

    #[async_trait]
    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            self.origin + self.elapsed()
        }

        async fn sleep(&self, duration: Duration) {
            *self.elapsed.lock().expect("mutex should not be poisoned") += duration;
            self.sleeps
                .lock()
                .expect("mutex should not be poisoned")
                .push(duration);
        }
    }
}
