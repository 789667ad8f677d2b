//! Bounded-wait convergence on an observed phase
//!
//! `PhaseWaiter` repeatedly polls an object, classifies the returned phase
//! against target / pending / failure sets, and resolves to one of three
//! outcomes: converged, diverged (phase left the accepted sets), or deadline
//! exceeded. A poll error ends the wait immediately and is returned as-is.
//!
//! The waiter only observes. Dropping the future abandons the wait without
//! touching the cluster. Phases are re-read on every poll and never assumed
//! to progress monotonically.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, info, warn};

use volclaim_common::Error;

use crate::clock::Clock;

/// Default delay between polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Default cap on the delay between polls when backing off
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Floor for every delay between polls
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Delay schedule between polls
#[derive(Clone, Debug, PartialEq)]
pub struct PollCadence {
    /// Delay after the first poll
    pub interval: Duration,
    /// Upper bound for the delay
    pub max_interval: Duration,
    /// Growth factor per poll; 1.0 keeps the interval fixed
    pub multiplier: f64,
}

impl Default for PollCadence {
    fn default() -> Self {
        Self::fixed(DEFAULT_POLL_INTERVAL)
    }
}

impl PollCadence {
    /// Poll on a fixed interval, never shorter than `MIN_POLL_INTERVAL`
    pub fn fixed(interval: Duration) -> Self {
        let interval = interval.max(MIN_POLL_INTERVAL);
        Self {
            interval,
            max_interval: interval,
            multiplier: 1.0,
        }
    }

    /// Poll with exponential backoff, capped at `max_interval`
    pub fn backoff(interval: Duration, max_interval: Duration, multiplier: f64) -> Self {
        let interval = interval.max(MIN_POLL_INTERVAL);
        Self {
            interval,
            max_interval: max_interval.max(interval),
            multiplier: multiplier.max(1.0),
        }
    }

    /// Delay before the first repeat poll
    pub fn first(&self) -> Duration {
        self.interval.max(MIN_POLL_INTERVAL)
    }

    /// Delay to use after `current`
    pub fn next(&self, current: Duration) -> Duration {
        Duration::from_secs_f64(
            (current.as_secs_f64() * self.multiplier).min(self.max_interval.as_secs_f64()),
        )
        .max(MIN_POLL_INTERVAL)
    }
}

/// How an observed phase relates to the wait
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Phase is a target; stop and succeed
    Converged,
    /// Phase is acceptable while waiting; keep polling
    Pending,
    /// Phase is a declared terminal failure
    Failed,
    /// Phase is in no configured set
    Unexpected,
}

/// Outcome of a wait that did not hit a poll error
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution<T, P> {
    /// A target phase was observed
    Converged(T),
    /// The phase left the pending/target sets
    Diverged {
        /// Observation carrying the offending phase
        observation: T,
        /// The offending phase
        phase: P,
        /// True when the phase was in the declared failure set
        declared: bool,
    },
    /// The deadline elapsed while the phase was still pending
    DeadlineExceeded {
        /// Last observation made before the deadline
        observation: Option<T>,
        /// Phase of that observation
        last_phase: Option<P>,
    },
}

impl<T, P> Resolution<T, P> {
    /// Latest observation, whatever the outcome
    pub fn observation(&self) -> Option<&T> {
        match self {
            Resolution::Converged(observation) | Resolution::Diverged { observation, .. } => {
                Some(observation)
            }
            Resolution::DeadlineExceeded { observation, .. } => observation.as_ref(),
        }
    }
}

/// Waits for an observed phase to reach a target set
#[derive(Clone, Debug)]
pub struct PhaseWaiter<P> {
    target: Vec<P>,
    pending: Vec<P>,
    failure: Vec<P>,
    timeout: Duration,
    cadence: PollCadence,
}

impl<P> PhaseWaiter<P>
where
    P: PartialEq + Clone + fmt::Display + Send,
{
    /// Waiter accepting `target` as success and `pending` as in-progress
    pub fn new(
        target: impl IntoIterator<Item = P>,
        pending: impl IntoIterator<Item = P>,
        timeout: Duration,
    ) -> Self {
        Self {
            target: target.into_iter().collect(),
            pending: pending.into_iter().collect(),
            failure: Vec::new(),
            timeout,
            cadence: PollCadence::default(),
        }
    }

    /// Declare phases that are known terminal failures
    pub fn with_failure(mut self, failure: impl IntoIterator<Item = P>) -> Self {
        self.failure = failure.into_iter().collect();
        self
    }

    /// Override the poll cadence
    pub fn with_cadence(mut self, cadence: PollCadence) -> Self {
        self.cadence = cadence;
        self
    }

    /// Configured deadline
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Target phases joined for messages
    pub fn target_display(&self) -> String {
        self.target
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Classify a phase
    pub fn classify(&self, phase: &P) -> Classification {
        if self.target.contains(phase) {
            Classification::Converged
        } else if self.failure.contains(phase) {
            Classification::Failed
        } else if self.pending.contains(phase) {
            Classification::Pending
        } else {
            Classification::Unexpected
        }
    }

    /// Poll until the phase converges, diverges, or the deadline passes
    ///
    /// `poll` is always invoked at least once. Sleeps are clipped to the time
    /// remaining, so the final poll happens at the deadline. A timeout too
    /// large to represent as an instant means no deadline.
    pub async fn wait<T, F, Fut>(&self, clock: &dyn Clock, mut poll: F) -> Result<Resolution<T, P>, Error>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(T, P), Error>>,
    {
        let deadline = clock.now().checked_add(self.timeout);
        let mut interval = self.cadence.first();
        let mut attempt = 0u32;
        let mut last: Option<(T, P)> = None;

        loop {
            attempt += 1;
            let (observation, phase) = poll().await?;

            match self.classify(&phase) {
                Classification::Converged => {
                    info!(attempt, phase = %phase, "target phase reached");
                    return Ok(Resolution::Converged(observation));
                }
                class @ (Classification::Failed | Classification::Unexpected) => {
                    warn!(
                        attempt,
                        phase = %phase,
                        target = %self.target_display(),
                        "phase left the accepted set"
                    );
                    return Ok(Resolution::Diverged {
                        observation,
                        phase,
                        declared: class == Classification::Failed,
                    });
                }
                Classification::Pending => {
                    debug!(attempt, phase = %phase, "still pending");
                    last = Some((observation, phase));
                }
            }

            let now = clock.now();
            let remaining = deadline.map(|d| d.saturating_duration_since(now));
            if remaining == Some(Duration::ZERO) {
                let (observation, last_phase) = match last {
                    Some((o, p)) => (Some(o), Some(p)),
                    None => (None, None),
                };
                warn!(
                    attempt,
                    timeout = ?self.timeout,
                    last_phase = %last_phase.as_ref().map(ToString::to_string).unwrap_or_default(),
                    "deadline exceeded while waiting"
                );
                return Ok(Resolution::DeadlineExceeded {
                    observation,
                    last_phase,
                });
            }

            clock
                .sleep(remaining.map_or(interval, |r| interval.min(r)))
                .await;
            interval = self.cadence.next(interval);
        }
    }

    /// Map a resolution onto the error taxonomy
    pub fn into_result<T>(&self, resolution: Resolution<T, P>) -> Result<T, Error> {
        match resolution {
            Resolution::Converged(observation) => Ok(observation),
            Resolution::Diverged { phase, .. } => Err(Error::ConvergenceFailed {
                target: self.target_display(),
                phase: phase.to_string(),
            }),
            Resolution::DeadlineExceeded { last_phase, .. } => Err(Error::ConvergenceTimeout {
                target: self.target_display(),
                last_phase: last_phase.map(|p| p.to_string()),
                timeout: self.timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use crate::clock::ManualClock;
    use crate::state::ClaimPhase;

    fn bound_waiter(timeout: Duration) -> PhaseWaiter<ClaimPhase> {
        PhaseWaiter::new([ClaimPhase::Bound], [ClaimPhase::Pending], timeout)
    }

    /// Poll function that replays `phases`, numbering observations from 1
    struct Script {
        phases: Mutex<VecDeque<ClaimPhase>>,
        polls: AtomicU32,
    }

    impl Script {
        fn new(phases: Vec<ClaimPhase>) -> Self {
            Self {
                phases: Mutex::new(phases.into()),
                polls: AtomicU32::new(0),
            }
        }

        fn repeating(phase: ClaimPhase, count: usize) -> Self {
            Self::new(vec![phase; count])
        }

        async fn poll(&self) -> Result<(u32, ClaimPhase), Error> {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            let phase = self
                .phases
                .lock()
                .expect("mutex should not be poisoned")
                .pop_front()
                .ok_or_else(|| Error::internal("script exhausted"))?;
            Ok((n, phase))
        }

        fn polls(&self) -> u32 {
            self.polls.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_converges_on_third_poll() {
        let clock = ManualClock::new();
        let script = Script::new(vec![
            ClaimPhase::Pending,
            ClaimPhase::Pending,
            ClaimPhase::Bound,
        ]);

        let resolution = bound_waiter(Duration::from_secs(300))
            .wait(&clock, || script.poll())
            .await
            .expect("poll should not fail");

        assert_eq!(resolution, Resolution::Converged(3));
        assert_eq!(script.polls(), 3);
        assert_eq!(clock.sleeps(), vec![DEFAULT_POLL_INTERVAL; 2]);
    }

    #[tokio::test]
    async fn test_deadline_exceeded_carries_last_pending_phase() {
        let clock = ManualClock::new();
        let script = Script::repeating(ClaimPhase::Pending, 100);
        let waiter = bound_waiter(Duration::from_secs(10));

        let resolution = waiter
            .wait(&clock, || script.poll())
            .await
            .expect("poll should not fail");

        match &resolution {
            Resolution::DeadlineExceeded {
                observation,
                last_phase,
            } => {
                assert_eq!(last_phase.as_ref(), Some(&ClaimPhase::Pending));
                assert_eq!(*observation, Some(script.polls()));
            }
            other => panic!("Expected DeadlineExceeded, got {other:?}"),
        }
        // Polls at 0s, 3s, 6s, 9s and a final one at the 10s deadline.
        assert_eq!(script.polls(), 5);
        assert_eq!(clock.elapsed(), Duration::from_secs(10));
        assert_eq!(clock.sleeps().last(), Some(&Duration::from_secs(1)));

        match waiter.into_result(resolution) {
            Err(Error::ConvergenceTimeout {
                target,
                last_phase,
                timeout,
            }) => {
                assert_eq!(target, "Bound");
                assert_eq!(last_phase.as_deref(), Some("Pending"));
                assert_eq!(timeout, Duration::from_secs(10));
            }
            other => panic!("Expected ConvergenceTimeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unexpected_phase_fails_without_waiting() {
        let clock = ManualClock::new();
        let script = Script::new(vec![ClaimPhase::Lost]);
        let waiter = bound_waiter(Duration::from_secs(300));

        let resolution = waiter
            .wait(&clock, || script.poll())
            .await
            .expect("poll should not fail");

        assert_eq!(
            resolution,
            Resolution::Diverged {
                observation: 1,
                phase: ClaimPhase::Lost,
                declared: false,
            }
        );
        assert!(clock.sleeps().is_empty());
        assert_eq!(clock.elapsed(), Duration::ZERO);

        match waiter.into_result(resolution) {
            Err(Error::ConvergenceFailed { phase, target }) => {
                assert_eq!(phase, "Lost");
                assert_eq!(target, "Bound");
            }
            other => panic!("Expected ConvergenceFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_declared_failure_phase_is_flagged() {
        let clock = ManualClock::new();
        let script = Script::new(vec![ClaimPhase::Pending, ClaimPhase::Lost]);
        let waiter = bound_waiter(Duration::from_secs(300)).with_failure([ClaimPhase::Lost]);

        let resolution = waiter
            .wait(&clock, || script.poll())
            .await
            .expect("poll should not fail");

        assert!(matches!(
            resolution,
            Resolution::Diverged { declared: true, observation: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_poll_error_is_propagated() {
        let clock = ManualClock::new();
        let script = Script::new(vec![ClaimPhase::Pending]);

        let err = bound_waiter(Duration::from_secs(300))
            .wait(&clock, || script.poll())
            .await
            .expect_err("second poll runs out of script");

        assert!(matches!(err, Error::Internal { .. }));
        assert_eq!(script.polls(), 2);
    }

    #[tokio::test]
    async fn test_zero_timeout_still_polls_once() {
        let clock = ManualClock::new();
        let script = Script::repeating(ClaimPhase::Pending, 5);

        let resolution = bound_waiter(Duration::ZERO)
            .wait(&clock, || script.poll())
            .await
            .expect("poll should not fail");

        assert!(matches!(resolution, Resolution::DeadlineExceeded { .. }));
        assert_eq!(script.polls(), 1);
    }

    #[tokio::test]
    async fn test_tolerates_repeated_pending_after_other_states() {
        let clock = ManualClock::new();
        let script = Script::new(vec![
            ClaimPhase::Pending,
            ClaimPhase::Other("Resizing".to_string()),
            ClaimPhase::Pending,
            ClaimPhase::Bound,
        ]);
        let waiter = PhaseWaiter::new(
            [ClaimPhase::Bound],
            [ClaimPhase::Pending, ClaimPhase::Other("Resizing".to_string())],
            Duration::from_secs(300),
        );

        let resolution = waiter
            .wait(&clock, || script.poll())
            .await
            .expect("poll should not fail");
        assert_eq!(resolution, Resolution::Converged(4));
    }

    #[tokio::test]
    async fn test_backoff_cadence_grows_and_caps() {
        let clock = ManualClock::new();
        let script = Script::repeating(ClaimPhase::Pending, 100);
        let waiter = bound_waiter(Duration::from_secs(40)).with_cadence(PollCadence::backoff(
            Duration::from_secs(1),
            Duration::from_secs(10),
            2.0,
        ));

        waiter
            .wait(&clock, || script.poll())
            .await
            .expect("poll should not fail");

        let secs: Vec<u64> = clock.sleeps().iter().map(Duration::as_secs).collect();
        assert_eq!(secs, vec![1, 2, 4, 8, 10, 10, 5]);
    }

    #[test]
    fn test_classification() {
        let waiter = bound_waiter(Duration::from_secs(1)).with_failure([ClaimPhase::Lost]);
        assert_eq!(waiter.classify(&ClaimPhase::Bound), Classification::Converged);
        assert_eq!(waiter.classify(&ClaimPhase::Pending), Classification::Pending);
        assert_eq!(waiter.classify(&ClaimPhase::Lost), Classification::Failed);
        assert_eq!(
            waiter.classify(&ClaimPhase::Other("Weird".to_string())),
            Classification::Unexpected
        );
    }

    #[tokio::test]
    async fn test_unrepresentable_timeout_waits_without_deadline() {
        let clock = ManualClock::new();
        let script = Script::new(vec![
            ClaimPhase::Pending,
            ClaimPhase::Pending,
            ClaimPhase::Pending,
            ClaimPhase::Bound,
        ]);

        let resolution = bound_waiter(Duration::from_secs(u64::MAX))
            .wait(&clock, || script.poll())
            .await
            .expect("poll should not fail");

        assert_eq!(resolution, Resolution::Converged(4));
        assert_eq!(clock.sleeps(), vec![DEFAULT_POLL_INTERVAL; 3]);
    }

    #[tokio::test]
    async fn test_zero_interval_is_floored() {
        let clock = ManualClock::new();
        let script = Script::repeating(ClaimPhase::Pending, 100);
        let waiter =
            bound_waiter(Duration::from_secs(1)).with_cadence(PollCadence::fixed(Duration::ZERO));

        waiter
            .wait(&clock, || script.poll())
            .await
            .expect("poll should not fail");

        assert!(clock.sleeps().iter().all(|d| *d >= MIN_POLL_INTERVAL));
        assert_eq!(script.polls(), 11);
    }

    #[test]
    fn test_cadence_floor_applies_to_every_constructor() {
        assert_eq!(PollCadence::fixed(Duration::ZERO).interval, MIN_POLL_INTERVAL);
        let backoff = PollCadence::backoff(Duration::ZERO, Duration::ZERO, 2.0);
        assert_eq!(backoff.interval, MIN_POLL_INTERVAL);
        assert_eq!(backoff.next(Duration::ZERO), MIN_POLL_INTERVAL);

        let hand_built = PollCadence {
            interval: Duration::ZERO,
            max_interval: Duration::ZERO,
            multiplier: 1.0,
        };
        assert_eq!(hand_built.first(), MIN_POLL_INTERVAL);
    }

    #[test]
    fn test_fixed_cadence_never_grows() {
        let cadence = PollCadence::fixed(Duration::from_secs(3));
        assert_eq!(cadence.next(Duration::from_secs(3)), Duration::from_secs(3));
    }
}
