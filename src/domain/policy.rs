//! Admission policies for the rate gate.
//!
//! A policy owns the window bookkeeping (window start and admission count)
//! and decides, for a given instant, whether one more call may go out.
//! Policies never read the clock and never block; locking, waiting and
//! wake-ups live in [`RateGate`](crate::RateGate).

use std::collections::VecDeque;
use std::fmt::Debug;
use std::time::{Duration, Instant};

use crate::domain::config::{validate, ConfigError, WindowMode};

/// Record of one granted admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Admission {
    /// Sequence number of the window the admission was counted in.
    ///
    /// The first window is `0`. For sliding windows this is the release
    /// generation rather than a fixed window index.
    pub window: u64,
    /// Admissions counted in that window, including this one (1-based).
    pub position: u32,
}

/// Decision made by an admission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// A slot was reserved for the caller.
    Admit(Admission),
    /// The window is full; capacity is released after at most this long.
    Wait(Duration),
}

impl PolicyDecision {
    /// Check if this decision is Admit.
    pub fn is_admit(&self) -> bool {
        matches!(self, PolicyDecision::Admit(_))
    }

    /// Check if this decision is Wait.
    pub fn is_wait(&self) -> bool {
        matches!(self, PolicyDecision::Wait(_))
    }

    /// The admission, if one was granted.
    pub fn admission(&self) -> Option<Admission> {
        match self {
            PolicyDecision::Admit(admission) => Some(*admission),
            PolicyDecision::Wait(_) => None,
        }
    }
}

/// Trait for window accounting strategies.
///
/// Implementations are driven under the gate's lock, so they only need to be
/// `Send`. Every method receives the current instant from the gate's clock.
pub trait AdmissionPolicy: Send + Debug {
    /// Start a fresh, empty window at `now`.
    fn reset(&mut self, now: Instant);

    /// Refresh the window for `now`, then reserve a slot or report how long
    /// until capacity is released.
    fn register(&mut self, now: Instant) -> PolicyDecision;

    /// Admissions that count toward the limit at `now`.
    fn current(&self, now: Instant) -> u32;

    /// How long until a slot frees up at `now` (`Duration::ZERO` when one is
    /// available).
    fn retry_after(&self, now: Instant) -> Duration;

    /// Counter bumped every time capacity is released.
    ///
    /// The gate compares it before and after [`register`](Self::register)
    /// to know when blocked callers should re-check.
    fn generation(&self) -> u64;

    /// Maximum admissions per window.
    fn limit(&self) -> u32;

    /// Length of one window.
    fn window(&self) -> Duration;
}

/// Fixed-window policy.
///
/// Counts admissions from a moving reset point. The first call made at
/// least `window` after the reset point starts a new window at that call's
/// instant and resets the count to zero.
///
/// # Example
/// ```
/// use rate_gate::{AdmissionPolicy, FixedWindowPolicy};
/// use std::time::{Duration, Instant};
///
/// let mut policy = FixedWindowPolicy::new(2, Duration::from_secs(1)).unwrap();
/// let now = Instant::now();
/// policy.reset(now);
///
/// assert!(policy.register(now).is_admit());
/// assert!(policy.register(now).is_admit());
/// assert!(policy.register(now).is_wait());
///
/// let next = now + Duration::from_secs(1);
/// let admission = policy.register(next).admission().unwrap();
/// assert_eq!((admission.window, admission.position), (1, 1));
/// ```
#[derive(Debug, Clone)]
pub struct FixedWindowPolicy {
    limit: u32,
    window: Duration,
    window_start: Option<Instant>,
    count: u32,
    generation: u64,
}

impl FixedWindowPolicy {
    /// Create a fixed-window policy.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if `limit` or `window` is zero.
    pub fn new(limit: u32, window: Duration) -> Result<Self, ConfigError> {
        validate(limit, window)?;
        Ok(Self::unchecked(limit, window))
    }

    pub(crate) fn unchecked(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            window_start: None,
            count: 0,
            generation: 0,
        }
    }

    /// Beginning of the current window, if one has started.
    pub fn window_start(&self) -> Option<Instant> {
        self.window_start
    }

    fn expired(&self, start: Instant, now: Instant) -> bool {
        now.saturating_duration_since(start) >= self.window
    }

    /// Advance the window if it has expired. Returns the window start in
    /// effect for `now`.
    fn roll_over(&mut self, now: Instant) -> Instant {
        match self.window_start {
            Some(start) if !self.expired(start, now) => start,
            Some(_) => {
                self.window_start = Some(now);
                self.count = 0;
                self.generation += 1;
                now
            }
            None => {
                self.window_start = Some(now);
                now
            }
        }
    }
}

impl AdmissionPolicy for FixedWindowPolicy {
    fn reset(&mut self, now: Instant) {
        if self.window_start.replace(now).is_some() {
            self.generation += 1;
        }
        self.count = 0;
    }

    fn register(&mut self, now: Instant) -> PolicyDecision {
        let start = self.roll_over(now);

        if self.count < self.limit {
            self.count += 1;
            PolicyDecision::Admit(Admission {
                window: self.generation,
                position: self.count,
            })
        } else {
            PolicyDecision::Wait(self.window - now.saturating_duration_since(start))
        }
    }

    fn current(&self, now: Instant) -> u32 {
        match self.window_start {
            Some(start) if !self.expired(start, now) => self.count,
            _ => 0,
        }
    }

    fn retry_after(&self, now: Instant) -> Duration {
        match self.window_start {
            Some(start) if self.current(now) >= self.limit => {
                self.window - now.saturating_duration_since(start)
            }
            _ => Duration::ZERO,
        }
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn limit(&self) -> u32 {
        self.limit
    }

    fn window(&self) -> Duration {
        self.window
    }
}

/// Sliding-window policy.
///
/// Keeps the instant of every admission still inside the window, so no
/// half-open interval of length `window` ever holds more than `limit`
/// admissions. Costs one `Instant` per slot.
#[derive(Debug, Clone)]
pub struct SlidingWindowPolicy {
    limit: u32,
    window: Duration,
    admitted: VecDeque<Instant>,
    generation: u64,
}

impl SlidingWindowPolicy {
    /// Create a sliding-window policy.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if `limit` or `window` is zero.
    pub fn new(limit: u32, window: Duration) -> Result<Self, ConfigError> {
        validate(limit, window)?;
        Ok(Self::unchecked(limit, window))
    }

    pub(crate) fn unchecked(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            admitted: VecDeque::new(),
            generation: 0,
        }
    }

    fn is_live(&self, admitted_at: Instant, now: Instant) -> bool {
        now.saturating_duration_since(admitted_at) < self.window
    }

    /// Drop admissions that left the window.
    fn expire(&mut self, now: Instant) {
        let before = self.admitted.len();
        while let Some(&oldest) = self.admitted.front() {
            if self.is_live(oldest, now) {
                break;
            }
            self.admitted.pop_front();
        }
        if self.admitted.len() != before {
            self.generation += 1;
        }
    }
}

impl AdmissionPolicy for SlidingWindowPolicy {
    fn reset(&mut self, _now: Instant) {
        if !self.admitted.is_empty() {
            self.admitted.clear();
            self.generation += 1;
        }
    }

    fn register(&mut self, now: Instant) -> PolicyDecision {
        self.expire(now);

        if (self.admitted.len() as u32) < self.limit {
            self.admitted.push_back(now);
            PolicyDecision::Admit(Admission {
                window: self.generation,
                position: self.admitted.len() as u32,
            })
        } else {
            PolicyDecision::Wait(self.retry_after(now))
        }
    }

    fn current(&self, now: Instant) -> u32 {
        self.admitted
            .iter()
            .filter(|&&at| self.is_live(at, now))
            .count() as u32
    }

    fn retry_after(&self, now: Instant) -> Duration {
        if self.current(now) < self.limit {
            return Duration::ZERO;
        }
        self.admitted
            .iter()
            .find(|&&at| self.is_live(at, now))
            .map_or(Duration::ZERO, |&oldest| {
                self.window - now.saturating_duration_since(oldest)
            })
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn limit(&self) -> u32 {
        self.limit
    }

    fn window(&self) -> Duration {
        self.window
    }
}

/// Convenience enum over the built-in policies.
#[derive(Debug, Clone)]
pub enum Policy {
    /// Fixed window counted from a moving reset point (default)
    FixedWindow(FixedWindowPolicy),
    /// Sliding log of admission instants
    SlidingWindow(SlidingWindowPolicy),
}

impl Policy {
    /// Create a fixed-window policy.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if `limit` or `window` is zero.
    pub fn fixed_window(limit: u32, window: Duration) -> Result<Self, ConfigError> {
        FixedWindowPolicy::new(limit, window).map(Policy::FixedWindow)
    }

    /// Create a sliding-window policy.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if `limit` or `window` is zero.
    pub fn sliding_window(limit: u32, window: Duration) -> Result<Self, ConfigError> {
        SlidingWindowPolicy::new(limit, window).map(Policy::SlidingWindow)
    }

    pub(crate) fn unchecked(mode: WindowMode, limit: u32, window: Duration) -> Self {
        match mode {
            WindowMode::Fixed => Policy::FixedWindow(FixedWindowPolicy::unchecked(limit, window)),
            WindowMode::Sliding => {
                Policy::SlidingWindow(SlidingWindowPolicy::unchecked(limit, window))
            }
        }
    }

    /// The window mode this policy implements.
    pub fn mode(&self) -> WindowMode {
        match self {
            Policy::FixedWindow(_) => WindowMode::Fixed,
            Policy::SlidingWindow(_) => WindowMode::Sliding,
        }
    }
}

impl AdmissionPolicy for Policy {
    fn reset(&mut self, now: Instant) {
        match self {
            Policy::FixedWindow(p) => p.reset(now),
            Policy::SlidingWindow(p) => p.reset(now),
        }
    }

    fn register(&mut self, now: Instant) -> PolicyDecision {
        match self {
            Policy::FixedWindow(p) => p.register(now),
            Policy::SlidingWindow(p) => p.register(now),
        }
    }

    fn current(&self, now: Instant) -> u32 {
        match self {
            Policy::FixedWindow(p) => p.current(now),
            Policy::SlidingWindow(p) => p.current(now),
        }
    }

    fn retry_after(&self, now: Instant) -> Duration {
        match self {
            Policy::FixedWindow(p) => p.retry_after(now),
            Policy::SlidingWindow(p) => p.retry_after(now),
        }
    }

    fn generation(&self) -> u64 {
        match self {
            Policy::FixedWindow(p) => p.generation(),
            Policy::SlidingWindow(p) => p.generation(),
        }
    }

    fn limit(&self) -> u32 {
        match self {
            Policy::FixedWindow(p) => p.limit(),
            Policy::SlidingWindow(p) => p.limit(),
        }
    }

    fn window(&self) -> Duration {
        match self {
            Policy::FixedWindow(p) => p.window(),
            Policy::SlidingWindow(p) => p.window(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    fn fixed(limit: u32, window: Duration, now: Instant) -> FixedWindowPolicy {
        let mut policy = FixedWindowPolicy::new(limit, window).unwrap();
        policy.reset(now);
        policy
    }

    #[test]
    fn test_fixed_window_admits_up_to_limit() {
        let now = Instant::now();
        let mut policy = fixed(3, SECOND, now);

        for position in 1..=3 {
            assert_eq!(
                policy.register(now),
                PolicyDecision::Admit(Admission {
                    window: 0,
                    position
                })
            );
        }
        assert_eq!(policy.register(now), PolicyDecision::Wait(SECOND));
        assert_eq!(policy.current(now), 3);
    }

    #[test]
    fn test_fixed_window_wait_is_remaining_time() {
        let now = Instant::now();
        let mut policy = fixed(1, SECOND, now);

        assert!(policy.register(now).is_admit());
        let later = now + Duration::from_millis(100);
        assert_eq!(
            policy.register(later),
            PolicyDecision::Wait(Duration::from_millis(900))
        );
        assert_eq!(policy.retry_after(later), Duration::from_millis(900));
    }

    #[test]
    fn test_fixed_window_rolls_over_at_boundary() {
        let now = Instant::now();
        let mut policy = fixed(6, SECOND, now);

        for _ in 0..6 {
            assert!(policy.register(now).is_admit());
        }
        assert!(policy.register(now + Duration::from_millis(100)).is_wait());

        // Exactly one window later counts as expired
        let next = now + SECOND;
        assert_eq!(
            policy.register(next),
            PolicyDecision::Admit(Admission {
                window: 1,
                position: 1
            })
        );
        assert_eq!(policy.window_start(), Some(next));
        assert_eq!(policy.generation(), 1);
    }

    #[test]
    fn test_fixed_window_start_moves_to_first_late_call() {
        let now = Instant::now();
        let mut policy = fixed(1, SECOND, now);
        assert!(policy.register(now).is_admit());

        // A call long after expiry opens a window at its own instant
        let late = now + Duration::from_millis(2500);
        assert!(policy.register(late).is_admit());
        assert_eq!(policy.window_start(), Some(late));

        let wait = policy.register(late + Duration::from_millis(400));
        assert_eq!(wait, PolicyDecision::Wait(Duration::from_millis(600)));
    }

    #[test]
    fn test_fixed_window_never_moves_backward() {
        let now = Instant::now() + SECOND;
        let mut policy = fixed(1, SECOND, now);
        assert!(policy.register(now).is_admit());

        // An earlier instant is treated as zero elapsed time
        let earlier = now - Duration::from_millis(500);
        assert_eq!(policy.register(earlier), PolicyDecision::Wait(SECOND));
        assert_eq!(policy.window_start(), Some(now));
        assert_eq!(policy.generation(), 0);
    }

    #[test]
    fn test_fixed_window_count_only_resets_on_advance() {
        let now = Instant::now();
        let mut policy = fixed(2, SECOND, now);
        assert!(policy.register(now).is_admit());

        let mid = now + Duration::from_millis(999);
        assert_eq!(
            policy.register(mid).admission().map(|a| a.position),
            Some(2)
        );
        assert_eq!(policy.generation(), 0);
    }

    #[test]
    fn test_fixed_window_current_reports_zero_after_expiry() {
        let now = Instant::now();
        let mut policy = fixed(2, SECOND, now);
        policy.register(now);
        policy.register(now);

        assert_eq!(policy.current(now + SECOND), 0);
        assert_eq!(policy.retry_after(now + SECOND), Duration::ZERO);
        // Observing does not roll the window
        assert_eq!(policy.generation(), 0);
    }

    #[test]
    fn test_fixed_window_without_reset_starts_on_first_call() {
        let mut policy = FixedWindowPolicy::new(1, SECOND).unwrap();
        let now = Instant::now();

        assert_eq!(policy.window_start(), None);
        assert_eq!(policy.current(now), 0);
        assert!(policy.register(now).is_admit());
        assert_eq!(policy.window_start(), Some(now));
    }

    #[test]
    fn test_fixed_window_rejects_invalid_config() {
        assert_eq!(
            FixedWindowPolicy::new(0, SECOND).unwrap_err(),
            ConfigError::ZeroRequestLimit
        );
        assert_eq!(
            FixedWindowPolicy::new(1, Duration::ZERO).unwrap_err(),
            ConfigError::ZeroWindow
        );
    }

    #[test]
    fn test_sliding_window_admits_up_to_limit() {
        let now = Instant::now();
        let mut policy = SlidingWindowPolicy::new(2, SECOND).unwrap();
        policy.reset(now);

        assert!(policy.register(now).is_admit());
        assert!(policy
            .register(now + Duration::from_millis(400))
            .is_admit());
        assert_eq!(
            policy.register(now + Duration::from_millis(500)),
            PolicyDecision::Wait(Duration::from_millis(500))
        );

        // Only the first admission has left the window
        let next = now + SECOND;
        assert!(policy.register(next).is_admit());
        assert_eq!(
            policy.register(next),
            PolicyDecision::Wait(Duration::from_millis(400))
        );
    }

    #[test]
    fn test_sliding_window_reset_clears_log() {
        let now = Instant::now();
        let mut policy = SlidingWindowPolicy::new(1, SECOND).unwrap();
        assert!(policy.register(now).is_admit());
        assert!(policy.register(now).is_wait());

        policy.reset(now);
        assert_eq!(policy.generation(), 1);
        assert!(policy.register(now).is_admit());
    }

    #[test]
    fn test_sliding_window_bounds_every_interval() {
        // Deterministic pseudo-random arrival gaps between 0 and 63 ms
        let limit = 4;
        let window = Duration::from_millis(200);
        let start = Instant::now();
        let mut policy = SlidingWindowPolicy::new(limit, window).unwrap();
        policy.reset(start);

        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut now = start;
        let mut admitted = Vec::new();
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            now += Duration::from_millis(seed % 64);
            if policy.register(now).is_admit() {
                admitted.push(now);
            }
        }

        assert!(admitted.len() > limit as usize);
        for (i, &from) in admitted.iter().enumerate() {
            let in_window = admitted[i..]
                .iter()
                .take_while(|&&at| at.duration_since(from) < window)
                .count();
            assert!(in_window <= limit as usize, "interval starting at #{i} holds {in_window}");
        }
    }

    #[test]
    fn test_policy_enum_dispatch() {
        let now = Instant::now();
        let mut policy = Policy::fixed_window(1, SECOND).unwrap();
        policy.reset(now);
        assert_eq!(policy.mode(), WindowMode::Fixed);
        assert!(policy.register(now).is_admit());
        assert!(policy.register(now).is_wait());
        assert_eq!(policy.limit(), 1);
        assert_eq!(policy.window(), SECOND);

        let policy = Policy::sliding_window(3, SECOND).unwrap();
        assert_eq!(policy.mode(), WindowMode::Sliding);
        assert!(Policy::sliding_window(0, SECOND).is_err());
    }

    #[test]
    fn test_decision_helpers() {
        let admit = PolicyDecision::Admit(Admission {
            window: 2,
            position: 1,
        });
        assert!(admit.is_admit());
        assert_eq!(admit.admission().map(|a| a.window), Some(2));

        let wait = PolicyDecision::Wait(SECOND);
        assert!(wait.is_wait());
        assert_eq!(wait.admission(), None);
    }
}
