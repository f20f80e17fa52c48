//! Token-bucket pacing for upstream requests.
//!
//! A [`Pacer`] wraps a `governor` limiter and waits until the next request is
//! allowed. The clock is a type parameter so tests can drive time with
//! [`FakeRelativeClock`] instead of sleeping.

use std::future::Future;
use std::num::NonZeroU32;
use std::pin::Pin;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock, FakeRelativeClock};
use governor::middleware::NoOpMiddleware;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::provider_policy::ProviderPolicy;

/// A `governor` clock that also knows how to wait.
pub trait PacingClock: Clock + Send + Sync {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

impl PacingClock for DefaultClock {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Waiting on the fake clock just moves it forward.
impl PacingClock for FakeRelativeClock {
    fn sleep<'a>(&'a self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        self.advance(duration);
        Box::pin(std::future::ready(()))
    }
}

type DirectRateLimiter<C> =
    RateLimiter<NotKeyed, InMemoryState, C, NoOpMiddleware<<C as Clock>::Instant>>;

pub struct Pacer<C: PacingClock = DefaultClock> {
    limiter: DirectRateLimiter<C>,
    clock: C,
}

impl Pacer<DefaultClock> {
    pub fn new(quota_window: Duration, quota_limit: u32) -> Self {
        Self::with_clock(quota_window, quota_limit, DefaultClock::default())
    }

    pub fn from_policy(policy: &ProviderPolicy) -> Self {
        Self::new(policy.quota_window, policy.quota_limit)
    }
}

impl<C: PacingClock> Pacer<C> {
    pub fn with_clock(quota_window: Duration, quota_limit: u32, clock: C) -> Self {
        let quota = quota_from_window(quota_window, quota_limit);
        Self {
            limiter: RateLimiter::direct_with_clock(quota, &clock),
            clock,
        }
    }

    /// Takes one cell if available, otherwise reports how long to wait.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Waits until a request is allowed and takes the cell. Returns the total
    /// time spent waiting.
    pub async fn until_ready(&self) -> Duration {
        let mut waited = Duration::ZERO;
        loop {
            match self.try_acquire() {
                Ok(()) => return waited,
                Err(wait) => {
                    self.clock.sleep(wait).await;
                    waited += wait;
                }
            }
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }
}

/// Spread `quota_limit` cells evenly over `quota_window`, allowing the whole
/// limit as an initial burst.
fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let safe_limit = quota_limit.max(1);
    let burst = NonZeroU32::new(safe_limit).unwrap_or(NonZeroU32::MIN);

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(safe_limit)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
        .allow_burst(burst)
}
