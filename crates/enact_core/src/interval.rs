//! Periodic timer streams.

use std::{
    cell::Cell,
    pin::Pin,
    task::{ready, Context, Poll},
    time::Duration,
};

use futures::Stream;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::error::EnactError;

thread_local! {
    static ACTIVE_TIMERS: Cell<usize> = const { Cell::new(0) };
}

/// Number of live [`Interval`] streams on this thread.
pub fn active_timers() -> usize {
    ACTIVE_TIMERS.with(Cell::get)
}

/// Emits a clone of `payload` every `period`, the first one a full period
/// after the call. The timer stops as soon as the stream is dropped.
pub fn interval<P: Clone>(period: Duration, payload: P) -> Result<Interval<P>, EnactError> {
    if period.is_zero() {
        return Err(EnactError::ZeroPeriod);
    }
    let mut ticks = time::interval_at(Instant::now() + period, period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ACTIVE_TIMERS.with(|count| count.set(count.get() + 1));
    debug!(period_ms = period.as_millis() as u64, "timer started");
    Ok(Interval { ticks, payload })
}

pub struct Interval<P> {
    ticks: time::Interval,
    payload: P,
}

impl<P> Interval<P> {
    pub fn period(&self) -> Duration {
        self.ticks.period()
    }
}

// The payload is never pinned.
impl<P> Unpin for Interval<P> {}

impl<P: Clone> Stream for Interval<P> {
    type Item = P;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<P>> {
        let this = self.get_mut();
        ready!(this.ticks.poll_tick(cx));
        Poll::Ready(Some(this.payload.clone()))
    }
}

impl<P> Drop for Interval<P> {
    fn drop(&mut self) {
        ACTIVE_TIMERS.with(|count| count.set(count.get().saturating_sub(1)));
        debug!(period_ms = self.ticks.period().as_millis() as u64, "timer stopped");
    }
}

#[cfg(test)]
#[path = "tests/interval_tests.rs"]
mod tests;
