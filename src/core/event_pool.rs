//! Per-thread event pool
//!
//! Each thread owns one reusable [`LogEvent`]. A log call borrows it through
//! a [`PooledEvent`] guard, which resets the event and hands it back when
//! dropped, on every exit path including unwinding.
//!
//! A log call made while the thread's event is already borrowed (a value's
//! `Display` impl that logs, or a sink that logs) gets a freshly allocated
//! event instead, counted as a pool miss.

use super::diagnostic;
use super::log_event::LogEvent;
use super::log_level::LogLevel;
use super::metrics::LoggerMetrics;
use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

struct Slot {
    event: Cell<Option<Box<LogEvent>>>,
    created: Cell<bool>,
}

thread_local! {
    static SLOT: Slot = const {
        Slot {
            event: Cell::new(None),
            created: Cell::new(false),
        }
    };
}

/// Access to the current thread's pooled event
pub struct EventPool;

impl EventPool {
    /// Borrow the thread's event for one log call at `level` on `logger`
    pub fn acquire(level: LogLevel, logger: &Arc<str>, metrics: &LoggerMetrics) -> PooledEvent {
        let (mut event, pooled) = SLOT
            .try_with(|slot| match slot.event.take() {
                Some(event) => (event, true),
                None if !slot.created.get() => {
                    slot.created.set(true);
                    (Box::new(LogEvent::new()), true)
                }
                None => {
                    metrics.record_pool_miss();
                    (Box::new(LogEvent::new()), false)
                }
            })
            // thread teardown: the slot is gone
            .unwrap_or_else(|_| (Box::new(LogEvent::new()), false));

        if !event.is_reset() {
            metrics.record_pool_violation();
            diagnostic::error(format!(
                "Pool invariant violated: event reused without reset (logger '{}')",
                event.logger
            ));
            event.reset();
        }

        event.level = level;
        event.logger = Arc::clone(logger);

        PooledEvent {
            event: Some(event),
            pooled,
            _not_send: PhantomData,
        }
    }

    /// Whether the current thread's event is available (not borrowed)
    pub fn is_available() -> bool {
        SLOT.try_with(|slot| {
            let event = slot.event.take();
            let available = event.is_some() || !slot.created.get();
            slot.event.set(event);
            available
        })
        .unwrap_or(false)
    }
}

/// Scoped borrow of a pooled event
///
/// Not `Send`: the event must return to the thread it came from.
pub struct PooledEvent {
    event: Option<Box<LogEvent>>,
    pooled: bool,
    _not_send: PhantomData<*const ()>,
}

impl PooledEvent {
    pub fn get(&self) -> Option<&LogEvent> {
        self.event.as_deref()
    }

    pub fn get_mut(&mut self) -> Option<&mut LogEvent> {
        self.event.as_deref_mut()
    }

    /// Whether this event came from the thread's slot rather than a fresh allocation
    pub fn is_pooled(&self) -> bool {
        self.pooled
    }
}

impl Drop for PooledEvent {
    fn drop(&mut self) {
        let Some(mut event) = self.event.take() else {
            return;
        };
        if !self.pooled {
            return;
        }
        event.reset();
        let _ = SLOT.try_with(|slot| {
            let previous = slot.event.take();
            slot.event.set(Some(previous.unwrap_or(event)));
        });
    }
}
