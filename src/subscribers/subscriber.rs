//! Subscriber seam for supervisor events.
//!
//! A [`SubscriberSet`](crate::SubscriberSet) gives every subscriber its own
//! task and a bounded FIFO queue sized by [`Subscribe::queue_capacity`].
//! When a queue is full the event is dropped for that subscriber alone and
//! a `SubscriberOverflow` event names it. A panic inside `on_event` is caught
//! and reported as `SubscriberPanicked`; the subscriber keeps receiving.

use async_trait::async_trait;

use crate::events::Event;

/// Receives every event the supervisor publishes, e.g. to page on
/// `SlotAbandoned`. `on_event` runs on the executor, so blocking work
/// belongs in `spawn_blocking`.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event. Calls never overlap for the same subscriber.
    async fn on_event(&self, event: &Event);

    /// Reported as `Event::source` when this subscriber overflows or panics.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Events buffered before drops begin; 0 is treated as 1.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
