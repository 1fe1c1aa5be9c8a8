//! # Event subscribers.
//!
//! Supervisor events published on the [`Bus`](crate::events::Bus) are fanned
//! out to every [`Subscribe`] implementation through a [`SubscriberSet`].
//!
//! ```text
//! supervisor loop ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                              ├──► LogWriter
//!                                                              ├──► alerting hook
//!                                                              └──► ...
//! ```
//!
//! [`LogWriter`] is the supervisor's only log output; it is installed by
//! default. Operator alerting for abandoned slots plugs in here as another
//! subscriber watching [`EventKind::SlotAbandoned`](crate::EventKind::SlotAbandoned).
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use clustervisor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct Pager;
//!
//! #[async_trait]
//! impl Subscribe for Pager {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::SlotAbandoned {
//!             // page the on-call
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "pager" }
//! }
//! ```

mod log;
mod set;
mod subscriber;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
