//! In-memory buffering and batched background delivery of analytics hits.
//!
//! Producers hand the [`Tracker`] (or a [`RecordQueue`] directly) fully
//! serialized records and return immediately. A background [`Dispatcher`]
//! drains the queue on a fixed interval and delivers the records through a
//! [`Transport`] in bounded pages, waiting for each page to settle before
//! starting the next one.
//!
//! Delivery is best-effort and at-most-once. Failed records are logged and
//! dropped rather than retried, and records still queued at shutdown or
//! cancellation are abandoned.

mod config;
mod dispatcher;
mod queue;
mod tracker;
mod transport;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigError};
pub use dispatcher::Dispatcher;
pub use queue::RecordQueue;
pub use tracker::{Client, Event, PageView, TrackError, Tracker};
pub use transport::{DeliveryError, HttpTransport, Transport};
