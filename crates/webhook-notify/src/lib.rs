//! Notification layer: composing the stock-level message and delivering it to
//! a Discord-compatible webhook endpoint.
//!
//! Composition is pure and always runs; delivery happens at most once per run
//! and only when an endpoint is configured.

pub mod compose;
pub mod message;
pub mod sink;

pub use compose::{FieldGranularity, NotificationComposer, RunMetadata};
pub use message::{Field, Footer, Message};
pub use sink::{NotifyError, WebhookSink};
