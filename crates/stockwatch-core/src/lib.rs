//! Core pipeline for the stockwatch monitor.
//!
//! The page session produces an unbounded stream of network responses; this
//! crate holds everything that decides what to do with them: the URL predicate
//! that picks out the stock response, the strict payload parser, the
//! flattening aggregator, and the single-fire completion gate that guarantees
//! the downstream pipeline runs exactly once per process run.

pub mod aggregate;
pub mod gate;
pub mod matcher;
pub mod outcome;
pub mod payload;

pub use aggregate::{aggregate, AggregateSummary, Aggregation, AvailabilityRecord, StateSummary};
pub use gate::CompletionGate;
pub use matcher::MatchRule;
pub use outcome::RunOutcome;
pub use payload::{parse, LocationStock, PayloadParseError, StateId, StateStock, StockPayload};
