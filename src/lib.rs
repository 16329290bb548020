//! stockwatch: single-shot per-store stock monitor.
//!
//! Drives a headless Chromium at one retail product page, taps the network
//! responses the page generates, extracts the stock payload, and fires one
//! webhook notification before exiting. Each invocation is stateless; retries
//! are an external scheduling concern.

pub mod config;
pub mod runner;
