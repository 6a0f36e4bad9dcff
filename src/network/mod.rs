//! Request transport and batching
//!
//! This module contains:
//! - Single-request transports and response interpretation
//! - An offline swatch transport
//! - Batch execution on isolated worker threads
//! - The batching dispatcher routing results back to callers

/// Size- and idle-triggered request batching
pub mod dispatcher;
/// Offline colour swatch transport
pub mod swatch;
/// Transport seam and response interpretation
pub mod transport;
/// Batch execution and wire messages
pub mod worker;

pub use dispatcher::{Dispatcher, DispatcherConfig, DispatcherStats, Request, Ticket};
pub use swatch::SwatchTransport;
pub use transport::{HttpTransport, Method, Payload, RawResponse, Transport};
