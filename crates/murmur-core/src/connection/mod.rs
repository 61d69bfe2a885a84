//! Live connection bookkeeping and fan-out.
//!
//! - `client` -- `ClientConnection`, one per open socket, with a bounded outbound queue
//! - `registry` -- `ConnectionRegistry`, the broadcast set

pub mod client;
pub mod registry;

pub use client::ClientConnection;
pub use registry::{BroadcastReport, ConnectionRegistry};
