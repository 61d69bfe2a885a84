//! Realtime chat path: handshake, history replay, persist-then-broadcast.
//!
//! - `lifecycle` -- `LifecycleController`, the per-connection state machine driver
//! - `broadcast` -- `BroadcastEngine`, append to the store then fan out
//! - `frame` -- JSON encoding of outbound frames

pub mod broadcast;
pub mod frame;
pub mod lifecycle;

#[cfg(test)]
mod test_support;

pub use broadcast::{BroadcastEngine, Published};
pub use lifecycle::{AuthenticatedConnection, LifecycleController, OpenConnection};
