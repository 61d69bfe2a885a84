//! In-memory session registry backing the realtime authentication gate.

pub mod registry;

pub use registry::SessionRegistry;
