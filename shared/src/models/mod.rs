//! Data models
//!
//! Shared between arcade-server and clients (via API).
//! All IDs are strings; timestamps are Unix millis unless noted.

pub mod game;
pub mod invoice;
pub mod payment;
pub mod session;

// Re-exports
pub use game::*;
pub use invoice::*;
pub use payment::*;
pub use session::*;
