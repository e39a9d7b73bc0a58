//! Session Pricing Module
//!
//! Converts a closed session's duration into a billable quantity and
//! amount under the game's pricing policy.

mod engine;

pub use engine::*;
