//! Payment Allocation Module
//!
//! Allocates an incoming payment across outstanding invoices:
//! exact-match first, then oldest-first (FIFO), with best-effort
//! per-invoice bookkeeping.

mod allocator;

pub use allocator::*;
