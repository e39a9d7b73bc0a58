//! Arcade Server - gaming-cafe billing node
//!
//! # Architecture overview
//!
//! - **Pricing** (`pricing`): tiered/incremental session pricing engine
//! - **Allocation** (`allocation`): exact-match-then-FIFO payment allocator
//! - **Reconciliation** (`reconcile`): gateway polling with bounded retry
//! - **Sessions** (`sessions`): game-space occupancy and session-to-invoice
//! - **Store** (`store`): persistence collaborator boundary
//! - **HTTP API** (`api`): RESTful interface and gateway webhook
//!
//! # Module structure
//!
//! ```text
//! arcade-server/src/
//! ├── core/          # config, state
//! ├── api/           # HTTP routes and handlers
//! ├── pricing/       # pricing engine
//! ├── allocation/    # payment allocator
//! ├── reconcile/     # gateway client + polling reconciler
//! ├── sessions/      # session lifecycle
//! ├── store/         # store traits + in-memory implementation
//! ├── notify/        # receipt notification boundary
//! └── utils/         # logger
//! ```

pub mod allocation;
pub mod api;
pub mod core;
pub mod notify;
pub mod pricing;
pub mod reconcile;
pub mod sessions;
pub mod store;
pub mod utils;

// Re-export public types
pub use core::{Config, Server, ServerState};
pub use allocation::{AllocationResult, PaymentAllocator};
pub use pricing::{PricingError, Quote, price};
pub use reconcile::{ReconcileConfig, Reconciler};
pub use utils::logger::{init_logger, init_logger_with_file};

/// Load .env, then initialize logging from the environment
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
    ___                          __
   /   |  ______________ _____  / /__
  / /| | / ___/ ___/ __ `/ __ \/ / _ \
 / ___ |/ /  / /__/ /_/ / /_/ / /  __/
/_/  |_/_/   \___/\__,_/\__,_/_/\___/
    "#
    );
}
