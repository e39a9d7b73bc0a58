//! Shared types for the Arcade billing framework
//!
//! Common types used across crates: domain models, error types,
//! response structures, execution context and utility helpers.

pub mod context;
pub mod error;
pub mod models;
pub mod money;
pub mod response;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use context::{ExecutionContext, Privilege};
pub use error::{ApiError, ApiErrorCode, ApiResult};
pub use response::ApiResponse;
