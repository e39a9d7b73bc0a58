//! Execution context
//!
//! Every core call that touches financial state receives an explicit
//! `ExecutionContext` instead of reading ambient session state. Allocation
//! runs with elevated privilege regardless of the calling identity; the
//! caller's identity is retained for audit records.

use serde::{Deserialize, Serialize};

/// Privilege level for a core call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Privilege {
    /// Normal operator privilege
    Operator,
    /// Elevated privilege (financial writes)
    Elevated,
}

/// Identity and privilege for one core call.
///
/// Scoped: elevation produces a new value, it never mutates process-wide
/// state, so there is nothing to restore on error paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Acting identity, recorded in audit records
    pub actor: String,
    pub privilege: Privilege,
}

impl ExecutionContext {
    /// Context for an unattended system call (gateway callback, reconciler)
    pub fn system() -> Self {
        Self {
            actor: "system".to_string(),
            privilege: Privilege::Elevated,
        }
    }

    /// Context for a named operator
    pub fn operator(actor: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            privilege: Privilege::Operator,
        }
    }

    /// Scoped elevated copy keeping the caller identity
    pub fn elevated(&self) -> Self {
        Self {
            actor: self.actor.clone(),
            privilege: Privilege::Elevated,
        }
    }

    pub fn is_elevated(&self) -> bool {
        self.privilege == Privilege::Elevated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elevation_keeps_actor() {
        let ctx = ExecutionContext::operator("cashier-1");
        assert!(!ctx.is_elevated());

        let elevated = ctx.elevated();
        assert!(elevated.is_elevated());
        assert_eq!(elevated.actor, "cashier-1");

        // Original context is untouched
        assert!(!ctx.is_elevated());
    }
}
