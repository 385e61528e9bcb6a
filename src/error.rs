//! # Errors — Optimizer Failure Taxonomy
//!
//! Every optimizer entry point returns `Result<_, OptimizerError>`. Input
//! validation failures are raised before any combinatorial work starts; the
//! optimizer never returns a truncated system alongside an error.
//!
//! | Variant | `kind()` | HTTP |
//! |---------|----------|------|
//! | `InvalidPool` | `invalid_pool` | 400 |
//! | `InsufficientPool` | `insufficient_pool` | 400 |
//! | `InvalidTicketCount` | `invalid_ticket_count` | 400 |
//! | `InvalidBudget` | `invalid_budget` | 400 |
//! | `ConstraintUnsatisfiable` | `constraint_unsatisfiable` | 422 |
//! | `Internal` | `internal_optimizer_error` | 500 |

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizerError {
    /// Pool is malformed: out-of-range values, or too small for the requested subset size.
    #[error("invalid number pool: {0}")]
    InvalidPool(String),

    /// Constraints admit no valid combination.
    #[error("constraints admit no valid combination: {0}")]
    ConstraintUnsatisfiable(String),

    /// Pool has fewer numbers than a single ticket needs.
    #[error("pool has {pool} numbers but a ticket needs {draw_width}")]
    InsufficientPool { pool: usize, draw_width: usize },

    #[error("invalid ticket count: {0}")]
    InvalidTicketCount(String),

    #[error("invalid budget: {0}")]
    InvalidBudget(String),

    /// Unexpected failure, e.g. a candidate space too large to evaluate exhaustively.
    #[error("optimizer failure: {0}")]
    Internal(String),
}

impl OptimizerError {
    /// Stable machine-readable identifier, used in JSON error bodies and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            OptimizerError::InvalidPool(_) => "invalid_pool",
            OptimizerError::ConstraintUnsatisfiable(_) => "constraint_unsatisfiable",
            OptimizerError::InsufficientPool { .. } => "insufficient_pool",
            OptimizerError::InvalidTicketCount(_) => "invalid_ticket_count",
            OptimizerError::InvalidBudget(_) => "invalid_budget",
            OptimizerError::Internal(_) => "internal_optimizer_error",
        }
    }

    /// True for errors caused by the caller's input rather than the optimizer.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, OptimizerError::Internal(_))
    }
}
