use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Cents, OrderId, UserId};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("User name must not be empty")]
    EmptyName,

    #[error("Order title must not be empty")]
    EmptyTitle,

    #[error("Skill name must not be empty")]
    EmptySkill,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid order status '{0}' (expected 'reserve' or 'done')")]
    InvalidStatus(String),

    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("User name already taken: {0}")]
    DuplicateName(String),

    #[error("Insufficient funds for user {user_id}: balance {balance}, required {required}")]
    InsufficientFunds {
        user_id: UserId,
        balance: Cents,
        required: Cents,
    },

    #[error("Order already done: {0}")]
    AlreadyDone(OrderId),

    #[error("Balance of user {0} cannot hold the order fee")]
    BalanceOverflow(UserId),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

/// Coarse classification of an [`AppError`], used by the transport to
/// pick a response without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed or missing input, including references to unknown ids
    Validation,
    /// A ledger rule rejected the operation; nothing was changed
    BusinessRule,
    /// The store failed; the outcome is opaque to the caller
    Storage,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::EmptyName
            | AppError::EmptyTitle
            | AppError::EmptySkill
            | AppError::InvalidAmount(_)
            | AppError::InvalidStatus(_)
            | AppError::UserNotFound(_)
            | AppError::OrderNotFound(_) => ErrorKind::Validation,
            AppError::DuplicateName(_)
            | AppError::InsufficientFunds { .. }
            | AppError::AlreadyDone(_)
            | AppError::BalanceOverflow(_) => ErrorKind::BusinessRule,
            AppError::Database(_) => ErrorKind::Storage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(AppError::EmptyTitle.kind(), ErrorKind::Validation);
        assert_eq!(AppError::OrderNotFound(3).kind(), ErrorKind::Validation);
        assert_eq!(AppError::AlreadyDone(3).kind(), ErrorKind::BusinessRule);
        assert_eq!(AppError::BalanceOverflow(3).kind(), ErrorKind::BusinessRule);
        assert_eq!(
            AppError::InsufficientFunds {
                user_id: 1,
                balance: 500,
                required: 1000
            }
            .kind(),
            ErrorKind::BusinessRule
        );
        assert_eq!(
            AppError::Database(anyhow::anyhow!("disk I/O error")).kind(),
            ErrorKind::Storage
        );
    }

    #[test]
    fn test_insufficient_funds_message() {
        let err = AppError::InsufficientFunds {
            user_id: 7,
            balance: 500,
            required: 1000,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds for user 7: balance 500, required 1000"
        );
    }
}
