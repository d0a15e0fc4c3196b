use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(
        "Insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: Uuid,
        available: i32,
        requested: i32,
    },
    #[error("{0} already exists")]
    AlreadyExists(String),
    #[error("Illegal transition from {from} to {to}")]
    IllegalTransition { from: String, to: String },
    #[error("Concurrent modification: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn illegal(from: impl ToString, to: impl ToString) -> Self {
        DomainError::IllegalTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}
