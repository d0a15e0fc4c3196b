use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::alert::AlertEvaluation;
use super::errors::DomainError;

/// Direction of a ledger entry. The stored quantity is always a positive
/// magnitude; the type carries the direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionType {
    In,
    Out,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::In => "in",
            TransactionType::Out => "out",
            TransactionType::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(TransactionType::In),
            "out" => Ok(TransactionType::Out),
            "adjustment" => Ok(TransactionType::Adjustment),
            other => Err(DomainError::InvalidInput(format!(
                "unknown transaction type '{other}'"
            ))),
        }
    }
}

/// How a movement changes the materialized stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockChange {
    /// Relative change; never zero.
    Delta(i32),
    /// Absolute target, used by bulk reconciliation.
    SetTo(i32),
}

/// Result of applying a [`StockChange`] to the current stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedChange {
    pub previous: i32,
    pub new_stock: i32,
    /// Unsigned quantity written to the ledger entry.
    pub magnitude: i32,
}

impl StockChange {
    /// Returns `Ok(None)` when the change would leave stock untouched.
    pub fn apply(self, product_id: Uuid, current: i32) -> Result<Option<AppliedChange>, DomainError> {
        let new_stock = match self {
            StockChange::Delta(delta) => current
                .checked_add(delta)
                .ok_or_else(|| DomainError::InvalidInput("stock quantity overflow".to_string()))?,
            StockChange::SetTo(target) => target,
        };

        if new_stock < 0 {
            return Err(DomainError::InsufficientStock {
                product_id,
                available: current,
                requested: current.saturating_sub(new_stock),
            });
        }

        let magnitude = (i64::from(new_stock) - i64::from(current)).abs();
        if magnitude == 0 {
            return Ok(None);
        }
        let magnitude = i32::try_from(magnitude)
            .map_err(|_| DomainError::InvalidInput("stock quantity overflow".to_string()))?;

        Ok(Some(AppliedChange {
            previous: current,
            new_stock,
            magnitude,
        }))
    }
}

/// Optional link from a ledger entry to whatever caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub id: Uuid,
    pub kind: String,
}

/// A validated request to move stock for one product.
#[derive(Debug, Clone)]
pub struct StockMovement {
    pub product_id: Uuid,
    pub transaction_type: TransactionType,
    pub change: StockChange,
    pub reason: String,
    pub reference: Option<Reference>,
    pub created_by: Uuid,
}

impl StockMovement {
    /// `quantity` must be positive for `in`/`out`. For `adjustment` it is a
    /// signed, non-zero delta.
    pub fn new(
        product_id: Uuid,
        transaction_type: TransactionType,
        quantity: i32,
        reason: impl Into<String>,
        created_by: Uuid,
    ) -> Result<Self, DomainError> {
        let delta = match transaction_type {
            TransactionType::In | TransactionType::Out if quantity <= 0 => {
                return Err(DomainError::InvalidInput(format!(
                    "quantity for '{transaction_type}' must be positive, got {quantity}"
                )));
            }
            TransactionType::In => quantity,
            TransactionType::Out => -quantity,
            TransactionType::Adjustment if quantity == 0 || quantity == i32::MIN => {
                return Err(DomainError::InvalidInput(
                    "adjustment delta must be non-zero".to_string(),
                ));
            }
            TransactionType::Adjustment => quantity,
        };

        Ok(Self {
            product_id,
            transaction_type,
            change: StockChange::Delta(delta),
            reason: required_reason(reason.into())?,
            reference: None,
            created_by,
        })
    }

    /// An adjustment that asserts an absolute stock level.
    pub fn reconcile(
        product_id: Uuid,
        target: i32,
        reason: impl Into<String>,
        created_by: Uuid,
    ) -> Result<Self, DomainError> {
        if target < 0 {
            return Err(DomainError::InvalidInput(format!(
                "target quantity must be >= 0, got {target}"
            )));
        }
        Ok(Self {
            product_id,
            transaction_type: TransactionType::Adjustment,
            change: StockChange::SetTo(target),
            reason: required_reason(reason.into())?,
            reference: None,
            created_by,
        })
    }

    pub fn with_reference(mut self, id: Uuid, kind: impl Into<String>) -> Self {
        self.reference = Some(Reference {
            id,
            kind: kind.into(),
        });
        self
    }
}

fn required_reason(reason: String) -> Result<String, DomainError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidInput("reason must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub product_id: Uuid,
    pub transaction_type: TransactionType,
    pub quantity: i32,
    pub stock_after: i32,
    pub reason: String,
    pub reference: Option<Reference>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct RecordOutcome {
    pub entry: LedgerEntry,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub alerts: Vec<AlertEvaluation>,
}

/// One line of a bulk reconciliation request. Fields are optional because
/// incomplete lines are skipped rather than failing the batch.
#[derive(Debug, Clone, Default)]
pub struct StockTarget {
    pub product_id: Option<Uuid>,
    pub new_quantity: Option<i32>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileStatus {
    Applied {
        previous: i32,
        current: i32,
        transaction_id: Uuid,
    },
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct ReconcileResult {
    pub product_id: Option<Uuid>,
    pub status: ReconcileStatus,
}

/// Comparison between the cached stock on the product row and the stock the
/// ledger says it should have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAudit {
    pub product_id: Uuid,
    pub cached_stock: i32,
    /// `stock_after` of the most recent ledger entry, if any.
    pub ledger_stock: Option<i32>,
    pub entry_count: i64,
}

impl StockAudit {
    /// Products start at zero, so an empty ledger means zero stock.
    pub fn in_sync(&self) -> bool {
        self.ledger_stock.unwrap_or(0) == self.cached_stock
    }
}
