use uuid::Uuid;

use super::alert::{NewStockAlert, StockAlert};
use super::errors::DomainError;
use super::inventory::{LedgerEntry, RecordOutcome, StockAudit, StockMovement};
use super::order::{
    Actor, ListResult, NewOrderInput, OrderView, PaymentStatus, RefundStatus, StatusChange,
};

pub trait OrderRepository: Send + Sync + 'static {
    /// Persists header, items and the first tracking entry atomically. With
    /// `reserve_stock` the same transaction books an `out` ledger entry per
    /// product.
    fn create(
        &self,
        order: &NewOrderInput,
        order_number: &str,
        actor: &Actor,
        reserve_stock: bool,
    ) -> Result<OrderView, DomainError>;
    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;
    fn list(&self, user_id: Option<Uuid>, page: i64, limit: i64) -> Result<ListResult, DomainError>;
    fn update_status(
        &self,
        id: Uuid,
        actor: &Actor,
        change: &StatusChange,
    ) -> Result<OrderView, DomainError>;
    fn update_refund(
        &self,
        id: Uuid,
        actor: &Actor,
        next: RefundStatus,
        note: Option<String>,
    ) -> Result<OrderView, DomainError>;
    fn update_payment(
        &self,
        id: Uuid,
        actor: &Actor,
        next: PaymentStatus,
    ) -> Result<OrderView, DomainError>;
}

/// The only write path for product stock.
pub trait StockLedger: Send + Sync + 'static {
    /// Returns `Ok(None)` when the movement leaves stock unchanged; nothing is
    /// written in that case.
    fn apply(&self, movement: &StockMovement) -> Result<Option<RecordOutcome>, DomainError>;
    fn history(&self, product_id: Uuid, page: i64, limit: i64)
        -> Result<Vec<LedgerEntry>, DomainError>;
    fn audit(&self, product_id: Uuid) -> Result<StockAudit, DomainError>;
}

pub trait AlertRepository: Send + Sync + 'static {
    fn create(&self, alert: NewStockAlert) -> Result<StockAlert, DomainError>;
    fn resolve(&self, id: Uuid) -> Result<StockAlert, DomainError>;
    fn list_active(&self, product_id: Option<Uuid>) -> Result<Vec<StockAlert>, DomainError>;
    /// The catalog reorder point used when a low-stock alert names no threshold.
    fn min_stock_level(&self, product_id: Uuid) -> Result<i32, DomainError>;
}
