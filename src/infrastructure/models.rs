use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

use crate::domain::alert::StockAlert;
use crate::domain::errors::DomainError;
use crate::domain::inventory::{LedgerEntry, Reference};
use crate::domain::order::{OrderItemView, TrackingEntry};
use crate::schema::{
    inventory_transactions, order_items, order_tracking, orders, products, stock_alerts,
};

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub stock_quantity: i32,
    pub min_stock_level: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Catalog-owned insert; stock always starts at zero and moves only through
/// the ledger.
#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub name: String,
    pub price: BigDecimal,
    pub min_stock_level: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub refund_status: String,
    pub total_amount: BigDecimal,
    pub shipping_address: Value,
    pub billing_address: Option<Value>,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub refund_status: String,
    pub total_amount: BigDecimal,
    pub shipping_address: Value,
    pub billing_address: Option<Value>,
    pub notes: Option<String>,
}

/// Partial update of an order header; `None` fields are left untouched.
#[derive(Debug, Default, AsChangeset)]
#[diesel(table_name = orders)]
pub struct OrderChangeset {
    pub status: Option<String>,
    pub payment_status: Option<String>,
    pub refund_status: Option<String>,
    pub tracking_number: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_items)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
    pub created_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItemView {
    fn from(row: OrderItemRow) -> Self {
        OrderItemView {
            id: row.id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_items)]
pub struct NewOrderItemRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
    pub total_price: BigDecimal,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = order_tracking)]
#[diesel(belongs_to(OrderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TrackingRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: String,
    pub description: String,
    pub actor_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<TrackingRow> for TrackingEntry {
    fn from(row: TrackingRow) -> Self {
        TrackingEntry {
            id: row.id,
            status: row.status,
            description: row.description,
            actor_id: row.actor_id,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_tracking)]
pub struct NewTrackingRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: String,
    pub description: String,
    pub actor_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = inventory_transactions)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct InventoryTransactionRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub transaction_type: String,
    pub quantity: i32,
    pub stock_after: i32,
    pub reason: String,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<InventoryTransactionRow> for LedgerEntry {
    type Error = DomainError;

    fn try_from(row: InventoryTransactionRow) -> Result<Self, Self::Error> {
        let reference = match (row.reference_id, row.reference_type) {
            (Some(id), Some(kind)) => Some(Reference { id, kind }),
            _ => None,
        };
        Ok(LedgerEntry {
            id: row.id,
            product_id: row.product_id,
            transaction_type: row.transaction_type.parse().map_err(corrupt)?,
            quantity: row.quantity,
            stock_after: row.stock_after,
            reason: row.reason,
            reference,
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = inventory_transactions)]
pub struct NewInventoryTransactionRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub transaction_type: String,
    pub quantity: i32,
    pub stock_after: i32,
    pub reason: String,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = stock_alerts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StockAlertRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub alert_type: String,
    pub threshold_quantity: i32,
    pub current_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl TryFrom<StockAlertRow> for StockAlert {
    type Error = DomainError;

    fn try_from(row: StockAlertRow) -> Result<Self, Self::Error> {
        Ok(StockAlert {
            id: row.id,
            product_id: row.product_id,
            alert_type: row.alert_type.parse().map_err(corrupt)?,
            threshold_quantity: row.threshold_quantity,
            current_quantity: row.current_quantity,
            is_active: row.is_active,
            created_at: row.created_at,
            resolved_at: row.resolved_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = stock_alerts)]
pub struct NewStockAlertRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub alert_type: String,
    pub threshold_quantity: i32,
    pub current_quantity: i32,
}

/// A stored value that no longer parses is a storage fault, not bad input.
pub(crate) fn corrupt(e: DomainError) -> DomainError {
    DomainError::Internal(format!("corrupt row: {e}"))
}
