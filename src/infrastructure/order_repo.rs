use std::collections::BTreeMap;

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::inventory::{StockMovement, TransactionType};
use crate::domain::order::{
    Actor, ActorRole, Address, ListResult, NewOrderInput, OrderLineInput, OrderStatus,
    OrderView, PaymentStatus, RefundStatus, StatusChange,
};
use crate::domain::ports::OrderRepository;
use crate::schema::{order_items, order_tracking, orders};

use super::ledger;
use super::page_offset;
use super::models::{
    corrupt, NewOrderItemRow, NewOrderRow, NewTrackingRow, OrderChangeset, OrderItemRow,
    OrderRow, TrackingRow,
};

pub const ORDER_REFERENCE: &str = "order";

// ── Helpers ──────────────────────────────────────────────────────────────────

fn to_json(address: &Address) -> Result<serde_json::Value, DomainError> {
    serde_json::to_value(address).map_err(|e| DomainError::Internal(e.to_string()))
}

fn from_json(value: serde_json::Value) -> Result<Address, DomainError> {
    serde_json::from_value(value).map_err(|e| DomainError::Internal(format!("corrupt address: {e}")))
}

/// Quantities per product in ascending id order, so concurrent orders lock
/// product rows in the same order.
fn reservations(lines: &[OrderLineInput]) -> Result<BTreeMap<Uuid, i32>, DomainError> {
    let mut per_product = BTreeMap::new();
    for line in lines {
        let qty = per_product.entry(line.product_id).or_insert(0i32);
        *qty = qty
            .checked_add(line.quantity)
            .ok_or_else(|| DomainError::InvalidInput("quantity overflow".to_string()))?;
    }
    Ok(per_product)
}

fn to_view(row: OrderRow, items: Vec<OrderItemRow>, tracking: Vec<TrackingRow>) -> Result<OrderView, DomainError> {
    Ok(OrderView {
        id: row.id,
        order_number: row.order_number,
        user_id: row.user_id,
        status: row.status.parse().map_err(corrupt)?,
        payment_status: row.payment_status.parse().map_err(corrupt)?,
        refund_status: row.refund_status.parse().map_err(corrupt)?,
        total_amount: row.total_amount,
        shipping_address: from_json(row.shipping_address)?,
        billing_address: row.billing_address.map(from_json).transpose()?,
        notes: row.notes,
        tracking_number: row.tracking_number,
        delivered_at: row.delivered_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
        items: items.into_iter().map(Into::into).collect(),
        tracking: tracking.into_iter().map(Into::into).collect(),
    })
}

fn load_order(conn: &mut PgConnection, id: Uuid) -> Result<Option<OrderView>, DomainError> {
    let order = orders::table
        .find(id)
        .select(OrderRow::as_select())
        .first::<OrderRow>(conn)
        .optional()?;

    let Some(order) = order else {
        return Ok(None);
    };

    let items = order_items::table
        .filter(order_items::order_id.eq(order.id))
        .order(order_items::created_at.asc())
        .select(OrderItemRow::as_select())
        .load::<OrderItemRow>(conn)?;

    let tracking = order_tracking::table
        .filter(order_tracking::order_id.eq(order.id))
        .order(order_tracking::created_at.asc())
        .select(TrackingRow::as_select())
        .load::<TrackingRow>(conn)?;

    to_view(order, items, tracking).map(Some)
}

/// Locks the order header. Customers get `NotFound` for orders they do not own.
fn lock_order(conn: &mut PgConnection, id: Uuid, actor: &Actor) -> Result<OrderRow, DomainError> {
    let row = orders::table
        .find(id)
        .select(OrderRow::as_select())
        .for_update()
        .first::<OrderRow>(conn)
        .optional()?;
    match row {
        Some(row) if actor.role == ActorRole::Operator || row.user_id == actor.id => Ok(row),
        _ => Err(DomainError::NotFound("Order")),
    }
}

fn track(
    conn: &mut PgConnection,
    order_id: Uuid,
    status: String,
    description: String,
    actor: &Actor,
) -> Result<(), DomainError> {
    diesel::insert_into(order_tracking::table)
        .values(&NewTrackingRow {
            id: Uuid::new_v4(),
            order_id,
            status,
            description,
            actor_id: actor.id,
        })
        .execute(conn)?;
    Ok(())
}

fn update_header(
    conn: &mut PgConnection,
    id: Uuid,
    mut changes: OrderChangeset,
) -> Result<(), DomainError> {
    changes.updated_at = Some(Utc::now());
    diesel::update(orders::table.find(id))
        .set(&changes)
        .execute(conn)?;
    Ok(())
}

fn reload(conn: &mut PgConnection, id: Uuid) -> Result<OrderView, DomainError> {
    load_order(conn, id)?.ok_or(DomainError::NotFound("Order"))
}

fn refund_description(next: RefundStatus) -> &'static str {
    match next {
        RefundStatus::None => "Refund cleared",
        RefundStatus::Requested => "Refund requested",
        RefundStatus::Approved => "Refund approved",
        RefundStatus::Rejected => "Refund rejected",
        RefundStatus::Refunded => "Refund completed",
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn create(
        &self,
        order: &NewOrderInput,
        order_number: &str,
        actor: &Actor,
        reserve_stock: bool,
    ) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Insert the order header
            let order_id = Uuid::new_v4();
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    order_number: order_number.to_string(),
                    user_id: order.user_id,
                    status: OrderStatus::Pending.as_str().to_string(),
                    payment_status: order.payment_status.as_str().to_string(),
                    refund_status: RefundStatus::None.as_str().to_string(),
                    total_amount: order.total_amount(),
                    shipping_address: to_json(&order.shipping_address)?,
                    billing_address: order.billing_address.as_ref().map(to_json).transpose()?,
                    notes: order.notes.clone(),
                })
                .execute(conn)?;

            // 2. Reserve stock first: row locks are taken FOR UPDATE in
            // ascending product id before the item FK checks lock anything.
            if reserve_stock {
                for (product_id, quantity) in reservations(&order.lines)? {
                    let movement = StockMovement::new(
                        product_id,
                        TransactionType::Out,
                        quantity,
                        format!("Order {order_number}"),
                        actor.id,
                    )?
                    .with_reference(order_id, ORDER_REFERENCE);
                    ledger::apply_movement(conn, &movement)?;
                }
            }

            // 3. Insert one item per line, each with its own total
            let new_items: Vec<NewOrderItemRow> = order
                .lines
                .iter()
                .map(|l| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: l.product_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price.clone(),
                    total_price: l.total_price(),
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&new_items)
                .execute(conn)
                .map_err(|e| match e {
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        DomainError::NotFound("Product")
                    }
                    other => other.into(),
                })?;

            // 4. Start the tracking trail
            track(
                conn,
                order_id,
                OrderStatus::Pending.as_str().to_string(),
                StatusChange::to(OrderStatus::Pending).description_or_default(),
                actor,
            )?;

            reload(conn, order_id)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;
        load_order(&mut conn, id)
    }

    fn list(&self, user_id: Option<Uuid>, page: i64, limit: i64) -> Result<ListResult, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = page_offset(page, limit)?;
        conn.transaction::<_, DomainError, _>(|conn| {
            let mut count = orders::table.count().into_boxed();
            let mut rows = orders::table
                .select(OrderRow::as_select())
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .into_boxed();
            if let Some(user_id) = user_id {
                count = count.filter(orders::user_id.eq(user_id));
                rows = rows.filter(orders::user_id.eq(user_id));
            }

            let total: i64 = count.get_result(conn)?;
            let items = rows
                .load::<OrderRow>(conn)?
                .into_iter()
                .map(|o| to_view(o, vec![], vec![]))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(ListResult { items, total })
        })
    }

    fn update_status(
        &self,
        id: Uuid,
        actor: &Actor,
        change: &StatusChange,
    ) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = lock_order(conn, id, actor)?;
            let current: OrderStatus = row.status.parse().map_err(corrupt)?;
            let next = current.transition(change.status, actor.role)?;

            let mut changes = OrderChangeset {
                status: Some(next.as_str().to_string()),
                ..Default::default()
            };
            match next {
                OrderStatus::Shipped => changes.tracking_number = change.tracking_number.clone(),
                OrderStatus::Delivered => changes.delivered_at = Some(Utc::now()),
                _ => {}
            }
            update_header(conn, id, changes)?;
            track(
                conn,
                id,
                next.as_str().to_string(),
                change.description_or_default(),
                actor,
            )?;

            reload(conn, id)
        })
    }

    fn update_refund(
        &self,
        id: Uuid,
        actor: &Actor,
        next: RefundStatus,
        note: Option<String>,
    ) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = lock_order(conn, id, actor)?;
            let current: RefundStatus = row.refund_status.parse().map_err(corrupt)?;
            let payment: PaymentStatus = row.payment_status.parse().map_err(corrupt)?;
            let next = current.transition(next, actor.role, payment)?;

            let mut changes = OrderChangeset {
                refund_status: Some(next.as_str().to_string()),
                ..Default::default()
            };
            if next == RefundStatus::Refunded {
                changes.payment_status = Some(PaymentStatus::Refunded.as_str().to_string());
            }
            update_header(conn, id, changes)?;

            let description = note
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| refund_description(next).to_string());
            track(conn, id, format!("refund_{next}"), description, actor)?;

            reload(conn, id)
        })
    }

    fn update_payment(
        &self,
        id: Uuid,
        actor: &Actor,
        next: PaymentStatus,
    ) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = lock_order(conn, id, actor)?;
            let current: PaymentStatus = row.payment_status.parse().map_err(corrupt)?;
            let next = current.transition(next, actor.role)?;

            update_header(
                conn,
                id,
                OrderChangeset {
                    payment_status: Some(next.as_str().to_string()),
                    ..Default::default()
                },
            )?;
            track(
                conn,
                id,
                format!("payment_{next}"),
                format!("Payment marked {next}"),
                actor,
            )?;

            reload(conn, id)
        })
    }
}
