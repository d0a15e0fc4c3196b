use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::alert::{self, AlertEvaluation, StockAlert};
use crate::domain::errors::DomainError;
use crate::domain::inventory::{LedgerEntry, RecordOutcome, StockAudit, StockMovement};
use crate::domain::ports::StockLedger;
use crate::schema::{inventory_transactions, products, stock_alerts};

use super::models::{InventoryTransactionRow, NewInventoryTransactionRow, StockAlertRow};
use super::page_offset;

/// Reads a product's stock while holding its row lock until the enclosing
/// transaction ends.
pub(crate) fn lock_stock(conn: &mut PgConnection, product_id: Uuid) -> Result<i32, DomainError> {
    products::table
        .find(product_id)
        .select(products::stock_quantity)
        .for_update()
        .first::<i32>(conn)
        .optional()?
        .ok_or(DomainError::NotFound("Product"))
}

/// Applies one movement. Must be called inside a transaction; every caller
/// that moves stock goes through here so the lock, the invariant check and
/// alert evaluation always happen together.
pub(crate) fn apply_movement(
    conn: &mut PgConnection,
    movement: &StockMovement,
) -> Result<Option<RecordOutcome>, DomainError> {
    let current = lock_stock(conn, movement.product_id)?;
    let Some(applied) = movement.change.apply(movement.product_id, current)? else {
        log::debug!(
            "Movement on {} is a no-op at stock {}",
            movement.product_id,
            current
        );
        return Ok(None);
    };

    let row: InventoryTransactionRow = diesel::insert_into(inventory_transactions::table)
        .values(&NewInventoryTransactionRow {
            id: Uuid::new_v4(),
            product_id: movement.product_id,
            transaction_type: movement.transaction_type.as_str().to_string(),
            quantity: applied.magnitude,
            stock_after: applied.new_stock,
            reason: movement.reason.clone(),
            reference_id: movement.reference.as_ref().map(|r| r.id),
            reference_type: movement.reference.as_ref().map(|r| r.kind.clone()),
            created_by: movement.created_by,
        })
        .returning(InventoryTransactionRow::as_returning())
        .get_result(conn)?;

    diesel::update(products::table.find(movement.product_id))
        .set((
            products::stock_quantity.eq(applied.new_stock),
            products::updated_at.eq(Utc::now()),
        ))
        .execute(conn)?;

    let alerts = evaluate_alerts(conn, movement.product_id, applied.new_stock)?;

    Ok(Some(RecordOutcome {
        entry: LedgerEntry::try_from(row)?,
        previous_stock: applied.previous,
        new_stock: applied.new_stock,
        alerts,
    }))
}

/// Evaluates and updates the product's active alerts in the caller's
/// transaction.
pub(crate) fn evaluate_alerts(
    conn: &mut PgConnection,
    product_id: Uuid,
    stock: i32,
) -> Result<Vec<AlertEvaluation>, DomainError> {
    let rows = stock_alerts::table
        .filter(stock_alerts::product_id.eq(product_id))
        .filter(stock_alerts::is_active.eq(true))
        .select(StockAlertRow::as_select())
        .load::<StockAlertRow>(conn)?;
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let active = rows
        .into_iter()
        .map(StockAlert::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let evaluations = alert::evaluate(active, stock);

    diesel::update(
        stock_alerts::table
            .filter(stock_alerts::product_id.eq(product_id))
            .filter(stock_alerts::is_active.eq(true)),
    )
    .set(stock_alerts::current_quantity.eq(stock))
    .execute(conn)?;

    for ev in evaluations.iter().filter(|ev| ev.triggered) {
        log::info!(
            "{} alert {} triggered for product {} at stock {} (threshold {})",
            ev.alert.alert_type,
            ev.alert.id,
            product_id,
            stock,
            ev.alert.threshold_quantity
        );
    }
    Ok(evaluations)
}

// ── Repository ────────────────────────────────────────────────────────────────

pub struct DieselStockLedger {
    pool: DbPool,
}

impl DieselStockLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl StockLedger for DieselStockLedger {
    fn apply(&self, movement: &StockMovement) -> Result<Option<RecordOutcome>, DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| apply_movement(conn, movement))
    }

    fn history(
        &self,
        product_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<Vec<LedgerEntry>, DomainError> {
        let mut conn = self.pool.get()?;

        let exists: i64 = products::table
            .filter(products::id.eq(product_id))
            .count()
            .get_result(&mut conn)?;
        if exists == 0 {
            return Err(DomainError::NotFound("Product"));
        }

        inventory_transactions::table
            .filter(inventory_transactions::product_id.eq(product_id))
            .order((
                inventory_transactions::created_at.desc(),
                inventory_transactions::id.desc(),
            ))
            .limit(limit)
            .offset(page_offset(page, limit)?)
            .select(InventoryTransactionRow::as_select())
            .load::<InventoryTransactionRow>(&mut conn)?
            .into_iter()
            .map(LedgerEntry::try_from)
            .collect()
    }

    fn audit(&self, product_id: Uuid) -> Result<StockAudit, DomainError> {
        let mut conn = self.pool.get()?;

        conn.build_transaction()
            .repeatable_read()
            .read_only()
            .run::<_, DomainError, _>(|conn| {
                let cached_stock = products::table
                    .find(product_id)
                    .select(products::stock_quantity)
                    .first::<i32>(conn)
                    .optional()?
                    .ok_or(DomainError::NotFound("Product"))?;

                let ledger_stock = inventory_transactions::table
                    .filter(inventory_transactions::product_id.eq(product_id))
                    .order(inventory_transactions::created_at.desc())
                    .select(inventory_transactions::stock_after)
                    .first::<i32>(conn)
                    .optional()?;

                let entry_count = inventory_transactions::table
                    .filter(inventory_transactions::product_id.eq(product_id))
                    .count()
                    .get_result(conn)?;

                Ok(StockAudit {
                    product_id,
                    cached_stock,
                    ledger_stock,
                    entry_count,
                })
            })
    }
}
