use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::inventory::{
    LedgerEntry, ReconcileResult, ReconcileStatus, RecordOutcome, StockAudit, StockMovement,
    StockTarget, TransactionType,
};
use crate::domain::ports::StockLedger;

pub const DEFAULT_RECONCILE_REASON: &str = "Bulk stock update";

pub struct InventoryService<L> {
    ledger: L,
}

impl<L: StockLedger> InventoryService<L> {
    pub fn new(ledger: L) -> Self {
        Self { ledger }
    }

    /// Records one movement. For `adjustment`, `quantity` is a signed delta.
    pub fn record_transaction(
        &self,
        product_id: Uuid,
        transaction_type: TransactionType,
        quantity: i32,
        reason: &str,
        reference: Option<(Uuid, String)>,
        actor_id: Uuid,
    ) -> Result<RecordOutcome, DomainError> {
        let mut movement =
            StockMovement::new(product_id, transaction_type, quantity, reason, actor_id)?;
        if let Some((id, kind)) = reference {
            movement = movement.with_reference(id, kind);
        }

        match self.ledger.apply(&movement) {
            Ok(Some(outcome)) => {
                log::info!(
                    "Stock for {} moved {} -> {} ({} {})",
                    product_id,
                    outcome.previous_stock,
                    outcome.new_stock,
                    transaction_type,
                    outcome.entry.quantity
                );
                Ok(outcome)
            }
            Ok(None) => Err(DomainError::InvalidInput(
                "movement does not change stock".to_string(),
            )),
            Err(e) => {
                log::warn!("Rejected {transaction_type} movement for {product_id}: {e}");
                Err(e)
            }
        }
    }

    /// Drives each target to its absolute quantity in its own transaction.
    /// Failures are reported per item and never undo earlier items.
    pub fn reconcile(&self, targets: Vec<StockTarget>, actor_id: Uuid) -> Vec<ReconcileResult> {
        let results: Vec<ReconcileResult> = targets
            .into_iter()
            .map(|target| ReconcileResult {
                product_id: target.product_id,
                status: self.reconcile_one(target, actor_id),
            })
            .collect();

        let applied = results
            .iter()
            .filter(|r| matches!(r.status, ReconcileStatus::Applied { .. }))
            .count();
        log::info!("Reconciled stock: {applied} of {} items changed", results.len());
        results
    }

    fn reconcile_one(&self, target: StockTarget, actor_id: Uuid) -> ReconcileStatus {
        let (Some(product_id), Some(new_quantity)) = (target.product_id, target.new_quantity) else {
            return ReconcileStatus::Skipped {
                reason: "missing product_id or new_quantity".to_string(),
            };
        };
        let reason = target
            .reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RECONCILE_REASON.to_string());

        let applied = StockMovement::reconcile(product_id, new_quantity, reason, actor_id)
            .and_then(|movement| self.ledger.apply(&movement));

        match applied {
            Ok(Some(outcome)) => ReconcileStatus::Applied {
                previous: outcome.previous_stock,
                current: outcome.new_stock,
                transaction_id: outcome.entry.id,
            },
            Ok(None) => ReconcileStatus::Skipped {
                reason: "stock already at target".to_string(),
            },
            Err(e) => {
                log::warn!("Reconciliation of {product_id} failed: {e}");
                ReconcileStatus::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    pub fn history(&self, product_id: Uuid, page: i64, limit: i64) -> Result<Vec<LedgerEntry>, DomainError> {
        self.ledger
            .history(product_id, page.max(1), limit.clamp(1, 100))
    }

    pub fn audit(&self, product_id: Uuid) -> Result<StockAudit, DomainError> {
        let audit = self.ledger.audit(product_id)?;
        if !audit.in_sync() {
            log::warn!(
                "Stock drift on {}: cached {} vs ledger {:?}",
                product_id,
                audit.cached_stock,
                audit.ledger_stock
            );
        }
        Ok(audit)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    /// In-memory ledger with the same no-op and invariant semantics as the
    /// database one.
    #[derive(Default)]
    struct MemoryLedger {
        stock: Mutex<HashMap<Uuid, i32>>,
        entries: Mutex<Vec<LedgerEntry>>,
    }

    impl MemoryLedger {
        fn with_product(id: Uuid, stock: i32) -> Self {
            let ledger = Self::default();
            ledger.stock.lock().unwrap().insert(id, stock);
            ledger
        }
    }

    impl StockLedger for MemoryLedger {
        fn apply(&self, movement: &StockMovement) -> Result<Option<RecordOutcome>, DomainError> {
            let mut stock = self.stock.lock().unwrap();
            let current = *stock
                .get(&movement.product_id)
                .ok_or(DomainError::NotFound("Product"))?;
            let Some(applied) = movement.change.apply(movement.product_id, current)? else {
                return Ok(None);
            };
            stock.insert(movement.product_id, applied.new_stock);
            let entry = LedgerEntry {
                id: Uuid::new_v4(),
                product_id: movement.product_id,
                transaction_type: movement.transaction_type,
                quantity: applied.magnitude,
                stock_after: applied.new_stock,
                reason: movement.reason.clone(),
                reference: movement.reference.clone(),
                created_by: movement.created_by,
                created_at: Utc::now(),
            };
            self.entries.lock().unwrap().push(entry.clone());
            Ok(Some(RecordOutcome {
                entry,
                previous_stock: applied.previous,
                new_stock: applied.new_stock,
                alerts: vec![],
            }))
        }

        fn history(&self, product_id: Uuid, _: i64, _: i64) -> Result<Vec<LedgerEntry>, DomainError> {
            Ok(self
                .entries
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.product_id == product_id)
                .cloned()
                .collect())
        }

        fn audit(&self, product_id: Uuid) -> Result<StockAudit, DomainError> {
            let history = self.history(product_id, 1, 100)?;
            Ok(StockAudit {
                product_id,
                cached_stock: self.stock.lock().unwrap()[&product_id],
                ledger_stock: history.last().map(|e| e.stock_after),
                entry_count: history.len() as i64,
            })
        }
    }

    fn target(product_id: Option<Uuid>, qty: Option<i32>) -> StockTarget {
        StockTarget {
            product_id,
            new_quantity: qty,
            reason: None,
        }
    }

    #[test]
    fn out_beyond_stock_is_rejected_and_leaves_no_entry() {
        let p = Uuid::new_v4();
        let svc = InventoryService::new(MemoryLedger::with_product(p, 50));
        let err = svc
            .record_transaction(p, TransactionType::Out, 60, "sale", None, Uuid::nil())
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert_eq!(svc.ledger.stock.lock().unwrap()[&p], 50);
        assert!(svc.ledger.entries.lock().unwrap().is_empty());
    }

    #[test]
    fn reference_is_carried_onto_the_entry() {
        let p = Uuid::new_v4();
        let order = Uuid::new_v4();
        let svc = InventoryService::new(MemoryLedger::with_product(p, 5));
        let outcome = svc
            .record_transaction(
                p,
                TransactionType::Out,
                2,
                "sale",
                Some((order, "order".to_string())),
                Uuid::nil(),
            )
            .unwrap();
        let reference = outcome.entry.reference.expect("reference stored");
        assert_eq!(reference.id, order);
        assert_eq!(reference.kind, "order");
    }

    #[test]
    fn reconcile_is_idempotent() {
        let p = Uuid::new_v4();
        let svc = InventoryService::new(MemoryLedger::with_product(p, 10));

        let first = svc.reconcile(vec![target(Some(p), Some(50))], Uuid::nil());
        assert!(matches!(
            first[0].status,
            ReconcileStatus::Applied {
                previous: 10,
                current: 50,
                ..
            }
        ));

        let second = svc.reconcile(vec![target(Some(p), Some(50))], Uuid::nil());
        assert!(matches!(second[0].status, ReconcileStatus::Skipped { .. }));
        let entries = svc.ledger.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.transaction_type, TransactionType::Adjustment);
        assert_eq!(entry.quantity, 40);
        assert_eq!(entry.reason, DEFAULT_RECONCILE_REASON);
    }

    #[test]
    fn reconcile_reports_each_item_independently() {
        let good = Uuid::new_v4();
        let svc = InventoryService::new(MemoryLedger::with_product(good, 3));
        let missing = Uuid::new_v4();

        let results = svc.reconcile(
            vec![
                target(Some(missing), Some(5)),
                target(None, Some(5)),
                target(Some(good), None),
                target(Some(good), Some(-2)),
                target(Some(good), Some(0)),
            ],
            Uuid::nil(),
        );

        assert!(matches!(results[0].status, ReconcileStatus::Failed { .. }));
        assert!(matches!(results[1].status, ReconcileStatus::Skipped { .. }));
        assert!(matches!(results[2].status, ReconcileStatus::Skipped { .. }));
        assert!(matches!(results[3].status, ReconcileStatus::Failed { .. }));
        assert!(matches!(
            results[4].status,
            ReconcileStatus::Applied { current: 0, .. }
        ));
        assert_eq!(svc.ledger.stock.lock().unwrap()[&good], 0);
    }

    #[test]
    fn audit_matches_after_ledger_writes() {
        let p = Uuid::new_v4();
        let svc = InventoryService::new(MemoryLedger::with_product(p, 0));
        svc.record_transaction(p, TransactionType::In, 9, "restock", None, Uuid::nil())
            .unwrap();
        svc.record_transaction(p, TransactionType::Adjustment, -4, "wilted", None, Uuid::nil())
            .unwrap();
        let audit = svc.audit(p).unwrap();
        assert!(audit.in_sync());
        assert_eq!(audit.ledger_stock, Some(5));
        assert_eq!(audit.entry_count, 2);
    }
}
