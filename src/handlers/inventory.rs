use std::str::FromStr;

use actix_web::{web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::alert::AlertEvaluation;
use crate::domain::inventory::{
    LedgerEntry, ReconcileResult, ReconcileStatus, RecordOutcome, StockAudit, StockTarget,
    TransactionType,
};
use crate::errors::AppError;
use crate::Inventory;

use super::{actor_from, PageParams};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordTransactionRequest {
    pub product_id: Uuid,
    /// One of "in", "out", "adjustment"
    pub transaction_type: String,
    /// Positive for in/out; a signed, non-zero delta for adjustments
    pub quantity: i32,
    pub reason: String,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LedgerEntryResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub transaction_type: String,
    pub quantity: i32,
    pub stock_after: i32,
    pub reason: String,
    pub reference_id: Option<Uuid>,
    pub reference_type: Option<String>,
    pub created_by: Uuid,
    pub created_at: String,
}

impl From<LedgerEntry> for LedgerEntryResponse {
    fn from(e: LedgerEntry) -> Self {
        let (reference_id, reference_type) = match e.reference {
            Some(r) => (Some(r.id), Some(r.kind)),
            None => (None, None),
        };
        LedgerEntryResponse {
            id: e.id,
            product_id: e.product_id,
            transaction_type: e.transaction_type.to_string(),
            quantity: e.quantity,
            stock_after: e.stock_after,
            reason: e.reason,
            reference_id,
            reference_type,
            created_by: e.created_by,
            created_at: e.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AlertCheckResponse {
    pub alert_id: Uuid,
    pub alert_type: String,
    pub threshold_quantity: i32,
    pub triggered: bool,
}

impl From<AlertEvaluation> for AlertCheckResponse {
    fn from(ev: AlertEvaluation) -> Self {
        AlertCheckResponse {
            alert_id: ev.alert.id,
            alert_type: ev.alert.alert_type.to_string(),
            threshold_quantity: ev.alert.threshold_quantity,
            triggered: ev.triggered,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecordTransactionResponse {
    pub transaction: LedgerEntryResponse,
    pub previous_stock: i32,
    pub new_stock: i32,
    pub alerts: Vec<AlertCheckResponse>,
}

impl From<RecordOutcome> for RecordTransactionResponse {
    fn from(o: RecordOutcome) -> Self {
        RecordTransactionResponse {
            transaction: o.entry.into(),
            previous_stock: o.previous_stock,
            new_stock: o.new_stock,
            alerts: o.alerts.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StockUpdateItem {
    pub product_id: Option<Uuid>,
    pub new_quantity: Option<i32>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReconcileRequest {
    pub items: Vec<StockUpdateItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileItemResponse {
    pub product_id: Option<Uuid>,
    /// "applied", "skipped" or "failed"
    pub status: String,
    pub previous_stock: Option<i32>,
    pub new_stock: Option<i32>,
    pub transaction_id: Option<Uuid>,
    pub message: Option<String>,
}

impl From<ReconcileResult> for ReconcileItemResponse {
    fn from(r: ReconcileResult) -> Self {
        let mut resp = ReconcileItemResponse {
            product_id: r.product_id,
            status: String::new(),
            previous_stock: None,
            new_stock: None,
            transaction_id: None,
            message: None,
        };
        match r.status {
            ReconcileStatus::Applied {
                previous,
                current,
                transaction_id,
            } => {
                resp.status = "applied".to_string();
                resp.previous_stock = Some(previous);
                resp.new_stock = Some(current);
                resp.transaction_id = Some(transaction_id);
            }
            ReconcileStatus::Skipped { reason } => {
                resp.status = "skipped".to_string();
                resp.message = Some(reason);
            }
            ReconcileStatus::Failed { error } => {
                resp.status = "failed".to_string();
                resp.message = Some(error);
            }
        }
        resp
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockAuditResponse {
    pub product_id: Uuid,
    pub cached_stock: i32,
    pub ledger_stock: Option<i32>,
    pub entry_count: i64,
    pub in_sync: bool,
}

impl From<StockAudit> for StockAuditResponse {
    fn from(a: StockAudit) -> Self {
        StockAuditResponse {
            in_sync: a.in_sync(),
            product_id: a.product_id,
            cached_stock: a.cached_stock,
            ledger_stock: a.ledger_stock,
            entry_count: a.entry_count,
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /inventory/transactions
///
/// Appends one ledger entry and moves the product's stock with it.
#[utoipa::path(
    post,
    path = "/inventory/transactions",
    request_body = RecordTransactionRequest,
    responses(
        (status = 201, description = "Movement recorded", body = RecordTransactionResponse),
        (status = 400, description = "Invalid movement"),
        (status = 404, description = "Product not found"),
        (status = 422, description = "Insufficient stock"),
    ),
    tag = "inventory"
)]
pub async fn record_transaction(
    req: HttpRequest,
    inventory: web::Data<Inventory>,
    body: web::Json<RecordTransactionRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = actor_from(&req)?;
    let body = body.into_inner();
    let transaction_type = TransactionType::from_str(&body.transaction_type)?;
    let reference = match (body.reference_id, body.reference_type) {
        (Some(id), Some(kind)) => Some((id, kind)),
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "reference_id and reference_type must be given together".to_string(),
            ))
        }
    };

    let outcome = web::block(move || {
        inventory.record_transaction(
            body.product_id,
            transaction_type,
            body.quantity,
            &body.reason,
            reference,
            actor.id,
        )
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(RecordTransactionResponse::from(outcome)))
}

/// POST /inventory/reconcile
///
/// Sets each listed product to an absolute quantity. Items are independent:
/// the response reports each one as applied, skipped or failed.
#[utoipa::path(
    post,
    path = "/inventory/reconcile",
    request_body = ReconcileRequest,
    responses(
        (status = 200, description = "Per-item results", body = Vec<ReconcileItemResponse>),
    ),
    tag = "inventory"
)]
pub async fn reconcile(
    req: HttpRequest,
    inventory: web::Data<Inventory>,
    body: web::Json<ReconcileRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = actor_from(&req)?;
    let targets: Vec<StockTarget> = body
        .into_inner()
        .items
        .into_iter()
        .map(|i| StockTarget {
            product_id: i.product_id,
            new_quantity: i.new_quantity,
            reason: i.reason,
        })
        .collect();

    let results = web::block(move || inventory.reconcile(targets, actor.id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let body: Vec<ReconcileItemResponse> = results.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /inventory/{product_id}/history
#[utoipa::path(
    get,
    path = "/inventory/{product_id}/history",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
        PageParams,
    ),
    responses(
        (status = 200, description = "Ledger entries, newest first", body = Vec<LedgerEntryResponse>),
        (status = 404, description = "Product not found"),
    ),
    tag = "inventory"
)]
pub async fn history(
    inventory: web::Data<Inventory>,
    path: web::Path<Uuid>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let params = query.into_inner();

    let entries = web::block(move || inventory.history(product_id, params.page, params.limit))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body: Vec<LedgerEntryResponse> = entries.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}

/// GET /inventory/{product_id}/audit
///
/// Compares the cached stock with what the ledger last recorded.
#[utoipa::path(
    get,
    path = "/inventory/{product_id}/audit",
    params(("product_id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Audit result", body = StockAuditResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "inventory"
)]
pub async fn audit(
    inventory: web::Data<Inventory>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();

    let audit = web::block(move || inventory.audit(product_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(StockAuditResponse::from(audit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconcile_results_flatten_into_status_strings() {
        let id = Uuid::new_v4();
        let applied: ReconcileItemResponse = ReconcileResult {
            product_id: Some(id),
            status: ReconcileStatus::Applied {
                previous: 10,
                current: 7,
                transaction_id: id,
            },
        }
        .into();
        assert_eq!(applied.status, "applied");
        assert_eq!(applied.previous_stock, Some(10));
        assert_eq!(applied.new_stock, Some(7));
        assert!(applied.message.is_none());

        let skipped: ReconcileItemResponse = ReconcileResult {
            product_id: None,
            status: ReconcileStatus::Skipped {
                reason: "missing field".to_string(),
            },
        }
        .into();
        assert_eq!(skipped.status, "skipped");
        assert_eq!(skipped.message.as_deref(), Some("missing field"));
        assert!(skipped.transaction_id.is_none());
    }

    #[test]
    fn audit_response_reports_drift() {
        let resp: StockAuditResponse = StockAudit {
            product_id: Uuid::nil(),
            cached_stock: 5,
            ledger_stock: Some(4),
            entry_count: 3,
        }
        .into();
        assert!(!resp.in_sync);
    }
}
