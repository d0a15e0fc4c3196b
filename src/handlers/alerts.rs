use std::str::FromStr;

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::alert::{AlertType, StockAlert};
use crate::errors::AppError;
use crate::Alerts;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateAlertRequest {
    pub product_id: Uuid,
    /// One of "low_stock", "out_of_stock", "overstock"
    pub alert_type: String,
    /// Defaults to the product's min_stock_level for "low_stock" and to 0 for
    /// "out_of_stock". Required for "overstock".
    pub threshold_quantity: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AlertFilter {
    /// Only alerts for this product
    pub product_id: Option<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StockAlertResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub alert_type: String,
    pub threshold_quantity: i32,
    pub current_quantity: i32,
    pub is_active: bool,
    pub created_at: String,
    pub resolved_at: Option<String>,
}

impl From<StockAlert> for StockAlertResponse {
    fn from(a: StockAlert) -> Self {
        StockAlertResponse {
            id: a.id,
            product_id: a.product_id,
            alert_type: a.alert_type.to_string(),
            threshold_quantity: a.threshold_quantity,
            current_quantity: a.current_quantity,
            is_active: a.is_active,
            created_at: a.created_at.to_rfc3339(),
            resolved_at: a.resolved_at.map(|r| r.to_rfc3339()),
        }
    }
}

/// POST /alerts
#[utoipa::path(
    post,
    path = "/alerts",
    request_body = CreateAlertRequest,
    responses(
        (status = 201, description = "Alert created", body = StockAlertResponse),
        (status = 400, description = "Invalid alert"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "An active alert of this type already exists"),
    ),
    tag = "alerts"
)]
pub async fn create_alert(
    alerts: web::Data<Alerts>,
    body: web::Json<CreateAlertRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let alert_type = AlertType::from_str(&body.alert_type)?;

    let alert = web::block(move || {
        alerts.create_alert(body.product_id, alert_type, body.threshold_quantity)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(StockAlertResponse::from(alert)))
}

/// POST /alerts/{id}/resolve
///
/// Idempotent: resolving a resolved alert returns it unchanged.
#[utoipa::path(
    post,
    path = "/alerts/{id}/resolve",
    params(("id" = Uuid, Path, description = "Alert UUID")),
    responses(
        (status = 200, description = "Alert resolved", body = StockAlertResponse),
        (status = 404, description = "Alert not found"),
    ),
    tag = "alerts"
)]
pub async fn resolve_alert(
    alerts: web::Data<Alerts>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let alert = web::block(move || alerts.resolve_alert(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(StockAlertResponse::from(alert)))
}

/// GET /alerts
#[utoipa::path(
    get,
    path = "/alerts",
    params(AlertFilter),
    responses(
        (status = 200, description = "Active alerts, newest first", body = Vec<StockAlertResponse>),
    ),
    tag = "alerts"
)]
pub async fn list_alerts(
    alerts: web::Data<Alerts>,
    query: web::Query<AlertFilter>,
) -> Result<HttpResponse, AppError> {
    let product_id = query.into_inner().product_id;

    let active = web::block(move || alerts.active_alerts(product_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    let body: Vec<StockAlertResponse> = active.into_iter().map(Into::into).collect();
    Ok(HttpResponse::Ok().json(body))
}
