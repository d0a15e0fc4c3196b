use std::str::FromStr;

use actix_web::{web, HttpRequest, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::application::order_service::PaymentOutcome;
use crate::domain::order::{
    Address, NewOrderInput, OrderItemView, OrderLineInput, OrderStatus, OrderView,
    PaymentStatus, StatusChange, TrackingEntry,
};
use crate::errors::AppError;
use crate::Orders;

use super::{actor_from, PageParams};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddressBody {
    pub recipient: String,
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    pub phone: Option<String>,
}

impl From<AddressBody> for Address {
    fn from(b: AddressBody) -> Self {
        Address {
            recipient: b.recipient,
            line1: b.line1,
            line2: b.line2,
            city: b.city,
            state: b.state,
            postal_code: b.postal_code,
            country: b.country,
            phone: b.phone,
        }
    }
}

impl From<Address> for AddressBody {
    fn from(a: Address) -> Self {
        AddressBody {
            recipient: a.recipient,
            line1: a.line1,
            line2: a.line2,
            city: a.city,
            state: a.state,
            postal_code: a.postal_code,
            country: a.country,
            phone: a.phone,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub unit_price: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub items: Vec<CreateOrderItemRequest>,
    pub shipping_address: AddressBody,
    pub billing_address: Option<AddressBody>,
    pub notes: Option<String>,
}

impl CreateOrderRequest {
    fn into_input(self, user_id: Uuid) -> Result<NewOrderInput, AppError> {
        let lines = self
            .items
            .into_iter()
            .map(|i| {
                let unit_price = BigDecimal::from_str(&i.unit_price).map_err(|e| {
                    AppError::BadRequest(format!("Invalid unit_price '{}': {}", i.unit_price, e))
                })?;
                Ok(OrderLineInput {
                    product_id: i.product_id,
                    quantity: i.quantity,
                    unit_price,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(NewOrderInput {
            user_id,
            lines,
            shipping_address: self.shipping_address.into(),
            billing_address: self.billing_address.map(Into::into),
            notes: self.notes,
            payment_status: PaymentStatus::Pending,
        })
    }
}

/// What the payment gateway posts back once a checkout settles.
#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentCallbackRequest {
    /// The buyer the checkout belongs to
    pub user_id: Uuid,
    pub success: bool,
    pub failure_reason: Option<String>,
    pub order: CreateOrderRequest,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionRequest {
    /// Target status, e.g. "confirmed" or "shipped"
    pub status: String,
    pub description: Option<String>,
    pub tracking_number: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct NoteRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefundDecisionRequest {
    pub approve: bool,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PaymentStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: String,
    pub total_price: String,
}

impl From<OrderItemView> for OrderItemResponse {
    fn from(i: OrderItemView) -> Self {
        OrderItemResponse {
            id: i.id,
            product_id: i.product_id,
            quantity: i.quantity,
            unit_price: i.unit_price.to_string(),
            total_price: i.total_price.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TrackingResponse {
    pub status: String,
    pub description: String,
    pub actor_id: Uuid,
    pub created_at: String,
}

impl From<TrackingEntry> for TrackingResponse {
    fn from(t: TrackingEntry) -> Self {
        TrackingResponse {
            status: t.status,
            description: t.description,
            actor_id: t.actor_id,
            created_at: t.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub user_id: Uuid,
    pub status: String,
    pub payment_status: String,
    pub refund_status: String,
    pub total_amount: String,
    pub shipping_address: AddressBody,
    pub billing_address: Option<AddressBody>,
    pub notes: Option<String>,
    pub tracking_number: Option<String>,
    pub delivered_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub items: Vec<OrderItemResponse>,
    pub tracking: Vec<TrackingResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(o: OrderView) -> Self {
        OrderResponse {
            id: o.id,
            order_number: o.order_number,
            user_id: o.user_id,
            status: o.status.to_string(),
            payment_status: o.payment_status.to_string(),
            refund_status: o.refund_status.to_string(),
            total_amount: o.total_amount.to_string(),
            shipping_address: o.shipping_address.into(),
            billing_address: o.billing_address.map(Into::into),
            notes: o.notes,
            tracking_number: o.tracking_number,
            delivered_at: o.delivered_at.map(|d| d.to_rfc3339()),
            created_at: o.created_at.to_rfc3339(),
            updated_at: o.updated_at.to_rfc3339(),
            items: o.items.into_iter().map(Into::into).collect(),
            tracking: o.tracking.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders
///
/// Creates an order for the calling actor. Header, items, the first tracking
/// entry and (when enabled) the stock reservation commit together or not at
/// all.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Invalid order"),
        (status = 404, description = "Unknown product"),
        (status = 422, description = "Insufficient stock"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    req: HttpRequest,
    orders: web::Data<Orders>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = actor_from(&req)?;
    let input = body.into_inner().into_input(actor.id)?;

    let order = web::block(move || orders.create_order(input, &actor))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// POST /orders/payment-callback
///
/// Called by the payment gateway with an operator identity. A successful
/// payment creates the buyer's order already marked `paid`; a failed one
/// writes nothing.
#[utoipa::path(
    post,
    path = "/orders/payment-callback",
    request_body = PaymentCallbackRequest,
    responses(
        (status = 201, description = "Paid order created", body = OrderResponse),
        (status = 400, description = "Payment failed or invalid order"),
        (status = 409, description = "Caller is not the payment gateway"),
        (status = 422, description = "Insufficient stock"),
    ),
    tag = "orders"
)]
pub async fn payment_callback(
    req: HttpRequest,
    orders: web::Data<Orders>,
    body: web::Json<PaymentCallbackRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = actor_from(&req)?;
    let body = body.into_inner();
    let outcome = if body.success {
        PaymentOutcome::Succeeded(body.order.into_input(body.user_id)?)
    } else {
        PaymentOutcome::Failed {
            user_id: body.user_id,
            reason: body
                .failure_reason
                .unwrap_or_else(|| "declined".to_string()),
        }
    };

    let order = web::block(move || orders.handle_payment_callback(outcome, &actor))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders/{id}
///
/// Returns the order with its items and tracking trail.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    req: HttpRequest,
    orders: web::Data<Orders>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let actor = actor_from(&req)?;
    let id = path.into_inner();

    let order = web::block(move || orders.get_order(id, &actor))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// Newest first, without items or tracking. Customers only see their own.
#[utoipa::path(
    get,
    path = "/orders",
    params(PageParams),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    req: HttpRequest,
    orders: web::Data<Orders>,
    query: web::Query<PageParams>,
) -> Result<HttpResponse, AppError> {
    let actor = actor_from(&req)?;
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result = web::block(move || orders.list_orders(&actor, page, limit))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ListOrdersResponse {
        items: result.items.into_iter().map(Into::into).collect(),
        total: result.total,
        page,
        limit,
    }))
}

/// POST /orders/{id}/status
#[utoipa::path(
    post,
    path = "/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Status changed", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Illegal transition"),
    ),
    tag = "orders"
)]
pub async fn transition_status(
    req: HttpRequest,
    orders: web::Data<Orders>,
    path: web::Path<Uuid>,
    body: web::Json<TransitionRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = actor_from(&req)?;
    let id = path.into_inner();
    let body = body.into_inner();
    let change = StatusChange {
        status: OrderStatus::from_str(&body.status)?,
        description: body.description,
        tracking_number: body.tracking_number,
    };

    let order = web::block(move || orders.transition_status(id, &actor, change))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/cancel
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = NoteRequest,
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order can no longer be cancelled"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    req: HttpRequest,
    orders: web::Data<Orders>,
    path: web::Path<Uuid>,
    body: Option<web::Json<NoteRequest>>,
) -> Result<HttpResponse, AppError> {
    let actor = actor_from(&req)?;
    let id = path.into_inner();
    let reason = body.map(|b| b.into_inner()).unwrap_or_default().reason;

    let order = web::block(move || orders.cancel_order(id, &actor, reason))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/refund
#[utoipa::path(
    post,
    path = "/orders/{id}/refund",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = NoteRequest,
    responses(
        (status = 200, description = "Refund requested", body = OrderResponse),
        (status = 400, description = "Order is not paid"),
        (status = 409, description = "Refund already in progress"),
    ),
    tag = "orders"
)]
pub async fn request_refund(
    req: HttpRequest,
    orders: web::Data<Orders>,
    path: web::Path<Uuid>,
    body: Option<web::Json<NoteRequest>>,
) -> Result<HttpResponse, AppError> {
    let actor = actor_from(&req)?;
    let id = path.into_inner();
    let reason = body.map(|b| b.into_inner()).unwrap_or_default().reason;

    let order = web::block(move || orders.request_refund(id, &actor, reason))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/refund/decision
#[utoipa::path(
    post,
    path = "/orders/{id}/refund/decision",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = RefundDecisionRequest,
    responses(
        (status = 200, description = "Refund approved or rejected", body = OrderResponse),
        (status = 409, description = "No pending refund request"),
    ),
    tag = "orders"
)]
pub async fn decide_refund(
    req: HttpRequest,
    orders: web::Data<Orders>,
    path: web::Path<Uuid>,
    body: web::Json<RefundDecisionRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = actor_from(&req)?;
    let id = path.into_inner();
    let body = body.into_inner();

    let order = web::block(move || orders.decide_refund(id, &actor, body.approve, body.note))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/refund/complete
#[utoipa::path(
    post,
    path = "/orders/{id}/refund/complete",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Refund paid out", body = OrderResponse),
        (status = 409, description = "Refund not approved"),
    ),
    tag = "orders"
)]
pub async fn complete_refund(
    req: HttpRequest,
    orders: web::Data<Orders>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let actor = actor_from(&req)?;
    let id = path.into_inner();

    let order = web::block(move || orders.complete_refund(id, &actor))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/payment
#[utoipa::path(
    post,
    path = "/orders/{id}/payment",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = PaymentStatusRequest,
    responses(
        (status = 200, description = "Payment status changed", body = OrderResponse),
        (status = 409, description = "Illegal payment transition"),
    ),
    tag = "orders"
)]
pub async fn update_payment(
    req: HttpRequest,
    orders: web::Data<Orders>,
    path: web::Path<Uuid>,
    body: web::Json<PaymentStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let actor = actor_from(&req)?;
    let id = path.into_inner();
    let status = PaymentStatus::from_str(&body.status)?;

    let order = web::block(move || orders.update_payment_status(id, &actor, status))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(price: &str) -> CreateOrderRequest {
        serde_json::from_value(serde_json::json!({
            "items": [{ "product_id": Uuid::nil(), "quantity": 2, "unit_price": price }],
            "shipping_address": {
                "recipient": "Grace Hopper",
                "line1": "1 Orchid Way",
                "city": "Arlington",
                "postal_code": "22201",
                "country": "US"
            }
        }))
        .expect("valid request json")
    }

    #[test]
    fn request_converts_into_pending_order_for_the_caller() {
        let user = Uuid::new_v4();
        let input = request("12.50").into_input(user).unwrap();
        assert_eq!(input.user_id, user);
        assert_eq!(input.payment_status, PaymentStatus::Pending);
        assert_eq!(input.total_amount(), BigDecimal::from_str("25.00").unwrap());
        assert!(input.shipping_address.line2.is_none());
    }

    #[test]
    fn malformed_price_is_a_bad_request() {
        assert!(matches!(
            request("twelve").into_input(Uuid::new_v4()),
            Err(AppError::BadRequest(_))
        ));
    }
}
