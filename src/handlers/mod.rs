pub mod alerts;
pub mod inventory;
pub mod orders;
pub mod products;

use actix_web::HttpRequest;
use serde::Deserialize;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

use crate::domain::order::{Actor, ActorRole};
use crate::errors::AppError;

pub const ACTOR_ID_HEADER: &str = "X-Actor-Id";
pub const ACTOR_ROLE_HEADER: &str = "X-Actor-Role";

/// Reads the acting identity forwarded by the auth layer in front of us.
/// The role defaults to `customer` when absent.
pub fn actor_from(req: &HttpRequest) -> Result<Actor, AppError> {
    let id = header(req, ACTOR_ID_HEADER)?
        .ok_or_else(|| AppError::BadRequest(format!("{ACTOR_ID_HEADER} header is required")))?;
    let id = Uuid::parse_str(id)
        .map_err(|_| AppError::BadRequest(format!("{ACTOR_ID_HEADER} must be a UUID")))?;

    let role = match header(req, ACTOR_ROLE_HEADER)? {
        Some(role) => role.trim().to_ascii_lowercase().parse::<ActorRole>()?,
        None => ActorRole::Customer,
    };
    Ok(Actor { id, role })
}

fn header<'a>(req: &'a HttpRequest, name: &str) -> Result<Option<&'a str>, AppError> {
    req.headers()
        .get(name)
        .map(|v| {
            v.to_str()
                .map_err(|_| AppError::BadRequest(format!("{name} header is not valid text")))
        })
        .transpose()
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(OpenApi)]
#[openapi(
    paths(
        orders::create_order,
        orders::payment_callback,
        orders::get_order,
        orders::list_orders,
        orders::transition_status,
        orders::cancel_order,
        orders::request_refund,
        orders::decide_refund,
        orders::complete_refund,
        orders::update_payment,
        inventory::record_transaction,
        inventory::reconcile,
        inventory::history,
        inventory::audit,
        alerts::create_alert,
        alerts::resolve_alert,
        alerts::list_alerts,
        products::create_product,
        products::get_product,
    ),
    tags(
        (name = "orders", description = "Order creation and fulfillment"),
        (name = "inventory", description = "Stock ledger"),
        (name = "alerts", description = "Stock alerts"),
        (name = "products", description = "Product registration"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn actor_defaults_to_customer() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((ACTOR_ID_HEADER, id.to_string()))
            .to_http_request();
        assert_eq!(actor_from(&req).unwrap(), Actor::customer(id));
    }

    #[test]
    fn admin_role_is_an_operator() {
        let id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((ACTOR_ID_HEADER, id.to_string()))
            .insert_header((ACTOR_ROLE_HEADER, "Admin"))
            .to_http_request();
        assert!(actor_from(&req).unwrap().is_operator());
    }

    #[test]
    fn missing_or_malformed_actor_is_a_bad_request() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(actor_from(&req), Err(AppError::BadRequest(_))));

        let req = TestRequest::default()
            .insert_header((ACTOR_ID_HEADER, "not-a-uuid"))
            .to_http_request();
        assert!(matches!(actor_from(&req), Err(AppError::BadRequest(_))));

        let req = TestRequest::default()
            .insert_header((ACTOR_ID_HEADER, Uuid::new_v4().to_string()))
            .insert_header((ACTOR_ROLE_HEADER, "florist"))
            .to_http_request();
        assert!(matches!(actor_from(&req), Err(AppError::BadRequest(_))));
    }
}
