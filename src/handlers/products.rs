use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::errors::AppError;
use crate::infrastructure::models::ProductRow;
use crate::infrastructure::product_repo::DieselProductCatalog;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    /// Decimal price as a string, e.g. "4.50"
    pub price: String,
    /// Reorder point; low-stock alerts created without a threshold use it
    #[serde(default)]
    pub min_stock_level: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub price: String,
    pub stock_quantity: i32,
    pub min_stock_level: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ProductRow> for ProductResponse {
    fn from(p: ProductRow) -> Self {
        ProductResponse {
            id: p.id,
            name: p.name,
            price: p.price.to_string(),
            stock_quantity: p.stock_quantity,
            min_stock_level: p.min_stock_level,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

/// POST /products
///
/// Registers a product with zero stock; stock arrives through the ledger.
#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product registered", body = ProductResponse),
        (status = 400, description = "Invalid product"),
    ),
    tag = "products"
)]
pub async fn create_product(
    catalog: web::Data<DieselProductCatalog>,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();
    let price = BigDecimal::from_str(&body.price)
        .map_err(|e| AppError::BadRequest(format!("Invalid price '{}': {}", body.price, e)))?;

    let product = web::block(move || catalog.create(&body.name, price, body.min_stock_level))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(ProductResponse::from(product)))
}

/// GET /products/{id}
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn get_product(
    catalog: web::Data<DieselProductCatalog>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let product = web::block(move || catalog.find_by_id(id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??
        .ok_or(DomainError::NotFound("Product"))?;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}
