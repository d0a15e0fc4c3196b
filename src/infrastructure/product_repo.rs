use bigdecimal::{BigDecimal, Zero};
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::schema::products;

use super::models::{NewProductRow, ProductRow};

/// Minimal stand-in for the catalog service: it registers products and reads
/// them back. It has no way to write `stock_quantity`.
pub struct DieselProductCatalog {
    pool: DbPool,
}

impl DieselProductCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn create(
        &self,
        name: &str,
        price: BigDecimal,
        min_stock_level: i32,
    ) -> Result<ProductRow, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::InvalidInput("name must not be empty".to_string()));
        }
        if price < BigDecimal::zero() {
            return Err(DomainError::InvalidInput("price must not be negative".to_string()));
        }
        if min_stock_level < 0 {
            return Err(DomainError::InvalidInput(
                "min_stock_level must not be negative".to_string(),
            ));
        }

        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(products::table)
            .values(&NewProductRow {
                id: Uuid::new_v4(),
                name: name.trim().to_string(),
                price,
                min_stock_level,
            })
            .returning(ProductRow::as_returning())
            .get_result::<ProductRow>(&mut conn)?;
        log::info!("Registered product {} ({})", row.name, row.id);
        Ok(row)
    }

    pub fn find_by_id(&self, id: Uuid) -> Result<Option<ProductRow>, DomainError> {
        let mut conn = self.pool.get()?;
        Ok(products::table
            .find(id)
            .select(ProductRow::as_select())
            .first::<ProductRow>(&mut conn)
            .optional()?)
    }
}
