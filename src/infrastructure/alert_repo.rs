use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::alert::{NewStockAlert, StockAlert};
use crate::domain::errors::DomainError;
use crate::domain::ports::AlertRepository;
use crate::schema::{products, stock_alerts};

use super::ledger::lock_stock;
use super::models::{NewStockAlertRow, StockAlertRow};

pub struct DieselAlertRepository {
    pool: DbPool,
}

impl DieselAlertRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn already_active(alert: &NewStockAlert) -> DomainError {
    DomainError::AlreadyExists(format!(
        "Active {} alert for product {}",
        alert.alert_type, alert.product_id
    ))
}

impl AlertRepository for DieselAlertRepository {
    fn create(&self, alert: NewStockAlert) -> Result<StockAlert, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Holding the product lock keeps current_quantity in step with
            // concurrent ledger writes.
            let stock = lock_stock(conn, alert.product_id)?;

            let active: i64 = stock_alerts::table
                .filter(stock_alerts::product_id.eq(alert.product_id))
                .filter(stock_alerts::alert_type.eq(alert.alert_type.as_str()))
                .filter(stock_alerts::is_active.eq(true))
                .count()
                .get_result(conn)?;
            if active > 0 {
                return Err(already_active(&alert));
            }

            let row: StockAlertRow = diesel::insert_into(stock_alerts::table)
                .values(&NewStockAlertRow {
                    id: Uuid::new_v4(),
                    product_id: alert.product_id,
                    alert_type: alert.alert_type.as_str().to_string(),
                    threshold_quantity: alert.threshold_quantity,
                    current_quantity: stock,
                })
                .returning(StockAlertRow::as_returning())
                .get_result(conn)
                .map_err(|e| match e {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        already_active(&alert)
                    }
                    other => other.into(),
                })?;

            StockAlert::try_from(row)
        })
    }

    fn resolve(&self, id: Uuid) -> Result<StockAlert, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row: StockAlertRow = stock_alerts::table
                .find(id)
                .select(StockAlertRow::as_select())
                .for_update()
                .first(conn)
                .optional()?
                .ok_or(DomainError::NotFound("Stock alert"))?;

            if !row.is_active {
                return StockAlert::try_from(row);
            }

            let row: StockAlertRow = diesel::update(stock_alerts::table.find(id))
                .set((
                    stock_alerts::is_active.eq(false),
                    stock_alerts::resolved_at.eq(Some(Utc::now())),
                ))
                .returning(StockAlertRow::as_returning())
                .get_result(conn)?;
            StockAlert::try_from(row)
        })
    }

    fn list_active(&self, product_id: Option<Uuid>) -> Result<Vec<StockAlert>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = stock_alerts::table
            .filter(stock_alerts::is_active.eq(true))
            .select(StockAlertRow::as_select())
            .order(stock_alerts::created_at.desc())
            .into_boxed();
        if let Some(product_id) = product_id {
            query = query.filter(stock_alerts::product_id.eq(product_id));
        }

        query
            .load::<StockAlertRow>(&mut conn)?
            .into_iter()
            .map(StockAlert::try_from)
            .collect()
    }

    fn min_stock_level(&self, product_id: Uuid) -> Result<i32, DomainError> {
        let mut conn = self.pool.get()?;

        products::table
            .find(product_id)
            .select(products::min_stock_level)
            .first::<i32>(&mut conn)
            .optional()?
            .ok_or(DomainError::NotFound("Product"))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use super::DieselAlertRepository;
    use crate::domain::alert::{AlertType, NewStockAlert};
    use crate::domain::errors::DomainError;
    use crate::domain::ports::AlertRepository;
    use crate::infrastructure::product_repo::DieselProductCatalog;
    use crate::infrastructure::test_support::setup_db;

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn second_active_alert_for_same_pair_is_rejected() {
        let (_container, pool) = setup_db().await;
        let repo = DieselAlertRepository::new(pool.clone());
        let product = DieselProductCatalog::new(pool)
            .create("Tulips", BigDecimal::from_str("2.00").unwrap(), 10)
            .expect("product")
            .id;
        let new = NewStockAlert::new(product, AlertType::LowStock, 10).unwrap();

        repo.create(new).expect("first alert");
        assert!(matches!(repo.create(new), Err(DomainError::AlreadyExists(_))));

        // a different type on the same product is fine
        repo.create(NewStockAlert::new(product, AlertType::Overstock, 500).unwrap())
            .expect("overstock alert");
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn resolving_frees_the_pair_for_a_new_alert() {
        let (_container, pool) = setup_db().await;
        let repo = DieselAlertRepository::new(pool.clone());
        let product = DieselProductCatalog::new(pool)
            .create("Lilies", BigDecimal::from_str("3.25").unwrap(), 0)
            .expect("product")
            .id;
        let new = NewStockAlert::new(product, AlertType::OutOfStock, 0).unwrap();

        let first = repo.create(new).expect("first alert");
        let resolved = repo.resolve(first.id).expect("resolve");
        assert!(!resolved.is_active);
        assert!(resolved.resolved_at.is_some());

        // resolving twice is harmless
        let again = repo.resolve(first.id).expect("resolve again");
        assert_eq!(again.resolved_at, resolved.resolved_at);

        repo.create(new).expect("new alert after resolution");
        assert_eq!(repo.list_active(Some(product)).expect("list").len(), 1);
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn unknown_ids_are_not_found() {
        let (_container, pool) = setup_db().await;
        let repo = DieselAlertRepository::new(pool);

        assert!(matches!(repo.resolve(Uuid::new_v4()), Err(DomainError::NotFound(_))));
        assert!(matches!(
            repo.create(NewStockAlert::new(Uuid::new_v4(), AlertType::LowStock, 1).unwrap()),
            Err(DomainError::NotFound(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires a container runtime"]
    async fn reorder_point_comes_from_the_catalog() {
        let (_container, pool) = setup_db().await;
        let repo = DieselAlertRepository::new(pool.clone());
        let product = DieselProductCatalog::new(pool)
            .create("Peonies", BigDecimal::from_str("4.50").unwrap(), 6)
            .expect("product")
            .id;

        assert_eq!(repo.min_stock_level(product).expect("level"), 6);
        assert!(matches!(
            repo.min_stock_level(Uuid::new_v4()),
            Err(DomainError::NotFound(_))
        ));
    }
}
