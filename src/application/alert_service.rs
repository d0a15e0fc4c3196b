use uuid::Uuid;

use crate::domain::alert::{AlertType, NewStockAlert, StockAlert};
use crate::domain::errors::DomainError;
use crate::domain::ports::AlertRepository;

pub struct AlertService<A> {
    repo: A,
}

impl<A: AlertRepository> AlertService<A> {
    pub fn new(repo: A) -> Self {
        Self { repo }
    }

    /// Without an explicit threshold, low-stock alerts fall back to the
    /// product's `min_stock_level` and out-of-stock alerts to zero.
    pub fn create_alert(
        &self,
        product_id: Uuid,
        alert_type: AlertType,
        threshold: Option<i32>,
    ) -> Result<StockAlert, DomainError> {
        let threshold = match (threshold, alert_type) {
            (Some(t), _) => t,
            (None, AlertType::LowStock) => self.repo.min_stock_level(product_id)?,
            (None, AlertType::OutOfStock) => 0,
            (None, AlertType::Overstock) => {
                return Err(DomainError::InvalidInput(
                    "threshold_quantity is required for overstock alerts".to_string(),
                ))
            }
        };
        let alert = self
            .repo
            .create(NewStockAlert::new(product_id, alert_type, threshold)?)?;
        log::info!(
            "Created {} alert {} for product {} at threshold {}",
            alert.alert_type,
            alert.id,
            product_id,
            threshold
        );
        Ok(alert)
    }

    pub fn resolve_alert(&self, id: Uuid) -> Result<StockAlert, DomainError> {
        let alert = self.repo.resolve(id)?;
        log::info!("Resolved {} alert {}", alert.alert_type, alert.id);
        Ok(alert)
    }

    pub fn active_alerts(&self, product_id: Option<Uuid>) -> Result<Vec<StockAlert>, DomainError> {
        self.repo.list_active(product_id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    #[derive(Default)]
    struct MemoryAlerts {
        alerts: Mutex<Vec<StockAlert>>,
        min_levels: HashMap<Uuid, i32>,
    }

    impl AlertRepository for MemoryAlerts {
        fn create(&self, alert: NewStockAlert) -> Result<StockAlert, DomainError> {
            let mut alerts = self.alerts.lock().unwrap();
            if alerts.iter().any(|a| {
                a.is_active && a.product_id == alert.product_id && a.alert_type == alert.alert_type
            }) {
                return Err(DomainError::AlreadyExists("alert".to_string()));
            }
            let stored = StockAlert {
                id: Uuid::new_v4(),
                product_id: alert.product_id,
                alert_type: alert.alert_type,
                threshold_quantity: alert.threshold_quantity,
                current_quantity: 0,
                is_active: true,
                created_at: Utc::now(),
                resolved_at: None,
            };
            alerts.push(stored.clone());
            Ok(stored)
        }

        fn resolve(&self, id: Uuid) -> Result<StockAlert, DomainError> {
            let mut alerts = self.alerts.lock().unwrap();
            let alert = alerts
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or(DomainError::NotFound("Stock alert"))?;
            if alert.is_active {
                alert.is_active = false;
                alert.resolved_at = Some(Utc::now());
            }
            Ok(alert.clone())
        }

        fn list_active(&self, product_id: Option<Uuid>) -> Result<Vec<StockAlert>, DomainError> {
            Ok(self
                .alerts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| a.is_active && product_id.map_or(true, |p| a.product_id == p))
                .cloned()
                .collect())
        }

        fn min_stock_level(&self, product_id: Uuid) -> Result<i32, DomainError> {
            self.min_levels
                .get(&product_id)
                .copied()
                .ok_or(DomainError::NotFound("Product"))
        }
    }

    #[test]
    fn negative_threshold_is_rejected_before_storage() {
        let svc = AlertService::new(MemoryAlerts::default());
        assert!(matches!(
            svc.create_alert(Uuid::new_v4(), AlertType::LowStock, Some(-1)),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(svc.active_alerts(None).unwrap().is_empty());
    }

    #[test]
    fn resolved_alerts_drop_out_of_the_active_list() {
        let svc = AlertService::new(MemoryAlerts::default());
        let product = Uuid::new_v4();
        let low = svc.create_alert(product, AlertType::LowStock, Some(5)).unwrap();
        svc.create_alert(product, AlertType::Overstock, Some(200)).unwrap();
        svc.create_alert(Uuid::new_v4(), AlertType::OutOfStock, Some(0)).unwrap();

        assert_eq!(svc.active_alerts(Some(product)).unwrap().len(), 2);
        svc.resolve_alert(low.id).unwrap();
        let active = svc.active_alerts(Some(product)).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].alert_type, AlertType::Overstock);
    }

    #[test]
    fn low_stock_threshold_defaults_to_the_product_reorder_point() {
        let product = Uuid::new_v4();
        let svc = AlertService::new(MemoryAlerts {
            min_levels: HashMap::from([(product, 7)]),
            ..Default::default()
        });

        let low = svc.create_alert(product, AlertType::LowStock, None).unwrap();
        assert_eq!(low.threshold_quantity, 7);
        let out = svc.create_alert(product, AlertType::OutOfStock, None).unwrap();
        assert_eq!(out.threshold_quantity, 0);
        assert!(matches!(
            svc.create_alert(product, AlertType::Overstock, None),
            Err(DomainError::InvalidInput(_))
        ));
        assert!(matches!(
            svc.create_alert(Uuid::new_v4(), AlertType::LowStock, None),
            Err(DomainError::NotFound(_))
        ));

        // an explicit threshold wins over the reorder point
        svc.resolve_alert(low.id).unwrap();
        let custom = svc.create_alert(product, AlertType::LowStock, Some(2)).unwrap();
        assert_eq!(custom.threshold_quantity, 2);
    }
}
