use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertType {
    LowStock,
    OutOfStock,
    Overstock,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "low_stock",
            AlertType::OutOfStock => "out_of_stock",
            AlertType::Overstock => "overstock",
        }
    }

    /// Whether `stock` crosses this alert's threshold.
    pub fn is_triggered(&self, threshold: i32, stock: i32) -> bool {
        match self {
            AlertType::LowStock => stock <= threshold,
            AlertType::OutOfStock => stock == 0,
            AlertType::Overstock => stock >= threshold,
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low_stock" => Ok(AlertType::LowStock),
            "out_of_stock" => Ok(AlertType::OutOfStock),
            "overstock" => Ok(AlertType::Overstock),
            other => Err(DomainError::InvalidInput(format!("unknown alert type '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAlert {
    pub id: Uuid,
    pub product_id: Uuid,
    pub alert_type: AlertType,
    pub threshold_quantity: i32,
    pub current_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertEvaluation {
    pub alert: StockAlert,
    pub triggered: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct NewStockAlert {
    pub product_id: Uuid,
    pub alert_type: AlertType,
    pub threshold_quantity: i32,
}

impl NewStockAlert {
    pub fn new(product_id: Uuid, alert_type: AlertType, threshold: i32) -> Result<Self, DomainError> {
        if threshold < 0 {
            return Err(DomainError::InvalidInput(format!(
                "threshold must be >= 0, got {threshold}"
            )));
        }
        Ok(Self {
            product_id,
            alert_type,
            threshold_quantity: threshold,
        })
    }
}

/// Evaluates every active alert against a fresh stock reading.
///
/// `current_quantity` is the last observed stock, so every active alert takes
/// the reading whether or not it triggers. Nothing is resolved here; inactive
/// alerts are dropped from the result.
pub fn evaluate(alerts: Vec<StockAlert>, stock: i32) -> Vec<AlertEvaluation> {
    alerts
        .into_iter()
        .filter(|a| a.is_active)
        .map(|mut alert| {
            let triggered = alert
                .alert_type
                .is_triggered(alert.threshold_quantity, stock);
            alert.current_quantity = stock;
            AlertEvaluation { alert, triggered }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(alert_type: AlertType, threshold: i32) -> StockAlert {
        StockAlert {
            id: Uuid::new_v4(),
            product_id: Uuid::nil(),
            alert_type,
            threshold_quantity: threshold,
            current_quantity: -1,
            is_active: true,
            created_at: Utc::now(),
            resolved_at: None,
        }
    }

    #[test]
    fn low_stock_triggers_at_or_below_threshold() {
        assert!(AlertType::LowStock.is_triggered(10, 10));
        assert!(AlertType::LowStock.is_triggered(10, 3));
        assert!(!AlertType::LowStock.is_triggered(10, 11));
    }

    #[test]
    fn out_of_stock_triggers_only_at_zero() {
        assert!(AlertType::OutOfStock.is_triggered(0, 0));
        assert!(!AlertType::OutOfStock.is_triggered(0, 1));
        // threshold is irrelevant for out-of-stock
        assert!(!AlertType::OutOfStock.is_triggered(5, 3));
    }

    #[test]
    fn overstock_triggers_at_or_above_threshold() {
        assert!(AlertType::Overstock.is_triggered(100, 100));
        assert!(!AlertType::Overstock.is_triggered(100, 99));
    }

    #[test]
    fn evaluate_flags_triggers_and_records_observed_stock() {
        let result = evaluate(
            vec![alert(AlertType::LowStock, 10), alert(AlertType::Overstock, 100)],
            5,
        );
        assert_eq!(result.len(), 2);
        assert!(result[0].triggered);
        assert_eq!(result[0].alert.current_quantity, 5);
        assert!(!result[1].triggered);
        assert_eq!(result[1].alert.current_quantity, 5);
    }

    #[test]
    fn triggered_alerts_remain_active() {
        let result = evaluate(vec![alert(AlertType::OutOfStock, 0)], 0);
        assert!(result[0].triggered);
        assert!(result[0].alert.is_active);
    }

    #[test]
    fn restock_updates_out_of_stock_alert_but_keeps_it_active() {
        let result = evaluate(vec![alert(AlertType::OutOfStock, 0)], 50);
        assert!(!result[0].triggered);
        assert!(result[0].alert.is_active);
        assert_eq!(result[0].alert.current_quantity, 50);
    }

    #[test]
    fn inactive_alerts_are_ignored() {
        let mut resolved = alert(AlertType::LowStock, 10);
        resolved.is_active = false;
        assert!(evaluate(vec![resolved], 0).is_empty());
    }

    #[test]
    fn negative_threshold_is_rejected() {
        assert!(NewStockAlert::new(Uuid::nil(), AlertType::LowStock, -1).is_err());
        assert!(NewStockAlert::new(Uuid::nil(), AlertType::LowStock, 0).is_ok());
    }
}
