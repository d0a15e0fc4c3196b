pub mod alert_service;
pub mod inventory_service;
pub mod order_service;
