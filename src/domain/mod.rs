pub mod alert;
pub mod errors;
pub mod inventory;
pub mod order;
pub mod ports;
