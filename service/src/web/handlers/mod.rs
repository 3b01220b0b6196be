// shipping_desk/src/web/handlers/mod.rs

pub mod label_handlers;
pub mod maintenance_handlers;
pub mod order_handlers;
pub mod rate_handlers;
pub mod webhook_handlers;
