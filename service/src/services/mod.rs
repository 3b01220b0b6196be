// shipping_desk/src/services/mod.rs

pub mod addresses;
pub mod label_storage;
pub mod ledger;
pub mod notifier;
pub mod payment_signature;
pub mod providers;
pub mod rate_token;
