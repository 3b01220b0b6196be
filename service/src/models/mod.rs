// shipping_desk/src/models/mod.rs

//! Data structures for database rows, provider results and request bodies.

pub mod address;
pub mod order;
pub mod order_item;
pub mod product;
pub mod rate;
pub mod requests;
pub mod seller;
pub mod shipment;

pub use address::{Address, Parcel, ShipmentSpec};
pub use order::{Order, OrderStatus};
pub use order_item::{NewOrderItem, OrderItem};
pub use product::Product;
pub use rate::{ProviderId, PurchasedLabel, QuotedRate, Rate};
pub use requests::{PurchaseRequest, RateQuoteRequest};
pub use seller::SellerProfile;
pub use shipment::{LabelReceipt, NewShipment, Shipment};
