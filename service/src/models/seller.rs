// shipping_desk/src/models/seller.rs

use crate::models::Address;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Seller contact details and ship-from address.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SellerProfile {
  pub seller_id: Uuid,
  pub email: String,
  pub display_name: String,
  pub origin_name: String,
  pub origin_company: Option<String>,
  pub origin_line1: String,
  pub origin_line2: Option<String>,
  pub origin_city: String,
  pub origin_state: String,
  pub origin_postal_code: String,
  pub origin_country: String,
  pub origin_phone: Option<String>,
}

impl SellerProfile {
  pub fn origin_address(&self) -> Address {
    Address {
      name: self.origin_name.clone(),
      company: self.origin_company.clone(),
      address_line1: self.origin_line1.clone(),
      address_line2: self.origin_line2.clone().unwrap_or_default(),
      city: self.origin_city.clone(),
      state: self.origin_state.clone(),
      postal_code: self.origin_postal_code.clone(),
      country: self.origin_country.clone(),
      phone: self.origin_phone.clone().unwrap_or_default(),
    }
    .normalized()
  }
}
