// shipping_desk/src/models/address.rs

use serde::{Deserialize, Deserializer, Serialize};

/// Accepts a missing or `null` string and yields `""`.
fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// A postal address as sent to shipping providers.
///
/// `address_line2` is always present (possibly empty); several providers
/// reject a request where the key is missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
  pub name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub company: Option<String>,
  pub address_line1: String,
  #[serde(deserialize_with = "string_or_empty")]
  pub address_line2: String,
  pub city: String,
  pub state: String,
  pub postal_code: String,
  pub country: String,
  #[serde(deserialize_with = "string_or_empty")]
  pub phone: String,
}

impl Address {
  /// Trimmed copy with an upper-cased country code and empty optional parts collapsed.
  pub fn normalized(&self) -> Address {
    let company = self
      .company
      .as_deref()
      .map(str::trim)
      .filter(|c| !c.is_empty())
      .map(String::from);
    Address {
      name: self.name.trim().to_string(),
      company,
      address_line1: self.address_line1.trim().to_string(),
      address_line2: self.address_line2.trim().to_string(),
      city: self.city.trim().to_string(),
      state: self.state.trim().to_string(),
      postal_code: self.postal_code.trim().to_string(),
      country: self.country.trim().to_ascii_uppercase(),
      phone: self.phone.trim().to_string(),
    }
  }

  /// Lists every problem with the address; empty means valid.
  pub fn problems(&self) -> Vec<String> {
    let required = [
      ("name", &self.name),
      ("addressLine1", &self.address_line1),
      ("city", &self.city),
      ("state", &self.state),
      ("postalCode", &self.postal_code),
      ("country", &self.country),
    ];
    let mut problems: Vec<String> = required
      .iter()
      .filter(|(_, value)| value.trim().is_empty())
      .map(|(field, _)| format!("{} is required", field))
      .collect();

    let country = self.country.trim();
    if !country.is_empty() && (country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic())) {
      problems.push("country must be a two-letter ISO code".to_string());
    }
    problems
  }
}

/// Parcel weight in ounces and optional dimensions in inches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Parcel {
  pub weight_oz: f64,
  pub length_in: Option<f64>,
  pub width_in: Option<f64>,
  pub height_in: Option<f64>,
}

impl Parcel {
  pub fn problems(&self) -> Vec<String> {
    let mut problems = Vec::new();
    if !self.weight_oz.is_finite() || self.weight_oz <= 0.0 {
      problems.push("weightOz must be a positive number".to_string());
    }
    let dims = [self.length_in, self.width_in, self.height_in];
    let given = dims.iter().filter(|d| d.is_some()).count();
    if given != 0 && given != dims.len() {
      problems.push("lengthIn, widthIn and heightIn must be given together".to_string());
    }
    if dims.iter().flatten().any(|d| !d.is_finite() || *d <= 0.0) {
      problems.push("dimensions must be positive numbers".to_string());
    }
    problems
  }

  /// `(length, width, height)` when all three are known.
  pub fn dimensions(&self) -> Option<(f64, f64, f64)> {
    match (self.length_in, self.width_in, self.height_in) {
      (Some(l), Some(w), Some(h)) => Some((l, w, h)),
      _ => None,
    }
  }
}

/// A validated origin/destination/parcel triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentSpec {
  pub ship_from: Address,
  pub ship_to: Address,
  pub parcel: Parcel,
}
