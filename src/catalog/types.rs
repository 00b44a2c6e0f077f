use serde::{Deserialize, Serialize};

/// A product as listed in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub id: u64,
  pub name: String,
  #[serde(default)]
  pub slug: String,
  #[serde(default)]
  pub description: Option<String>,
  pub price: f64,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub image_url: Option<String>,
  /// Average review rating, 0-5
  #[serde(default)]
  pub rating: f32,
  #[serde(default)]
  pub review_count: u32,
  #[serde(default = "default_in_stock")]
  pub in_stock: bool,
}

fn default_in_stock() -> bool {
  true
}

/// One page of a product listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPage {
  pub products: Vec<Product>,
  #[serde(default)]
  pub total: u64,
  #[serde(default = "first_page")]
  pub page: u32,
  #[serde(default)]
  pub per_page: u32,
}

fn first_page() -> u32 {
  1
}

/// A customer review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
  pub id: u64,
  pub product_id: u64,
  pub author: String,
  /// 1-5 stars
  pub rating: u8,
  #[serde(default)]
  pub title: Option<String>,
  #[serde(default)]
  pub comment: String,
  #[serde(default)]
  pub created_at: Option<String>,
}

/// Payload for submitting a review
#[derive(Debug, Clone, Serialize)]
pub struct NewReview {
  pub rating: u8,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  pub comment: String,
}

/// Everything shown on a product detail screen
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetails {
  pub product: Product,
  pub reviews: Vec<Review>,
  pub related: Vec<Product>,
}
