use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::csrf::validate_token;
use crate::http::{FetchClient, FetchError, FetchRequest, RetryPolicy, Transport};

use super::filter::ProductFilter;
use super::types::{NewReview, Product, ProductDetails, ProductPage, Review};

/// Errors from catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error("review rating must be between 1 and 5, got {0}")]
  InvalidRating(u8),

  #[error("missing or malformed CSRF token")]
  MissingCsrfToken,
}

impl CatalogError {
  /// Short message suitable for showing to a shopper.
  pub fn user_message(&self) -> &'static str {
    match self {
      CatalogError::Fetch(e) => e.user_message(),
      CatalogError::InvalidRating(_) => "Please choose a rating from 1 to 5 stars.",
      CatalogError::MissingCsrfToken => "Your session has expired. Please refresh and try again.",
    }
  }
}

/// Typed access to the storefront catalog API.
pub struct CatalogClient<T: Transport> {
  http: FetchClient<T>,
  base_url: Url,
}

impl<T: Transport> Clone for CatalogClient<T> {
  fn clone(&self) -> Self {
    Self {
      http: self.http.clone(),
      base_url: self.base_url.clone(),
    }
  }
}

impl<T: Transport> CatalogClient<T> {
  /// `base_url` is the API root, e.g. `https://shop.example.com/api/`.
  pub fn new(http: FetchClient<T>, mut base_url: Url) -> Self {
    // Url::join drops the last segment unless the path ends with '/'
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }
    Self { http, base_url }
  }

  pub fn http(&self) -> &FetchClient<T> {
    &self.http
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  /// Resolve an API path (relative to the base URL) into a full URL.
  pub fn url(&self, path: &str) -> Result<Url, FetchError> {
    Ok(self.base_url.join(path.trim_start_matches('/'))?)
  }

  async fn get<D: DeserializeOwned>(&self, url: Url) -> Result<D, CatalogError> {
    let request = FetchRequest::get(url);
    let result = self.http.fetch_json(&request).await?;
    if result.is_cached() {
      debug!(url = %request.url, age = ?result.age, "served from cache");
    }
    Ok(result.data)
  }

  /// List products matching `filter`.
  pub async fn list_products(&self, filter: &ProductFilter) -> Result<ProductPage, CatalogError> {
    let mut url = self.url("products")?;
    let pairs = filter.query_pairs();
    if !pairs.is_empty() {
      url.query_pairs_mut().extend_pairs(pairs);
    }
    self.get(url).await
  }

  /// Get a single product by id.
  pub async fn get_product(&self, id: u64) -> Result<Product, CatalogError> {
    self.get(self.url(&format!("products/{}", id))?).await
  }

  /// Get reviews for a product.
  pub async fn get_reviews(&self, product_id: u64) -> Result<Vec<Review>, CatalogError> {
    self
      .get(self.url(&format!("products/{}/reviews", product_id))?)
      .await
  }

  /// Products from the same category, best rated first, excluding `product`.
  pub async fn related_products(
    &self,
    product: &Product,
    limit: usize,
  ) -> Result<Vec<Product>, CatalogError> {
    let Some(category) = product.category.clone() else {
      debug!(product = product.id, "no category, skipping related products");
      return Ok(Vec::new());
    };

    let filter = ProductFilter {
      categories: [category].into_iter().collect(),
      ..Default::default()
    };
    let page = self.list_products(&filter).await?;

    Ok(select_related(product, page.products, limit))
  }

  /// Product with its reviews and related products.
  ///
  /// Reviews and related products are fetched concurrently once the product
  /// itself is known.
  pub async fn product_details(
    &self,
    id: u64,
    related_limit: usize,
  ) -> Result<ProductDetails, CatalogError> {
    let product = self.get_product(id).await?;
    let (reviews, related) = tokio::try_join!(
      self.get_reviews(id),
      self.related_products(&product, related_limit)
    )?;

    Ok(ProductDetails {
      product,
      reviews,
      related,
    })
  }

  /// Submit a review. Requires a valid CSRF token.
  ///
  /// Sent once without retries: a 5xx after the server stored the review
  /// must not create a duplicate.
  ///
  /// On success every cached response for the product is invalidated so the
  /// new review and updated rating show up on the next fetch.
  pub async fn submit_review(
    &self,
    product_id: u64,
    review: &NewReview,
  ) -> Result<Review, CatalogError> {
    if !(1..=5).contains(&review.rating) {
      return Err(CatalogError::InvalidRating(review.rating));
    }

    let token = self.http.csrf().and_then(|csrf| csrf.get_token());
    if !token.as_deref().map(validate_token).unwrap_or(false) {
      return Err(CatalogError::MissingCsrfToken);
    }

    let request =
      FetchRequest::post(self.url(&format!("products/{}/reviews", product_id))?).json(review)?;
    let value = self.http.send_with(&request, RetryPolicy::NONE).await?;
    let created: Review = serde_json::from_value(value).map_err(FetchError::from)?;

    let removed = self.invalidate_product(product_id)?;
    info!(product = product_id, review = created.id, removed, "review submitted");

    Ok(created)
  }

  /// Drop cached responses that may show stale data for a product: the
  /// product itself, its sub-resources and every listing.
  fn invalidate_product(&self, product_id: u64) -> Result<usize, FetchError> {
    let detail = FetchRequest::get(self.url(&format!("products/{}", product_id))?);
    let listing = FetchRequest::get(self.url("products")?);
    let cache = self.http.cache();

    let mut removed = usize::from(cache.remove(&detail.cache_key()));
    removed += usize::from(cache.remove(&listing.cache_key()));
    // Trailing '/' keeps products/1 from matching products/10
    removed += self.http.invalidate(&format!("/products/{}/", product_id));
    removed += self.http.invalidate("/products?");
    Ok(removed)
  }
}

fn select_related(product: &Product, candidates: Vec<Product>, limit: usize) -> Vec<Product> {
  let mut related: Vec<Product> = candidates
    .into_iter()
    .filter(|p| p.id != product.id)
    .collect();
  related.sort_by(|a, b| b.rating.total_cmp(&a.rating));
  related.truncate(limit);
  related
}
