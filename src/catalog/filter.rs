//! Product listing filters and the price-range value model.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Price range selected with a two-thumb slider.
///
/// Both thumbs live inside `[floor, ceiling]` and never get closer than
/// `min_gap`; moving one thumb past the other stops at the gap instead of
/// swapping them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
  floor: f64,
  ceiling: f64,
  min_gap: f64,
  min: f64,
  max: f64,
}

impl PriceRange {
  /// Full range `[floor, ceiling]` selected, no minimum gap.
  ///
  /// A non-finite bound collapses to 0.0.
  pub fn new(floor: f64, ceiling: f64) -> Self {
    let finite = |v: f64| if v.is_finite() { v } else { 0.0 };
    let (floor, ceiling) = (finite(floor), finite(ceiling));
    let (floor, ceiling) = if floor <= ceiling {
      (floor, ceiling)
    } else {
      (ceiling, floor)
    };
    Self {
      floor,
      ceiling,
      min_gap: 0.0,
      min: floor,
      max: ceiling,
    }
  }

  /// Require at least `gap` between the thumbs (capped at the full width).
  ///
  /// A gap at or above the full width pins the thumbs to the bounds.
  pub fn with_min_gap(mut self, gap: f64) -> Self {
    if gap.is_nan() {
      return self;
    }
    let width = self.ceiling - self.floor;
    if gap >= width {
      self.min_gap = width;
      self.min = self.floor;
      self.max = self.ceiling;
      return self;
    }

    self.min_gap = gap.max(0.0);
    if self.max - self.min < self.min_gap {
      self.max = (self.min + self.min_gap).min(self.ceiling);
      self.min = (self.max - self.min_gap).max(self.floor);
    }
    self
  }

  pub fn min(&self) -> f64 {
    self.min
  }

  pub fn max(&self) -> f64 {
    self.max
  }

  pub fn floor(&self) -> f64 {
    self.floor
  }

  pub fn ceiling(&self) -> f64 {
    self.ceiling
  }

  /// Move the lower thumb, clamped to `[floor, max - min_gap]`.
  /// Non-finite values are ignored.
  pub fn set_min(&mut self, value: f64) {
    if !value.is_finite() || self.is_pinned() {
      return;
    }
    // Rounding in `max - min_gap` can dip below the floor
    let hi = (self.max - self.min_gap).max(self.floor);
    self.min = value.max(self.floor).min(hi);
  }

  /// Move the upper thumb, clamped to `[min + min_gap, ceiling]`.
  /// Non-finite values are ignored.
  pub fn set_max(&mut self, value: f64) {
    if !value.is_finite() || self.is_pinned() {
      return;
    }
    let lo = (self.min + self.min_gap).min(self.ceiling);
    self.max = value.min(self.ceiling).max(lo);
  }

  // Gap spans the whole track, neither thumb can move
  fn is_pinned(&self) -> bool {
    self.min_gap >= self.ceiling - self.floor
  }

  /// Price at a relative track position (0.0 = floor, 1.0 = ceiling).
  pub fn value_at(&self, fraction: f64) -> f64 {
    let fraction = if fraction.is_nan() {
      0.0
    } else {
      fraction.clamp(0.0, 1.0)
    };
    self.floor + (self.ceiling - self.floor) * fraction
  }

  /// Relative track position of a price, the inverse of `value_at`.
  pub fn fraction_of(&self, value: f64) -> f64 {
    let width = self.ceiling - self.floor;
    if width <= 0.0 {
      return 0.0;
    }
    ((value - self.floor) / width).clamp(0.0, 1.0)
  }

  /// Whether the selection is narrower than the full range.
  pub fn is_narrowed(&self) -> bool {
    self.min > self.floor || self.max < self.ceiling
  }

  pub fn contains(&self, price: f64) -> bool {
    price >= self.min && price <= self.max
  }
}

/// Sort order for product listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
  #[default]
  Featured,
  PriceAsc,
  PriceDesc,
  Rating,
  Newest,
}

impl SortOrder {
  pub fn as_str(&self) -> &'static str {
    match self {
      SortOrder::Featured => "featured",
      SortOrder::PriceAsc => "price_asc",
      SortOrder::PriceDesc => "price_desc",
      SortOrder::Rating => "rating",
      SortOrder::Newest => "newest",
    }
  }
}

impl fmt::Display for SortOrder {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SortOrder {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().replace('-', "_").as_str() {
      "featured" => Ok(SortOrder::Featured),
      "price_asc" | "price" => Ok(SortOrder::PriceAsc),
      "price_desc" => Ok(SortOrder::PriceDesc),
      "rating" => Ok(SortOrder::Rating),
      "newest" => Ok(SortOrder::Newest),
      other => Err(format!("unknown sort order: {}", other)),
    }
  }
}

/// Filters for the product listing endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilter {
  pub categories: BTreeSet<String>,
  pub price: Option<PriceRange>,
  pub min_rating: Option<u8>,
  pub in_stock_only: bool,
  pub search: Option<String>,
  pub sort: SortOrder,
  pub page: Option<u32>,
}

impl ProductFilter {
  /// Query parameters in a stable order, so equal filters share a cache key.
  pub fn query_pairs(&self) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
      pairs.push(("q".to_string(), search.to_string()));
    }
    // BTreeSet iterates sorted
    for category in &self.categories {
      pairs.push(("category[]".to_string(), category.clone()));
    }
    if let Some(range) = self.price.filter(PriceRange::is_narrowed) {
      pairs.push(("min_price".to_string(), format_price(range.min())));
      pairs.push(("max_price".to_string(), format_price(range.max())));
    }
    if let Some(rating) = self.min_rating {
      pairs.push(("min_rating".to_string(), rating.min(5).to_string()));
    }
    if self.in_stock_only {
      pairs.push(("in_stock".to_string(), "1".to_string()));
    }
    if self.sort != SortOrder::Featured {
      pairs.push(("sort".to_string(), self.sort.to_string()));
    }
    if let Some(page) = self.page.filter(|p| *p > 1) {
      pairs.push(("page".to_string(), page.to_string()));
    }

    pairs
  }
}

fn format_price(value: f64) -> String {
  if value.fract() == 0.0 {
    format!("{}", value as i64)
  } else {
    format!("{:.2}", value)
  }
}
