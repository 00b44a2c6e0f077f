//! Storefront catalog: products, reviews and related products.

mod client;
mod filter;
mod types;

pub use client::{CatalogClient, CatalogError};
pub use filter::{PriceRange, ProductFilter, SortOrder};
pub use types::{NewReview, Product, ProductDetails, ProductPage, Review};
