//! Storefront API client: TTL response cache, retrying fetch layer, CSRF
//! token handling and a typed product catalog.

pub mod app;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod csrf;
pub mod http;
pub mod logging;
