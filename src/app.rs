use crate::cache::CacheStore;
use crate::catalog::{CatalogClient, CatalogError, NewReview, PriceRange, ProductFilter, SortOrder};
use crate::config::Config;
use crate::csrf::{CsrfTokens, FileTokenStore, JarCookies, MemoryTokenStore, TokenStore};
use crate::http::{FetchClient, FetchError, FetchRequest, RequestBatcher, ReqwestTransport};
use clap::{Args, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Catalog client wired to the real HTTP transport
pub type Catalog = CatalogClient<ReqwestTransport>;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// List products
  Products(ProductArgs),
  /// Show a product with its reviews and related products
  Product {
    id: u64,
    /// Number of related products to include
    #[arg(long, default_value_t = 4)]
    related: usize,
  },
  /// Fetch one or more API paths in batches
  Get {
    #[arg(required = true)]
    paths: Vec<String>,
  },
  /// Submit a review for a product
  Review {
    id: u64,
    #[arg(long)]
    rating: u8,
    #[arg(long)]
    comment: String,
    #[arg(long)]
    title: Option<String>,
  },
  /// Print the current CSRF token
  Token,
  /// Report CSRF token changes until interrupted
  WatchToken,
}

#[derive(Args, Debug, Default)]
pub struct ProductArgs {
  /// Filter by category (repeatable)
  #[arg(short, long)]
  pub category: Vec<String>,
  #[arg(long)]
  pub min_price: Option<f64>,
  #[arg(long)]
  pub max_price: Option<f64>,
  /// Upper end of the price slider
  #[arg(long, default_value_t = 1000.0)]
  pub price_ceiling: f64,
  #[arg(long)]
  pub min_rating: Option<u8>,
  #[arg(long)]
  pub in_stock: bool,
  /// featured, price-asc, price-desc, rating or newest
  #[arg(long, default_value = "featured")]
  pub sort: SortOrder,
  #[arg(short, long)]
  pub search: Option<String>,
  #[arg(long)]
  pub page: Option<u32>,
}

impl ProductArgs {
  pub fn to_filter(&self) -> Result<ProductFilter> {
    for (flag, value) in [
      ("--min-price", self.min_price),
      ("--max-price", self.max_price),
      ("--price-ceiling", Some(self.price_ceiling)),
    ] {
      if let Some(value) = value.filter(|v| !v.is_finite()) {
        return Err(eyre!("{} must be a finite number, got {}", flag, value));
      }
    }

    let price = (self.min_price.is_some() || self.max_price.is_some()).then(|| {
      let mut range = PriceRange::new(0.0, self.price_ceiling);
      if let Some(max) = self.max_price {
        range.set_max(max);
      }
      if let Some(min) = self.min_price {
        range.set_min(min);
      }
      range
    });

    Ok(ProductFilter {
      categories: self.category.iter().cloned().collect(),
      price,
      min_rating: self.min_rating,
      in_stock_only: self.in_stock,
      search: self.search.clone(),
      sort: self.sort,
      page: self.page,
    })
  }
}

/// Owns the shared cache and every client built on top of it.
pub struct App {
  config: Config,
  cache: Arc<CacheStore>,
  csrf: CsrfTokens,
  catalog: Catalog,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let base_url = config.base_url()?;
    let transport = ReqwestTransport::new(&config.api.user_agent)?;

    let token_store: Arc<dyn TokenStore> = match config
      .csrf
      .token_file
      .clone()
      .or_else(FileTokenStore::default_path)
    {
      Some(path) => Arc::new(FileTokenStore::new(path)),
      None => Arc::new(MemoryTokenStore::default()),
    };
    let cookies = Arc::new(JarCookies::new(transport.cookie_jar(), base_url.clone()));
    let csrf = CsrfTokens::new(cookies, token_store)
      .with_cookie_name(config.csrf.cookie_name.clone())
      .with_header_name(config.csrf_header()?)
      .with_poll_interval(config.csrf_poll_interval());

    let cache = Arc::new(CacheStore::with_ttl(config.cache_ttl()));
    let http = FetchClient::new(transport, Arc::clone(&cache))
      .with_retry(config.retry_policy())
      .with_batcher(RequestBatcher::new(config.batch.size))
      .with_csrf(csrf.clone());
    let catalog = CatalogClient::new(http, base_url);

    debug!(base_url = %catalog.base_url(), ttl_secs = config.cache.ttl_secs, "app initialized");

    Ok(Self {
      config,
      cache,
      csrf,
      catalog,
    })
  }

  pub fn config(&self) -> &Config {
    &self.config
  }

  pub fn catalog(&self) -> &Catalog {
    &self.catalog
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Products(args) => {
        let page = self
          .catalog
          .list_products(&args.to_filter()?)
          .await
          .map_err(catalog_error)?;
        print_json(&page)
      }
      Command::Product { id, related } => {
        let details = self
          .catalog
          .product_details(id, related)
          .await
          .map_err(catalog_error)?;
        print_json(&details)
      }
      Command::Get { paths } => {
        let requests = paths
          .iter()
          .map(|path| self.catalog.url(path).map(FetchRequest::get))
          .collect::<Result<Vec<_>, FetchError>>()
          .map_err(fetch_error)?;
        let values = self
          .catalog
          .http()
          .fetch_all(&requests)
          .await
          .map_err(fetch_error)?;
        print_json(&values)
      }
      Command::Review {
        id,
        rating,
        comment,
        title,
      } => {
        let review = NewReview {
          rating,
          title,
          comment,
        };
        let created = self
          .catalog
          .submit_review(id, &review)
          .await
          .map_err(catalog_error)?;
        print_json(&created)
      }
      Command::Token => match self.csrf.get_token() {
        Some(token) => {
          println!("{}", token);
          Ok(())
        }
        None => Err(eyre!("No CSRF token available")),
      },
      Command::WatchToken => {
        let monitor = self.csrf.monitor(|token| match token {
          Some(token) => println!("{}", token),
          None => println!("<none>"),
        });
        info!(
          interval_secs = self.config.csrf.poll_interval_secs,
          "watching CSRF token, press Ctrl-C to stop"
        );
        tokio::signal::ctrl_c().await?;
        monitor.cancel().await;
        Ok(())
      }
    }
  }

  /// Release cached responses. Called once on exit.
  pub fn shutdown(self) {
    let entries = self.cache.len();
    self.cache.clear();
    debug!(entries, "cache cleared on shutdown");
  }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn fetch_error(err: FetchError) -> color_eyre::Report {
  eyre!("{} ({})", err.user_message(), err)
}

fn catalog_error(err: CatalogError) -> color_eyre::Report {
  eyre!("{} ({})", err.user_message(), err)
}
