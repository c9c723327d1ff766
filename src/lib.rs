//! # GitHub Search Scraper
//!
//! A Rust library for scraping GitHub's HTML search results page and the
//! language breakdown of every repository it lists, while staying polite to
//! the site: jittered request pacing, optional proxy selection and a
//! directory-backed response cache.
//!
//! ## Main Components
//!
//! - [`GitHubSearcher`]: runs a search and assembles the result records
//! - [`CachedFetcher`]: paced, cached HTTP session behind the [`PageFetcher`] trait
//! - [`extract_result_urls`] / [`extract_repo_info`]: markup extraction
//! - [`Config`]: typed configuration read from the environment
//! - [`Args`]: command line arguments
//!
//! ## Example
//!
//! ```no_run
//! use github_search_scraper_lib::{CachedFetcher, Config, GitHubSearcher, SearchRequest, SearchType};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let config = Config::from_env()?;
//!     let request = SearchRequest::new(
//!         vec!["python".to_string(), "jwt".to_string()],
//!         SearchType::Repositories,
//!         vec![],
//!     )?;
//!
//!     let fetcher = CachedFetcher::open(&config.fetcher, request.proxies().to_vec()).await?;
//!     let mut searcher = GitHubSearcher::new(fetcher, config.base_url.clone());
//!     let records = searcher.run(&request).await?;
//!     searcher.into_fetcher().close();
//!
//!     println!("{}", serde_json::to_string_pretty(&records)?);
//!     Ok(())
//! }
//! ```

mod args;
pub mod cache;
pub mod config;
mod error;
pub mod extract;
pub mod fetcher;
mod github_searcher;
pub mod logging;
pub mod pacer;
pub mod proxy;
mod types;

// Re-export main components for documentation and external use
pub use crate::args::Args;
pub use crate::cache::{CacheEntry, ResponseCache};
pub use crate::config::{Config, FetcherConfig};
pub use crate::error::{Error, Result};
pub use crate::extract::{extract_repo_info, extract_result_urls, Extraction};
pub use crate::fetcher::{CachedFetcher, PageFetcher};
pub use crate::github_searcher::{run_search, GitHubMarkup, GitHubSearcher, PageExtractor};
pub use crate::pacer::Pacer;
pub use crate::proxy::{ProxyConfig, ProxySelector};
pub use crate::types::{RepoInfo, SearchInput, SearchRequest, SearchResultRecord, SearchType};
