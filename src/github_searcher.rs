use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::args::Args;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::extract::{extract_repo_info, extract_result_urls, Extraction};
use crate::fetcher::{CachedFetcher, PageFetcher};
use crate::types::{RepoInfo, SearchInput, SearchRequest, SearchResultRecord};

/// Turns fetched GitHub pages into structured data.
pub trait PageExtractor {
    fn result_urls(&self, html: &str) -> Vec<Url>;
    fn repo_info(&self, url: &Url, html: &str) -> Extraction<RepoInfo>;
}

/// Extraction against GitHub's live markup, resolving links against `base`.
#[derive(Debug, Clone)]
pub struct GitHubMarkup {
    base: Url,
}

impl GitHubMarkup {
    pub fn new(base: Url) -> Self {
        GitHubMarkup { base }
    }
}

impl PageExtractor for GitHubMarkup {
    fn result_urls(&self, html: &str) -> Vec<Url> {
        extract_result_urls(html, &self.base)
    }

    fn repo_info(&self, url: &Url, html: &str) -> Extraction<RepoInfo> {
        extract_repo_info(url, html)
    }
}

pub struct GitHubSearcher<F, E = GitHubMarkup> {
    fetcher: F,
    extractor: E,
    base_url: Url,
    show_progress: bool,
}

impl<F: PageFetcher> GitHubSearcher<F> {
    /// Create a searcher against `base_url` (normally `https://github.com`).
    pub fn new(fetcher: F, base_url: Url) -> Self {
        GitHubSearcher {
            fetcher,
            extractor: GitHubMarkup::new(base_url.clone()),
            base_url,
            show_progress: false,
        }
    }
}

impl<F: PageFetcher, E: PageExtractor> GitHubSearcher<F, E> {
    pub fn with_extractor<X: PageExtractor>(self, extractor: X) -> GitHubSearcher<F, X> {
        GitHubSearcher {
            fetcher: self.fetcher,
            extractor,
            base_url: self.base_url,
            show_progress: self.show_progress,
        }
    }

    /// Show a progress bar while repository pages are fetched.
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn into_fetcher(self) -> F {
        self.fetcher
    }

    /// Scrape the first results page and every repository it links to.
    ///
    /// Repository pages are fetched one after another through the same
    /// fetcher, so pacing holds across the whole run.
    pub async fn run(&mut self, request: &SearchRequest) -> Result<Vec<SearchResultRecord>> {
        let search_url = self.base_url.join("search")?;
        let params = request.query_params();
        info!(
            "Searching {} for '{}'",
            request.search_type(),
            request.keywords().join(" ")
        );

        let html = self.fetcher.fetch(search_url.as_str(), &params).await?;
        let urls = self.extractor.result_urls(&html);
        if urls.is_empty() {
            info!("No search results for '{}'", request.keywords().join(" "));
            return Ok(Vec::new());
        }
        info!(
            "Parsed URLs: {:?}",
            urls.iter().map(Url::as_str).collect::<Vec<_>>()
        );

        let pb = self.progress_bar(urls.len() as u64)?;
        let mut records = Vec::with_capacity(urls.len());
        for url in urls {
            pb.set_message(url.to_string());
            let html = self.fetcher.fetch(url.as_str(), &[]).await?;
            let extra = match self.extractor.repo_info(&url, &html) {
                Extraction::Found(info) => {
                    info!("Extra info: {:?}", info);
                    Some(info)
                }
                Extraction::NotFound => {
                    debug!("No sidebar info for {}", url);
                    None
                }
                Extraction::Malformed(reason) => {
                    debug!("Unexpected sidebar markup for {}: {}", url, reason);
                    None
                }
            };
            records.push(SearchResultRecord {
                url: url.into(),
                extra,
            });
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(records)
    }

    fn progress_bar(&self, len: u64) -> Result<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}/{len:3} {wide_msg}")?
                .progress_chars("=>-"),
        );
        Ok(pb)
    }
}

/// The command-line pipeline: read the input file, scrape, write the records.
///
/// Without an output path the JSON array goes to stdout.
pub async fn run_search(args: &Args, config: &Config) -> Result<Vec<SearchResultRecord>> {
    let request = read_request(&args.input_file_path).await?;

    let fetcher = CachedFetcher::open(&config.fetcher, request.proxies().to_vec()).await?;
    let mut searcher =
        GitHubSearcher::new(fetcher, config.base_url.clone()).with_progress(!args.no_progress);
    let records = searcher.run(&request).await?;
    searcher.into_fetcher().close();

    let json = serde_json::to_string(&records)?;
    match &args.output_file_path {
        Some(path) => {
            fs::write(path, json.as_bytes()).await?;
            info!("Saved {} records to '{}'", records.len(), path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(json.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
            stdout.flush().await?;
        }
    }
    Ok(records)
}

async fn read_request(path: &Path) -> Result<SearchRequest> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::InputNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    let input: SearchInput = serde_json::from_slice(&raw)?;
    SearchRequest::try_from(input)
}
