use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The kind of objects a GitHub search looks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Repositories,
    Issues,
    Wikis,
}

impl SearchType {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchType::Repositories => "repositories",
            SearchType::Issues => "issues",
            SearchType::Wikis => "wikis",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The JSON payload read from the input file.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchInput {
    pub keywords: Vec<String>,
    #[serde(default)]
    pub proxies: Vec<String>,
    #[serde(rename = "type", default)]
    pub search_type: SearchType,
}

/// A validated search: keywords, search type and the candidate proxies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    keywords: Vec<String>,
    search_type: SearchType,
    proxies: Vec<String>,
}

impl SearchRequest {
    pub fn new(keywords: Vec<String>, search_type: SearchType, proxies: Vec<String>) -> Result<Self> {
        if keywords.iter().all(|keyword| keyword.trim().is_empty()) {
            return Err(Error::NoKeywords);
        }
        Ok(SearchRequest {
            keywords,
            search_type,
            proxies,
        })
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn search_type(&self) -> SearchType {
        self.search_type
    }

    pub fn set_search_type(&mut self, search_type: SearchType) {
        self.search_type = search_type;
    }

    pub fn proxies(&self) -> &[String] {
        &self.proxies
    }

    /// Query parameters for the search endpoint.
    ///
    /// Values are left unencoded; the HTTP client encodes them exactly once.
    pub fn query_params(&self) -> Vec<(String, String)> {
        vec![
            ("q".to_string(), self.keywords.join(" ")),
            ("type".to_string(), self.search_type.to_string()),
        ]
    }
}

impl TryFrom<SearchInput> for SearchRequest {
    type Error = Error;

    fn try_from(input: SearchInput) -> Result<Self> {
        SearchRequest::new(input.keywords, input.search_type, input.proxies)
    }
}

/// Owner and language breakdown scraped from a repository sidebar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoInfo {
    pub owner: String,
    /// Language name to the percentage exactly as displayed, e.g. `"52.0%"`.
    pub language_stats: IndexMap<String, String>,
}

/// One entry of the output array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultRecord {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<RepoInfo>,
}
