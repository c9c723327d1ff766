//! Extraction of search results and repository sidebars from GitHub markup.
//!
//! GitHub's markup varies by result kind and changes over time, so every step
//! reports an [`Extraction`] instead of failing: callers decide what a miss
//! means.

use indexmap::IndexMap;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use crate::types::RepoInfo;

const RESULTS_LIST: &str = r#"div[data-testid="results-list"]"#;
const SEARCH_MATCH: &str = "span.search-match";
const SIDEBAR: &str = "div.Layout-sidebar";
const LANGUAGES_HEADING: &str = "Languages";

/// Outcome of one extraction step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction<T> {
    Found(T),
    /// The markup the step looks for is not on the page.
    NotFound,
    /// The markup is there but not in the expected shape.
    Malformed(&'static str),
}

impl<T> Extraction<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Extraction::Found(value) => Some(value),
            Extraction::NotFound | Extraction::Malformed(_) => None,
        }
    }
}

/// URLs of all search matches inside the results list, in document order.
pub fn extract_result_urls(html: &str, base: &Url) -> Vec<Url> {
    let (Ok(container), Ok(marker)) = (Selector::parse(RESULTS_LIST), Selector::parse(SEARCH_MATCH))
    else {
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut urls = Vec::new();
    for list in document.select(&container) {
        for span in list.select(&marker) {
            match link_target(span, base) {
                Extraction::Found(url) => urls.push(url),
                Extraction::NotFound => {}
                Extraction::Malformed(reason) => debug!("Skipping search match: {}", reason),
            }
        }
    }
    urls
}

/// Resolve the link wrapping a search-match marker.
///
/// Only a marker whose immediate parent is `<a>` names a result; other
/// match kinds (text snippets, metadata) are `NotFound`.
pub fn link_target(marker: ElementRef<'_>, base: &Url) -> Extraction<Url> {
    let Some(parent) = marker.parent().and_then(ElementRef::wrap) else {
        return Extraction::NotFound;
    };
    if parent.value().name() != "a" {
        return Extraction::NotFound;
    }
    let Some(href) = parent.value().attr("href").map(str::trim) else {
        return Extraction::Malformed("result link has no href");
    };
    if href.is_empty() {
        return Extraction::Malformed("result link has an empty href");
    }
    match base.join(href) {
        Ok(url) => Extraction::Found(url),
        Err(_) => Extraction::Malformed("result link href is not a valid URL"),
    }
}

/// Owner handle and language breakdown from a repository page.
pub fn extract_repo_info(url: &Url, html: &str) -> Extraction<RepoInfo> {
    let owner = match url.path_segments().and_then(|mut segments| segments.next()) {
        Some(owner) if !owner.is_empty() => owner.to_string(),
        _ => return Extraction::Malformed("repository URL has no owner segment"),
    };

    let Ok(sidebar) = Selector::parse(SIDEBAR) else {
        return Extraction::NotFound;
    };
    let document = Html::parse_document(html);
    let container = document
        .select(&sidebar)
        .find_map(languages_container);

    match container {
        Some(Extraction::Found(container)) => Extraction::Found(RepoInfo {
            owner,
            language_stats: language_stats(container),
        }),
        Some(Extraction::Malformed(reason)) => Extraction::Malformed(reason),
        Some(Extraction::NotFound) | None => Extraction::NotFound,
    }
}

/// The element two levels above the "Languages" heading text.
fn languages_container(sidebar: ElementRef<'_>) -> Option<Extraction<ElementRef<'_>>> {
    let heading = sidebar.descendants().find(|node| {
        node.value()
            .as_text()
            .is_some_and(|text| text.trim() == LANGUAGES_HEADING)
    })?;

    let container = heading
        .parent()
        .and_then(ElementRef::wrap)
        .and_then(|parent| parent.parent())
        .and_then(ElementRef::wrap);
    Some(match container {
        Some(container) => Extraction::Found(container),
        None => Extraction::Malformed("languages heading is not nested in a container"),
    })
}

/// Language rows under the container; rows with fewer than two spans are skipped.
fn language_stats(container: ElementRef<'_>) -> IndexMap<String, String> {
    let mut stats = IndexMap::new();
    let (Ok(item), Ok(span)) = (Selector::parse("li"), Selector::parse("span")) else {
        return stats;
    };

    for li in container.select(&item) {
        let spans: Vec<String> = li.select(&span).map(element_text).collect();
        match spans.as_slice() {
            [language, percentage, ..] => {
                stats.insert(language.clone(), percentage.clone());
            }
            _ => debug!("Skipping language row with {} span(s)", spans.len()),
        }
    }
    stats
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SEARCH_RESULT: &str = include_str!("../tests/fixtures/search_result.html");
    const REPOSITORY_SIDEBAR: &str = include_str!("../tests/fixtures/repository_sidebar.html");

    fn github() -> Url {
        Url::parse("https://github.com").unwrap()
    }

    fn urls(html: &str) -> Vec<String> {
        extract_result_urls(html, &github())
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_extract_urls() {
        assert_eq!(
            urls(SEARCH_RESULT),
            vec![
                "https://github.com/atuldjadhav/DropBox-Cloud-Storage",
                "https://github.com/michealbalogun/Horizon-dashboard",
            ]
        );
    }

    #[test]
    fn test_no_results_list() {
        let html = r#"<html><body><a href="/x/y"><span class="search-match">y</span></a></body></html>"#;
        assert!(urls(html).is_empty());
    }

    #[test]
    fn test_results_list_without_matches() {
        let html = r#"<div data-testid="results-list"><a href="/x/y"><span>y</span></a></div>"#;
        assert!(urls(html).is_empty());
        assert!(urls("").is_empty());
    }

    #[test]
    fn test_link_target_variants() {
        let html = r#"
            <div id="root">
              <a href="/owner/repo"><span class="search-match">repo</span></a>
              <p><span class="search-match">snippet</span></p>
              <a><span class="search-match">broken</span></a>
              <a href="https://gist.github.com/abc"><span class="search-match">gist</span></a>
            </div>"#;
        let document = Html::parse_document(html);
        let marker = Selector::parse(SEARCH_MATCH).unwrap();
        let found: Vec<Extraction<Url>> = document
            .select(&marker)
            .map(|span| link_target(span, &github()))
            .collect();

        assert_eq!(
            found,
            vec![
                Extraction::Found(Url::parse("https://github.com/owner/repo").unwrap()),
                Extraction::NotFound,
                Extraction::Malformed("result link has no href"),
                Extraction::Found(Url::parse("https://gist.github.com/abc").unwrap()),
            ]
        );
    }

    #[test]
    fn test_extract_extra_info() {
        let url = Url::parse("https://github.com/AKrekhovetskyi/github-search").unwrap();
        let info = extract_repo_info(&url, REPOSITORY_SIDEBAR).found().unwrap();

        assert_eq!(info.owner, "AKrekhovetskyi");
        assert_eq!(
            info.language_stats.into_iter().collect::<Vec<_>>(),
            vec![
                ("CSS".to_string(), "52.0%".to_string()),
                ("JavaScript".to_string(), "47.2%".to_string()),
                ("HTML".to_string(), "0.8%".to_string()),
            ]
        );
    }

    #[test]
    fn test_sidebar_without_languages() {
        let url = Url::parse("https://github.com/owner/empty").unwrap();
        let html = r#"<div class="Layout-sidebar"><h2>About</h2><p>No description</p></div>"#;
        assert_eq!(extract_repo_info(&url, html), Extraction::NotFound);
    }

    #[test]
    fn test_languages_outside_sidebar_are_ignored() {
        let url = Url::parse("https://github.com/owner/repo").unwrap();
        let html = r#"
            <div class="Layout-main"><div><h2>Languages</h2><ul><li><span>Go</span><span>100%</span></li></ul></div></div>
            <div class="Layout-sidebar"><h2>About</h2></div>"#;
        assert_eq!(extract_repo_info(&url, html), Extraction::NotFound);
    }

    #[test]
    fn test_short_rows_are_skipped_and_duplicates_overwrite() {
        let url = Url::parse("https://github.com/owner/repo").unwrap();
        let html = r#"
            <div class="Layout-sidebar">
              <div class="BorderGrid-cell">
                <h2 class="h4 mb-3">Languages</h2>
                <ul>
                  <li><span>Rust</span><span>80.0%</span></li>
                  <li><span>Other</span></li>
                  <li><span>Shell</span><span>20.0%</span></li>
                  <li><span>Rust</span><span>79.9%</span></li>
                </ul>
              </div>
            </div>"#;
        let info = extract_repo_info(&url, html).found().unwrap();
        assert_eq!(
            info.language_stats.into_iter().collect::<Vec<_>>(),
            vec![
                ("Rust".to_string(), "79.9%".to_string()),
                ("Shell".to_string(), "20.0%".to_string()),
            ]
        );
    }

    #[test]
    fn test_url_without_owner_is_malformed() {
        let url = Url::parse("https://github.com/").unwrap();
        assert!(matches!(
            extract_repo_info(&url, REPOSITORY_SIDEBAR),
            Extraction::Malformed(_)
        ));
    }
}
