//! Paginated collection of the promises belonging to one call tree
//!
//! Promises are searched by their `resonate:origin` tag. Older workers do
//! not set that tag, so an empty result falls back to a single id-prefix
//! search (`<root>*`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use thiserror::Error;

use crate::record::{Promise, TAG_ORIGIN};

/// Search parameters sent to the backend
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchFilter {
    /// Id pattern, `*` matches any run of characters
    pub id: String,
    /// Tags that must all match exactly
    pub tags: HashMap<String, String>,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub promises: Vec<Promise>,
    /// Continuation cursor; `None` once the search is exhausted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Source of search pages, typically an HTTP client for the promise server
pub trait PageFetcher {
    fn fetch_page(&self, filter: SearchFilter) -> impl Future<Output = anyhow::Result<Page>> + Send;
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to fetch page {page} for {root}: {source}")]
    Page {
        root: String,
        page: usize,
        source: anyhow::Error,
    },
}

/// Collect every promise of the tree rooted at `root_id`.
///
/// Pages are requested one at a time until the fetcher stops returning a
/// cursor. A failed fallback search is logged and yields no records.
pub async fn fetch_tree_promises<F: PageFetcher>(
    root_id: &str,
    fetcher: &F,
    page_size: usize,
) -> Result<Vec<Promise>, FetchError> {
    let mut all = Vec::new();
    let mut cursor: Option<String> = None;
    let mut page = 0;

    loop {
        let filter = SearchFilter {
            id: "*".to_string(),
            tags: HashMap::from([(TAG_ORIGIN.to_string(), root_id.to_string())]),
            cursor: cursor.take(),
            limit: Some(page_size),
        };
        let result = fetcher
            .fetch_page(filter)
            .await
            .map_err(|source| FetchError::Page {
                root: root_id.to_string(),
                page,
                source,
            })?;
        tracing::debug!(root = root_id, page, count = result.promises.len(), "fetched page");
        all.extend(result.promises);
        page += 1;

        match result.cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    if all.is_empty() {
        let filter = SearchFilter {
            id: format!("{}*", root_id),
            tags: HashMap::new(),
            cursor: None,
            limit: Some(page_size),
        };
        match fetcher.fetch_page(filter).await {
            Ok(result) => {
                tracing::debug!(
                    root = root_id,
                    count = result.promises.len(),
                    "no origin-tagged promises, used id prefix search"
                );
                if result.cursor.is_some() {
                    tracing::warn!(
                        root = root_id,
                        page_size,
                        "id prefix search returned more than one page, tree is truncated"
                    );
                }
                all = result.promises;
            }
            Err(e) => {
                tracing::warn!(root = root_id, error = %e, "id prefix search failed");
            }
        }
    }

    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays a fixed list of responses and records every filter it sees.
    struct Scripted {
        responses: Mutex<Vec<anyhow::Result<Page>>>,
        seen: Mutex<Vec<SearchFilter>>,
    }

    impl Scripted {
        fn new(responses: Vec<anyhow::Result<Page>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().rev().collect()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl PageFetcher for Scripted {
        async fn fetch_page(&self, filter: SearchFilter) -> anyhow::Result<Page> {
            self.seen.lock().unwrap().push(filter);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(Page::default()))
        }
    }

    fn page(ids: &[&str], cursor: Option<&str>) -> Page {
        Page {
            promises: ids
                .iter()
                .map(|id| Promise {
                    id: id.to_string(),
                    ..Promise::default()
                })
                .collect(),
            cursor: cursor.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_follows_cursor_until_exhausted() {
        let fetcher = Scripted::new(vec![
            Ok(page(&["r", "r.1"], Some("c1"))),
            Ok(page(&["r.2"], Some("c2"))),
            Ok(page(&["r.3"], None)),
        ]);
        let all = fetch_tree_promises("r", &fetcher, 2).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["r", "r.1", "r.2", "r.3"]);

        let seen = fetcher.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].cursor, None);
        assert_eq!(seen[1].cursor.as_deref(), Some("c1"));
        assert_eq!(seen[2].cursor.as_deref(), Some("c2"));
        assert!(seen.iter().all(|f| f.tags.get(TAG_ORIGIN).map(String::as_str) == Some("r")));
        assert!(seen.iter().all(|f| f.limit == Some(2) && f.id == "*"));
    }

    #[tokio::test]
    async fn test_empty_origin_search_falls_back_to_prefix() {
        let fetcher = Scripted::new(vec![Ok(page(&[], None)), Ok(page(&["r", "r.1"], None))]);
        let all = fetch_tree_promises("r", &fetcher, 50).await.unwrap();
        assert_eq!(all.len(), 2);

        let seen = fetcher.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].id, "r*");
        assert!(seen[1].tags.is_empty());
    }

    #[tokio::test]
    async fn test_page_error_propagates() {
        let fetcher = Scripted::new(vec![
            Ok(page(&["r"], Some("c1"))),
            Err(anyhow::anyhow!("connection reset")),
        ]);
        let err = fetch_tree_promises("r", &fetcher, 10).await.unwrap_err();
        assert!(matches!(err, FetchError::Page { page: 1, .. }));
        assert!(err.to_string().contains("connection reset"));
    }

    #[tokio::test]
    async fn test_fallback_fetches_a_single_page() {
        let fetcher = Scripted::new(vec![
            Ok(page(&[], None)),
            Ok(page(&["r", "r.1"], Some("more"))),
            Ok(page(&["r.2"], None)),
        ]);
        let all = fetch_tree_promises("r", &fetcher, 2).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(fetcher.seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_fallback_error_yields_empty() {
        let fetcher = Scripted::new(vec![Ok(page(&[], None)), Err(anyhow::anyhow!("500"))]);
        let all = fetch_tree_promises("r", &fetcher, 10).await.unwrap();
        assert!(all.is_empty());
    }
}
