//! In-memory promise search
//!
//! `RecordStore` answers [`SearchFilter`]s over a loaded record dump the way
//! the promise server's search endpoint does: `*` wildcards in the id
//! pattern, exact tag matches, a page size, and a continuation cursor. It
//! lets the CLI and the tests drive [`fetch_tree_promises`] without a server.
//!
//! [`fetch_tree_promises`]: crate::fetch::fetch_tree_promises

use anyhow::Context;

use crate::fetch::{Page, PageFetcher, SearchFilter};
use crate::record::Promise;

#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    promises: Vec<Promise>,
    default_limit: usize,
}

impl RecordStore {
    pub fn new(promises: Vec<Promise>, default_limit: usize) -> Self {
        Self {
            promises,
            default_limit: default_limit.max(1),
        }
    }

    pub fn promises(&self) -> &[Promise] {
        &self.promises
    }

    /// Run one search synchronously.
    pub fn search(&self, filter: &SearchFilter) -> anyhow::Result<Page> {
        let offset = match &filter.cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .with_context(|| format!("Invalid cursor: {}", cursor))?,
            None => 0,
        };
        let limit = filter.limit.unwrap_or(self.default_limit).max(1);

        let mut matching = self.promises.iter().filter(|p| {
            wildcard_match(&filter.id, &p.id)
                && filter
                    .tags
                    .iter()
                    .all(|(k, v)| p.tags.get(k).is_some_and(|tv| tv == v))
        });

        let promises: Vec<Promise> = matching.by_ref().skip(offset).take(limit).cloned().collect();
        let cursor = matching
            .next()
            .map(|_| (offset + promises.len()).to_string());

        Ok(Page { promises, cursor })
    }
}

impl PageFetcher for RecordStore {
    async fn fetch_page(&self, filter: SearchFilter) -> anyhow::Result<Page> {
        self.search(&filter)
    }
}

/// Glob match where `*` stands for any run of characters.
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == text;
    }

    let (first, last) = (parts[0], parts[parts.len() - 1]);
    if !text.starts_with(first)
        || !text.ends_with(last)
        || text.len() < first.len() + last.len()
    {
        return false;
    }
    let mut rest = &text[first.len()..text.len() - last.len()];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    true
}
