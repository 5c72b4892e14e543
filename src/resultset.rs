//! ResultSet — the current page of results for one query directory: the
//! pagination cursor, the name→store map, and the two control files.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::Config;
use crate::error::{Result, YtfsError};
use crate::path::{ControlDirection, CONTROL_NEXT, CONTROL_PREV};
use crate::resolver::MediaResolver;
use crate::store::{StreamingStore, StreamingStoreHandle};

/// One search hit as reported by the remote search backend, before a
/// display name or media mode has been attached.
#[derive(Debug, Clone)]
pub struct SearchItem {
    pub item_id: String,
    pub title: String,
}

/// One page of search results plus the cursors needed to page further.
#[derive(Debug, Clone, Default)]
pub struct SearchPage {
    pub items: Vec<SearchItem>,
    /// Cursor to pass to fetch the page after this one; `None` if this is
    /// the last page.
    pub next_cursor: Option<String>,
}

/// The only component permitted to talk to the remote search/listing API
/// (distinct from [`MediaResolver`], which resolves one item's media URLs).
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Fetches one page of results for `query`. `cursor` is `None` for the
    /// first page, otherwise a value previously returned as `next_cursor`.
    async fn search(&self, query: &str, cursor: Option<&str>) -> Result<SearchPage>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageDirection {
    Next,
    Prev,
}

struct PageRecord {
    /// Cursor used to fetch this page (`None` for the first page).
    fetch_cursor: Option<String>,
    /// Cursor to fetch the page after this one, if any.
    next_cursor: Option<String>,
}

struct Inner {
    page_index: usize,
    pages: Vec<PageRecord>,
    /// Insertion-ordered display name → store, for the current page only.
    entries: Vec<(String, StreamingStoreHandle)>,
}

/// The current page of results for one query, plus everything needed to
/// page it forward and backward.
pub struct ResultSet {
    query: String,
    backend: Arc<dyn SearchBackend>,
    resolver: Arc<dyn MediaResolver>,
    client: reqwest::Client,
    config: Arc<Config>,
    inner: tokio::sync::Mutex<Inner>,
}

impl ResultSet {
    pub fn new(
        query: String,
        backend: Arc<dyn SearchBackend>,
        resolver: Arc<dyn MediaResolver>,
        client: reqwest::Client,
        config: Arc<Config>,
    ) -> Self {
        Self {
            query,
            backend,
            resolver,
            client,
            config,
            inner: tokio::sync::Mutex::new(Inner { page_index: 0, pages: Vec::new(), entries: Vec::new() }),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Fetches the first page. Fails with [`YtfsError::NoResults`] if it is
    /// empty, so a query with no hits never becomes a mountable, permanently
    /// empty directory.
    pub async fn initialize(&self) -> Result<()> {
        tracing::debug!(query = %self.query, "fetching first page");
        let page = self.backend.search(&self.query, None).await?;
        if page.items.is_empty() {
            tracing::debug!(query = %self.query, "first page came back empty");
            return Err(YtfsError::NoResults);
        }

        let mut inner = self.inner.lock().await;
        inner.pages.push(PageRecord { fetch_cursor: None, next_cursor: page.next_cursor });
        inner.entries = self.build_entries(&[], page.items);
        Ok(())
    }

    /// The current page's display names (base name plus media extension)
    /// plus the two control files. Lookups use the extension-less base
    /// name.
    pub async fn list(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        let extension = self.config.media_mode.extension();
        let mut names: Vec<String> =
            inner.entries.iter().map(|(base_name, _)| format!("{base_name}{extension}")).collect();
        names.push(CONTROL_NEXT.to_string());
        names.push(CONTROL_PREV.to_string());
        names
    }

    /// Looks up a non-control, extension-less base name in the current page.
    pub async fn lookup(&self, base_name: &str) -> Option<StreamingStoreHandle> {
        let inner = self.inner.lock().await;
        inner.entries.iter().find(|(n, _)| n == base_name).map(|(_, store)| Arc::clone(store))
    }

    /// Advances or retreats the pagination cursor, rebuilding the
    /// name→store map and cleaning up stores that fell off the page.
    /// Clamps at the first/last page rather than erroring.
    pub async fn page(&self, direction: PageDirection) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let target_index = match direction {
            PageDirection::Prev => {
                if inner.page_index == 0 {
                    return Ok(());
                }
                inner.page_index - 1
            }
            PageDirection::Next => {
                let current = inner.pages.get(inner.page_index).expect("current page recorded");
                if inner.page_index + 1 >= inner.pages.len() && current.next_cursor.is_none() {
                    return Ok(());
                }
                inner.page_index + 1
            }
        };

        let fetch_cursor = if target_index < inner.pages.len() {
            inner.pages[target_index].fetch_cursor.clone()
        } else {
            inner.pages[inner.page_index].next_cursor.clone()
        };

        drop(inner);
        tracing::debug!(query = %self.query, ?direction, target_index, "fetching page");
        let page = self.backend.search(&self.query, fetch_cursor.as_deref()).await?;

        let mut inner = self.inner.lock().await;
        if page.items.is_empty() {
            // Tolerate a short or empty page from the backend by clamping
            // at the previous page rather than showing an empty directory.
            tracing::debug!(query = %self.query, target_index, "backend returned a short/empty page, clamping");
            return Ok(());
        }

        let old_entries = std::mem::take(&mut inner.entries);
        let new_entries = self.build_entries(&old_entries, page.items);

        for (name, store) in &old_entries {
            if !new_entries.iter().any(|(n, _)| n == name) {
                store.cleanup().await;
            }
        }

        inner.entries = new_entries;
        if target_index >= inner.pages.len() {
            inner.pages.push(PageRecord { fetch_cursor, next_cursor: page.next_cursor });
        } else {
            inner.pages[target_index].next_cursor = page.next_cursor;
        }
        inner.page_index = target_index;
        Ok(())
    }

    /// Builds the new display-name → store map for one page's items,
    /// reusing a previous page's store for any name that persists
    /// unchanged rather than re-resolving it.
    fn build_entries(
        &self,
        old_entries: &[(String, StreamingStoreHandle)],
        items: Vec<SearchItem>,
    ) -> Vec<(String, StreamingStoreHandle)> {
        let mode = self.config.media_mode;
        let mut used_names: HashSet<String> = HashSet::new();
        let mut entries = Vec::with_capacity(items.len());

        for item in items {
            let name = disambiguate_name(&item.title, &mut used_names);
            let store = old_entries
                .iter()
                .find(|(old_name, _)| *old_name == name)
                .map(|(_, store)| Arc::clone(store))
                .unwrap_or_else(|| {
                    StreamingStore::new(
                        item.item_id,
                        mode,
                        Arc::clone(&self.resolver),
                        self.client.clone(),
                        &self.config,
                    )
                    .expect("store cache setup never fails under normal operation")
                });
            entries.push((name, store));
        }
        entries
    }

    /// Tears down every owned store. Called from `rmdir`.
    pub async fn cleanup(&self) {
        let mut inner = self.inner.lock().await;
        for (_, store) in inner.entries.drain(..) {
            store.cleanup().await;
        }
    }
}

/// Minimal shape of the remote search backend's listing response.
#[derive(Debug, Deserialize)]
struct BackendSearchItem {
    item_id: String,
    title: String,
}

#[derive(Debug, Deserialize)]
struct BackendSearchPage {
    items: Vec<BackendSearchItem>,
    next_cursor: Option<String>,
}

/// HTTP-backed default [`SearchBackend`]. Talks to a `search_base_url` that
/// serves `GET {base}/search?q={query}[&cursor={cursor}]` and returns a
/// [`BackendSearchPage`]-shaped JSON body.
pub struct HttpSearchBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSearchBackend {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn search(&self, query: &str, cursor: Option<&str>) -> Result<SearchPage> {
        let mut url = reqwest::Url::parse(&format!("{}/search", self.base_url.trim_end_matches('/')))
            .map_err(|err| YtfsError::Io(err.to_string()))?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            if let Some(cursor) = cursor {
                pairs.append_pair("cursor", cursor);
            }
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(YtfsError::Io(format!("search backend HTTP {}", response.status())));
        }

        let body: BackendSearchPage =
            response.json().await.map_err(|err| YtfsError::ParseError(err.to_string()))?;

        Ok(SearchPage {
            items: body
                .items
                .into_iter()
                .map(|item| SearchItem { item_id: item.item_id, title: item.title })
                .collect(),
            next_cursor: body.next_cursor,
        })
    }
}

/// A [`ControlDirection`] maps 1:1 onto a [`PageDirection`]; kept as
/// separate types since `path` must not depend on `resultset`.
impl From<ControlDirection> for PageDirection {
    fn from(direction: ControlDirection) -> Self {
        match direction {
            ControlDirection::Next => PageDirection::Next,
            ControlDirection::Prev => PageDirection::Prev,
        }
    }
}

fn disambiguate_name(title: &str, used: &mut HashSet<String>) -> String {
    let base = if title.is_empty() { "untitled" } else { title };
    let mut candidate = base.to_string();
    let mut suffix = 2;
    while used.contains(&candidate) {
        candidate = format!("{base} ({suffix})");
        suffix += 1;
    }
    used.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disambiguate_name_adds_numeric_suffix_on_collision() {
        let mut used = HashSet::new();
        let first = disambiguate_name("same title", &mut used);
        let second = disambiguate_name("same title", &mut used);
        assert_eq!(first, "same title");
        assert_eq!(second, "same title (2)");
    }

    #[test]
    fn disambiguate_name_leaves_distinct_titles_alone() {
        let mut used = HashSet::new();
        let a = disambiguate_name("a", &mut used);
        let b = disambiguate_name("b", &mut used);
        assert_eq!(a, "a");
        assert_eq!(b, "b");
    }
}
