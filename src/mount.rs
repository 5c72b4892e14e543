//! Mount — the single query→ResultSet map for one mounted filesystem.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Result, YtfsError};
use crate::resolver::MediaResolver;
use crate::resultset::{ResultSet, SearchBackend};

/// Owns every query's [`ResultSet`]. There is exactly one `Mount` per
/// mounted filesystem; `FilesystemFrontend` holds it behind an `Arc`.
pub struct Mount {
    backend: Arc<dyn SearchBackend>,
    resolver: Arc<dyn MediaResolver>,
    client: reqwest::Client,
    config: Arc<Config>,
    queries: std::sync::Mutex<HashMap<String, Arc<ResultSet>>>,
}

impl Mount {
    pub fn new(
        backend: Arc<dyn SearchBackend>,
        resolver: Arc<dyn MediaResolver>,
        client: reqwest::Client,
        config: Arc<Config>,
    ) -> Self {
        Self { backend, resolver, client, config, queries: std::sync::Mutex::new(HashMap::new()) }
    }

    pub fn get(&self, query: &str) -> Option<Arc<ResultSet>> {
        self.queries.lock().unwrap().get(query).cloned()
    }

    pub fn contains(&self, query: &str) -> bool {
        self.queries.lock().unwrap().contains_key(query)
    }

    /// All currently-mounted query names, in arbitrary order.
    pub fn query_names(&self) -> Vec<String> {
        self.queries.lock().unwrap().keys().cloned().collect()
    }

    /// Creates and initializes a new `ResultSet` bound to `query`. Fails
    /// with [`YtfsError::AlreadyExists`] if the name is taken, or whatever
    /// [`ResultSet::initialize`] returns (e.g. `NoResults`) otherwise —
    /// in the latter case the query is never inserted.
    pub async fn create(&self, query: String) -> Result<()> {
        if self.contains(&query) {
            return Err(YtfsError::AlreadyExists);
        }

        let result_set = Arc::new(ResultSet::new(
            query.clone(),
            Arc::clone(&self.backend),
            Arc::clone(&self.resolver),
            self.client.clone(),
            Arc::clone(&self.config),
        ));
        tracing::debug!(%query, "mounting new query");
        result_set.initialize().await?;

        let mut queries = self.queries.lock().unwrap();
        queries.entry(query).or_insert(result_set);
        Ok(())
    }

    /// Removes `query`, cleaning up every store it owned. A no-op target
    /// (already absent) is the caller's concern (`rmdir` distinguishes
    /// root vs. unknown query before calling this).
    pub async fn remove(&self, query: &str) -> Result<()> {
        let result_set = self.queries.lock().unwrap().remove(query).ok_or(YtfsError::NotFound)?;
        result_set.cleanup().await;
        Ok(())
    }

    /// Replaces `old` with a freshly initialized `ResultSet` bound to
    /// `new`, dropping (and cleaning up) the old one. The swap itself
    /// (insert `new`, remove `old`) happens under a single lock acquisition
    /// so no reader ever observes both or neither name mounted; the old
    /// store's cleanup runs afterward, outside the lock.
    pub async fn rename(&self, old: &str, new: String) -> Result<()> {
        if self.contains(&new) {
            return Err(YtfsError::AlreadyExists);
        }
        if !self.contains(old) {
            return Err(YtfsError::NotFound);
        }

        let result_set = Arc::new(ResultSet::new(
            new.clone(),
            Arc::clone(&self.backend),
            Arc::clone(&self.resolver),
            self.client.clone(),
            Arc::clone(&self.config),
        ));
        tracing::debug!(old, new = %new, "renaming query, initializing replacement");
        result_set.initialize().await?;

        let old_result_set = {
            let mut queries = self.queries.lock().unwrap();
            if queries.contains_key(&new) {
                drop(queries);
                result_set.cleanup().await;
                return Err(YtfsError::AlreadyExists);
            }
            let old_result_set = queries.remove(old).ok_or(YtfsError::NotFound);
            match old_result_set {
                Ok(old_result_set) => {
                    queries.insert(new, result_set);
                    old_result_set
                }
                Err(err) => {
                    drop(queries);
                    result_set.cleanup().await;
                    return Err(err);
                }
            }
        };
        tracing::debug!(old, "cleaning up replaced query");
        old_result_set.cleanup().await;
        Ok(())
    }
}
