//! Integration tests for `Mount`/`ResultSet` against an in-memory
//! `SearchBackend`, mirroring the teacher's `tests/shadow_fs/` convention
//! of exercising the trait boundary directly rather than through the real
//! (here: FUSE) transport.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use ytfs::config::{Config, ConfigOverrides};
use ytfs::error::{Result, YtfsError};
use ytfs::mount::Mount;
use ytfs::resolver::{MediaMode, MediaResolver, ResolvedMedia};
use ytfs::resultset::{PageDirection, SearchBackend, SearchItem, SearchPage};

/// A canned, in-memory `SearchBackend`: each query maps to an ordered list
/// of pages, advanced by matching the opaque cursor string.
struct FakeBackend {
    pages: HashMap<&'static str, Vec<Vec<&'static str>>>,
}

#[async_trait]
impl SearchBackend for FakeBackend {
    async fn search(&self, query: &str, cursor: Option<&str>) -> Result<SearchPage> {
        let pages = self.pages.get(query).ok_or(YtfsError::NoResults)?;
        let index = match cursor {
            None => 0,
            Some(cursor) => cursor.parse::<usize>().map_err(|_| YtfsError::InvalidArgument)?,
        };
        let titles = match pages.get(index) {
            Some(titles) => titles,
            None => return Ok(SearchPage::default()),
        };
        let next_cursor = if index + 1 < pages.len() { Some((index + 1).to_string()) } else { None };
        Ok(SearchPage {
            items: titles
                .iter()
                .map(|title| SearchItem { item_id: title.to_string(), title: title.to_string() })
                .collect(),
            next_cursor,
        })
    }
}

/// Never called in these tests: pagination and lifecycle never resolve a
/// store's media.
struct UnusedResolver;

#[async_trait]
impl MediaResolver for UnusedResolver {
    async fn resolve(&self, _item_id: &str, _mode: MediaMode) -> Result<ResolvedMedia> {
        panic!("resolver should not be called by pagination/lifecycle tests")
    }
}

fn test_mount(pages: HashMap<&'static str, Vec<Vec<&'static str>>>) -> Mount {
    let config = Arc::new(Config::from_parts(
        std::path::PathBuf::from("/mnt"),
        MediaMode::AudioOnly,
        "https://example.test".to_string(),
        None,
        ConfigOverrides::default(),
    ));
    Mount::new(
        Arc::new(FakeBackend { pages }),
        Arc::new(UnusedResolver),
        reqwest::Client::new(),
        config,
    )
}

#[tokio::test]
async fn mkdir_lists_first_page_plus_control_files() {
    let mount = test_mount(HashMap::from([("cats", vec![vec!["a", "b"]])]));
    mount.create("cats".to_string()).await.unwrap();

    let result_set = mount.get("cats").unwrap();
    let mut names = result_set.list().await;
    names.sort();
    assert_eq!(names, vec![" next", " prev", "a.m4a", "b.m4a"]);
}

#[tokio::test]
async fn mkdir_on_empty_first_page_fails_and_leaves_no_query() {
    let mount = test_mount(HashMap::from([("empty", vec![vec![]])]));
    let err = mount.create("empty".to_string()).await.unwrap_err();
    assert!(matches!(err, YtfsError::NoResults));
    assert!(!mount.contains("empty"));
}

#[tokio::test]
async fn mkdir_twice_fails_with_already_exists() {
    let mount = test_mount(HashMap::from([("cats", vec![vec!["a"]])]));
    mount.create("cats".to_string()).await.unwrap();
    let err = mount.create("cats".to_string()).await.unwrap_err();
    assert!(matches!(err, YtfsError::AlreadyExists));
}

#[tokio::test]
async fn paging_next_then_prev_round_trips_to_the_same_page() {
    let mount =
        test_mount(HashMap::from([("cats", vec![vec!["a", "b"], vec!["c", "d"]])]));
    mount.create("cats".to_string()).await.unwrap();
    let result_set = mount.get("cats").unwrap();

    let first_page = result_set.list().await;

    result_set.page(PageDirection::Next).await.unwrap();
    let second_page = result_set.list().await;
    assert_ne!(first_page, second_page);
    assert!(second_page.iter().any(|name| name == "c.m4a"));

    result_set.page(PageDirection::Prev).await.unwrap();
    let back_to_first = result_set.list().await;
    assert_eq!(first_page, back_to_first);
}

#[tokio::test]
async fn paging_past_the_last_page_clamps_without_error() {
    let mount = test_mount(HashMap::from([("cats", vec![vec!["a"]])]));
    mount.create("cats".to_string()).await.unwrap();
    let result_set = mount.get("cats").unwrap();

    let only_page = result_set.list().await;
    result_set.page(PageDirection::Next).await.unwrap();
    assert_eq!(result_set.list().await, only_page);
}

#[tokio::test]
async fn paging_before_the_first_page_clamps_without_error() {
    let mount = test_mount(HashMap::from([("cats", vec![vec!["a"]])]));
    mount.create("cats".to_string()).await.unwrap();
    let result_set = mount.get("cats").unwrap();

    let only_page = result_set.list().await;
    result_set.page(PageDirection::Prev).await.unwrap();
    assert_eq!(result_set.list().await, only_page);
}

#[tokio::test]
async fn rename_replaces_the_query_and_drops_the_old_one() {
    let mount = test_mount(HashMap::from([
        ("cats", vec![vec!["a"]]),
        ("dogs", vec![vec!["b"]]),
    ]));
    mount.create("cats".to_string()).await.unwrap();
    mount.rename("cats", "dogs".to_string()).await.unwrap();

    assert!(!mount.contains("cats"));
    assert!(mount.contains("dogs"));
    let names = mount.get("dogs").unwrap().list().await;
    assert!(names.iter().any(|name| name == "b.m4a"));
}

#[tokio::test]
async fn rmdir_removes_the_query_and_repeat_rmdir_fails_not_found() {
    let mount = test_mount(HashMap::from([("cats", vec![vec!["a"]])]));
    mount.create("cats".to_string()).await.unwrap();
    mount.remove("cats").await.unwrap();
    assert!(!mount.contains("cats"));

    let err = mount.remove("cats").await.unwrap_err();
    assert!(matches!(err, YtfsError::NotFound));
}
