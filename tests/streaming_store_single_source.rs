//! Integration tests for `StreamingStore` in single-source mode against a
//! ranged-fetch HTTP server, grounded on `wiremock`'s custom-`Respond`
//! pattern for serving `Range:` requests (the shape `zijiren233-synctv`
//! uses `wiremock` for in its own test suite).

use std::sync::Arc;

use async_trait::async_trait;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use ytfs::config::{Config, ConfigOverrides};
use ytfs::error::Result;
use ytfs::resolver::{MediaMode, MediaResolver, ResolvedMedia, StreamSource};
use ytfs::store::StreamingStore;

/// Serves `GET` requests against a fixed byte buffer, honoring a
/// `Range: bytes=a-b` header with a `206 Partial Content` slice, or the
/// full body with `200 OK` if no `Range` header was sent.
struct RangeResponder {
    body: Vec<u8>,
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let total = self.body.len() as u64;
        let range_header = request.headers.get("Range").and_then(|value| value.to_str().ok());

        match range_header.and_then(parse_range) {
            Some((start, end)) => {
                let end = end.min(total.saturating_sub(1));
                let slice = self.body[start as usize..=(end as usize)].to_vec();
                ResponseTemplate::new(206)
                    .insert_header("Content-Range", format!("bytes {start}-{end}/{total}"))
                    .set_body_bytes(slice)
            }
            None => ResponseTemplate::new(200).set_body_bytes(self.body.clone()),
        }
    }
}

fn parse_range(header: &str) -> Option<(u64, u64)> {
    let spec = header.strip_prefix("bytes=")?;
    let (start, end) = spec.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// Resolves every item to the same mock server URL and fixed body length.
struct FixedResolver {
    url: String,
    content_length: u64,
}

#[async_trait]
impl MediaResolver for FixedResolver {
    async fn resolve(&self, _item_id: &str, _mode: MediaMode) -> Result<ResolvedMedia> {
        Ok(ResolvedMedia {
            sources: vec![StreamSource {
                url: self.url.clone(),
                content_length_hint: Some(self.content_length),
                bitrate_bps: None,
            }],
            duration_seconds: 0.0,
            content_length_hint: self.content_length,
        })
    }
}

fn test_config() -> Config {
    Config::from_parts(
        std::path::PathBuf::from("/mnt"),
        MediaMode::AudioOnly,
        "https://example.test".to_string(),
        None,
        ConfigOverrides::default(),
    )
}

#[tokio::test]
async fn obtain_info_publishes_remote_content_length() {
    let body = b"hello streaming world".to_vec();
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::method("GET"))
        .respond_with(RangeResponder { body: body.clone() })
        .mount(&server)
        .await;

    let resolver = Arc::new(FixedResolver { url: server.uri(), content_length: body.len() as u64 });
    let config = test_config();
    let store = StreamingStore::new(
        "item-1".to_string(),
        MediaMode::AudioOnly,
        resolver,
        reqwest::Client::new(),
        &config,
    )
    .unwrap();

    let size = store.obtain_info().await.unwrap();
    assert_eq!(size, body.len() as u64);
}

#[tokio::test]
async fn read_returns_the_requested_slice() {
    let body = b"0123456789abcdefghij".to_vec();
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::method("GET"))
        .respond_with(RangeResponder { body: body.clone() })
        .mount(&server)
        .await;

    let resolver = Arc::new(FixedResolver { url: server.uri(), content_length: body.len() as u64 });
    let config = test_config();
    let store = StreamingStore::new(
        "item-1".to_string(),
        MediaMode::AudioOnly,
        resolver,
        reqwest::Client::new(),
        &config,
    )
    .unwrap();

    let chunk = store.read(5, 4).await.unwrap();
    assert_eq!(chunk, b"5678");
}

#[tokio::test]
async fn read_past_filesize_is_clipped_never_errors() {
    let body = b"short".to_vec();
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::method("GET"))
        .respond_with(RangeResponder { body: body.clone() })
        .mount(&server)
        .await;

    let resolver = Arc::new(FixedResolver { url: server.uri(), content_length: body.len() as u64 });
    let config = test_config();
    let store = StreamingStore::new(
        "item-1".to_string(),
        MediaMode::AudioOnly,
        resolver,
        reqwest::Client::new(),
        &config,
    )
    .unwrap();

    let tail = store.read(3, 100).await.unwrap();
    assert_eq!(tail, b"rt");

    let at_eof = store.read(body.len() as u64, 10).await.unwrap();
    assert!(at_eof.is_empty());
}

#[tokio::test]
async fn concurrent_full_reads_on_one_store_agree_byte_for_byte() {
    let body: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::method("GET"))
        .respond_with(RangeResponder { body: body.clone() })
        .mount(&server)
        .await;

    let resolver = Arc::new(FixedResolver { url: server.uri(), content_length: body.len() as u64 });
    let config = test_config();
    let store = StreamingStore::new(
        "item-1".to_string(),
        MediaMode::AudioOnly,
        resolver,
        reqwest::Client::new(),
        &config,
    )
    .unwrap();

    let len = body.len() as u32;
    let (first, second) =
        tokio::join!(store.read(0, len), store.read(0, len));
    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first, body);
    assert_eq!(second, body);
}
