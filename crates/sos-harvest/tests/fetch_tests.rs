//! HTTP fetcher retry behaviour against a mock server

use sos_harvest::error::FetchError;
use sos_harvest::harvest::{FileFetcher, HttpFetcherConfig, HttpFileFetcher};
use std::time::Duration;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn fetcher() -> HttpFileFetcher {
    HttpFileFetcher::new(HttpFetcherConfig {
        timeout_secs: 5,
        max_attempts: 3,
        retry_delay: Duration::from_millis(10),
        ..HttpFetcherConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_fetch_text_recovers_after_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/eml.xml"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/eml.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<eml><pubDate>2024-03-01</pubDate></eml>"))
        .mount(&server)
        .await;

    let body = fetcher()
        .fetch_text(&format!("{}/eml.xml", server.uri()))
        .await
        .unwrap();

    assert!(body.contains("2024-03-01"));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_fetch_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/eml.xml"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let url = format!("{}/eml.xml", server.uri());
    let err = fetcher().fetch_text(&url).await.unwrap_err();

    match err {
        FetchError::RetriesExhausted { url: failed, attempts, .. } => {
            assert_eq!(failed, url);
            assert_eq!(attempts, 3);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_fetch_to_file_creates_parent_directories() {
    let server = MockServer::start().await;
    let body = vec![7u8; 64 * 1024];
    Mock::given(method("GET"))
        .and(path("/dwca.zip"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("artportalen").join("dwca.zip");
    let written = fetcher()
        .fetch_to_file(&format!("{}/dwca.zip", server.uri()), &target)
        .await
        .unwrap();

    assert_eq!(written, body.len() as u64);
    assert_eq!(std::fs::read(&target).unwrap(), body);
}
