//! End-to-end crawls against a mock catalog.
//!
//! The catalog, the home page and the caption CDN are all served by one
//! wiremock server; captions and the ledger are written to a temp directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use capcrawl_core::{
    CaptionHost, CatalogEndpoints, ClientConfig, CrawlError, Crawler, CrawlerConfig,
    ReviewPrompt, ScriptedPrompt,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COLLECTION_PATH: &str = "/content/v5/view_hubs/anime-tv/collections/4559";
const SERIES_PATH: &str = "/content/v5/hubs/series/A1";
const SEASON_PATH: &str = "/content/v5/hubs/series/A1/season/1";

fn closed_caption() -> String {
    "WEBVTT\n\n".to_string() + &"[footsteps]\n".repeat(15)
}

fn episode_json(number: &str, name: &str, id: &str, content_id: &str) -> serde_json::Value {
    json!({
        "number": number,
        "name": name,
        "id": id,
        "personalization": {"eab": format!("x::y::{content_id}")}
    })
}

fn caption_path(content_id: &str) -> String {
    let digits: String = content_id.chars().filter(char::is_ascii_digit).collect();
    let shard: u64 = digits[digits.len().saturating_sub(3)..].parse().unwrap();
    format!("/captions/{shard}/{content_id}_US_en_en.vtt")
}

/// Mount the home page and a one-series, one-season catalog.
async fn mount_catalog(server: &MockServer, episodes: Vec<serde_json::Value>) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(COLLECTION_PATH))
        .and(query_param("schema", "1"))
        .and(query_param("limit", "9999"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "A1", "metrics_info": {"target_name": "Foo"}}]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(SERIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "components": [{"items": [{"name": "Season 1"}]}]
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(SEASON_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": episodes })))
        .mount(server)
        .await;
}

async fn mount_caption(server: &MockServer, content_id: &str, status: u16, body: &str, calls: u64) {
    Mock::given(method("GET"))
        .and(path(caption_path(content_id)))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .expect(calls)
        .mount(server)
        .await;
}

fn crawler(server: &MockServer, root: &Path, prompt: Arc<dyn ReviewPrompt>) -> Crawler {
    let config = CrawlerConfig {
        client: ClientConfig {
            concurrency: 4,
            timeout_secs: 5,
            ..ClientConfig::default()
        },
        endpoints: CatalogEndpoints::with_base(&server.uri()),
        captions: CaptionHost {
            prefix: format!("{}/captions/", server.uri()),
            suffix: "_US_en_en.vtt".to_string(),
        },
        output_dir: root.join("subtitles"),
        inspection_dir: root.join("check"),
    };
    Crawler::new(config, prompt).expect("crawler should build")
}

fn read_ledger(path: &Path) -> Vec<String> {
    serde_json::from_str(&std::fs::read_to_string(path).expect("ledger file")).expect("json array")
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let Ok(entries) = std::fs::read_dir(dir) else {
        return found;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            found.extend(files_under(&path));
        } else {
            found.push(path);
        }
    }
    found
}

#[tokio::test]
async fn test_single_episode_is_stored_and_recorded() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let body = closed_caption();
    mount_catalog(&server, vec![episode_json("1", "Foo Ep1", "E1", "C1")]).await;
    mount_caption(&server, "C1", 200, &body, 1).await;

    let crawler = crawler(&server, temp.path(), Arc::new(ScriptedPrompt::always(false)));
    let ledger_path = temp.path().join("archive.json");
    let summary = crawler.run(&ledger_path, false).await.unwrap();

    let stored = temp.path().join("subtitles/Foo/Foo - 1.vtt");
    assert_eq!(std::fs::read_to_string(&stored).unwrap(), body);
    assert_eq!(files_under(&temp.path().join("subtitles")), vec![stored]);
    assert_eq!(read_ledger(&ledger_path), vec!["E1C1"]);
    assert_eq!(summary.seasons, 1);
    assert_eq!(summary.episodes, 1);
}

#[tokio::test]
async fn test_missing_caption_is_skipped_but_recorded() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_catalog(
        &server,
        vec![
            episode_json("1", "Foo Ep1", "E1", "100"),
            episode_json("2", "Foo Ep2", "E2", "200"),
        ],
    )
    .await;
    mount_caption(&server, "100", 404, "", 1).await;
    mount_caption(&server, "200", 200, &closed_caption(), 1).await;

    let crawler = crawler(&server, temp.path(), Arc::new(ScriptedPrompt::always(false)));
    let ledger_path = temp.path().join("archive.json");
    let summary = crawler.run(&ledger_path, false).await.unwrap();

    assert!(!temp.path().join("subtitles/Foo/Foo - 1.vtt").exists());
    assert!(temp.path().join("subtitles/Foo/Foo - 2.vtt").exists());

    let mut ledger = read_ledger(&ledger_path);
    ledger.sort();
    assert_eq!(ledger, vec!["E1100", "E2200"]);
    assert_eq!(summary.episodes, 1);
}

#[tokio::test]
async fn test_region_block_aborts_without_saving_ledger() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(COLLECTION_PATH))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let ledger_path = temp.path().join("archive.json");
    std::fs::write(&ledger_path, r#"["OLD"]"#).unwrap();

    let crawler = crawler(&server, temp.path(), Arc::new(ScriptedPrompt::always(true)));
    let result = crawler.run(&ledger_path, true).await;

    assert!(matches!(result, Err(CrawlError::RegionBlocked { .. })));
    assert_eq!(std::fs::read_to_string(&ledger_path).unwrap(), r#"["OLD"]"#);
}

#[tokio::test]
async fn test_series_detail_error_is_fatal() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(COLLECTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "A1", "metrics_info": {"target_name": "Foo"}}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SERIES_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let ledger_path = temp.path().join("archive.json");
    let crawler = crawler(&server, temp.path(), Arc::new(ScriptedPrompt::always(true)));
    let result = crawler.run(&ledger_path, false).await;

    assert!(matches!(
        result,
        Err(CrawlError::UnexpectedStatus { status: 500, .. })
    ));
    assert!(!ledger_path.exists());
}

#[tokio::test]
async fn test_second_run_fetches_nothing() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_catalog(
        &server,
        vec![
            episode_json("1", "Foo Ep1", "E1", "101"),
            episode_json("2", "Foo Ep2", "E2", "102"),
        ],
    )
    .await;
    // Each caption may be requested exactly once across both runs
    mount_caption(&server, "101", 200, &closed_caption(), 1).await;
    mount_caption(&server, "102", 404, "", 1).await;

    let crawler = crawler(&server, temp.path(), Arc::new(ScriptedPrompt::always(false)));
    let ledger_path = temp.path().join("archive.json");

    let first = crawler.run(&ledger_path, true).await.unwrap();
    let second = crawler.run(&ledger_path, true).await.unwrap();

    assert_eq!(first.episodes, 1);
    assert_eq!(second.episodes, 0);
    assert_eq!(second.seasons, 0);
    assert_eq!(read_ledger(&ledger_path).len(), 2);
}

#[tokio::test]
async fn test_inconclusive_caption_follows_reviewer() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_catalog(&server, vec![episode_json("3", "Foo Ep3", "E3", "303")]).await;
    mount_caption(&server, "303", 200, "WEBVTT\n\nHello there.", 1).await;

    let prompt = Arc::new(ScriptedPrompt::always(true));
    let crawler = crawler(&server, temp.path(), prompt.clone());
    let summary = crawler
        .run(&temp.path().join("archive.json"), false)
        .await
        .unwrap();

    assert_eq!(summary.episodes, 1);
    assert!(temp.path().join("subtitles/Foo/Foo - 3.vtt").exists());

    let asked = prompt.asked();
    assert_eq!(asked.len(), 1);
    assert_eq!(asked[0].series_name, "Foo");
    assert_eq!(asked[0].title, "Foo Ep3");
    assert!(files_under(&temp.path().join("check")).is_empty());
}

#[tokio::test]
async fn test_rejected_caption_is_not_stored() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_catalog(&server, vec![episode_json("3", "Foo Ep3", "E3", "303")]).await;
    mount_caption(&server, "303", 200, "WEBVTT\n\nHello there.", 1).await;

    let crawler = crawler(&server, temp.path(), Arc::new(ScriptedPrompt::always(false)));
    let ledger_path = temp.path().join("archive.json");
    let summary = crawler.run(&ledger_path, false).await.unwrap();

    assert_eq!(summary.episodes, 0);
    assert!(files_under(&temp.path().join("subtitles")).is_empty());
    assert_eq!(read_ledger(&ledger_path), vec!["E3303"]);
}

#[tokio::test]
async fn test_subtitled_release_is_never_fetched() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_catalog(&server, vec![episode_json("1", "(Sub) Foo Ep1", "E1", "111")]).await;
    mount_caption(&server, "111", 200, &closed_caption(), 0).await;

    let crawler = crawler(&server, temp.path(), Arc::new(ScriptedPrompt::always(true)));
    let ledger_path = temp.path().join("archive.json");
    let summary = crawler.run(&ledger_path, false).await.unwrap();

    assert_eq!(summary.episodes, 0);
    assert_eq!(read_ledger(&ledger_path), vec!["E1111"]);
}

#[tokio::test]
async fn test_dubbed_title_is_accepted_without_review() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_catalog(&server, vec![episode_json("1", "(Dub) Foo Ep1", "E1", "121")]).await;
    mount_caption(&server, "121", 200, "WEBVTT\n\nHi.", 1).await;

    let prompt = Arc::new(ScriptedPrompt::always(false));
    let crawler = crawler(&server, temp.path(), prompt.clone());
    let summary = crawler
        .run(&temp.path().join("archive.json"), false)
        .await
        .unwrap();

    assert_eq!(summary.episodes, 1);
    assert!(prompt.asked().is_empty());
}

#[tokio::test]
async fn test_unreadable_collection_is_an_empty_crawl() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(COLLECTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let ledger_path = temp.path().join("archive.json");
    let crawler = crawler(&server, temp.path(), Arc::new(ScriptedPrompt::always(true)));
    let summary = crawler.run(&ledger_path, false).await.unwrap();

    assert_eq!(summary.episodes, 0);
    assert!(read_ledger(&ledger_path).is_empty());
}

#[tokio::test]
async fn test_malformed_episode_does_not_stop_siblings() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    let broken = json!({
        "number": "1", "name": "Broken", "id": "E1",
        "personalization": {"eab": "no-segments"}
    });
    mount_catalog(&server, vec![broken, episode_json("2", "Foo Ep2", "E2", "222")]).await;
    mount_caption(&server, "222", 200, &closed_caption(), 1).await;

    let crawler = crawler(&server, temp.path(), Arc::new(ScriptedPrompt::always(false)));
    let ledger_path = temp.path().join("archive.json");
    let summary = crawler.run(&ledger_path, false).await.unwrap();

    assert_eq!(summary.episodes, 1);
    assert_eq!(read_ledger(&ledger_path), vec!["E2222"]);
}

#[tokio::test]
async fn test_season_listing_error_is_fatal() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(COLLECTION_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": "A1", "metrics_info": {"target_name": "Foo"}}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SERIES_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "components": [{"items": [{"name": "Season 1"}]}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(SEASON_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let ledger_path = temp.path().join("archive.json");
    let crawler = crawler(&server, temp.path(), Arc::new(ScriptedPrompt::always(true)));
    let result = crawler.run(&ledger_path, false).await;

    assert!(matches!(
        result,
        Err(CrawlError::UnexpectedStatus { status: 500, .. })
    ));
    assert!(!ledger_path.exists());
}

#[tokio::test]
async fn test_unwritable_inspection_file_only_skips_that_episode() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    // Longer than any file name the filesystem accepts
    let long_title = "L".repeat(300);
    mount_catalog(
        &server,
        vec![
            episode_json("1", &long_title, "E1", "131"),
            episode_json("2", "Foo Ep2", "E2", "132"),
        ],
    )
    .await;
    mount_caption(&server, "131", 200, "WEBVTT\n\nHello there.", 1).await;
    mount_caption(&server, "132", 200, &"[x]".repeat(20), 1).await;

    let prompt = Arc::new(ScriptedPrompt::always(true));
    let crawler = crawler(&server, temp.path(), prompt.clone());
    let ledger_path = temp.path().join("archive.json");
    let summary = crawler.run(&ledger_path, false).await.unwrap();

    assert_eq!(summary.episodes, 1);
    assert!(temp.path().join("subtitles/Foo/Foo - 2.vtt").exists());
    assert!(prompt.asked().is_empty());
    // Not recorded, so the next run tries it again
    assert_eq!(read_ledger(&ledger_path), vec!["E2132"]);
}

#[tokio::test]
async fn test_episode_listed_twice_is_fetched_once() {
    let server = MockServer::start().await;
    let temp = TempDir::new().unwrap();
    mount_catalog(
        &server,
        vec![
            episode_json("4", "Foo Ep4", "E4", "144"),
            episode_json("4", "Foo Ep4", "E4", "144"),
        ],
    )
    .await;
    mount_caption(&server, "144", 200, "WEBVTT\n\nHello there.", 1).await;

    let prompt = Arc::new(ScriptedPrompt::always(true));
    let crawler = crawler(&server, temp.path(), prompt.clone());
    let ledger_path = temp.path().join("archive.json");
    let summary = crawler.run(&ledger_path, false).await.unwrap();

    assert_eq!(summary.episodes, 1);
    assert_eq!(prompt.asked().len(), 1);
    assert_eq!(read_ledger(&ledger_path), vec!["E4144"]);
}
