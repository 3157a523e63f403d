//! Integration tests from config file to a working service.

use std::fs;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use forgeline::core::config::Config;
use forgeline::forge::{create_service, ForgePrService, RetryPolicy};
use forgeline::state::QueryOptions;

fn load(contents: &str) -> (TempDir, Config) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, contents).unwrap();
    let config = Config::from_path(&path).unwrap();
    (dir, config)
}

#[test]
fn project_from_remote_url() {
    let (_dir, config) = load(
        r#"
[gitlab]
host = "git.example.com"
remote_url = "git@git.example.com:platform/tools/app.git"

[retry]
max_attempts = 2
delay_ms = 100
"#,
    );

    let settings = config.service_settings();
    assert_eq!(settings.api_base, "https://git.example.com/api/v4");
    assert_eq!(settings.retry, RetryPolicy::new(2, Duration::from_millis(100)));

    let service = create_service(settings).unwrap();
    assert_eq!(service.name(), "gitlab");
    assert!(!*service.loading().borrow());
}

#[test]
fn remote_for_another_host_is_rejected() {
    let (_dir, config) = load(
        r#"
[gitlab]
host = "git.example.com"
remote_url = "git@gitlab.com:team/app.git"
"#,
    );

    assert!(create_service(config.service_settings()).is_err());
}

#[tokio::test]
async fn configured_service_reads_from_api_base() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v4/projects/team%2Fapp/merge_requests/3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 903,
            "iid": 3,
            "project_id": 1,
            "title": "Tidy",
            "state": "closed",
            "source_branch": "tidy",
            "target_branch": "main",
            "web_url": "https://gitlab.example.com/team/app/-/merge_requests/3",
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-02T10:00:00Z",
            "closed_at": "2024-05-02T10:00:00Z"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (_dir, config) = load(&format!(
        "[gitlab]\napi_base = \"{}/api/v4\"\nproject = \"team/app\"\n\n[telemetry]\nenabled = false\n",
        server.uri()
    ));
    let service = create_service(config.service_settings()).unwrap();

    let pr = service.fetch(3, QueryOptions::default()).await.unwrap();

    assert_eq!(pr.title, "Tidy");
    assert_eq!(pr.state, forgeline::forge::PrState::Closed);
    assert!(pr.closed_at.is_some());
}
