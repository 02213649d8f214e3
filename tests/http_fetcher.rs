//! The blocking HTTP client against a mock server. Blocking calls run on
//! `spawn_blocking` so they stay off the async runtime.

use std::io::Cursor;
use std::time::Duration;

use assert_matches::assert_matches;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use imgpack::app::App;
use imgpack::archive::verify_archive;
use imgpack::config::PipelineConfig;
use imgpack::domain::FailureReason;
use imgpack::fetcher::{HttpImageClient, ImageClient};
use imgpack::progress::NoProgress;
use imgpack::table::Table;

const USER_AGENT: &str = "imgpack-tests";

async fn server_with(route: &str, response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(&server)
        .await;
    server
}

#[tokio::test(flavor = "multi_thread")]
async fn ok_status_returns_body() {
    let server = server_with(
        "/cat.png",
        ResponseTemplate::new(200).set_body_bytes(b"\x89PNG".to_vec()),
    )
    .await;
    let url = format!("{}/cat.png", server.uri());

    let result = tokio::task::spawn_blocking(move || {
        let client = HttpImageClient::with_timeout(USER_AGENT, Duration::from_secs(5)).unwrap();
        client.get(&url)
    })
    .await
    .unwrap();

    assert_eq!(result.unwrap(), b"\x89PNG".to_vec());
}

#[tokio::test(flavor = "multi_thread")]
async fn non_200_success_status_is_a_failure() {
    let server = server_with("/empty", ResponseTemplate::new(204)).await;
    let url = format!("{}/empty", server.uri());

    let result = tokio::task::spawn_blocking(move || {
        let client = HttpImageClient::with_timeout(USER_AGENT, Duration::from_secs(5)).unwrap();
        client.get(&url)
    })
    .await
    .unwrap();

    assert_matches!(result, Err(FailureReason::Status(204)));
}

#[tokio::test(flavor = "multi_thread")]
async fn not_found_reports_status_code() {
    let server = server_with("/missing.png", ResponseTemplate::new(404)).await;
    let url = format!("{}/missing.png", server.uri());

    let result = tokio::task::spawn_blocking(move || {
        let client = HttpImageClient::with_timeout(USER_AGENT, Duration::from_secs(5)).unwrap();
        client.get(&url)
    })
    .await
    .unwrap();

    assert_matches!(result, Err(FailureReason::Status(404)));
}

#[tokio::test(flavor = "multi_thread")]
async fn slow_response_is_a_transport_failure() {
    let server = server_with(
        "/slow.png",
        ResponseTemplate::new(200)
            .set_body_bytes(b"late".to_vec())
            .set_delay(Duration::from_secs(3)),
    )
    .await;
    let url = format!("{}/slow.png", server.uri());

    let result = tokio::task::spawn_blocking(move || {
        let client =
            HttpImageClient::with_timeout(USER_AGENT, Duration::from_millis(300)).unwrap();
        client.get(&url)
    })
    .await
    .unwrap();

    assert_matches!(result, Err(FailureReason::Transport(message)) if message.contains("timed out"));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_host_is_a_transport_failure() {
    let result = tokio::task::spawn_blocking(|| {
        let client = HttpImageClient::with_timeout(USER_AGENT, Duration::from_secs(2)).unwrap();
        client.get("http://127.0.0.1:9/nothing.png")
    })
    .await
    .unwrap();

    assert_matches!(result, Err(FailureReason::Transport(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn run_survives_a_timeout_and_archives_the_rest() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fast.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"fast".to_vec()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/stuck.png"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;
    let base = server.uri();

    let (summary, names) = tokio::task::spawn_blocking(move || {
        let client =
            HttpImageClient::with_timeout(USER_AGENT, Duration::from_millis(300)).unwrap();
        let mut app = App::new(PipelineConfig::default(), client);
        let table = Table::new(
            vec!["Item".to_string(), "URL".to_string()],
            vec![
                vec![Some("fast".to_string()), Some(format!("{base}/fast.png"))],
                vec![Some("stuck".to_string()), Some(format!("{base}/stuck.png"))],
            ],
        );
        let report = app
            .run(&table, Cursor::new(Vec::new()), &NoProgress)
            .unwrap();
        let names = verify_archive(Cursor::new(report.archive.into_inner())).unwrap();
        (report.summary, names)
    })
    .await
    .unwrap();

    assert_eq!(names, vec!["fast.jpg"]);
    assert_eq!(summary.success_count, 1);
    let failures = summary.failures.expect("timeout recorded");
    assert_eq!(failures.export[0].item, "stuck");
    assert!(failures.display[0].reason.contains("timed out"));
}
