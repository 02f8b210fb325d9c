use std::time::Duration;

use glance_engine::guard::{AddressRange, BlockReason, GuardSettings, UrlGuard};
use glance_engine::{ApprovedTarget, FailureKind, FetchSettings, Fetcher, ReqwestFetcher};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// The mock server listens on loopback, so tests trust it explicitly.
fn local_guard() -> UrlGuard {
    UrlGuard::new(GuardSettings {
        trusted_hosts: vec!["127.0.0.1".to_string()],
    })
}

fn fetcher(settings: FetchSettings) -> ReqwestFetcher {
    ReqwestFetcher::new(settings, local_guard())
}

async fn approve(url: &str) -> ApprovedTarget {
    local_guard()
        .check(url)
        .await
        .into_result()
        .expect("mock server url approved")
}

#[tokio::test]
async fn fetcher_returns_html_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html>ok</html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/doc", server.uri());
    let target = approve(&url).await;
    let output = fetcher(FetchSettings::default())
        .fetch(&target, &CancellationToken::new())
        .await
        .expect("fetch ok");

    assert_eq!(output.metadata.original_url, url);
    assert_eq!(output.metadata.final_url, output.metadata.original_url);
    assert_eq!(output.metadata.redirect_count, 0);
    assert_eq!(output.metadata.byte_len, 15);
    assert!(output
        .metadata
        .content_type
        .unwrap()
        .starts_with("text/html"));
    assert_eq!(output.bytes, b"<html>ok</html>");
}

#[tokio::test]
async fn fetcher_fails_on_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let target = approve(&format!("{}/missing", server.uri())).await;
    let err = fetcher(FetchSettings::default())
        .fetch(&target, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
}

#[tokio::test]
async fn fetcher_times_out_on_slow_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_string("slow"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_millis(50),
        ..FetchSettings::default()
    };
    let target = approve(&format!("{}/slow", server.uri())).await;
    let err = fetcher(settings)
        .fetch(&target, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
}

#[tokio::test]
async fn fetcher_rejects_declared_oversize_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/large"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("01234567890", "text/html"),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        max_bytes: 10,
        ..FetchSettings::default()
    };
    let target = approve(&format!("{}/large", server.uri())).await;
    let err = fetcher(settings)
        .fetch(&target, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::TooLarge {
            max_bytes: 10,
            actual: Some(11)
        }
    );
}

#[tokio::test]
async fn fetcher_follows_redirects_on_the_same_host() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("Location", "/new"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>moved</p>", "text/html"))
        .mount(&server)
        .await;

    let target = approve(&format!("{}/old", server.uri())).await;
    let output = fetcher(FetchSettings::default())
        .fetch(&target, &CancellationToken::new())
        .await
        .expect("redirect followed");

    assert_eq!(output.metadata.redirect_count, 1);
    assert_eq!(output.metadata.final_url, format!("{}/new", server.uri()));
    assert_eq!(output.bytes, b"<p>moved</p>");
}

#[tokio::test]
async fn redirect_into_metadata_range_is_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bounce"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("Location", "http://169.254.169.254/latest/meta-data"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let target = approve(&format!("{}/bounce", server.uri())).await;
    let err = fetcher(FetchSettings::default())
        .fetch(&target, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::Blocked(BlockReason::Address(AddressRange::LinkLocal))
    );
}

#[tokio::test]
async fn redirect_loops_stop_at_the_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/loop"))
        .mount(&server)
        .await;

    let settings = FetchSettings {
        redirect_limit: 2,
        ..FetchSettings::default()
    };
    let target = approve(&format!("{}/loop", server.uri())).await;
    let err = fetcher(settings)
        .fetch(&target, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::RedirectLimitExceeded);
}

#[tokio::test]
async fn cancelling_aborts_an_inflight_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/hang"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_string("late"),
        )
        .mount(&server)
        .await;

    let target = approve(&format!("{}/hang", server.uri())).await;
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = fetcher(FetchSettings::default())
        .fetch(&target, &cancel)
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Cancelled);
}

#[tokio::test]
async fn refused_connection_is_a_network_failure() {
    let url = Url::parse("http://127.0.0.1:1/unreachable").unwrap();
    let target = ApprovedTarget {
        url,
        pinned_addrs: Vec::new(),
    };
    let settings = FetchSettings {
        connect_timeout: Duration::from_millis(200),
        ..FetchSettings::default()
    };
    let err = fetcher(settings)
        .fetch(&target, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Network);
}

#[tokio::test]
async fn fetcher_connects_to_the_pinned_address() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("<p>pinned</p>", "text/html"))
        .expect(1)
        .mount(&server)
        .await;

    // The name does not resolve; only the pinned address can reach the server.
    let port = server.address().port();
    let target = ApprovedTarget {
        url: Url::parse(&format!("http://pinned.invalid:{port}/x")).unwrap(),
        pinned_addrs: vec![*server.address()],
    };
    let output = fetcher(FetchSettings::default())
        .fetch(&target, &CancellationToken::new())
        .await
        .expect("pinned address reached");

    assert_eq!(output.bytes, b"<p>pinned</p>");
    assert_eq!(output.metadata.final_url, format!("http://pinned.invalid:{port}/x"));
}

#[tokio::test]
async fn fetcher_refuses_content_types_outside_the_allow_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("%PDF-1.7", "application/pdf"))
        .mount(&server)
        .await;

    let target = approve(&format!("{}/report.pdf", server.uri())).await;
    let err = fetcher(FetchSettings::default())
        .fetch(&target, &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::UnsupportedContentType {
            content_type: "application/pdf".to_string()
        }
    );
}

#[tokio::test]
async fn content_type_parameters_and_case_are_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<p>x</p>", "Application/XHTML+xml; charset=utf-8"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/untyped"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes("<p>y</p>"))
        .mount(&server)
        .await;

    for route in ["/page", "/untyped"] {
        let target = approve(&format!("{}{route}", server.uri())).await;
        fetcher(FetchSettings::default())
            .fetch(&target, &CancellationToken::new())
            .await
            .unwrap_or_else(|err| panic!("{route} refused: {err}"));
    }
}
