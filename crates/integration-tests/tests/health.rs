mod harness;

use harness::config::ConfigBuilder;
use harness::mock_backend::MockBackend;
use harness::server::TestServer;

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let mock = MockBackend::start().await.unwrap();
    let config = ConfigBuilder::new()
        .with_openai_provider("mock", &mock.openai_url())
        .build();

    let server = TestServer::start(config).await.unwrap();

    let resp = server.client().get(server.url("/health")).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn health_endpoint_disabled() {
    let mock = MockBackend::start().await.unwrap();
    let config = ConfigBuilder::new()
        .with_openai_provider("mock", &mock.openai_url())
        .without_health()
        .build();

    let server = TestServer::start(config).await.unwrap();

    let resp = server.client().get(server.url("/health")).send().await.unwrap();

    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn health_skips_auth() {
    let mock = MockBackend::start().await.unwrap();
    let config = ConfigBuilder::new()
        .with_openai_provider("mock", &mock.openai_url())
        .with_api_keys(&["sk-test"])
        .build();

    let server = TestServer::start(config).await.unwrap();

    let resp = server.client().get(server.url("/health")).send().await.unwrap();

    assert_eq!(resp.status(), 200);
}
