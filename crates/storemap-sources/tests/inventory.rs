//! Integration tests for `InventoryClient` using wiremock HTTP mocks.

use storemap_sources::{HttpSettings, InventoryClient, SourceError};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings() -> HttpSettings {
    HttpSettings {
        timeout_secs: 5,
        user_agent: "storemap-test".to_string(),
        max_retries: 2,
        retry_backoff_ms: 0,
    }
}

fn test_client(base_url: &str) -> InventoryClient {
    InventoryClient::new(base_url, Some("test-token".to_string()), &settings())
        .expect("client construction should not fail")
}

#[tokio::test]
async fn list_chains_sends_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/chains/"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({ "chains": ["konzum", "spar", "lidl"] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let chains = test_client(&server.uri())
        .list_chains()
        .await
        .expect("should list chains");

    assert_eq!(chains, vec!["konzum", "spar", "lidl"]);
}

#[tokio::test]
async fn list_stores_for_chain_parses_stores() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "stores": [
            {
                "chain_code": "konzum",
                "code": "1",
                "type": "supermarket",
                "address": "Ilica 1",
                "city": "Zagreb",
                "zipcode": "10000",
                "lat": null,
                "lon": null
            },
            {
                "chain_code": "konzum",
                "code": "2",
                "type": null,
                "address": "Vukovarska 2",
                "city": "Split",
                "zipcode": null,
                "lat": 43.5,
                "lon": 16.44
            }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/v1/konzum/stores/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let stores = test_client(&server.uri())
        .list_stores_for_chain("konzum")
        .await
        .expect("should list stores");

    assert_eq!(stores.len(), 2);
    assert_eq!(stores[0].address, "Ilica 1");
    assert!(stores[0].coordinate().is_none());
    assert_eq!(stores[1].store_type, "");
    assert_eq!(stores[1].zipcode, "");
    assert!(stores[1].coordinate().is_some());
}

#[tokio::test]
async fn missing_token_fails_without_a_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = InventoryClient::new(&server.uri(), None, &settings()).unwrap();
    let err = client.list_chains().await.unwrap_err();

    assert!(matches!(err, SourceError::MissingCredential { .. }));
    assert!(err.is_configuration());
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/chains/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/chains/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "chains": ["spar"] })),
        )
        .mount(&server)
        .await;

    let chains = test_client(&server.uri())
        .list_chains()
        .await
        .expect("should succeed after retries");

    assert_eq!(chains, vec!["spar"]);
}

#[tokio::test]
async fn unauthorized_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .list_chains()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SourceError::UnexpectedStatus { status: 401, .. }
    ));
}

#[tokio::test]
async fn malformed_body_is_a_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = test_client(&server.uri())
        .list_stores_for_chain("konzum")
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::Deserialize { .. }));
}
