//! Integration tests for error bodies, correlation ids, transport failures,
//! and catalog caching.

#![allow(clippy::unwrap_used)]

use ecom_client::{ApiClient, CatalogClient, ClientConfig, ClientError, TokenStore};
use ecom_core::{Cart, ErrorBody, ErrorCategory, ProductQuery};
use ecom_integration_tests::{InjectedFailure, TestServer, unreachable_url};

// =============================================================================
// Typed and untyped error bodies
// =============================================================================

#[tokio::test]
async fn test_not_found_carries_request_correlation_id() {
    let server = TestServer::start().await;
    let catalog = CatalogClient::new(server.client());

    let err = catalog.get_product("no-such-product").await.unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(err.category(), Some(ErrorCategory::NotFound));
    assert_eq!(err.user_message(), "Product not found");

    let sent = server.state().requests_to("/products/no-such-product");
    let sent_id = sent.first().unwrap().correlation_id.clone();
    assert!(sent_id.is_some());
    assert_eq!(err.correlation_id(), sent_id.as_deref());
}

#[tokio::test]
async fn test_server_correlation_id_wins() {
    let server = TestServer::start().await;
    let mut body = ErrorBody::new(ErrorCategory::RateLimit, "Slow down");
    body.correlation_id = Some("srv-123".to_string());
    server.state().inject_failure(InjectedFailure::Typed(body));

    let err = CatalogClient::new(server.client())
        .list_products(&ProductQuery::default())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(429));
    assert_eq!(err.error_code(), Some("RATE_LIMIT_EXCEEDED"));
    assert_eq!(err.correlation_id(), Some("srv-123"));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_untyped_gateway_error_is_synthesized() {
    let server = TestServer::start().await;
    server.state().inject_failure(InjectedFailure::Raw {
        status: 502,
        body: "<html>Bad Gateway</html>".to_string(),
    });

    let err = CatalogClient::new(server.client())
        .list_products(&ProductQuery::default())
        .await
        .unwrap_err();

    assert!(err.is_server_error());
    assert_eq!(err.category(), Some(ErrorCategory::ExternalService));
    let ClientError::Api(body) = err else {
        panic!("expected an API error");
    };
    assert_eq!(body.status_code, 502);
    assert_eq!(body.error_code, "EXTERNAL_SERVICE_ERROR");
    assert_eq!(body.path.as_deref(), Some("/products"));
    assert!(body.correlation_id.is_some());
}

#[tokio::test]
async fn test_empty_error_body_uses_reason_phrase() {
    let server = TestServer::start().await;
    server.state().inject_failure(InjectedFailure::Raw {
        status: 503,
        body: String::new(),
    });

    let err = CatalogClient::new(server.client())
        .get_product("clay-teapot")
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(err.user_message(), "Service Unavailable");
}

#[tokio::test]
async fn test_unauthenticated_request_without_session() {
    let server = TestServer::start().await;

    let err = server.client().get::<Cart>("cart").await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.category(), Some(ErrorCategory::Authentication));
    assert_eq!(server.state().refresh_calls(), 0);
}

// =============================================================================
// Transport failures
// =============================================================================

#[tokio::test]
async fn test_unreachable_api_is_network_error() {
    let config = ClientConfig::new(&unreachable_url()).unwrap();
    let api = ApiClient::new(config, TokenStore::in_memory()).unwrap();

    let err = CatalogClient::new(api)
        .get_product("clay-teapot")
        .await
        .unwrap_err();

    assert!(err.is_network_error(), "got {err:?}");
    assert_eq!(err.status(), None);
    assert!(err.correlation_id().is_none());
    assert_eq!(
        err.user_message(),
        "Could not reach the store. Check your connection."
    );
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_listing_is_cached() {
    let server = TestServer::start().await;
    let catalog = CatalogClient::new(server.client());
    let query = ProductQuery {
        category: Some("home".to_string()),
        ..ProductQuery::default()
    };

    let first = catalog.list_products(&query).await.unwrap();
    let second = catalog.list_products(&query).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.items.len(), 3);
    assert_eq!(server.state().requests_to("/products").len(), 1);

    catalog.invalidate_all();
    catalog.list_products(&query).await.unwrap();
    assert_eq!(server.state().requests_to("/products").len(), 2);
}

#[tokio::test]
async fn test_search_is_not_cached() {
    let server = TestServer::start().await;
    let catalog = CatalogClient::new(server.client());
    let query = ProductQuery {
        search: Some("SAREE".to_string()),
        ..ProductQuery::default()
    };

    let page = catalog.list_products(&query).await.unwrap();
    catalog.list_products(&query).await.unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items.first().unwrap().slug, "jamdani-saree");
    assert_eq!(server.state().requests_to("/products").len(), 2);
}

#[tokio::test]
async fn test_pagination_meta() {
    let server = TestServer::start().await;
    let catalog = CatalogClient::new(server.client());

    let page_one = catalog
        .list_products(&ProductQuery {
            page: Some(1),
            limit: Some(2),
            ..ProductQuery::default()
        })
        .await
        .unwrap();
    let last = catalog
        .list_products(&ProductQuery {
            page: Some(3),
            limit: Some(2),
            ..ProductQuery::default()
        })
        .await
        .unwrap();

    assert!(page_one.has_next());
    let meta = page_one.meta.unwrap();
    assert_eq!(meta.total, 5);
    assert_eq!(meta.total_pages, 3);
    assert_eq!(last.items.len(), 1);
    assert!(!last.has_next());
}

#[tokio::test]
async fn test_product_page_is_cached() {
    let server = TestServer::start().await;
    let catalog = CatalogClient::new(server.client());

    let product = catalog.get_product("jamdani-saree").await.unwrap();
    catalog.get_product("jamdani-saree").await.unwrap();

    assert!(product.is_on_sale());
    assert_eq!(server.state().requests_to("/products/jamdani-saree").len(), 1);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let server = TestServer::start().await;
    let catalog = CatalogClient::new(server.client());
    server.state().inject_failure(InjectedFailure::Raw {
        status: 500,
        body: "oops".to_string(),
    });

    assert!(catalog.get_product("clay-teapot").await.is_err());
    let product = catalog.get_product("clay-teapot").await.unwrap();

    assert_eq!(product.name, "Clay Teapot");
    assert_eq!(server.state().requests_to("/products/clay-teapot").len(), 2);
}

#[tokio::test]
async fn test_product_slug_stays_in_its_segment() {
    let server = TestServer::start().await;
    let catalog = CatalogClient::new(server.client());

    let err = catalog.get_product("../cart").await.unwrap_err();
    assert_eq!(err.status(), Some(404));

    let err = catalog.get_product("tea?x=1").await.unwrap_err();
    assert_eq!(err.status(), Some(404));

    let state = server.state();
    assert!(state.requests_to("/cart").is_empty());
    assert!(state.requests_to("/products/tea").is_empty());
    assert_eq!(state.requests_to("/products/..%2Fcart").len(), 1);
    assert_eq!(state.requests_to("/products/tea%3Fx=1").len(), 1);
}
