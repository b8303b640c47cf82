mod common;

use common::{items, mount_page};
use serde_json::json;
use tokio_test::assert_err;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wp_harvest::http::build_client;
use wp_harvest::{ApiPrefix, Error, Paginator};

fn paginator() -> Paginator {
    Paginator::new(build_client().unwrap())
}

fn per_page_rejection() -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "code": "rest_invalid_param",
        "message": "Invalid parameter(s): per_page",
        "data": {
            "status": 400,
            "params": { "per_page": "per_page must be between 1 (inclusive) and 100 (inclusive)" }
        }
    }))
}

#[tokio::test]
async fn fetches_exactly_the_desired_limit() {
    let server = MockServer::start().await;
    mount_page(&server, "posts", 100, 1, items(&server, 1, 100), 1).await;
    mount_page(&server, "posts", 100, 2, items(&server, 101, 100), 1).await;
    mount_page(&server, "posts", 50, 3, items(&server, 201, 50), 1).await;

    let fetched = paginator()
        .fetch_all(&common::origin(&server), ApiPrefix::WpJson, "posts", 250)
        .await
        .unwrap();

    assert_eq!(fetched.len(), 250);
    assert_eq!(fetched[0].id, 1);
    assert_eq!(fetched[249].id, 250);
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn short_page_ends_collection() {
    let server = MockServer::start().await;
    mount_page(&server, "pages", 100, 1, items(&server, 1, 100), 1).await;
    mount_page(&server, "pages", 100, 2, items(&server, 101, 7), 1).await;

    let fetched = paginator()
        .fetch_all(&common::origin(&server), ApiPrefix::WpJson, "pages", 1000)
        .await
        .unwrap();

    assert_eq!(fetched.len(), 107);
}

#[tokio::test]
async fn empty_page_ends_collection() {
    let server = MockServer::start().await;
    mount_page(&server, "media", 100, 1, items(&server, 1, 100), 1).await;
    mount_page(&server, "media", 100, 2, json!([]), 1).await;

    let fetched = paginator()
        .fetch_all(&common::origin(&server), ApiPrefix::WpJson, "media", 1000)
        .await
        .unwrap();

    assert_eq!(fetched.len(), 100);
}

#[tokio::test]
async fn small_limit_requests_small_page() {
    let server = MockServer::start().await;
    mount_page(&server, "posts", 5, 1, items(&server, 1, 5), 1).await;

    let fetched = paginator()
        .fetch_all(&common::origin(&server), ApiPrefix::WpJson, "posts", 5)
        .await
        .unwrap();

    assert_eq!(fetched.len(), 5);
}

#[tokio::test]
async fn rejected_page_size_retries_same_page_clamped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("per_page", "1000"))
        .and(query_param("page", "1"))
        .respond_with(per_page_rejection())
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "posts", 100, 1, items(&server, 1, 100), 1).await;
    mount_page(&server, "posts", 100, 2, items(&server, 101, 20), 1).await;

    let fetched = Paginator::new(build_client().unwrap())
        .with_initial_page_size(1000)
        .fetch_all(&common::origin(&server), ApiPrefix::WpJson, "posts", 1000)
        .await
        .unwrap();

    assert_eq!(fetched.len(), 120);
}

#[tokio::test]
async fn repeated_rejection_gives_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(per_page_rejection())
        .expect(2)
        .mount(&server)
        .await;

    let err = Paginator::new(build_client().unwrap())
        .with_initial_page_size(500)
        .fetch_all(&common::origin(&server), ApiPrefix::WpJson, "posts", 1000)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::PageSizeRejected { per_page: 100 }));
}

#[tokio::test]
async fn tiny_page_size_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(per_page_rejection())
        .expect(1)
        .mount(&server)
        .await;

    let result = paginator()
        .fetch_all(&common::origin(&server), ApiPrefix::WpJson, "posts", 10)
        .await;

    let err = assert_err!(result);
    assert!(matches!(err, Error::HttpStatus { status: 400, .. }));
}

#[tokio::test]
async fn other_errors_propagate_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database error"))
        .expect(1)
        .mount(&server)
        .await;

    let err = paginator()
        .fetch_all(&common::origin(&server), ApiPrefix::WpJson, "posts", 1000)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
}

#[tokio::test]
async fn paginates_under_rest_route_prefix() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("rest_route", "/wp/v2/posts"))
        .and(query_param("per_page", "100"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items(&server, 1, 3)))
        .expect(1)
        .mount(&server)
        .await;

    let fetched = paginator()
        .fetch_all(&common::origin(&server), ApiPrefix::RestRoute, "posts", 1000)
        .await
        .unwrap();

    assert_eq!(fetched.len(), 3);
}

fn invalid_page_number() -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_json(json!({
        "code": "rest_post_invalid_page_number",
        "message": "The page number requested is larger than the number of pages available.",
        "data": { "status": 400 }
    }))
}

#[tokio::test]
async fn page_past_the_end_ends_full_collection() {
    let server = MockServer::start().await;
    mount_page(&server, "posts", 100, 1, items(&server, 1, 100), 1).await;
    mount_page(&server, "posts", 100, 2, items(&server, 101, 100), 1).await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .and(query_param("page", "3"))
        .respond_with(invalid_page_number())
        .expect(1)
        .mount(&server)
        .await;

    let fetched = paginator()
        .fetch_all(&common::origin(&server), ApiPrefix::WpJson, "posts", 1000)
        .await
        .unwrap();

    assert_eq!(fetched.len(), 200);
    assert_eq!(fetched[199].id, 200);
}

#[tokio::test]
async fn invalid_first_page_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/posts"))
        .respond_with(invalid_page_number())
        .expect(1)
        .mount(&server)
        .await;

    let err = paginator()
        .fetch_all(&common::origin(&server), ApiPrefix::WpJson, "posts", 1000)
        .await
        .unwrap_err();

    assert!(err.is_invalid_page_number());
}
