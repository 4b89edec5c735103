//! Contract tests for `HttpRepository` against a mock REST backend.

use garden_query::backend::InMemoryBackend;
use garden_query::models::{Media, Soil, Vegetable, VegetableInput};
use garden_query::repository::HttpRepository;
use garden_query::{ClientConfig, DataRepository, Error, ListParams, QueryClient};
use httpmock::MockServer;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TOMATO: &str = r#"{"id":"veg_1","slug":"tomato","name":"Tomato","category":"fruit","daysToHarvest":75}"#;

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        base_url: format!("{}/api", server.base_url()),
        api_token: Some("t0ken".to_string()),
        retry_backoff: Duration::from_millis(1),
        ..Default::default()
    }
}

fn repository(server: &MockServer) -> HttpRepository {
    HttpRepository::new(&config(server)).expect("repository")
}

#[tokio::test]
async fn list_sends_params_and_bearer_token() {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/api/vegetables")
            .query_param("page", "2")
            .query_param("limit", "10")
            .query_param("q", "tom")
            .query_param("category", "fruit")
            .header("authorization", "Bearer t0ken");
        then.status(200)
            .header("content-type", "application/json")
            .body(format!(r#"{{"items":[{TOMATO}],"page":2,"limit":10,"total":11}}"#));
    });

    let params = ListParams::new()
        .page(2)
        .limit(10)
        .query("  tom ")
        .filter("category", "fruit");
    let page = repository(&server)
        .fetch_list::<Vegetable>(&params)
        .await
        .expect("list");

    mock.assert();
    assert_eq!(page.total, 11);
    assert_eq!(page.total_pages(), 2);
    assert_eq!(page.items[0].days_to_harvest, Some(75));
}

#[tokio::test]
async fn status_codes_map_to_typed_errors() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("GET").path("/api/soils/missing");
        then.status(404).body(r#"{"message":"soil not found"}"#);
    });
    server.mock(|when, then| {
        when.method("POST").path("/api/vegetables");
        then.status(409).body(r#"{"message":"slug already exists"}"#);
    });
    server.mock(|when, then| {
        when.method("DELETE").path("/api/vegetables/veg_1");
        then.status(400).body(r#"{"error":"vegetable is referenced by 2 rules"}"#);
    });
    let repo = repository(&server);

    let err = repo.fetch_one::<Soil>("missing").await.expect_err("404");
    assert!(err.is_not_found());

    let err = repo
        .create::<Vegetable, _>(&VegetableInput::new("tomato", "Tomato", "fruit"))
        .await
        .expect_err("409");
    assert!(err.is_conflict());
    assert_eq!(err.user_message(), "This value is already in use.");

    let err = repo.delete::<Vegetable>("veg_1").await.expect_err("400");
    match err {
        Error::Validation(Some(message)) => assert_eq!(message, "vegetable is referenced by 2 rules"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unauthorized_calls_handler_and_is_not_retried() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/soils/s1");
        then.status(401);
    });

    let seen = Arc::new(AtomicU16::new(0));
    let handler_seen = Arc::clone(&seen);
    let repo = repository(&server)
        .with_unauthorized_handler(move |status: u16| handler_seen.store(status, Ordering::SeqCst));
    let client = QueryClient::new(InMemoryBackend::new(), repo).with_config(config(&server));

    let err = client
        .resource::<Soil>()
        .fetch_detail("s1")
        .await
        .expect_err("unauthorized");

    assert!(matches!(err, Error::Unauthorized { status: 401 }));
    assert_eq!(seen.load(Ordering::SeqCst), 401);
    mock.assert();
}

#[tokio::test]
async fn server_errors_are_retried_for_reads() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET").path("/api/soils/s1");
        then.status(503).body("upstream unavailable");
    });
    let client = QueryClient::new(InMemoryBackend::new(), repository(&server)).with_config(ClientConfig {
        read_retries: 2,
        ..config(&server)
    });

    let err = client
        .resource::<Soil>()
        .fetch_detail("s1")
        .await
        .expect_err("still failing");

    assert!(matches!(err, Error::Server { status: 503, .. }));
    mock.assert_calls(3);
}

#[tokio::test]
async fn update_sends_patch_and_overwrites_detail() {
    let server = MockServer::start();
    let patch = server.mock(|when, then| {
        when.method("PATCH")
            .path("/api/vegetables/veg_1")
            .header("content-type", "application/json")
            .json_body_includes(r#"{"slug":"tomato","daysToHarvest":75}"#);
        then.status(200)
            .header("content-type", "application/json")
            .body(TOMATO);
    });
    let get = server.mock(|when, then| {
        when.method("GET").path("/api/vegetables/veg_1");
        then.status(200)
            .header("content-type", "application/json")
            .body(TOMATO);
    });
    let client = QueryClient::new(InMemoryBackend::new(), repository(&server)).with_config(config(&server));
    let vegetables = client.resource::<Vegetable>();

    let input = VegetableInput {
        days_to_harvest: Some(75),
        ..VegetableInput::new("tomato", "Tomato", "fruit")
    };
    vegetables.update("veg_1", &input).await.expect("update");
    let state = vegetables.detail(Some("veg_1")).await;

    patch.assert();
    assert_eq!(state.data.expect("overwritten detail").days_to_harvest, Some(75));
    get.assert_calls(0);
}

#[tokio::test]
async fn media_cursor_is_forwarded() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/api/media")
            .query_param("limit", "2")
            .query_param("cursor", "abc");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"items":[{"id":"m9","url":"https://cdn.example.com/m9.png","filename":"m9.png","mimeType":"image/png"}],"nextCursor":null}"#);
    });

    let page = repository(&server)
        .fetch_cursor_page::<Media>(&ListParams::new().limit(2), Some("abc"))
        .await
        .expect("page");

    mock.assert();
    assert_eq!(page.next_cursor, None);
    assert!(page.items[0].is_image());
}
