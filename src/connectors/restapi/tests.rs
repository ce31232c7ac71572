use super::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn uid() -> Uuid {
    Uuid::parse_str("5ee55a5c-6e30-4c7a-80e8-90165a729e0a").unwrap()
}

fn doc(v: Value) -> Document {
    v.as_object().cloned().unwrap()
}

fn config(server: &MockServer, auth: Value) -> Document {
    doc(json!({"base_url": server.uri(), "authentication": auth}))
}

async fn run(server: &MockServer, task: &str, auth: Value, input: Value) -> Result<Vec<Document>> {
    let connector = RestApiConnector::new().unwrap();
    let exec = connector.create_execution(uid(), task, &config(server, auth))?;
    exec.execute(vec![doc(input)]).await
}

#[tokio::test]
async fn test_post_with_json_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/items"))
        .and(body_json(json!({"name": "widget"})))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("X-Request-Id", "abc")
                .set_body_json(json!({"id": 7})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let out = run(
        &server,
        "TASK_POST",
        json!({"auth_type": "NO_AUTH"}),
        json!({"endpoint_path": "/v1/items", "body": {"name": "widget"}}),
    )
    .await
    .unwrap();

    assert_eq!(out[0]["status_code"], json!(201));
    assert_eq!(out[0]["body"], json!({"id": 7}));
    assert_eq!(out[0]["header"]["X-Request-Id"], json!(["abc"]));
}

#[tokio::test]
async fn test_error_status_is_a_valid_output() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let out = run(
        &server,
        "TASK_GET",
        json!({"auth_type": "NO_AUTH"}),
        json!({"endpoint_path": "/missing", "body": {"ignored": true}}),
    )
    .await
    .unwrap();

    assert_eq!(out[0]["status_code"], json!(404));
    assert_eq!(out[0]["body"], json!("not here"));

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].body.is_empty());
}

#[tokio::test]
async fn test_basic_auth_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("Authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    run(
        &server,
        "TASK_GET",
        json!({"auth_type": "BASIC_AUTH", "username": "user", "password": "pass"}),
        json!({}),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_bearer_token_header() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(header("Authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let out = run(
        &server,
        "TASK_DELETE",
        json!({"auth_type": "BEARER_TOKEN", "token": "tok"}),
        json!({"endpoint_path": "/x"}),
    )
    .await
    .unwrap();
    assert_eq!(out[0]["body"], Value::Null);
}

#[tokio::test]
async fn test_api_key_in_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("X-Api-Key", "k-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    run(
        &server,
        "TASK_GET",
        json!({"auth_type": "API_KEY", "key": "X-Api-Key", "value": "k-123", "auth_location": "header"}),
        json!({}),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_api_key_in_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "rust"))
        .and(query_param("api_key", "k-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": 1})))
        .expect(1)
        .mount(&server)
        .await;

    run(
        &server,
        "TASK_GET",
        json!({"auth_type": "API_KEY", "key": "api_key", "value": "k-123", "auth_location": "query"}),
        json!({"endpoint_path": "/search?q=rust"}),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_invalid_auth_type_makes_no_call() {
    let server = MockServer::start().await;

    let err = run(
        &server,
        "TASK_GET",
        json!({"auth_type": "OAUTH"}),
        json!({}),
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "invalid authentication type");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_connection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let connector = RestApiConnector::new().unwrap();
    let state = connector
        .test(uid(), &config(&server, json!({"auth_type": "NO_AUTH"})))
        .await
        .unwrap();
    assert_eq!(state, ConnectionState::Connected);

    let unreachable = doc(json!({
        "base_url": "http://127.0.0.1:1",
        "authentication": {"auth_type": "NO_AUTH"}
    }));
    assert!(connector.test(uid(), &unreachable).await.is_err());
}

#[tokio::test]
async fn test_definition_output_body_schema() {
    let connector = RestApiConnector::new().unwrap();
    let schema = json!({"type": "object", "properties": {"id": {"type": "integer"}}});
    let component = doc(json!({
        "task": "TASK_GET",
        "input": {"output_body_schema": schema.to_string()}
    }));

    let def = connector
        .definition_by_id("restapi", None, Some(&component))
        .await
        .unwrap();

    let body = def.spec.openapi_specifications["TASK_GET"]["paths"]["/execute"]["post"]
        ["responses"]["200"]["content"]["application/json"]["schema"]["properties"]["outputs"]
        ["items"]["properties"]["body"]
        .clone();
    assert_eq!(body, schema);

    let stored = connector.definitions().by_id("restapi").unwrap();
    assert_ne!(stored, &def);
}

#[tokio::test]
async fn test_definition_unknown_task_is_unchanged() {
    let connector = RestApiConnector::new().unwrap();
    let component = doc(json!({
        "task": "TASK_TRACE",
        "input": {"output_body_schema": "{}"}
    }));

    let def = connector
        .definition_by_id("restapi", None, Some(&component))
        .await
        .unwrap();
    assert_eq!(&def, connector.definitions().by_id("restapi").unwrap());
}

#[test_case("content-type", "Content-Type" ; "lowercase")]
#[test_case("x-request-id", "X-Request-Id" ; "three parts")]
#[test_case("ETAG", "Etag" ; "uppercase")]
fn test_canonical_header_name(raw: &str, want: &str) {
    assert_eq!(canonical_header_name(raw), want);
}

#[test]
fn test_unknown_task() {
    let err = "TASK_TRACE".parse::<Task>().unwrap_err();
    assert_eq!(err.to_string(), "TASK_TRACE task is not supported.");
}
