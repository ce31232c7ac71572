use super::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PNG_B64: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

fn uid() -> Uuid {
    Uuid::parse_str("c86a95cc-7d32-4e22-a290-8c699f6705a4").unwrap()
}

fn doc(v: Value) -> Document {
    v.as_object().cloned().unwrap()
}

fn config(server: &MockServer) -> Document {
    doc(json!({"api_key": "sk-stab", "base_url": server.uri()}))
}

async fn run(server: &MockServer, task: &str, inputs: Vec<Value>) -> Result<Vec<Document>> {
    let connector = StabilityAiConnector::new().unwrap();
    let exec = connector
        .create_execution(uid(), task, &config(server))
        .unwrap();
    exec.execute(inputs.into_iter().map(doc).collect()).await
}

fn artifacts() -> Value {
    json!({"artifacts": [
        {"base64": "a", "seed": 1, "finishReason": "SUCCESS"},
        {"base64": "b", "seed": 2, "finishReason": "CONTENT_FILTERED"},
        {"base64": "c", "seed": 3, "finishReason": "SUCCESS"}
    ]})
}

#[tokio::test]
async fn test_text_to_image_keeps_successful_artifacts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/generation/sdxl/text-to-image"))
        .and(header("Authorization", "Bearer sk-stab"))
        .and(body_json(json!({
            "text_prompts": [
                {"text": "a cat", "weight": 0.5},
                {"text": "blurry", "weight": 1.0}
            ],
            "steps": 30
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(artifacts()))
        .expect(1)
        .mount(&server)
        .await;

    let out = run(
        &server,
        "TASK_TEXT_TO_IMAGE",
        vec![json!({
            "engine": "sdxl",
            "prompts": ["a cat", "blurry"],
            "weights": [0.5],
            "steps": 30
        })],
    )
    .await
    .unwrap();

    assert_eq!(out, vec![doc(json!({"images": ["a", "c"], "seeds": [1, 3]}))]);
}

#[tokio::test]
async fn test_image_to_image_multipart() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/generation/sdxl/image-to-image"))
        .respond_with(ResponseTemplate::new(200).set_body_json(artifacts()))
        .mount(&server)
        .await;

    let out = run(
        &server,
        "TASK_IMAGE_TO_IMAGE",
        vec![json!({
            "engine": "sdxl",
            "prompts": ["", "a dog"],
            "init_image": PNG_B64,
            "image_strength": 0.35
        })],
    )
    .await
    .unwrap();
    assert_eq!(out[0]["seeds"], json!([1, 3]));

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"init_image\""));
    assert!(body.contains("name=\"text_prompts[0][text]\"\r\n\r\na dog"));
    assert!(!body.contains("text_prompts[1]"));
    assert!(body.contains("0.350000"));
}

#[tokio::test]
async fn test_missing_prompts_and_engine() {
    let server = MockServer::start().await;

    let err = run(
        &server,
        "TASK_TEXT_TO_IMAGE",
        vec![json!({"engine": "sdxl", "prompts": []})],
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "no text prompts given");

    let err = run(
        &server,
        "TASK_TEXT_TO_IMAGE",
        vec![json!({"engine": "", "prompts": ["x"]})],
    )
    .await
    .unwrap_err();
    assert_eq!(err.to_string(), "no engine selected");
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_error_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "missing authorization header"})),
        )
        .mount(&server)
        .await;

    let err = run(
        &server,
        "TASK_TEXT_TO_IMAGE",
        vec![json!({"engine": "sdxl", "prompts": ["x"]})],
    )
    .await
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Stability AI responded with a 401 status code. missing authorization header"
    );
}

#[tokio::test]
async fn test_connection_states() {
    let server = MockServer::start().await;
    let connector = StabilityAiConnector::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/engines/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/engines/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "sdxl", "name": "SDXL", "type": "PICTURE", "description": ""}
        ])))
        .mount(&server)
        .await;

    assert_eq!(
        connector.test(uid(), &config(&server)).await.unwrap(),
        ConnectionState::Disconnected
    );
    assert_eq!(
        connector.test(uid(), &config(&server)).await.unwrap(),
        ConnectionState::Connected
    );
}

#[test]
fn test_weights_default_to_one() {
    let prompts = weighted_prompts(&["a".into(), "b".into()], Some(&[0.2])).unwrap();
    assert_eq!(
        prompts,
        vec![
            TextPrompt { text: "a".into(), weight: 0.2 },
            TextPrompt { text: "b".into(), weight: 1.0 },
        ]
    );
}

#[test]
fn test_unknown_task() {
    let err = "TASK_UPSCALE".parse::<Task>().unwrap_err();
    assert_eq!(err.to_string(), "TASK_UPSCALE task is not supported.");
}
