use super::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use test_case::test_case;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn uid() -> Uuid {
    Uuid::parse_str("ddcf42c3-4c30-4c65-9585-25f1c89b2b48").unwrap()
}

fn doc(v: Value) -> Document {
    v.as_object().cloned().unwrap()
}

fn config(server: &MockServer) -> Document {
    doc(json!({
        "mode": "Cloud Mode",
        "api_token": "instill_sk",
        "instill_user_uid": "user-uid",
        "server_url": server.uri()
    }))
}

async fn mount_namespace(server: &MockServer, kind: &str) {
    Mock::given(method("POST"))
        .and(path("/core/v1beta/check-namespace"))
        .and(body_json(json!({"id": "acme"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"type": kind})))
        .mount(server)
        .await;
}

#[test_case("https://api.instill.tech", "https://api.instill.tech:443" ; "https default port")]
#[test_case("http://localhost", "http://localhost:80" ; "http default port")]
#[test_case("http://localhost:8080", "http://localhost:8080" ; "explicit port")]
#[test_case("https://api.instill.tech/base", "https://api.instill.tech:443/base" ; "with path")]
#[test_case("localhost:9080", "localhost:9080" ; "no scheme")]
fn test_normalize_server_url(raw: &str, want: &str) {
    assert_eq!(normalize_server_url(raw), want);
}

#[test]
fn test_internal_mode_uses_backend() {
    let config = InstillConfig {
        mode: INTERNAL_MODE.to_string(),
        instill_model_backend: "model-backend:8083".to_string(),
        server_url: "https://ignored".to_string(),
        ..Default::default()
    };
    assert_eq!(config.server_url(), "http://model-backend:8083");
}

#[tokio::test]
async fn test_classification_on_user_namespace() {
    let server = MockServer::start().await;
    mount_namespace(&server, "NAMESPACE_USER").await;

    Mock::given(method("POST"))
        .and(path("/model/v1alpha/users/acme/models/yolov7/trigger"))
        .and(header("Authorization", "Bearer instill_sk"))
        .and(header("Instill-User-Uid", "user-uid"))
        .and(body_json(json!({
            "task_inputs": [{"classification": {"image_base64": "AAAA"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task": "TASK_CLASSIFICATION",
            "task_outputs": [{"classification": {"category": "cat", "score": 0.9}}]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let connector = InstillConnector::new().unwrap();
    let exec = connector
        .create_execution(uid(), "TASK_CLASSIFICATION", &config(&server))
        .unwrap();
    let input = json!({"model_name": "acme/yolov7", "image_base64": "data:image/png;base64,AAAA"});
    let out = exec
        .execute(vec![doc(input.clone()), doc(input)])
        .await
        .unwrap();

    assert_eq!(out.len(), 2);
    assert_eq!(out[1], doc(json!({"category": "cat", "score": 0.9})));
}

#[tokio::test]
async fn test_organization_namespace() {
    let server = MockServer::start().await;
    mount_namespace(&server, "NAMESPACE_ORGANIZATION").await;

    Mock::given(method("POST"))
        .and(path("/model/v1alpha/organizations/acme/models/llama/trigger"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_outputs": [{"text_generation": {"text": "hi"}}]
        })))
        .mount(&server)
        .await;

    let connector = InstillConnector::new().unwrap();
    let exec = connector
        .create_execution(uid(), "TASK_TEXT_GENERATION", &config(&server))
        .unwrap();
    let out = exec
        .execute(vec![doc(json!({"model_name": "acme/llama", "prompt": "hello"}))])
        .await
        .unwrap();
    assert_eq!(out, vec![doc(json!({"text": "hi"}))]);
}

#[tokio::test]
async fn test_missing_task_output() {
    let server = MockServer::start().await;
    mount_namespace(&server, "NAMESPACE_USER").await;

    Mock::given(method("POST"))
        .and(path("/model/v1alpha/users/acme/models/m/trigger"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"task_outputs": []})))
        .mount(&server)
        .await;

    let connector = InstillConnector::new().unwrap();
    let exec = connector
        .create_execution(uid(), "TASK_OCR", &config(&server))
        .unwrap();
    let err = exec
        .execute(vec![doc(json!({"model_name": "acme/m"}))])
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Failed to decode response from Instill AI's API.");
}

#[tokio::test]
async fn test_empty_batch_makes_no_calls() {
    let server = MockServer::start().await;
    let connector = InstillConnector::new().unwrap();
    let exec = connector
        .create_execution(uid(), "TASK_DETECTION", &config(&server))
        .unwrap();

    assert!(exec.execute(Vec::new()).await.unwrap().is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_model_name() {
    let server = MockServer::start().await;
    let connector = InstillConnector::new().unwrap();
    let exec = connector
        .create_execution(uid(), "TASK_DETECTION", &config(&server))
        .unwrap();

    let err = exec
        .execute(vec![doc(json!({"model_name": "yolov7"}))])
        .await
        .unwrap_err();
    assert_eq!(err.failed_index(), Some(0));
    assert!(err.to_string().contains("model_name"));
}

#[tokio::test]
async fn test_connection_error_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/model/v1alpha/models"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let connector = InstillConnector::new().unwrap();
    let err = connector.test(uid(), &config(&server)).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Instill AI responded with a 400 status code. \
         Please refer to Instill AI's API reference for more information."
    );
}

#[tokio::test]
async fn test_definition_lists_models_per_task() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/model/v1alpha/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": [
            {"name": "users/acme/models/yolov7", "task": "TASK_DETECTION"},
            {"name": "organizations/org/models/resnet", "task": "TASK_CLASSIFICATION"},
            {"name": "broken", "task": "TASK_CLASSIFICATION"}
        ]})))
        .mount(&server)
        .await;

    let connector = InstillConnector::new().unwrap();
    let def = connector
        .definition_by_id("instill-model", Some(&config(&server)), None)
        .await
        .unwrap();

    let variants = def.spec.component_specification["oneOf"].as_array().unwrap();
    let enum_for = |task: &str| {
        variants
            .iter()
            .find(|v| v.pointer("/properties/task/const") == Some(&json!(task)))
            .and_then(|v| v.pointer("/properties/input/properties/model_name/enum"))
            .cloned()
    };
    assert_eq!(enum_for("TASK_DETECTION"), Some(json!(["acme/yolov7"])));
    assert_eq!(enum_for("TASK_CLASSIFICATION"), Some(json!(["org/resnet"])));
    assert_eq!(enum_for("TASK_OCR"), None);

    // The stored definition is untouched.
    let stored = connector.definitions().by_uid(&uid()).unwrap();
    assert_ne!(stored, &def);
}

#[test]
fn test_add_model_enum_walks_arrays() {
    let mut schema = json!({"allOf": [{"properties": {"model_name": {"type": "string"}}}]});
    add_model_enum(&mut schema, &["a/b".to_string()]);
    assert_eq!(
        schema,
        json!({"allOf": [{"properties": {"model_name": {"type": "string", "enum": ["a/b"]}}}]})
    );
}

#[test]
fn test_unknown_task() {
    let err = "TASK_SPEECH".parse::<Task>().unwrap_err();
    assert_eq!(err.to_string(), "TASK_SPEECH task is not supported.");
}

async fn run_task(server: &MockServer, task: &str, input: Value) -> Result<Vec<Document>> {
    let connector = InstillConnector::new().unwrap();
    let exec = connector
        .create_execution(uid(), task, &config(server))
        .unwrap();
    exec.execute(vec![doc(input)]).await
}

#[tokio::test]
async fn test_image_to_image_sends_prompt_image() {
    let server = MockServer::start().await;
    mount_namespace(&server, "NAMESPACE_USER").await;

    Mock::given(method("POST"))
        .and(path("/model/v1alpha/users/acme/models/sd/trigger"))
        .and(body_json(json!({
            "task_inputs": [{"image_to_image": {
                "prompt": "p",
                "prompt_image_base64": "AAAA",
                "steps": 20,
                "extra_params": [{"param_name": "style", "param_value": "anime"}]
            }}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_outputs": [{"image_to_image": {"images": ["BBBB"]}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = run_task(
        &server,
        "TASK_IMAGE_TO_IMAGE",
        json!({
            "model_name": "acme/sd",
            "prompt": "p",
            "image_base64": "data:image/png;base64,AAAA",
            "steps": 20,
            "extra_params": [{"param_name": "style", "param_value": "anime"}]
        }),
    )
    .await
    .unwrap();
    assert_eq!(out, vec![doc(json!({"images": ["BBBB"]}))]);
}

#[tokio::test]
async fn test_chat_history_images_are_trimmed() {
    let server = MockServer::start().await;
    mount_namespace(&server, "NAMESPACE_USER").await;

    Mock::given(method("POST"))
        .and(path("/model/v1alpha/users/acme/models/llava/trigger"))
        .and(body_json(json!({
            "task_inputs": [{"text_generation_chat": {
                "prompt": "and now?",
                "chat_history": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "what is this?"},
                        {"type": "image_url", "image_url": {"prompt_image_base64": "CCCC"}}
                    ]
                }],
                "prompt_images": [{"prompt_image_base64": "DDDD"}]
            }}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "task_outputs": [{"text_generation_chat": {"text": "a cat"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let out = run_task(
        &server,
        "TASK_TEXT_GENERATION_CHAT",
        json!({
            "model_name": "acme/llava",
            "prompt": "and now?",
            "chat_history": [{
                "role": "user",
                "content": [
                    {"type": "text", "text": "what is this?"},
                    {"type": "image_url", "image_url": {"url": "data:image/jpeg;base64,CCCC"}}
                ]
            }],
            "prompt_images": ["data:image/png;base64,DDDD"]
        }),
    )
    .await
    .unwrap();
    assert_eq!(out, vec![doc(json!({"text": "a cat"}))]);
}

#[test]
fn test_image_base64_kept_for_vision_tasks() {
    let input = doc(json!({"model_name": "a/b", "image_base64": "data:image/png;base64,AAAA"}));
    assert_eq!(
        task_input(Task::Detection, input).unwrap(),
        doc(json!({"image_base64": "AAAA"}))
    );
}

#[test]
fn test_extra_params_must_be_string_pairs() {
    let input = doc(json!({"extra_params": [{"param_name": "n", "param_value": 3}]}));
    let err = task_input(Task::TextGeneration, input).unwrap_err();
    assert_eq!(
        err.to_string(),
        "extra_params entries need string param_name and param_value"
    );
}
