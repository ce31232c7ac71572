use super::*;
use object_store::memory::InMemory;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn uid() -> Uuid {
    Uuid::parse_str("205cbeff-6f45-4abe-b0a8-cec1a310137f").unwrap()
}

fn doc(v: Value) -> Document {
    v.as_object().cloned().unwrap()
}

fn memory_execution(store: Arc<InMemory>) -> GcsExecution {
    GcsExecution {
        bucket: "media".to_string(),
        store,
    }
}

#[tokio::test]
async fn test_upload_writes_object() {
    let store = Arc::new(InMemory::new());
    let exec = memory_execution(Arc::clone(&store));

    let out = exec
        .execute(vec![doc(json!({
            "object_name": "images/cat.txt",
            "data": "data:text/plain;base64,aGVsbG8="
        }))])
        .await
        .unwrap();

    assert_eq!(
        out,
        vec![doc(json!({
            "status": "success",
            "gsutil_uri": "gs://media/images/cat.txt",
            "public_url": "https://storage.googleapis.com/media/images/cat.txt",
            "authenticated_url": "https://storage.cloud.google.com/media/images/cat.txt"
        }))]
    );

    let stored = store
        .get(&Path::from("images/cat.txt"))
        .await
        .unwrap()
        .bytes()
        .await
        .unwrap();
    assert_eq!(stored.as_ref(), b"hello");
}

#[tokio::test]
async fn test_invalid_payload_keeps_earlier_uploads() {
    let store = Arc::new(InMemory::new());
    let exec = memory_execution(Arc::clone(&store));

    let err = exec
        .execute(vec![
            doc(json!({"object_name": "a", "data": "aGVsbG8="})),
            doc(json!({"object_name": "b", "data": "%%%"})),
        ])
        .await
        .unwrap_err();

    assert_eq!(err.failed_index(), Some(1));
    assert_eq!(err.partial_outputs().len(), 1);
    assert!(store.head(&Path::from("a")).await.is_ok());
    assert!(store.head(&Path::from("b")).await.is_err());
}

#[test]
fn test_missing_bucket() {
    let err = GcsConnector::new()
        .unwrap()
        .create_execution(uid(), "TASK_UPLOAD", &doc(json!({"json_key": "{}"})))
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "Missing required config field: bucket_name");
}

#[test]
fn test_invalid_credentials() {
    let err = GcsConnector::new()
        .unwrap()
        .create_execution(
            uid(),
            "TASK_UPLOAD",
            &doc(json!({"json_key": "not a key", "bucket_name": "media"})),
        )
        .err()
        .unwrap();
    assert!(matches!(err, Error::Config { .. }));
}

#[test]
fn test_unknown_task() {
    let err = GcsConnector::new()
        .unwrap()
        .create_execution(uid(), "TASK_DOWNLOAD", &Document::new())
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "TASK_DOWNLOAD task is not supported.");
}
