use super::*;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

const LOCAL_JSON: &str = "975678a2-5117-48a4-a135-019619dee18e";
const POSTGRES: &str = "25c2fa4e-0b1f-4b44-8d3a-6e5f9c2b7a81";

fn uid(raw: &str) -> Uuid {
    Uuid::parse_str(raw).unwrap()
}

fn doc(v: Value) -> Document {
    v.as_object().cloned().unwrap()
}

#[derive(Debug, Clone)]
struct WriteCall {
    spec: ContainerSpec,
    stdin: Vec<u8>,
    config: Value,
    catalog: Value,
}

#[derive(Default)]
struct MockRuntime {
    stdout: String,
    fail: bool,
    pulls: Mutex<Vec<String>>,
    writes: Mutex<Vec<WriteCall>>,
    checks: Mutex<Vec<(ContainerSpec, Value)>>,
}

fn read_json(path: &str) -> Value {
    serde_json::from_slice(&std::fs::read(path).unwrap()).unwrap()
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn pull_image(&self, image: &str) -> Result<()> {
        self.pulls.lock().unwrap().push(image.to_string());
        Ok(())
    }

    async fn run_with_stdin(&self, spec: &ContainerSpec, stdin: Vec<u8>) -> Result<String> {
        // Files must exist while the container runs
        let call = WriteCall {
            spec: spec.clone(),
            stdin,
            config: read_json(&spec.cmd[2]),
            catalog: read_json(&spec.cmd[4]),
        };
        self.writes.lock().unwrap().push(call);
        if self.fail {
            return Err(Error::container("container exited with status 1"));
        }
        Ok(self.stdout.clone())
    }

    async fn run_to_completion(&self, spec: &ContainerSpec) -> Result<String> {
        let config = read_json(&spec.cmd[2]);
        self.checks.lock().unwrap().push((spec.clone(), config));
        if self.fail {
            return Err(Error::container("failed to start container"));
        }
        Ok(self.stdout.clone())
    }
}

fn options(dir: &tempfile::TempDir) -> AirbyteOptions {
    let target = dir.path().to_string_lossy().into_owned();
    AirbyteOptions {
        mount_source_vdp: target.clone(),
        mount_target_vdp: target,
        mount_source_airbyte: "airbyte".to_string(),
        mount_target_airbyte: "/local".to_string(),
        ..AirbyteOptions::default()
    }
}

fn connector(dir: &tempfile::TempDir, runtime: Arc<MockRuntime>) -> AirbyteConnector {
    AirbyteConnector::new(options(dir), runtime).unwrap()
}

fn leftover_files(dir: &tempfile::TempDir) -> usize {
    ["config", "catalog"]
        .iter()
        .filter_map(|kind| std::fs::read_dir(dir.path().join("connector-data").join(kind)).ok())
        .map(|entries| entries.count())
        .sum()
}

#[tokio::test]
async fn test_write_streams_records() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(MockRuntime::default());
    let connector = connector(&dir, Arc::clone(&runtime));

    let exec = connector
        .create_execution(
            uid(LOCAL_JSON),
            "TASK_WRITE_DESTINATION",
            &doc(json!({"destination_path": "/local/out"})),
        )
        .unwrap();
    let out = exec
        .execute(vec![
            doc(json!({"data": {"text": "a"}})),
            doc(json!({"data": {"text": "b"}})),
        ])
        .await
        .unwrap();

    assert_eq!(out, vec![Document::new(), Document::new()]);
    assert_eq!(
        *runtime.pulls.lock().unwrap(),
        vec!["airbyte/destination-local-json:0.2.11".to_string()]
    );

    let writes = runtime.writes.lock().unwrap();
    assert_eq!(writes.len(), 1);
    let call = &writes[0];

    assert!(call.spec.name.starts_with(LOCAL_JSON));
    assert!(call.spec.name.ends_with(".write"));
    assert_eq!(call.spec.cmd[0], "write");
    assert_eq!(call.spec.cmd[1], "--config");
    assert_eq!(call.spec.cmd[3], "--catalog");
    assert_eq!(call.config, json!({"destination_path": "/local/out"}));
    assert_eq!(call.catalog["streams"][0]["stream"]["name"], "vdp");
    assert_eq!(call.catalog["streams"][0]["sync_mode"], "full_refresh");
    assert_eq!(call.catalog["streams"][0]["destination_sync_mode"], "append");

    assert_eq!(call.spec.mounts.len(), 2);
    assert!(call.spec.mounts[0].is_bind());
    assert!(!call.spec.mounts[1].is_bind());
    assert_eq!(call.spec.mounts[1].target, "/local");

    let (lines, tail) = call.stdin.split_at(call.stdin.len() - 2);
    assert_eq!(tail, &[b'\n', 0x04]);
    let records: Vec<AirbyteMessage> = std::str::from_utf8(lines)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind, "RECORD");
    let record = records[1].record.as_ref().unwrap();
    assert_eq!(record.stream, "vdp");
    assert_eq!(record.data, doc(json!({"text": "b"})));

    assert_eq!(leftover_files(&dir), 0);
}

#[tokio::test]
async fn test_empty_batch_runs_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(MockRuntime::default());
    let connector = connector(&dir, Arc::clone(&runtime));

    let exec = connector
        .create_execution(uid(POSTGRES), "TASK_WRITE_DESTINATION", &Document::new())
        .unwrap();
    assert!(exec.execute(vec![]).await.unwrap().is_empty());
    assert!(runtime.pulls.lock().unwrap().is_empty());
    assert!(runtime.writes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_run_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(MockRuntime {
        fail: true,
        ..MockRuntime::default()
    });
    let connector = connector(&dir, Arc::clone(&runtime));

    let exec = connector
        .create_execution(uid(POSTGRES), "TASK_WRITE_DESTINATION", &Document::new())
        .unwrap();
    let err = exec
        .execute(vec![doc(json!({"data": {}}))])
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Container error: container exited with status 1");
    assert_eq!(err.failed_index(), Some(0));
    assert!(err.partial_outputs().is_empty());
    assert_eq!(leftover_files(&dir), 0);
}

#[tokio::test]
async fn test_missing_data_sends_empty_record() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(MockRuntime::default());
    let connector = connector(&dir, Arc::clone(&runtime));

    let exec = connector
        .create_execution(uid(POSTGRES), "TASK_WRITE_DESTINATION", &Document::new())
        .unwrap();
    exec.execute(vec![doc(json!({"other": 1}))]).await.unwrap();

    let writes = runtime.writes.lock().unwrap();
    let line = &writes[0].stdin[..writes[0].stdin.len() - 2];
    let msg: AirbyteMessage = serde_json::from_slice(line).unwrap();
    assert!(msg.record.unwrap().data.is_empty());
}

#[tokio::test]
async fn test_check_succeeded() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(MockRuntime {
        stdout: concat!(
            "{\"type\":\"LOG\",\"log\":{\"level\":\"INFO\",\"message\":\"checking\"}}\r\n",
            "{\"type\":\"CONNECTION_STATUS\",\"connectionStatus\":{\"status\":\"SUCCEEDED\"}}\r\n"
        )
        .to_string(),
        ..MockRuntime::default()
    });
    let connector = connector(&dir, Arc::clone(&runtime));

    let state = connector
        .test(uid(POSTGRES), &doc(json!({"host": "db"})))
        .await
        .unwrap();
    assert_eq!(state, ConnectionState::Connected);

    let checks = runtime.checks.lock().unwrap();
    let (spec, config) = &checks[0];
    assert_eq!(spec.cmd[0], "check");
    assert_eq!(spec.cmd.len(), 3);
    assert_eq!(spec.mounts.len(), 1);
    assert_eq!(*config, json!({"host": "db"}));
    assert_eq!(leftover_files(&dir), 0);
}

#[tokio::test]
async fn test_check_runtime_failure_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(MockRuntime {
        fail: true,
        ..MockRuntime::default()
    });
    let connector = connector(&dir, runtime);
    assert!(connector
        .test(uid(POSTGRES), &Document::new())
        .await
        .is_err());
}

#[test_case::test_case(r#"{"type":"CONNECTION_STATUS","connectionStatus":{"status":"SUCCEEDED"}}"#, ConnectionState::Connected ; "succeeded")]
#[test_case::test_case(r#"{"type":"CONNECTION_STATUS","connectionStatus":{"status":"FAILED","message":"bad password"}}"#, ConnectionState::Error ; "failed")]
#[test_case::test_case("Starting destination\nnot json", ConnectionState::Error ; "no status line")]
fn test_parse_connection_status(stdout: &str, want: ConnectionState) {
    assert_eq!(parse_connection_status(stdout).unwrap(), want);
}

#[test]
fn test_parse_unknown_status() {
    let stdout = r#"{"type":"CONNECTION_STATUS","connectionStatus":{"status":"MAYBE"}}"#;
    let err = parse_connection_status(stdout).unwrap_err();
    assert!(err.to_string().contains("UNKNOWN STATUS"));
}

#[test]
fn test_exclude_local_destinations() {
    let dir = tempfile::tempdir().unwrap();
    let opts = AirbyteOptions {
        exclude_local_connector: true,
        ..options(&dir)
    };
    let connector = AirbyteConnector::new(opts, Arc::new(MockRuntime::default())).unwrap();

    for id in LOCAL_DESTINATIONS {
        assert!(connector.definitions().by_id(id).unwrap().tombstone, "{id}");
    }
    let postgres = connector.definitions().by_uid(&uid(POSTGRES)).unwrap();
    assert!(!postgres.tombstone);
}

#[tokio::test]
async fn test_pre_download_images() {
    let dir = tempfile::tempdir().unwrap();
    let runtime = Arc::new(MockRuntime::default());
    let connector = connector(&dir, Arc::clone(&runtime));

    connector
        .pre_download_images(&[uid(LOCAL_JSON), uid(POSTGRES)])
        .await
        .unwrap();
    assert_eq!(runtime.pulls.lock().unwrap().len(), 2);

    let err = connector
        .pre_download_images(&[Uuid::nil()])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownDefinition { .. }));
}

#[test]
fn test_run_cache_expires() {
    let cache = RunCache::default();
    cache.insert("a");
    assert!(cache.contains("a"));
    cache.remove("a");
    assert!(cache.is_empty());

    let cache = RunCache::new(Duration::ZERO);
    cache.insert("b");
    assert!(!cache.contains("b"));
    assert!(cache.is_empty());
}

#[test]
fn test_record_schema_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"type: object\nproperties:\n  text:\n    type: string\n")
        .unwrap();
    let schema = load_record_schema(&file.path().to_string_lossy());
    assert_eq!(schema["properties"]["text"]["type"], "string");

    assert_eq!(
        load_record_schema("/nonexistent/schema.yaml"),
        json!({"type": "object"})
    );
}

#[test]
fn test_unknown_task() {
    let dir = tempfile::tempdir().unwrap();
    let connector = connector(&dir, Arc::new(MockRuntime::default()));
    let err = connector
        .create_execution(uid(POSTGRES), "TASK_READ_SOURCE", &Document::new())
        .err()
        .unwrap();
    assert_eq!(err.to_string(), "TASK_READ_SOURCE task is not supported.");
}

#[test_case::test_case(false ; "check")]
#[test_case::test_case(true ; "write")]
fn test_container_config_tty_follows_stdin(interactive: bool) {
    let spec = ContainerSpec {
        name: "vdp-airbyte-test".into(),
        image: "airbyte/destination-local-json:0.2.11".into(),
        cmd: vec!["check".into(), "--config".into(), "/vdp/config.json".into()],
        mounts: vec![MountSpec::new("/tmp/vdp", "/vdp")],
    };
    let config = DockerRuntime::container_config(&spec, interactive);

    assert_eq!(config.tty, Some(interactive));
    assert_eq!(config.open_stdin, Some(interactive));
    assert_eq!(config.attach_stdout, Some(true));
    let mounts = config.host_config.unwrap().mounts.unwrap();
    assert_eq!(mounts[0].target.as_deref(), Some("/vdp"));
}
