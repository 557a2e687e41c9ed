//! End-to-end scenarios: a live listener, real sockets, full frames.

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use serde_json::{Value, json};

use rootd_config::{Config, SocketEndpoint};
use rootd_modules::testing::StubModule;
use rootd_modules::{ModuleRegistry, SystemInfoModule};
use rootd_protocol::ModuleCapability;

use crate::dispatch::{MessageProcessor, RequestConnectionHandler};
use crate::process::{
    DeniedPolicy, LaunchError, PermissivePolicy, ShutdownError, ShutdownSignal, run_daemon_with,
};
use crate::transport::{ListenerHandle, SocketListener};

/// Group name chosen to be absent from any sane test environment.
const MISSING_GROUP: &str = "rootd-test-no-such-group";

struct DaemonHarness {
    socket_path: PathBuf,
    handle: Option<ListenerHandle>,
    _dir: tempfile::TempDir,
}

impl DaemonHarness {
    fn start(registry: Arc<ModuleRegistry>) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let socket_path = dir.path().join("rootd.sock");
        let endpoint = SocketEndpoint::unix(
            Utf8PathBuf::from_path_buf(socket_path.clone()).expect("utf8 socket path"),
        );
        let listener = SocketListener::bind(&endpoint, MISSING_GROUP).expect("bind listener");
        let handler = Arc::new(RequestConnectionHandler::new(MessageProcessor::new(
            registry,
        )));
        let handle = listener.start(handler).expect("start listener");
        Self {
            socket_path,
            handle: Some(handle),
            _dir: dir,
        }
    }

    /// Sends one raw line and decodes the single response frame.
    fn request_raw(&self, line: &[u8]) -> Value {
        let stream = UnixStream::connect(&self.socket_path).expect("connect");
        // Writes are best-effort: the daemon closes the connection as soon
        // as it rejects an oversized frame, which can race the separator.
        drop((&stream).write_all(line));
        drop((&stream).write_all(b"\n"));

        let mut response = String::new();
        BufReader::new(&stream)
            .read_line(&mut response)
            .expect("read response");
        serde_json::from_str(&response).expect("response is valid JSON")
    }

    fn request(&self, message: &Value) -> Value {
        self.request_raw(message.to_string().as_bytes())
    }

    fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.shutdown();
            handle.join().expect("join listener");
        }
    }
}

#[fixture]
fn daemon() -> DaemonHarness {
    let registry = Arc::new(ModuleRegistry::new());
    registry
        .register(Arc::new(SystemInfoModule::new()))
        .expect("register systeminfo");
    DaemonHarness::start(registry)
}

#[rstest]
fn ping_is_idempotent(daemon: DaemonHarness) {
    for _ in 0..3 {
        let response = daemon.request(&json!({"type": "ping", "request_id": "r1", "data": {}}));
        assert_eq!(response["type"], "success");
        assert_eq!(response["request_id"], "r1");
        assert_eq!(response["data"], json!({"pong": true}));
    }
    let listing =
        daemon.request(&json!({"type": "list_modules", "request_id": "r2", "data": {}}));
    assert_eq!(listing["data"]["modules"], json!(["systeminfo"]));
    daemon.stop();
}

#[rstest]
fn list_modules_reports_registered_names(daemon: DaemonHarness) {
    let response =
        daemon.request(&json!({"type": "list_modules", "request_id": "r1", "data": {}}));
    assert_eq!(response["type"], "success");
    assert_eq!(response["data"], json!({"modules": ["systeminfo"]}));
    daemon.stop();
}

#[rstest]
fn module_info_describes_the_system_module(daemon: DaemonHarness) {
    let response = daemon.request(&json!({
        "type": "module_info",
        "request_id": "r1",
        "data": {"module": "systeminfo"}
    }));
    assert_eq!(response["type"], "success");
    let info = &response["data"]["module_info"];
    assert_eq!(info["name"], "systeminfo");
    assert_eq!(info["capabilities"].as_array().map(Vec::len), Some(5));
    daemon.stop();
}

#[rstest]
fn execute_command_returns_the_hostname(daemon: DaemonHarness) {
    let response = daemon.request(&json!({
        "type": "execute_command",
        "request_id": "r2",
        "data": {"module": "systeminfo", "action": "get_hostname", "parameters": {}}
    }));
    assert_eq!(response["type"], "success");
    assert_eq!(response["data"]["success"], json!(true));
    let hostname = response["data"]["data"]["hostname"]
        .as_str()
        .expect("hostname field");
    assert!(!hostname.is_empty());
    daemon.stop();
}

#[rstest]
fn undeclared_action_is_rejected_end_to_end(daemon: DaemonHarness) {
    let response = daemon.request(&json!({
        "type": "execute_command",
        "request_id": "r3",
        "data": {"module": "systeminfo", "action": "delete_everything", "parameters": {}}
    }));
    assert_eq!(response["type"], "error");
    assert_eq!(response["data"]["success"], json!(false));
    let error = response["data"]["error"].as_str().expect("error text");
    assert!(error.contains("unknown action 'delete_everything'"));
    daemon.stop();
}

#[test]
fn undeclared_action_never_reaches_the_module() {
    let stub = Arc::new(
        StubModule::new("guarded")
            .with_capabilities(vec![ModuleCapability::new("probe", "Probe action")]),
    );
    let registry = Arc::new(ModuleRegistry::new());
    registry.register(stub.clone()).expect("register stub");
    let daemon = DaemonHarness::start(registry);

    let response = daemon.request(&json!({
        "type": "execute_command",
        "request_id": "r1",
        "data": {"module": "guarded", "action": "sabotage", "parameters": {}}
    }));

    assert_eq!(response["type"], "error");
    assert_eq!(stub.execute_calls(), 0, "module must never see the action");
    daemon.stop();
}

#[rstest]
fn unknown_module_is_reported(daemon: DaemonHarness) {
    let response = daemon.request(&json!({
        "type": "execute_command",
        "request_id": "r4",
        "data": {"module": "ghost", "action": "probe", "parameters": {}}
    }));
    assert_eq!(response["type"], "error");
    let error = response["data"]["error"].as_str().expect("error text");
    assert!(error.contains("module not found: ghost"));
    daemon.stop();
}

#[rstest]
fn malformed_json_is_answered_with_the_sentinel_id(daemon: DaemonHarness) {
    let response = daemon.request_raw(b"this is not json");
    assert_eq!(response["type"], "error");
    assert_eq!(response["request_id"], "unknown");
    daemon.stop();
}

#[rstest]
fn request_id_is_salvaged_from_a_bad_envelope(daemon: DaemonHarness) {
    let response = daemon.request_raw(br#"{"type":"bogus","request_id":"r9","data":{}}"#);
    assert_eq!(response["type"], "error");
    assert_eq!(response["request_id"], "r9");
    daemon.stop();
}

#[rstest]
fn oversized_frames_are_rejected(daemon: DaemonHarness) {
    let oversized = vec![b'x'; rootd_protocol::MAX_FRAME_BYTES + 1];
    let response = daemon.request_raw(&oversized);
    assert_eq!(response["type"], "error");
    let error = response["data"]["error"].as_str().expect("error text");
    assert!(error.contains("byte limit"));
    daemon.stop();
}

#[rstest]
fn system_info_shortcut_runs_get_info(daemon: DaemonHarness) {
    let response =
        daemon.request(&json!({"type": "system_info", "request_id": "r5", "data": {}}));
    assert_eq!(response["type"], "success");
    assert!(response["data"]["data"]["hostname"].is_string());
    daemon.stop();
}

#[test]
fn system_info_shortcut_reports_a_missing_module() {
    let daemon = DaemonHarness::start(Arc::new(ModuleRegistry::new()));
    let response =
        daemon.request(&json!({"type": "system_info", "request_id": "r6", "data": {}}));
    assert_eq!(response["type"], "error");
    assert_eq!(
        response["data"]["error"],
        json!("system information module not available")
    );
    daemon.stop();
}

#[test]
fn concurrent_connections_do_not_serialise() {
    let slow = Arc::new(
        StubModule::new("slow")
            .with_capabilities(vec![ModuleCapability::new("stall", "Sleeps for a while")])
            .with_execute_delay(Duration::from_millis(400)),
    );
    let registry = Arc::new(ModuleRegistry::new());
    registry.register(slow.clone()).expect("register slow");
    let daemon = Arc::new(DaemonHarness::start(registry));

    let slow_daemon = Arc::clone(&daemon);
    let stalled = thread::spawn(move || {
        slow_daemon.request(&json!({
            "type": "execute_command",
            "request_id": "slow-1",
            "data": {"module": "slow", "action": "stall", "parameters": {}}
        }))
    });

    // Give the slow request time to occupy its worker.
    thread::sleep(Duration::from_millis(50));

    let started = Instant::now();
    let pong = daemon.request(&json!({"type": "ping", "request_id": "fast-1", "data": {}}));
    let latency = started.elapsed();

    assert_eq!(pong["type"], "success");
    assert!(
        latency < Duration::from_millis(300),
        "ping should not wait for the stalled worker (took {latency:?})"
    );

    let slow_response = stalled.join().expect("join slow request");
    assert_eq!(slow_response["type"], "success");
}

/// Shutdown signal driven by a test-owned channel.
struct ChannelShutdown(Mutex<mpsc::Receiver<()>>);

impl ShutdownSignal for ChannelShutdown {
    fn wait(&self) -> Result<(), ShutdownError> {
        let receiver = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        // A closed channel also releases the daemon; both are a shutdown.
        drop(receiver.recv());
        Ok(())
    }
}

fn config_for(socket_path: &Path) -> Config {
    Config {
        socket: SocketEndpoint::unix(
            Utf8PathBuf::from_path_buf(socket_path.to_path_buf()).expect("utf8 socket path"),
        ),
        client_group: String::from(MISSING_GROUP),
        modules: vec![String::from("systeminfo")],
        ..Config::default()
    }
}

#[test]
fn daemon_lifecycle_serves_and_cleans_up() {
    let dir = tempfile::tempdir().expect("temp dir");
    let socket_path = dir.path().join("rootd.sock");
    let lock_path = dir.path().join("rootd.lock");
    let config = config_for(&socket_path);

    let (sender, receiver) = mpsc::channel();
    let shutdown = ChannelShutdown(Mutex::new(receiver));
    let runner = thread::spawn(move || run_daemon_with(&config, &PermissivePolicy, &shutdown));

    let deadline = Instant::now() + Duration::from_secs(2);
    while !socket_path.exists() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert!(socket_path.exists(), "daemon should bind its socket");
    assert!(lock_path.exists(), "daemon should hold its lock");

    let stream = UnixStream::connect(&socket_path).expect("connect");
    (&stream)
        .write_all(b"{\"type\":\"list_modules\",\"request_id\":\"r1\",\"data\":{}}\n")
        .expect("write request");
    let mut response = String::new();
    BufReader::new(&stream)
        .read_line(&mut response)
        .expect("read response");
    let decoded: Value = serde_json::from_str(&response).expect("valid response");
    assert_eq!(decoded["data"]["modules"], json!(["systeminfo"]));

    sender.send(()).expect("signal shutdown");
    runner
        .join()
        .expect("join daemon thread")
        .expect("daemon exits cleanly");

    assert!(!socket_path.exists(), "socket removed on shutdown");
    assert!(!lock_path.exists(), "lock removed on shutdown");
}

#[test]
fn missing_privilege_fails_fast() {
    let dir = tempfile::tempdir().expect("temp dir");
    let socket_path = dir.path().join("rootd.sock");
    let config = config_for(&socket_path);

    let (_sender, receiver) = mpsc::channel();
    let shutdown = ChannelShutdown(Mutex::new(receiver));

    let error =
        run_daemon_with(&config, &DeniedPolicy, &shutdown).expect_err("must refuse to start");
    assert!(matches!(error, LaunchError::Privilege { .. }));
    assert!(!socket_path.exists(), "no socket is created unprivileged");
}
