// tests/config_loading.rs

use std::io::Write;

use tempfile::NamedTempFile;

use rex_scheduler::config::{load_and_validate, load_graph};
use rex_scheduler::engine::EngineOptions;
use rex_scheduler::errors::RexError;
use rex_scheduler::types::{Method, Mode};

#[test]
fn full_config_is_read_and_applied() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[scheduler]
name = "staging"
base_url = "http://rex.internal:9000/"
clean = false

[admission]
max_concurrent = 4
queue_page_size = 20

[retry]
concurrent_update_attempts = 3
internal_attempts = 9
remote_attempts = 2
remote_backoff_ms = 5

[http]
timeout_secs = 7
"#
    )
    .unwrap();

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.admission.max_concurrent, 4);
    assert_eq!(cfg.retry.remote_backoff_ms, 5);
    assert_eq!(cfg.http.timeout_secs, 7);

    let options = EngineOptions::from_config(&cfg);
    assert_eq!(options.deployment, "staging");
    assert!(!options.clean);
    assert_eq!(options.queue_page_size, 20);
    // conflict replays are budgeted apart from HTTP attempts
    assert_eq!(options.internal_attempts, 9);
    assert_eq!(cfg.retry.remote_attempts, 2);
    assert_eq!(
        options.callback_url("build"),
        "http://rex.internal:9000/rest/internal/build/finish"
    );
}

#[test]
fn invalid_values_are_config_errors() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[scheduler]\nname = \"  \"\n").unwrap();

    match load_and_validate(file.path()) {
        Err(RexError::Config(msg)) => assert!(msg.contains("name"), "{msg}"),
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[test]
fn missing_file_is_an_io_error() {
    let err = load_and_validate("/definitely/not/here/Rex.toml").unwrap_err();
    assert!(matches!(err, RexError::Io(_)), "{err:?}");
}

#[test]
fn malformed_graph_is_a_json_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{ \"vertices\": [ }}").unwrap();

    let err = load_graph(file.path()).unwrap_err();
    assert!(matches!(err, RexError::Json(_)), "{err:?}");
}

#[test]
fn graph_file_accepts_both_edge_spellings() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
  "vertices": {{
    "X": {{
      "remote_start": {{ "uri": "http://w/x/start", "body": {{ "n": 1 }} }},
      "remote_cancel": {{ "method": "DELETE", "uri": "http://w/x" }},
      "mode": "ACTIVE"
    }},
    "Y": {{
      "remote_start": {{ "uri": "http://w/y/start" }},
      "remote_cancel": {{ "uri": "http://w/y/stop" }}
    }}
  }},
  "edges": [
    {{ "dependant": "Y", "dependency": "X" }},
    {{ "dependent": "Y", "dependency": "Z" }}
  ]
}}"#
    )
    .unwrap();

    let graph = load_graph(file.path()).unwrap();
    let x = &graph.vertices["X"];
    assert_eq!(x.mode, Mode::Active);
    assert_eq!(x.remote_start.method, Method::Post);
    assert_eq!(x.remote_cancel.method, Method::Delete);
    assert_eq!(graph.vertices["Y"].mode, Mode::Idle);
    assert_eq!(graph.edges.len(), 2);
    assert!(graph.edges.iter().all(|e| e.dependent == "Y"));
}
