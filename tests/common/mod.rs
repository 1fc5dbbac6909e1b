use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use parley::config::ApiConfig;
use parley::storage::SledHistory;

#[allow(dead_code)]
pub fn create_temp_history() -> (SledHistory, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let history =
        SledHistory::open(tmp.path().join("history")).expect("failed to open sled history");
    (history, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// API config pointing at a mock server
#[allow(dead_code)]
pub fn api_config(base_url: &str) -> ApiConfig {
    ApiConfig {
        base_url: base_url.to_string(),
        api_key: Some("sk-test".to_string()),
        model: "test-model".to_string(),
        timeout_seconds: 5,
    }
}

/// SSE body streaming `fragments` as content deltas, then `[DONE]`
#[allow(dead_code)]
pub fn sse_body(fragments: &[&str]) -> String {
    let mut body = String::new();
    for fragment in fragments {
        let chunk = serde_json::json!({
            "choices": [{ "index": 0, "delta": { "content": fragment } }]
        });
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}
