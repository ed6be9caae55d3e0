use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "minddrift-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_minddrift-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("continue-once"));
}

#[test]
fn cli_runs_smoke_against_memory_backend() {
    let exe = env!("CARGO_BIN_EXE_minddrift-tester");
    let output_path = temp_path("smoke");
    let output = Command::new(exe)
        .args([
            "--backend",
            "memory",
            "--scenarios",
            "smoke,continue-once",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("MindDrift Automated Tester"));

    let report = std::fs::read_to_string(output_path).expect("read report");
    let results: serde_json::Value = serde_json::from_str(&report).expect("json report");
    let results = results.as_array().expect("array of results");
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r["passed"] == true));
    assert_eq!(results[1]["sessions_run"], 1);
}

#[test]
fn cli_skips_fault_scenarios_over_http() {
    let exe = env!("CARGO_BIN_EXE_minddrift-tester");
    let output_path = temp_path("http");
    let output = Command::new(exe)
        .args([
            "--backend",
            "http",
            "--base-url",
            "http://127.0.0.1:9",
            "--scenarios",
            "hung-backend",
            "--report",
            "markdown",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let report = std::fs::read_to_string(output_path).expect("read report");
    assert!(report.contains("- **Skipped**: 1"));
}

#[test]
fn cli_rejects_bad_config_file() {
    let exe = env!("CARGO_BIN_EXE_minddrift-tester");
    let config_path = temp_path("config");
    std::fs::write(&config_path, "{ not json").expect("write config");
    let output = Command::new(exe)
        .arg("--config")
        .arg(&config_path)
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid config"));
}
