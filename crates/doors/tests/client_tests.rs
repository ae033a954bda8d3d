// These tests stand in a small shell script for the DOORS desktop client, so
// they only run where `/bin/sh` exists.
#![cfg(unix)]

use doors::client::terminate_by_name;
use doors::dxl::{DXL_SUCCESS_MARKER, RECORD_DELIMITER};
use doors::{get_testcases, DoorsClient, DoorsConfig, DoorsError};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Writes an executable fake client that records its arguments and pid,
/// runs `body`, then sleeps like a desktop app that never exits on its own.
fn fake_client(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("doors");
    let script = format!(
        "#!/bin/sh\nprintf '%s\\n' \"$@\" > \"{args}\"\necho $$ > \"{pid}\"\n{body}\nexec sleep 30\n",
        args = dir.join("args.txt").display(),
        pid = dir.join("pid.txt").display(),
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn config_for(client: &Path, max_wait: Duration) -> DoorsConfig {
    let mut config = DoorsConfig::new("alice", "s3cret", "36677@doors.example.local");
    config.client_path = client.to_path_buf();
    config.max_wait = max_wait;
    config.poll_interval = Duration::from_millis(20);
    config
}

fn export_body(out: &Path) -> String {
    format!(
        "cat > \"{out}\" <<'EOF'\n{d}\n## Testcase: TC-1\n- **URL**: doors://host/1\n- **Status**: Released\n\n- **Description**: Valid login\n- **Steps**:\n1. Open\n\n2. Submit\n- **Expected Results**:\nDashboard shown\n{m}\nEOF",
        out = out.display(),
        d = RECORD_DELIMITER,
        m = DXL_SUCCESS_MARKER,
    )
}

#[cfg(target_os = "linux")]
fn assert_exited(dir: &Path) {
    // No pid file means the client was killed before it got that far.
    let Ok(pid) = std::fs::read_to_string(dir.join("pid.txt")) else {
        return;
    };
    let proc_dir = PathBuf::from(format!("/proc/{}", pid.trim()));
    assert!(!proc_dir.exists(), "fake client {} still running", pid.trim());
}

#[cfg(not(target_os = "linux"))]
fn assert_exited(_dir: &Path) {}

#[tokio::test]
async fn test_run_script_returns_once_marker_written() {
    let bin = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let out_path = out_dir.path().join("output.md");
    let client = fake_client(bin.path(), &export_body(&out_path));
    let script_path = bin.path().join("script.dxl");
    std::fs::write(&script_path, "// dxl").unwrap();

    let started = Instant::now();
    DoorsClient::new(config_for(&client, Duration::from_secs(10)))
        .run_script(&script_path, &out_path)
        .await
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));

    let args = std::fs::read_to_string(bin.path().join("args.txt")).unwrap();
    let args: Vec<&str> = args.lines().collect();
    assert_eq!(
        args,
        vec![
            "-d",
            "36677@doors.example.local",
            "-u",
            "alice",
            "-P",
            "s3cret",
            "-dxl",
            format!("#include <{}>", script_path.display()).as_str(),
        ]
    );
    assert_exited(bin.path());
}

#[tokio::test]
async fn test_run_script_times_out_and_kills_client() {
    let bin = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let out_path = out_dir.path().join("output.md");
    let client = fake_client(bin.path(), "true");

    let err = DoorsClient::new(config_for(&client, Duration::from_millis(300)))
        .run_script(&bin.path().join("script.dxl"), &out_path)
        .await
        .unwrap_err();

    match &err {
        DoorsError::Timeout { waited, command } => {
            assert_eq!(*waited, Duration::from_millis(300));
            assert!(command.contains("-P ********"));
            assert!(!command.contains("s3cret"));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(err.to_string().contains("within 0.3 seconds"));
    assert_exited(bin.path());
}

#[tokio::test]
async fn test_stale_output_does_not_count_as_completion() {
    let bin = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let out_path = out_dir.path().join("output.md");
    std::fs::write(&out_path, format!("old run\n{DXL_SUCCESS_MARKER}")).unwrap();
    let client = fake_client(bin.path(), "true");

    let err = DoorsClient::new(config_for(&client, Duration::from_millis(200)))
        .run_script(&bin.path().join("script.dxl"), &out_path)
        .await
        .unwrap_err();
    assert!(matches!(err, DoorsError::Timeout { .. }));
    assert!(!out_path.exists());
}

#[tokio::test]
async fn test_script_error_marker_fails_fast() {
    let bin = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let out_path = out_dir.path().join("output.md");
    let body = format!(
        "echo '__DXL_ERROR__: module /P/Missing not found' > \"{}\"",
        out_path.display()
    );
    let client = fake_client(bin.path(), &body);

    let started = Instant::now();
    let err = DoorsClient::new(config_for(&client, Duration::from_secs(10)))
        .run_script(&bin.path().join("script.dxl"), &out_path)
        .await
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(10));
    match err {
        DoorsError::ClientReported { message, .. } => {
            assert_eq!(message, "module /P/Missing not found")
        }
        other => panic!("expected client error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_client_is_a_launch_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&dir.path().join("no-such-client"), Duration::from_secs(1));
    let err = DoorsClient::new(config)
        .run_script(&dir.path().join("script.dxl"), &dir.path().join("output.md"))
        .await
        .unwrap_err();
    assert!(matches!(err, DoorsError::Launch { .. }));
    assert_eq!(err.kind(), "LaunchFailed");
}

#[tokio::test]
async fn test_get_testcases_end_to_end() {
    let bin = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let out_path = out_dir.path().join("output.md");
    let client = fake_client(bin.path(), &export_body(&out_path));

    let testcases = get_testcases(
        &config_for(&client, Duration::from_secs(10)),
        "/Project/System/SysTS",
        out_dir.path(),
    )
    .await
    .unwrap();

    assert_eq!(testcases.len(), 1);
    let tc = &testcases[0];
    assert_eq!(tc.id, "TC-1");
    assert_eq!(tc.tc_url, "doors://host/1");
    assert_eq!(tc.test_description, "Valid login");
    assert_eq!(tc.test_steps, "1. Open\n2. Submit");
    assert_eq!(tc.expected_results, "Dashboard shown");

    let cleaned = std::fs::read_to_string(&out_path).unwrap();
    assert!(cleaned.lines().all(|line| !line.trim().is_empty()));

    // The script handed to the client includes the export target.
    let args = std::fs::read_to_string(bin.path().join("args.txt")).unwrap();
    assert!(args.contains("#include <"));
    assert!(args.contains("script.dxl>"));
}

#[tokio::test]
async fn test_get_testcases_rejects_missing_output_dir() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&dir.path().join("doors"), Duration::from_secs(1));
    let err = get_testcases(&config, "/P/M", &dir.path().join("absent"))
        .await
        .unwrap_err();
    assert!(matches!(err, DoorsError::InvalidOutputDir(_)));
    assert!(err.is_caller_error());
}

#[test]
fn test_terminate_by_name_matches_ignoring_case() {
    let dir = tempfile::tempdir().unwrap();
    // Process names are capped at 15 bytes on Linux.
    let name = format!("dsweep{}", std::process::id() % 1_000_000);
    let binary = dir.path().join(&name);
    std::fs::copy("/bin/sleep", &binary).unwrap();
    std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut child = std::process::Command::new(&binary).arg("30").spawn().unwrap();
    std::thread::sleep(Duration::from_millis(200));

    let killed = terminate_by_name(&name.to_uppercase());
    let status = child.wait().unwrap();

    assert_eq!(killed, 1);
    assert!(!status.success());
}
