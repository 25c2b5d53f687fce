//! CLI 集成测试
//!
//! 全部走 `--simulate` 台架总线或纯文件操作，不依赖硬件。
//! 配置目录重定向到临时目录，避免污染用户配置。

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cli(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("so101-cli").unwrap();
    cmd.env("HOME", home.path());
    cmd.env("XDG_CONFIG_HOME", home.path().join(".config"));
    cmd
}

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("motors"))
        .stdout(predicate::str::contains("wrist-roll"))
        .stdout(predicate::str::contains("train"));
}

#[test]
fn test_motors_list() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["motors", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shoulder_pan"))
        .stdout(predicate::str::contains("gripper"));
}

#[test]
fn test_motors_ping_simulated() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["motors", "ping", "--simulate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sts3215"))
        .stdout(predicate::str::contains("wrist_roll"));
}

#[test]
fn test_motors_test_single_motor_simulated() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args([
            "motors",
            "test",
            "--simulate",
            "--motor",
            "elbow_flex",
            "--yes",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("elbow_flex"))
        .stdout(predicate::str::contains("1/1 passed"));
}

#[test]
fn test_motors_test_json_output() {
    let home = TempDir::new().unwrap();
    let output = cli(&home)
        .args([
            "motors",
            "test",
            "--simulate",
            "--motor",
            "wrist_roll",
            "--yes",
            "--format",
            "json",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let reports: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let reports = reports.as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["name"], "wrist_roll");
    assert_eq!(reports[0]["reachable"], true);
}

#[test]
fn test_real_port_needs_external_backend() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["motors", "ping", "--port", "/dev/ttyACM0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--simulate"));
}

#[test]
fn test_wrist_roll_simulated_json() {
    let home = TempDir::new().unwrap();
    let output = cli(&home)
        .args(["wrist-roll", "--simulate", "--format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["id"], 5);
    assert_eq!(report["reachable"], true);
    assert!(report["findings"].as_array().unwrap().is_empty());
}

#[test]
fn test_registers_dump_simulated() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["registers", "--simulate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Present_Position"))
        .stdout(predicate::str::contains("Torque_Enable"));
}

#[test]
fn test_registers_dump_by_motor_name() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["registers", "--simulate", "--motor", "gripper"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Control table for servo ID 6"));
}

#[test]
fn test_train_script_generation() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("train.sh");
    cli(&home)
        .args([
            "train",
            "script",
            "--hf-user",
            "testuser",
            "--policy",
            "diffusion",
            "-o",
        ])
        .arg(&out)
        .assert()
        .success();

    let script = std::fs::read_to_string(&out).unwrap();
    assert!(script.contains("lerobot-train"));
    assert!(script.contains("--policy.type=diffusion"));
    assert!(script.contains("testuser/lerobot-so101-demo"));
}

#[test]
fn test_train_notebook_generation() {
    let home = TempDir::new().unwrap();
    let out = home.path().join("nb.ipynb");
    cli(&home)
        .args(["train", "notebook", "--hf-user", "testuser", "-o"])
        .arg(&out)
        .assert()
        .success();

    let nb: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(nb["nbformat"], 4);
    assert!(!nb["cells"].as_array().unwrap().is_empty());
}

#[test]
fn test_train_requires_hf_user() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["train", "script"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HuggingFace user"));
}

#[test]
fn test_config_set_and_get() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["config", "set", "--port", "/dev/ttyUSB7", "--arm", "follower"])
        .assert()
        .success();

    cli(&home)
        .args(["config", "get", "port"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/dev/ttyUSB7"));
}

#[test]
fn test_config_set_rejects_bad_arm() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["config", "set", "--arm", "so99"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown arm preset"));
}

#[test]
fn test_camera_list_custom_dir() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("video0"), b"").unwrap();
    cli(&home)
        .args(["camera", "list", "--dev-dir"])
        .arg(home.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("video0"));
}

#[test]
fn test_calibration_compare() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("calibration");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("so101_follower_f1.json"),
        r#"{"wrist_roll": {"homing_offset": 120, "range_min": 500}}"#,
    )
    .unwrap();
    std::fs::write(
        dir.join("so101_leader_l1.json"),
        r#"{"wrist_roll": {"homing_offset": 118, "range_min": 500}}"#,
    )
    .unwrap();

    cli(&home)
        .args([
            "calibration",
            "compare",
            "--follower-id",
            "f1",
            "--leader-id",
            "l1",
            "--dir",
        ])
        .arg(&dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("homing_offset"))
        .stdout(predicate::str::contains("1 value(s) differ"));
}

#[test]
fn test_calibration_compare_requires_ids() {
    let home = TempDir::new().unwrap();
    cli(&home)
        .args(["calibration", "compare"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("follower"));
}
