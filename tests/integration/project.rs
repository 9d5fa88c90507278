//! 项目文件集成测试：从磁盘加载、运行、导出，以及命令行入口

use blockvm::{EngineConfig, Project, Runtime, Value, VariableKind};
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::NamedTempFile;

const GAME: &str = r#"{
  "targets": [
    {
      "name": "Stage",
      "isStage": true,
      "variables": { "v1": { "name": "score", "value": 0 } }
    },
    {
      "name": "Cat",
      "blocks": {
        "flag": { "opcode": "event_whenflagclicked", "next": "set", "topLevel": true },
        "set": {
          "opcode": "data_setvariableto",
          "parent": "flag",
          "next": "change",
          "inputs": { "VALUE": { "literal": 5 } },
          "fields": { "VARIABLE": { "value": "score", "id": "v1" } }
        },
        "change": {
          "opcode": "data_changevariableby",
          "parent": "set",
          "inputs": { "VALUE": { "reporter": "sum" } },
          "fields": { "VARIABLE": { "value": "score", "id": "v1" } }
        },
        "sum": {
          "opcode": "operator_add",
          "parent": "change",
          "inputs": { "NUM1": { "literal": 1 }, "NUM2": { "literal": "2" } }
        },
        "hat": {
          "opcode": "event_whenbroadcastreceived",
          "next": "hop",
          "topLevel": true,
          "fields": { "BROADCAST_OPTION": { "value": "jump" } }
        },
        "hop": {
          "opcode": "motion_changeyby",
          "parent": "hat",
          "inputs": { "DY": { "literal": 10 } }
        }
      }
    }
  ]
}"#;

fn write_project(source: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(source.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn stage_score(rt: &Runtime) -> Value {
    rt.stage()
        .and_then(|stage| stage.variable_by_name("score", VariableKind::Scalar))
        .map(|variable| variable.get())
        .unwrap_or_default()
}

fn blockvm(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_blockvm"))
        .args(args)
        .output()
        .unwrap()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_load_run_and_export() {
    let file = write_project(GAME);
    let project = Project::from_file(file.path()).unwrap();
    assert!(project.validate().is_ok());

    let mut rt = Runtime::new(EngineConfig::default());
    let loaded = rt.load_project(&project).unwrap();
    assert_eq!(loaded.len(), 2);

    rt.green_flag();
    rt.step();
    assert_eq!(stage_score(&rt), Value::Number(8.0));

    let cat = rt.target_by_name("Cat").unwrap().id();
    rt.broadcast("jump");
    rt.step();
    rt.step();
    assert_eq!(rt.target(cat).unwrap().y, 10.0);

    // the export carries runtime state and loads back into the same shape
    let exported = rt.to_project();
    let json = exported.to_json_pretty().unwrap();
    let reparsed = Project::from_json_str(&json).unwrap();
    assert_eq!(reparsed, exported);
    assert_eq!(reparsed.targets[0].variables["v1"].value, Value::Number(8.0));
    assert_eq!(reparsed.targets[1].y, 10.0);
    assert_eq!(reparsed.targets[1].blocks.len(), 6);
}

#[test]
fn test_cli_check_accepts_valid_project() {
    let file = write_project(GAME);
    let output = blockvm(&["check", path_arg(file.path())]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Check passed!"));
    assert!(stdout.contains("2 script(s)"));
}

#[test]
fn test_cli_check_rejects_dangling_reference() {
    let broken = GAME.replace(r#""next": "change""#, r#""next": "missing""#);
    let file = write_project(&broken);
    let output = blockvm(&["check", path_arg(file.path())]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing"));
}

#[test]
fn test_cli_run_prints_final_state() {
    let file = write_project(GAME);
    let output = blockvm(&["run", path_arg(file.path()), "--frames", "5", "--broadcast", "jump"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains(" = 8"));
    assert!(stdout.contains("position: (0, 10)"));
}

#[test]
fn test_cli_run_missing_file_fails() {
    let output = blockvm(&["run", "/nonexistent/blockvm/project.json"]);
    assert!(!output.status.success());
}

#[test]
fn test_cli_turbo_help_describes_budget() {
    let output = blockvm(&["run", "--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("redraws"));
    assert!(stdout.contains("budget"));
}
