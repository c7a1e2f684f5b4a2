// CLI behavior against a local JSON roster

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

fn write_roster(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("roster.json");
    std::fs::write(
        &path,
        r#"[
  {"id": 1, "name": "Acme", "organization": "Acme SA", "pipeline_stage": "lead", "pipeline_position": 0},
  {"id": 2, "name": "Borges", "pipeline_stage": "lead", "pipeline_position": 1},
  {"id": 3, "name": "Cunha", "pipeline_stage": "proposta", "pipeline_position": 0}
]"#,
    )
    .unwrap();
    path
}

fn board_cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("pipeline-board").unwrap();
    cmd.current_dir(dir).env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_stages_lists_registry_in_board_order() {
    let dir = TempDir::new().unwrap();

    board_cmd(dir.path())
        .arg("stages")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. lead"))
        .stdout(predicate::str::contains("Qualificação"))
        .stdout(predicate::str::contains("6. perdido"));
}

#[test]
fn test_stage_labels_come_from_config_file() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("custom.toml");
    std::fs::write(&config, "[board.stages.fechado]\nlabel = \"Ganho\"\n").unwrap();

    board_cmd(dir.path())
        .args(["--config", config.to_str().unwrap(), "stages"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ganho"));
}

#[test]
fn test_show_renders_every_stage() {
    let dir = TempDir::new().unwrap();
    let roster = write_roster(&dir);

    board_cmd(dir.path())
        .args(["show", "--roster", roster.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 clients"))
        .stdout(predicate::str::contains("▸ Lead (2)"))
        .stdout(predicate::str::contains("#1 Acme · Acme SA"))
        .stdout(predicate::str::contains("▸ Perdido (0)"));
}

#[test]
fn test_move_updates_roster_file() {
    let dir = TempDir::new().unwrap();
    let roster = write_roster(&dir);

    board_cmd(dir.path())
        .args(["move", "2", "proposta", "--position", "0", "--roster", roster.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Client 2 is now in proposta at position 0"));

    let saved: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&roster).unwrap()).unwrap();
    let moved = saved
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["id"] == 2)
        .unwrap();
    assert_eq!(moved["pipeline_stage"], "proposta");
    assert_eq!(moved["pipeline_position"], 0);
}

#[test]
fn test_move_to_unknown_stage_fails() {
    let dir = TempDir::new().unwrap();
    let roster = write_roster(&dir);

    board_cmd(dir.path())
        .args(["move", "1", "arquivado", "--roster", roster.to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Invalid target stage 'arquivado'"));
}

#[test]
fn test_show_without_data_service_config_fails() {
    let dir = TempDir::new().unwrap();

    board_cmd(dir.path())
        .env_remove("PIPELINE_BOARD_API_KEY")
        .env_remove("PIPELINE_BOARD_REMOTE__API_KEY")
        .env_remove("PIPELINE_BOARD_REMOTE__BASE_URL")
        .arg("show")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Data service is not configured"));
}
