#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const RECORD: &str = ".github/HANDOVER.md";
const PRD: &str = "docs/planning/PRD-user-authentication.md";
const SPEC: &str = "docs/architecture/SPEC-user-authentication.md";

fn handover(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("handover").unwrap();
    cmd.current_dir(dir.path())
        .env("HANDOVER_ROOT", dir.path())
        .env_remove("GITHUB_TOKEN");
    cmd
}

fn init_project(dir: &TempDir) {
    handover(dir).arg("init").assert().success();
}

/// Overwrite `.handover/config.yaml` with the given handler commands.
fn write_config(dir: &TempDir, extra: &str, handlers: &[(&str, &str)]) {
    let mut yaml = format!("version: 1\nfeature: user-authentication\n{extra}handlers:\n");
    for (key, command) in handlers {
        yaml.push_str(&format!(
            "  {key}:\n    command: '{}'\n",
            command.replace('\'', "''")
        ));
    }
    std::fs::create_dir_all(dir.path().join(".handover")).unwrap();
    std::fs::write(dir.path().join(".handover/config.yaml"), yaml).unwrap();
}

/// Handlers that produce the artifacts the gated transitions wait for.
fn working_handlers() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "pm",
            "mkdir -p docs/planning && printf \"# PRD\\n\\n## Architect Prompt\\nDesign X\\n\" > docs/planning/PRD-user-authentication.md",
        ),
        (
            "architect",
            "mkdir -p docs/architecture && echo \"$HANDOVER_PROMPT\" > docs/architecture/SPEC-user-authentication.md",
        ),
        ("developer", "true"),
        ("qa", "true"),
        ("security", "true"),
        ("devops", "true"),
        ("releasemanager", "echo \"$HANDOVER_NEXT_PHASE\" > RELEASED"),
    ]
}

fn read(dir: &TempDir, rel: &str) -> String {
    std::fs::read_to_string(dir.path().join(rel)).unwrap()
}

fn report_files(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => {
            let mut names: Vec<String> = entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }
        Err(_) => Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// handover init
// ---------------------------------------------------------------------------

#[test]
fn init_creates_config_and_record() {
    let dir = TempDir::new().unwrap();
    handover(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("created: .handover/config.yaml"));

    assert!(dir.path().join(".handover/config.yaml").exists());
    let record = read(&dir, RECORD);
    assert!(record.contains("**[PM]**"));
    assert!(record.contains("**Planning**"));
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::write(dir.path().join(RECORD), "## Current Persona\n**[QA]**\n").unwrap();

    handover(&dir)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("exists:  .github/HANDOVER.md"));
    assert_eq!(read(&dir, RECORD), "## Current Persona\n**[QA]**\n");
}

#[test]
fn init_with_feature_sets_artifact_paths() {
    let dir = TempDir::new().unwrap();
    handover(&dir)
        .args(["init", "--feature", "billing"])
        .assert()
        .success();
    handover(&dir)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("docs/planning/PRD-billing.md"));
}

#[test]
fn init_rejects_invalid_feature_slug() {
    let dir = TempDir::new().unwrap();
    handover(&dir)
        .args(["init", "--feature", "Not A Slug"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid feature slug"));
}

// ---------------------------------------------------------------------------
// handover status
// ---------------------------------------------------------------------------

#[test]
fn status_without_record_suggests_init() {
    let dir = TempDir::new().unwrap();
    handover(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Persona:  UNKNOWN"))
        .stdout(predicate::str::contains("handover init"));
}

#[test]
fn status_shows_bootstrap_when_prd_missing() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    handover(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Persona:  PM"))
        .stdout(predicate::str::contains("Source:   System Init"));
}

#[test]
fn status_json_reports_next_action() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    std::fs::create_dir_all(dir.path().join("docs/planning")).unwrap();
    std::fs::write(dir.path().join(PRD), "## Architect Prompt\nDesign X\n").unwrap();

    let out = handover(&dir).args(["status", "--json"]).output().unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["persona"], "PM");
    assert_eq!(value["complete"], false);
    assert_eq!(value["next"]["handler"], "architect");
    assert_eq!(value["next"]["prompt"], "Design X");
}

// ---------------------------------------------------------------------------
// handover run
// ---------------------------------------------------------------------------

#[test]
fn run_drives_workflow_to_release() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_config(&dir, "", &working_handlers());

    handover(&dir)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("**Outcome:** completed"))
        .stdout(predicate::str::contains("**Total Steps:** 7"));

    let record = read(&dir, RECORD);
    assert!(record.contains("**[RELEASEMANAGER]**"));
    assert!(record.contains("**Release Management**"));
    assert!(record.contains("## Notes"));
    assert_eq!(read(&dir, SPEC).trim(), "Design X");
    assert_eq!(read(&dir, "RELEASED").trim(), "Release Management");

    let reports = report_files(&dir.path().join(".github/reports"));
    assert_eq!(reports.len(), 2);
    assert!(reports[0].ends_with(".json"));
    assert!(reports[1].ends_with(".md"));

    let journal = read(&dir, ".github/logs/workflow.log");
    assert!(journal.contains("[INFO] step 1: pm -> Planning (from System Init)"));
    assert!(journal.contains("finished: completed after 7 steps"));
}

#[test]
fn run_is_resumable_after_budget() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_config(&dir, "", &working_handlers());

    handover(&dir)
        .args(["run", "--max-steps", "3", "--no-report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("**Outcome:** budgetExceeded"))
        .stdout(predicate::str::contains("run `handover run` again"));
    assert!(read(&dir, RECORD).contains("**[DEVELOPER]**"));

    handover(&dir)
        .args(["run", "--no-report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("**Total Steps:** 4"));
    assert!(read(&dir, RECORD).contains("**[RELEASEMANAGER]**"));
}

#[test]
fn run_at_terminal_persona_takes_no_steps() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_config(&dir, "", &working_handlers());
    let record = read(&dir, RECORD)
        .replace("**[PM]**", "**[RELEASEMANAGER]**")
        .replace("**Planning**", "**Release Management**");
    std::fs::write(dir.path().join(RECORD), &record).unwrap();

    handover(&dir)
        .args(["run", "--no-report"])
        .assert()
        .success()
        .stdout(predicate::str::contains("_No steps were taken._"));
    assert_eq!(read(&dir, RECORD), record);
}

#[test]
fn failing_handler_exits_non_zero_and_keeps_record() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let mut handlers = working_handlers();
    handlers[1] = ("architect", "echo cannot design >&2; exit 4");
    write_config(&dir, "", &handlers);

    handover(&dir)
        .arg("run")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("**Outcome:** failedStep"))
        .stderr(predicate::str::contains(
            "handler 'architect' failed: exited with code 4: cannot design",
        ));

    let record = read(&dir, RECORD);
    assert!(record.contains("**[PM]**"));
    assert!(record.contains("**Planning**"));
    // The failed run still leaves a report behind.
    assert_eq!(report_files(&dir.path().join(".github/reports")).len(), 2);
}

#[test]
fn missing_handler_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_config(&dir, "", &working_handlers()[..2]);

    handover(&dir)
        .args(["run", "--no-report"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no handler registered for 'developer'"));
}

#[test]
fn unknown_handler_key_blocks_run() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let mut handlers = working_handlers();
    handlers.push(("janitor", "true"));
    write_config(&dir, "", &handlers);

    handover(&dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config has 1 error(s)"));
    assert!(!dir.path().join("docs/planning").exists());
}

#[test]
fn duplicate_handler_alias_blocks_run() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    let mut handlers = working_handlers();
    handlers.push(("project-manager", "true"));
    write_config(&dir, "", &handlers);

    handover(&dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("config has 1 error(s)"));
    handover(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "[error] handler 'pm' configured more than once (pm, project-manager)",
        ));
}

#[test]
fn run_json_prints_summary_and_report() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_config(&dir, "", &working_handlers());

    let out = handover(&dir)
        .args(["run", "--json", "--no-report"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let value: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(value["summary"]["outcome"], "completed");
    assert_eq!(value["summary"]["total_steps"], 7);
    assert_eq!(value["report"]["steps"][1]["handler"], "architect");
    assert_eq!(value["report"]["steps"][1]["source_artifact"], PRD);
    assert!(value["saved"].is_null());
}

#[test]
fn credential_is_passed_to_handlers() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_config(
        &dir,
        "credential_env: HANDOVER_TEST_TOKEN\n",
        &[("pm", "test \"$HANDOVER_TEST_TOKEN\" = s3cret")],
    );

    handover(&dir)
        .args(["run", "--max-steps", "1", "--no-report"])
        .env("HANDOVER_TEST_TOKEN", "s3cret")
        .assert()
        .success();

    handover(&dir)
        .args(["run", "--max-steps", "1", "--no-report"])
        .env("HANDOVER_TEST_TOKEN", "wrong")
        .assert()
        .failure();
}

#[test]
fn journal_can_be_disabled() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_config(&dir, "journal_file: null\n", &working_handlers());

    handover(&dir).args(["run", "--no-report"]).assert().success();
    assert!(!dir.path().join(".github/logs/workflow.log").exists());
}

// ---------------------------------------------------------------------------
// handover persona
// ---------------------------------------------------------------------------

#[test]
fn persona_runs_single_handler_without_touching_record() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_config(&dir, "", &[("qa", "printf '%s' \"$HANDOVER_PROMPT\"")]);
    let before = read(&dir, RECORD);

    handover(&dir)
        .args(["persona", "qa", "--prompt", "check login"])
        .assert()
        .success()
        .stdout(predicate::str::contains("check login"));
    assert_eq!(read(&dir, RECORD), before);
}

#[test]
fn persona_rejects_unknown_key() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    handover(&dir)
        .args(["persona", "bogus"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown handler 'bogus'"));
}

// ---------------------------------------------------------------------------
// handover config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_passes_with_all_handlers() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_config(&dir, "", &working_handlers());
    handover(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    init_project(&dir);
    write_config(&dir, "", &[("janitor", "true"), ("pm", "")]);
    handover(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] unknown handler 'janitor'"))
        .stdout(predicate::str::contains("[error] handler 'pm' has an empty command"))
        .stdout(predicate::str::contains("[warning] no command configured for handler 'architect'"));
}
