use crate::helpers::project::TestProject;
use flyrun::dispatch::Outcome;
use predicates::prelude::*;

const MIGRATE_OK: &str = r#"{"success": true, "migrationsExecuted": 1, "operation": "migrate"}"#;

fn project_with_stub() -> (TestProject, std::path::PathBuf) {
    let project = TestProject::new();
    let engine = project.stub_engine(MIGRATE_OK);
    project.add_migration("V1__init.sql", "create table t (id int);");
    (project, engine)
}

#[test]
fn test_out_of_process_dispatch_round_trip() {
    let (project, engine) = project_with_stub();
    let runtime = project.worker_runtime();
    project.write_config(&format!(
        "url=jdbc:h2:mem:ci\nlocations=migrations\nengine={}\nruntime={}\n",
        engine.display(),
        runtime.display()
    ));

    project
        .cmd()
        .args(["--debug", "migrate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied 1 migration"))
        .stderr(predicate::str::contains("dispatching to worker runtime"));

    // The engine ran inside the spawned worker, not in the parent.
    assert!(project.engine_was_invoked());
}

#[test]
fn test_runtime_equal_to_current_executable_stays_in_process() {
    let (project, engine) = project_with_stub();
    let current = env!("CARGO_BIN_EXE_flyrun");
    project.write_config(&format!(
        "url=jdbc:h2:mem:ci\nlocations=migrations\nengine={}\nruntime={}\n",
        engine.display(),
        current
    ));

    project
        .cmd()
        .args(["--debug", "migrate"])
        .assert()
        .success()
        .stderr(predicate::str::contains("dispatching in-process"));
}

#[test]
fn test_broken_worker_surfaces_a_boundary_failure() {
    let (project, engine) = project_with_stub();
    let runtime = project.broken_stub("broken-runtime", "runtime exploded", 3);
    project.write_config(&format!(
        "url=jdbc:h2:mem:ci\nlocations=migrations\nengine={}\nruntime={}\n",
        engine.display(),
        runtime.display()
    ));

    project
        .cmd()
        .arg("migrate")
        .assert()
        .failure()
        .stdout(predicate::str::contains("worker runtime"))
        .stdout(predicate::str::contains("runtime exploded"));
}

#[test]
fn test_worker_subcommand_executes_a_marshaled_request() {
    let (project, engine) = project_with_stub();

    let request = serde_json::json!({
        "operation": "migrate",
        "target": null,
        "connection": {"url": "jdbc:h2:mem:ci", "user": null, "password": null},
        "engine": engine.display().to_string(),
        "configuration": {"locations": format!("filesystem:{}/migrations", project.root().display())},
    });

    let assert = project
        .cmd()
        .arg("worker")
        .write_stdin(request.to_string())
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    let outcome: Outcome = serde_json::from_str(stdout.trim()).unwrap();
    match outcome {
        Outcome::Succeeded(report) => assert_eq!(report.migrations_applied, Some(1)),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_worker_reports_failures_in_the_response_not_the_exit_code() {
    let project = TestProject::new();

    let request = serde_json::json!({
        "operation": "migrate",
        "target": null,
        "connection": {"url": "jdbc:h2:mem:ci", "user": null, "password": null},
        "engine": project.root().join("no-such-engine").display().to_string(),
        "configuration": {},
    });

    let assert = project
        .cmd()
        .arg("worker")
        .write_stdin(request.to_string())
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout);
    let outcome: Outcome = serde_json::from_str(stdout.trim()).unwrap();
    match outcome {
        Outcome::Failed(failure) => {
            assert!(failure.message.contains("not found"));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_worker_rejects_an_unreadable_request() {
    let project = TestProject::new();
    project
        .cmd()
        .arg("worker")
        .write_stdin("this is not json")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to decode work request"));
}
