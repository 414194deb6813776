use flyrun::config::{ConfigBuilder, ConfigError};
use flyrun::dispatch::{self, Isolation, Outcome, Prepared, WorkRequest};
use flyrun::ops::Operation;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn migrate() -> Operation {
    Operation::Migrate { target: None }
}

/// A project root with one migration script under `migrations/`.
fn root_with_script() -> TempDir {
    let dir = TempDir::new().unwrap();
    let migrations = dir.path().join("migrations");
    fs::create_dir_all(&migrations).unwrap();
    fs::write(migrations.join("V1__init.sql"), "create table t (id int);").unwrap();
    dir
}

#[test]
fn test_prepare_skips_migrate_without_scripts() {
    let dir = TempDir::new().unwrap();
    let configuration = ConfigBuilder::new()
        .with_overrides([("url", "jdbc:h2:mem:test")])
        .resolve();

    // The default locations directory does not exist under this root.
    match dispatch::prepare(migrate(), configuration, dir.path()).unwrap() {
        Prepared::Skip { .. } => {}
        Prepared::Run(_) => panic!("expected skip for an empty location set"),
    }
}

#[test]
fn test_prepare_skip_runs_before_url_validation() {
    let dir = TempDir::new().unwrap();
    // No url anywhere: a skipped operation must still short-circuit cheaply.
    let configuration = ConfigBuilder::new().resolve();

    match dispatch::prepare(migrate(), configuration, dir.path()).unwrap() {
        Prepared::Skip { .. } => {}
        Prepared::Run(_) => panic!("expected skip to win over missing url"),
    }
}

#[test]
fn test_prepare_repair_needs_scripts_but_clean_does_not() {
    let dir = TempDir::new().unwrap();
    let configuration = ConfigBuilder::new()
        .with_overrides([("url", "jdbc:h2:mem:test"), ("cleanDisabled", "false")])
        .resolve();

    match dispatch::prepare(Operation::Repair, configuration.clone(), dir.path()).unwrap() {
        Prepared::Skip { .. } => {}
        Prepared::Run(_) => panic!("expected repair to skip without scripts"),
    }

    match dispatch::prepare(Operation::Clean, configuration, dir.path()).unwrap() {
        Prepared::Run(_) => {}
        Prepared::Skip { .. } => panic!("clean must not depend on migration scripts"),
    }
}

#[test]
fn test_prepare_clean_gate_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let configuration = ConfigBuilder::new()
        .with_overrides([("url", "jdbc:h2:mem:test")])
        .resolve();

    let error = dispatch::prepare(Operation::Clean, configuration, dir.path()).unwrap_err();
    assert!(matches!(error, ConfigError::CleanDisabled));
}

#[test]
fn test_prepare_strips_reserved_keys_and_resolves_locations() {
    let dir = root_with_script();
    let configuration = ConfigBuilder::new()
        .with_overrides([
            ("url", "jdbc:h2:mem:test"),
            ("user", "sa"),
            ("password", "secret"),
            ("locations", "migrations"),
            ("target", "7"),
            ("engine", "/opt/flyway/flyway"),
            ("schemas", "public"),
        ])
        .resolve();

    let invocation = match dispatch::prepare(migrate(), configuration, dir.path()).unwrap() {
        Prepared::Run(invocation) => invocation,
        Prepared::Skip { .. } => panic!("expected a runnable invocation"),
    };

    assert_eq!(invocation.isolation, Isolation::InProcess);
    let request = &invocation.request;
    assert_eq!(request.engine, "/opt/flyway/flyway");
    assert_eq!(request.connection.url, "jdbc:h2:mem:test");
    assert_eq!(request.connection.user.as_deref(), Some("sa"));
    assert_eq!(request.connection.password.as_deref(), Some("secret"));
    assert_eq!(
        request.operation,
        Operation::Migrate {
            target: Some("7".to_string())
        }
    );

    // Tool-level keys are gone; the rest reaches the engine verbatim.
    for reserved in ["url", "user", "password", "target", "engine", "runtime"] {
        assert_eq!(request.configuration.get(reserved), None, "{reserved}");
    }
    assert_eq!(request.configuration.get("schemas"), Some("public"));

    let locations = request.configuration.get("locations").unwrap();
    assert!(locations.starts_with("filesystem:"));
    assert!(locations.ends_with("migrations"));
    assert!(Path::new(locations.trim_start_matches("filesystem:")).is_absolute());
}

#[test]
fn test_prepare_runtime_selects_out_of_process() {
    let dir = root_with_script();
    let configuration = ConfigBuilder::new()
        .with_overrides([
            ("url", "jdbc:h2:mem:test"),
            ("locations", "migrations"),
            ("runtime", "/usr/bin/env"),
        ])
        .resolve();

    match dispatch::prepare(migrate(), configuration, dir.path()).unwrap() {
        Prepared::Run(invocation) => assert_eq!(
            invocation.isolation,
            Isolation::OutOfProcess {
                runtime: "/usr/bin/env".into()
            }
        ),
        Prepared::Skip { .. } => panic!("expected a runnable invocation"),
    }
}

#[test]
fn test_outcome_wire_format_is_text_only() {
    // What crosses the boundary is a kind tag and rendered text, nothing
    // richer; both sides must agree on this shape.
    let json = r#"{"outcome":"failed","kind":"validation","message":"checksum mismatch"}"#;
    let outcome: Outcome = serde_json::from_str(json).unwrap();
    match outcome {
        Outcome::Failed(failure) => {
            assert_eq!(failure.kind, dispatch::FailureKind::Validation);
            assert_eq!(failure.message, "checksum mismatch");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let json = r#"{"outcome":"succeeded","migrations_applied":3}"#;
    let outcome: Outcome = serde_json::from_str(json).unwrap();
    match outcome {
        Outcome::Succeeded(report) => assert_eq!(report.migrations_applied, Some(3)),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_work_request_marshals_by_value() {
    let dir = root_with_script();
    let configuration = ConfigBuilder::new()
        .with_overrides([
            ("url", "jdbc:h2:mem:test"),
            ("locations", "migrations"),
            ("schemas", "public"),
        ])
        .resolve();

    let invocation = match dispatch::prepare(migrate(), configuration, dir.path()).unwrap() {
        Prepared::Run(invocation) => invocation,
        Prepared::Skip { .. } => panic!("expected a runnable invocation"),
    };

    let encoded = serde_json::to_string(&invocation.request).unwrap();
    let decoded: WorkRequest = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded.operation, invocation.request.operation);
    assert_eq!(decoded.connection, invocation.request.connection);
    assert_eq!(decoded.configuration, invocation.request.configuration);
}
