use crate::config::{ConnectionParameters, EffectiveConfiguration};
use crate::constants::ENGINE_PASSWORD_ENV;
use crate::engine::{Engine, EngineError, EngineErrorKind, EngineSession, MigrateReport};
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// The production engine binding: drives the Flyway command-line client.
///
/// Parameters cross into the engine as `-key=value` arguments built from the
/// effective configuration; the connection url and user go through their
/// dedicated flags and the password through the engine's environment. Reports
/// come back as JSON (`-outputType=json`).
#[derive(Debug, Clone)]
pub struct ExecEngine {
    executable: PathBuf,
}

impl ExecEngine {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl Engine for ExecEngine {
    type Session = ExecSession;

    async fn connect(
        &self,
        connection: &ConnectionParameters,
        configuration: &EffectiveConfiguration,
    ) -> Result<ExecSession, EngineError> {
        // A bare command name is resolved through PATH at spawn time; an
        // explicit path must exist now so the failure classifies as a
        // connection problem rather than a failed operation.
        if self.executable.components().count() > 1 && !self.executable.exists() {
            return Err(EngineError::connection(format!(
                "migration engine executable not found: {}",
                self.executable.display()
            )));
        }
        Ok(ExecSession {
            executable: self.executable.clone(),
            connection: connection.clone(),
            parameters: configuration.clone(),
        })
    }
}

/// A constructed engine client for one invocation.
pub struct ExecSession {
    executable: PathBuf,
    connection: ConnectionParameters,
    parameters: EffectiveConfiguration,
}

impl ExecSession {
    fn command(&self, verb: &str, target: Option<&str>) -> Command {
        let mut command = Command::new(&self.executable);
        command.arg(format!("-url={}", self.connection.url));
        if let Some(user) = &self.connection.user {
            command.arg(format!("-user={}", user));
        }
        if let Some(password) = &self.connection.password {
            command.env(ENGINE_PASSWORD_ENV, password);
        }
        for (key, value) in self.parameters.iter() {
            // The engine rejects bare `-key=` arguments.
            if value.is_empty() {
                continue;
            }
            command.arg(format!("-{}={}", key, value));
        }
        if let Some(target) = target {
            command.arg(format!("-target={}", target));
        }
        command.arg("-outputType=json");
        command.arg(verb);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    async fn invoke(&self, verb: &str, target: Option<&str>) -> Result<MigrateReport, EngineError> {
        debug!(
            engine = %self.executable.display(),
            command = verb,
            "invoking migration engine"
        );
        let output = self
            .command(verb, target)
            .output()
            .await
            .map_err(|error| {
                EngineError::connection(format!(
                    "failed to launch migration engine `{}`: {}",
                    self.executable.display(),
                    error
                ))
            })?;
        parse_report(
            verb,
            output.status.success(),
            &String::from_utf8_lossy(&output.stdout),
            &String::from_utf8_lossy(&output.stderr),
        )
    }
}

impl EngineSession for ExecSession {
    async fn migrate(&mut self, target: Option<&str>) -> Result<MigrateReport, EngineError> {
        self.invoke("migrate", target).await
    }

    async fn repair(&mut self) -> Result<(), EngineError> {
        into_result(self.invoke("repair", None).await?)
    }

    async fn clean(&mut self) -> Result<(), EngineError> {
        into_result(self.invoke("clean", None).await?)
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        // Each call is a fresh engine process that has already been awaited;
        // there is no live client left to release.
        Ok(())
    }
}

fn into_result(report: MigrateReport) -> Result<(), EngineError> {
    if report.success {
        Ok(())
    } else {
        Err(report
            .error
            .unwrap_or_else(|| EngineError::general("migration engine reported failure")))
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawReport {
    #[serde(default)]
    success: Option<bool>,
    #[serde(rename = "migrationsExecuted", default)]
    migrations_executed: Option<u64>,
    #[serde(default)]
    error: Option<RawError>,
}

#[derive(Debug, Deserialize)]
struct RawError {
    #[serde(rename = "errorCode", default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Interprets one engine run. A parseable JSON report wins over the exit
/// status; without one, the exit status decides and stderr carries the
/// diagnostic.
fn parse_report(
    verb: &str,
    exit_ok: bool,
    stdout: &str,
    stderr: &str,
) -> Result<MigrateReport, EngineError> {
    match serde_json::from_str::<RawReport>(stdout.trim()) {
        Ok(report) => {
            if let Some(error) = report.error {
                let kind = classify(error.error_code.as_deref());
                let message = error.message.unwrap_or_else(|| {
                    format!(
                        "{} failed with code {}",
                        verb,
                        error.error_code.as_deref().unwrap_or("unknown")
                    )
                });
                return Ok(MigrateReport {
                    success: false,
                    migrations_executed: report.migrations_executed.unwrap_or(0),
                    error: Some(EngineError { kind, message }),
                });
            }
            Ok(MigrateReport {
                success: report.success.unwrap_or(exit_ok),
                migrations_executed: report.migrations_executed.unwrap_or(0),
                error: None,
            })
        }
        Err(_) if exit_ok => {
            // Unexpected but successful output; trust the exit code.
            Ok(MigrateReport {
                success: true,
                migrations_executed: 0,
                error: None,
            })
        }
        Err(_) => {
            let detail = if stderr.trim().is_empty() {
                stdout.trim()
            } else {
                stderr.trim()
            };
            Err(EngineError::general(format!(
                "migration engine {} exited with failure: {}",
                verb, detail
            )))
        }
    }
}

fn classify(error_code: Option<&str>) -> EngineErrorKind {
    match error_code {
        Some(code) if code.starts_with("VALIDATE") => EngineErrorKind::Validation,
        _ => EngineErrorKind::General,
    }
}
