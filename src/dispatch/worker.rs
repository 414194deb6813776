use crate::dispatch::{Failure, Outcome, WorkRequest};
use crate::engine::ExecEngine;
use crate::ops;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::debug;

/// Executes one work request with a freshly constructed engine client. Both
/// isolation modes funnel through here; this is the inside of the boundary.
pub async fn execute(request: &WorkRequest) -> Outcome {
    let engine = ExecEngine::new(&request.engine);
    match ops::run_action(
        &engine,
        &request.connection,
        &request.configuration,
        &request.operation,
    )
    .await
    {
        Ok(report) => Outcome::Succeeded(report),
        // Only the classification and rendered text cross back out; the
        // typed failure may not be resolvable on the other side.
        Err(error) => Outcome::Failed(error.into()),
    }
}

/// Parent side of out-of-process isolation: spawns the worker runtime, writes
/// the request to its stdin, and blocks until it exits with a response.
pub async fn execute_remote(runtime: &Path, request: &WorkRequest) -> Outcome {
    match run_worker_process(runtime, request).await {
        Ok(outcome) => outcome,
        Err(failure) => Outcome::Failed(failure),
    }
}

async fn run_worker_process(runtime: &Path, request: &WorkRequest) -> Result<Outcome, Failure> {
    let payload = serde_json::to_vec(request)
        .map_err(|error| Failure::boundary(format!("failed to encode work request: {}", error)))?;

    let mut child = Command::new(runtime)
        .arg("worker")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|error| {
            Failure::boundary(format!(
                "failed to spawn worker runtime `{}`: {}",
                runtime.display(),
                error
            ))
        })?;

    {
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Failure::boundary("worker runtime stdin unavailable"))?;
        stdin.write_all(&payload).await.map_err(|error| {
            Failure::boundary(format!("failed to write work request to worker: {}", error))
        })?;
        // Dropping the handle closes the pipe and signals end of input.
    }

    let output = child.wait_with_output().await.map_err(|error| {
        Failure::boundary(format!("failed waiting for worker runtime: {}", error))
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        debug!(worker_stderr = %stderr.trim(), "worker runtime diagnostics");
    }

    match serde_json::from_str::<Outcome>(stdout.trim()) {
        Ok(outcome) => Ok(outcome),
        Err(_) => {
            let status = if output.status.success() {
                "exited".to_string()
            } else {
                format!("failed ({})", output.status)
            };
            Err(Failure::boundary(format!(
                "worker runtime {} without a readable response: {}",
                status,
                stderr.trim()
            )))
        }
    }
}

/// Child side: reads one request from stdin, executes it, writes the outcome
/// to stdout. The exit code stays zero whenever a response was written; the
/// parent reads failures from the response, not from the exit status.
pub async fn run_worker() -> Result<()> {
    let mut payload = String::new();
    tokio::io::stdin()
        .read_to_string(&mut payload)
        .await
        .context("failed to read work request from stdin")?;
    let request: WorkRequest =
        serde_json::from_str(&payload).context("failed to decode work request")?;

    debug!(operation = request.operation.verb(), "worker request received");
    let outcome = execute(&request).await;

    let encoded = serde_json::to_string(&outcome).context("failed to encode work outcome")?;
    println!("{}", encoded);
    Ok(())
}
