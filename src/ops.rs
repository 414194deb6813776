use crate::config::{ConnectionParameters, EffectiveConfiguration};
use crate::engine::{Engine, EngineError, EngineSession, MigrateReport};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One migration-engine operation. Exactly one is dispatched per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum Operation {
    /// Apply pending migrations in ascending version order, up to the
    /// optional target version.
    Migrate { target: Option<String> },
    /// Reconcile the schema-history table with the discovered scripts.
    Repair,
    /// Drop all objects in the configured schemas.
    Clean,
}

impl Operation {
    /// The engine command verb.
    pub fn verb(&self) -> &'static str {
        match self {
            Operation::Migrate { .. } => "migrate",
            Operation::Repair => "repair",
            Operation::Clean => "clean",
        }
    }

    /// Migrate and repair work from discovered migration scripts and are
    /// skipped when there are none; clean does not depend on them.
    pub fn needs_locations(&self) -> bool {
        !matches!(self, Operation::Clean)
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, Operation::Clean)
    }
}

/// What a completed action reports back across the isolation boundary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReport {
    /// Number of scripts applied; only migrate counts anything.
    pub migrations_applied: Option<u64>,
}

/// Lifecycle of one dispatched action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Connected,
    Succeeded,
    Failed,
    Closed,
}

/// Runs one operation through the engine session lifecycle:
/// `Idle -> Connected -> (Succeeded | Failed) -> Closed`.
///
/// Connecting is the single blocking step. The session is closed on both
/// result paths, so no connection outlives the invocation; when both the
/// operation and the close fail, the operation's failure wins.
pub async fn run_action<E: Engine>(
    engine: &E,
    connection: &ConnectionParameters,
    configuration: &EffectiveConfiguration,
    operation: &Operation,
) -> Result<ActionReport, EngineError> {
    let mut phase = Phase::Idle;
    debug!(operation = operation.verb(), phase = ?phase, "starting action");

    let mut session = engine.connect(connection, configuration).await?;
    phase = Phase::Connected;
    debug!(url = %connection.display_url(), phase = ?phase, "engine client constructed");

    let result = perform(&mut session, operation).await;
    phase = match result {
        Ok(_) => Phase::Succeeded,
        Err(_) => Phase::Failed,
    };
    debug!(operation = operation.verb(), phase = ?phase, "engine call returned");

    let closed = session.close().await;
    phase = Phase::Closed;
    debug!(phase = ?phase, "engine client released");

    let report = result?;
    closed?;
    Ok(report)
}

async fn perform<S: EngineSession>(
    session: &mut S,
    operation: &Operation,
) -> Result<ActionReport, EngineError> {
    match operation {
        Operation::Migrate { target } => {
            let report = session.migrate(target.as_deref()).await?;
            migrate_outcome(report)
        }
        Operation::Repair => {
            session.repair().await?;
            Ok(ActionReport::default())
        }
        Operation::Clean => {
            session.clean().await?;
            Ok(ActionReport::default())
        }
    }
}

/// Migrate succeeds only when the engine's own success flag says so.
fn migrate_outcome(report: MigrateReport) -> Result<ActionReport, EngineError> {
    if report.success {
        Ok(ActionReport {
            migrations_applied: Some(report.migrations_executed),
        })
    } else {
        Err(report
            .error
            .unwrap_or_else(|| EngineError::general("migration engine reported failure")))
    }
}
