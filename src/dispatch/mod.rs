pub mod worker;

use crate::config::{ConfigError, ConnectionParameters, EffectiveConfiguration};
use crate::constants::{
    CLEAN_DISABLED_KEY, DEFAULT_ENGINE, ENGINE_KEY, LOCATIONS_KEY, RUNTIME_KEY, TARGET_KEY,
};
use crate::locations::LocationSet;
use crate::ops::{ActionReport, Operation};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// How the work action is isolated from the invoking process. Chosen once per
/// invocation and never revisited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Isolation {
    /// A fresh engine client inside the invoking process; nothing is shared
    /// with other invocations.
    InProcess,
    /// Spawn the configured worker runtime and marshal parameters by value.
    OutOfProcess { runtime: PathBuf },
}

/// Everything resolved and validated for one invocation, ready to submit.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub isolation: Isolation,
    pub request: WorkRequest,
}

/// The parameters crossing the isolation boundary, always by value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkRequest {
    #[serde(flatten)]
    pub operation: Operation,
    pub connection: ConnectionParameters,
    pub engine: String,
    pub configuration: EffectiveConfiguration,
}

/// Result of preparing an invocation from the merged configuration.
#[derive(Debug, Clone)]
pub enum Prepared {
    /// The operation needs migration scripts and there are none: a distinct
    /// outcome, not a success and not a failure.
    Skip { locations: LocationSet },
    Run(Invocation),
}

/// Classified result of one dispatched invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Outcome {
    Succeeded(ActionReport),
    NoApplicableWork,
    Failed(Failure),
}

/// A failure rendered safe to cross the isolation boundary: whatever the
/// original payload was, only its classification and message text survive, so
/// the receiving side can always print a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// The engine or database could not be reached.
    Connection,
    /// Applied scripts no longer match the schema history.
    Validation,
    /// The engine reported or raised any other failure.
    Engine,
    /// The isolation boundary itself broke: the worker died or produced no
    /// readable response.
    Boundary,
}

impl Failure {
    pub fn boundary(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Boundary,
            message: message.into(),
        }
    }
}

impl From<crate::engine::EngineError> for Failure {
    fn from(error: crate::engine::EngineError) -> Self {
        use crate::engine::EngineErrorKind;
        let kind = match error.kind {
            EngineErrorKind::Connection => FailureKind::Connection,
            EngineErrorKind::Validation => FailureKind::Validation,
            EngineErrorKind::General => FailureKind::Engine,
        };
        Self {
            kind,
            message: error.message,
        }
    }
}

/// Resolves one invocation from the merged configuration: skip rule first,
/// then the destructive-cleanup gate, then connection extraction and
/// isolation selection. Reserved tool-level keys are stripped here; the rest
/// of the map reaches the engine verbatim.
pub fn prepare(
    operation: Operation,
    mut configuration: EffectiveConfiguration,
    root_dir: &Path,
) -> Result<Prepared, ConfigError> {
    let locations = LocationSet::parse(
        configuration.get(LOCATIONS_KEY).unwrap_or_default(),
        root_dir,
    );

    // The skip probe runs before any validation: an operation with nothing to
    // do must short-circuit without touching url or connection state.
    if operation.needs_locations() && locations.has_no_scripts() {
        debug!(operation = operation.verb(), "no migration scripts found");
        return Ok(Prepared::Skip { locations });
    }

    if operation.is_destructive() && configuration.get(CLEAN_DISABLED_KEY) != Some("false") {
        return Err(ConfigError::CleanDisabled);
    }

    configuration.set(LOCATIONS_KEY, locations.descriptor());

    let target = configuration.take_nonempty(TARGET_KEY);
    let operation = match operation {
        Operation::Migrate { target: from_cli } => Operation::Migrate {
            target: from_cli.or(target),
        },
        other => other,
    };

    let connection = ConnectionParameters::extract(&mut configuration)?;
    let runtime = configuration.take_nonempty(RUNTIME_KEY).map(PathBuf::from);
    let engine = configuration
        .take_nonempty(ENGINE_KEY)
        .unwrap_or_else(|| DEFAULT_ENGINE.to_string());

    Ok(Prepared::Run(Invocation {
        isolation: select_isolation(runtime.as_deref()),
        request: WorkRequest {
            operation,
            connection,
            engine,
            configuration,
        },
    }))
}

/// Picks the isolation mode: a missing runtime, or one that resolves to the
/// executable already running, stays in-process; anything else is spawned.
pub fn select_isolation(runtime: Option<&Path>) -> Isolation {
    let Some(runtime) = runtime else {
        return Isolation::InProcess;
    };
    if is_current_runtime(runtime) {
        Isolation::InProcess
    } else {
        Isolation::OutOfProcess {
            runtime: runtime.to_path_buf(),
        }
    }
}

fn is_current_runtime(runtime: &Path) -> bool {
    let Ok(current) = std::env::current_exe() else {
        return false;
    };
    match (runtime.canonicalize(), current.canonicalize()) {
        (Ok(configured), Ok(current)) => configured == current,
        _ => runtime == current,
    }
}

/// Submits exactly one operation into the chosen execution context.
pub async fn dispatch(invocation: &Invocation) -> Outcome {
    match &invocation.isolation {
        Isolation::InProcess => {
            debug!(
                operation = invocation.request.operation.verb(),
                "dispatching in-process"
            );
            worker::execute(&invocation.request).await
        }
        Isolation::OutOfProcess { runtime } => {
            debug!(
                operation = invocation.request.operation.verb(),
                runtime = %runtime.display(),
                "dispatching to worker runtime"
            );
            worker::execute_remote(runtime, &invocation.request).await
        }
    }
}
