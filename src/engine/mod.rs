pub mod exec;

pub use exec::ExecEngine;

use crate::config::{ConnectionParameters, EffectiveConfiguration};
use serde::{Deserialize, Serialize};

/// The external migration engine, seen from this crate as a client factory.
/// flyrun never implements migration semantics itself; it builds a client
/// from connection parameters plus the effective configuration and makes
/// exactly one call per invocation.
#[allow(async_fn_in_trait)]
pub trait Engine {
    type Session: EngineSession;

    /// Constructs the engine client. This is the single blocking step of an
    /// invocation (connection setup, schema-history access).
    async fn connect(
        &self,
        connection: &ConnectionParameters,
        configuration: &EffectiveConfiguration,
    ) -> Result<Self::Session, EngineError>;
}

/// One connected engine client. Owned by exactly one invocation and closed
/// unconditionally when the operation returns or fails.
#[allow(async_fn_in_trait)]
pub trait EngineSession {
    /// Applies pending migrations in ascending version order, up to `target`
    /// when set. The report carries the engine's own success flag.
    async fn migrate(&mut self, target: Option<&str>) -> Result<MigrateReport, EngineError>;

    /// Reconciles the schema-history table with the discovered scripts.
    async fn repair(&mut self) -> Result<(), EngineError>;

    /// Drops all objects in the configured schemas.
    async fn clean(&mut self) -> Result<(), EngineError>;

    /// Releases the client and its connection.
    async fn close(&mut self) -> Result<(), EngineError>;
}

/// The engine's migrate report. `success` is the engine's verdict; a false
/// flag with a populated `error` is a reported failure, not a crashed call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrateReport {
    pub success: bool,
    pub migrations_executed: u64,
    pub error: Option<EngineError>,
}

/// An engine-level failure, reduced to a classification and rendered text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineErrorKind {
    /// The engine could not be reached or started.
    Connection,
    /// Applied scripts no longer match the schema history (checksum or
    /// resolution mismatch).
    Validation,
    /// Any other failure the engine reported or raised.
    General,
}

impl EngineError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self {
            kind: EngineErrorKind::Connection,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: EngineErrorKind::Validation,
            message: message.into(),
        }
    }

    pub fn general(message: impl Into<String>) -> Self {
        Self {
            kind: EngineErrorKind::General,
            message: message.into(),
        }
    }
}
