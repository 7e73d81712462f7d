//! Error taxonomy.
//!
//! Structural problems in the configured hierarchy are [`ConfigurationError`]s
//! and abort the configuration pass. Failed register accesses are
//! [`TransportError`]s; the fault monitors absorb them, configuration actions
//! propagate them. Hardware-reported faults are not errors at all, see
//! [`crate::fault::FaultRecord`].

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("invalid chassis number: {0}")]
    InvalidChassisNumber(u32),

    #[error("duplicate chassis number: {0}")]
    DuplicateChassisNumber(u32),

    #[error("duplicate id: {0}")]
    DuplicateId(String),

    #[error("unable to find {kind} with id \"{id}\"")]
    UnresolvedId { kind: &'static str, id: String },

    #[error("no volts value defined for {0}")]
    MissingVolts(String),

    #[error("invalid configuration document: {0}")]
    Document(String),
}

impl ConfigurationError {
    pub(crate) fn unresolved(kind: &'static str, id: &str) -> Self {
        Self::UnresolvedId {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<serde_json::Error> for ConfigurationError {
    fn from(e: serde_json::Error) -> Self {
        Self::Document(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("failed to read {command}: {reason}")]
    Read { command: String, reason: String },

    #[error("failed to write {command}: {reason}")]
    Write { command: String, reason: String },

    #[error("{command} verification failed: wrote {written:#06x}, read back {read:#06x}")]
    VerifyMismatch {
        command: String,
        written: u16,
        read: u16,
    },
}

impl TransportError {
    pub fn read(command: &str, reason: impl Into<String>) -> Self {
        Self::Read {
            command: command.to_string(),
            reason: reason.into(),
        }
    }

    pub fn write(command: &str, reason: impl Into<String>) -> Self {
        Self::Write {
            command: command.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("maximum rule depth exceeded by rule {0}")]
    RuleDepthExceeded(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MonitorError {
    #[error("monitor {monitor}: {reason}")]
    Failed { monitor: String, reason: String },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Top-level error returned by the configuration and monitoring entry points.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("unable to configure {entity}: {source}")]
    Configure {
        entity: String,
        #[source]
        source: ActionError,
    },

    #[error("monitor error: {0}")]
    Monitor(#[from] MonitorError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
