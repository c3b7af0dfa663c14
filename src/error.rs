/*============================================================
  Helmport Project: Helm-Up
  Module: helmup_core::error
  Etiquette: Helmport Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Centralise Helm-Up-Core error types to provide consistent
    diagnostics and exit semantics.

  Security / Safety Notes:
    Error contexts never embed request bodies or completion
    tokens; only endpoint paths and status codes are surfaced.

  Dependencies:
    thiserror for ergonomic error definitions.

  Operational Scope:
    Used across modules to propagate recoverable failures and
    consolidate exit codes for the binary entry point.

  Revision History:
    2025-05-12 KSL  Established shared error definitions.
    2025-08-25 KSL  Mutation failures carry the bare message.
  ------------------------------------------------------------
  HSE Principles Observed:
    - Explicit error taxonomy with actionable context
    - No silent failure paths
    - Stable exit codes for operational tooling
============================================================*/

use std::io;
use std::process::ExitCode;

use thiserror::Error;

/// Result alias for Helm-Up-Core operations.
pub type Result<T> = std::result::Result<T, HelmupError>;

/// Enumerates high-level error domains surfaced by Helm-Up-Core.
#[derive(Debug, Error)]
pub enum HelmupError {
    #[error("An action is already in flight ({current}); wait for it to settle")]
    ActionInFlight { current: String },
    #[error("Configuration: {0}")]
    Config(String),
    #[error("Network: {0}")]
    Network(String),
    /// Failed update/rollback mutation. Displays without a taxonomy
    /// prefix: the message becomes the action state value verbatim.
    #[error("{0}")]
    Mutation(String),
    #[error("Serialization: {0}")]
    Serialization(String),
    #[error("Filesystem: {0}")]
    Filesystem(String),
    #[error("Runtime: {0}")]
    Runtime(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl HelmupError {
    /// Map error category to a deterministic exit code.
    pub fn exit_code(&self) -> ExitCode {
        match self {
            HelmupError::ActionInFlight { .. } => ExitCode::from(12),
            HelmupError::Config(_) => ExitCode::from(20),
            HelmupError::Network(_) => ExitCode::from(30),
            HelmupError::Mutation(_) => ExitCode::from(32),
            HelmupError::Serialization(_) => ExitCode::from(31),
            HelmupError::Filesystem(_) => ExitCode::from(40),
            HelmupError::Runtime(_) => ExitCode::from(50),
            HelmupError::Io(_) => ExitCode::from(41),
        }
    }
}
