/*============================================================
  Helmport Project: Helm-Up
  Module: helmup_core::future
  Etiquette: Helmport Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Provide scaffolding for Helm-Up-Core roadmap features such
    as release-note retrieval, scheduled update windows, and
    operator notification backends.

  Security / Safety Notes:
    No operational code is executed; this module documents
    planned extension points to guide safe implementations.

  Dependencies:
    None at runtime; placeholder traits only.

  Operational Scope:
    Referenced by developers when implementing Helm-Up v2+.

  Revision History:
    2025-05-15 KSL  Added future expansion scaffolding.
  ------------------------------------------------------------
  HSE Principles Observed:
    - Explicit documentation of deferred capabilities
    - Clearly fenced placeholders to avoid accidental use
============================================================*/

#![allow(dead_code)]

/// Planned hook for release-note providers.
pub trait ReleaseNoteProvider {
    /// Fetch release notes for the given console version.
    fn fetch_notes(&self, version: &str) -> Vec<String>;
}

/// Planned hook for scheduled update windows.
pub trait UpdateScheduler {
    /// Report whether an update may start right now.
    fn window_open(&self) -> bool;
}

/// Planned hook for operator notification backends.
pub trait NotificationBackend {
    /// Deliver a terminal action notice to the operator channel.
    fn notify(&self, message: &str);
}

/// Extension registration entry point. Currently a stub.
pub fn register_extension<T>(_extension: T)
where
    T: ReleaseNoteProvider + UpdateScheduler + NotificationBackend + Send + Sync + 'static,
{
    // Placeholder: dynamic extension registry lands in Helm-Up v2.
}
