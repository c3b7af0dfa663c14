/*============================================================
  Helmport Project: Helm-Up
  Module: helmup_core::panel
  Etiquette: Helmport Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Combine the release catalog, console metadata, and action
    state into the update panel view-model, and drive actions
    while reporting their transitions.

  Security / Safety Notes:
    The panel degrades on query failure; it never aborts the
    session over a transport error.

  Dependencies:
    Catalog and console clients, the action tracker, and the
    pure comparator from helmup_core::version.

  Operational Scope:
    One controller per session. The catalog is fetched once and
    cached; metadata is re-fetched after every terminal action.

  Revision History:
    2025-05-15 KSL  Authored panel reducer and controller.
  ------------------------------------------------------------
  HSE Principles Observed:
    - State merge isolated in a pure reducer
    - Loading and fallback views instead of hard failures
    - Cross-kind actions conservatively disable controls
============================================================*/

use std::fmt;
use std::future::Future;

use crate::action::{ActionKind, ActionPhase, ActionState, ActionTracker};
use crate::catalog::CatalogClient;
use crate::console::ConsoleClient;
use crate::error::Result;
use crate::logger::Logger;
use crate::version::{coerce, find_available_update, CatalogEntry, FormattedVersion, UiMetadata};

/// Affordance of a single panel control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlState {
    pub enabled: bool,
    pub label: String,
}

impl ControlState {
    fn active(label: &str) -> Self {
        Self {
            enabled: true,
            label: label.to_string(),
        }
    }

    fn held(label: &str) -> Self {
        Self {
            enabled: false,
            label: label.to_string(),
        }
    }
}

/// Row describing the installed console build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledRow {
    pub display_version: String,
    /// Set when the server already runs a different build than the
    /// client loaded; a page refresh would pick it up.
    pub refresh_hint: Option<String>,
    pub rollback: ControlState,
}

/// Row describing the highest compatible update, when one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableRow {
    /// Raw catalog version string, the value passed to an update start.
    pub version: String,
    pub display_version: String,
    pub update: ControlState,
}

/// Renderable state of the update panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelView {
    /// Emitted before the queries settle.
    Loading,
    /// Degraded view seeded from the locally known build only.
    Fallback { client_build: String },
    Ready {
        installed: InstalledRow,
        available: Option<AvailableRow>,
    },
}

/// Pure reducer merging the three panel inputs into a view-model.
/// Missing inputs yield the loading placeholder.
pub fn combine(
    catalog: Option<&[CatalogEntry]>,
    metadata: Option<&UiMetadata>,
    action: &ActionState,
) -> PanelView {
    let (Some(catalog), Some(metadata)) = (catalog, metadata) else {
        return PanelView::Loading;
    };

    let installed = InstalledRow {
        display_version: installed_display(metadata),
        refresh_hint: refresh_hint(metadata),
        rollback: rollback_control(action),
    };
    let available = find_available_update(catalog, metadata).map(|candidate| AvailableRow {
        display_version: candidate.display_string(),
        version: candidate.version,
        update: update_control(action),
    });

    PanelView::Ready {
        installed,
        available,
    }
}

fn installed_display(metadata: &UiMetadata) -> String {
    match coerce(&metadata.client_build) {
        Some(parsed) => parsed.to_string(),
        None => metadata.client_build.clone(),
    }
}

fn refresh_hint(metadata: &UiMetadata) -> Option<String> {
    let client = coerce(&metadata.client_build)?;
    let server = coerce(metadata.server_build.as_deref()?)?;
    if client != server {
        Some(server.to_string())
    } else {
        None
    }
}

fn update_control(action: &ActionState) -> ControlState {
    match (action.kind, action.phase) {
        (ActionKind::Update, ActionPhase::Started) => ControlState::held("Updating..."),
        (ActionKind::Update, ActionPhase::Completed) => ControlState::held("Update Complete"),
        (ActionKind::Update, ActionPhase::Error) => ControlState::held("Update Failed!"),
        // A rollback in flight holds the update control too.
        (ActionKind::Rollback, ActionPhase::Started) => ControlState::held("Start Update"),
        _ => ControlState::active("Start Update"),
    }
}

fn rollback_control(action: &ActionState) -> ControlState {
    match (action.kind, action.phase) {
        (ActionKind::Rollback, ActionPhase::Started) => ControlState::held("Rolling back..."),
        (ActionKind::Rollback, ActionPhase::Completed) => ControlState::held("Rollback Complete"),
        (ActionKind::Rollback, ActionPhase::Error) => ControlState::held("Rollback Failed!"),
        (ActionKind::Update, ActionPhase::Started) => ControlState::held("Rollback"),
        _ => ControlState::active("Rollback"),
    }
}

impl fmt::Display for PanelView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanelView::Loading => writeln!(f, "→ Loading console version details..."),
            PanelView::Fallback { client_build } => {
                writeln!(f, "→ Installed Version: {client_build} (local fallback)")
            }
            PanelView::Ready {
                installed,
                available,
            } => {
                writeln!(
                    f,
                    "→ Installed Version: {} {}",
                    installed.display_version,
                    render_control(&installed.rollback)
                )?;
                if let Some(server) = &installed.refresh_hint {
                    writeln!(f, "→ Refresh page to load: {server}")?;
                }
                match available {
                    Some(row) => writeln!(
                        f,
                        "→ Available Version: {} (New) {}",
                        row.display_version,
                        render_control(&row.update)
                    ),
                    None => writeln!(f, "→ No compatible update available"),
                }
            }
        }
    }
}

fn render_control(control: &ControlState) -> String {
    if control.enabled {
        format!("[{}]", control.label)
    } else {
        format!("({})", control.label)
    }
}

/// Session-scoped controller binding queries, tracker, and reducer.
pub struct PanelController {
    catalog: CatalogClient,
    console: ConsoleClient,
    tracker: ActionTracker,
    local_build: String,
    catalog_cache: Option<Vec<CatalogEntry>>,
    catalog_failed: bool,
    metadata: Option<UiMetadata>,
}

impl PanelController {
    pub fn new(
        catalog: CatalogClient,
        console: ConsoleClient,
        tracker: ActionTracker,
        local_build: String,
    ) -> Self {
        Self {
            catalog,
            console,
            tracker,
            local_build,
            catalog_cache: None,
            catalog_failed: false,
            metadata: None,
        }
    }

    /// First emission plus the initial query round.
    pub async fn mount(&mut self, logger: &Logger) -> PanelView {
        logger.debug("PANEL", "Initial view: loading placeholder");
        self.refresh(logger).await
    }

    /// Fetch metadata (and the catalog, once) and rebuild the view.
    /// Query failures degrade; this never fails hard.
    pub async fn refresh(&mut self, logger: &Logger) -> PanelView {
        self.ensure_catalog(logger).await;

        match self.console.fetch_metadata().await {
            Ok(metadata) => {
                self.metadata = Some(metadata);
            }
            Err(err) => {
                logger.warn(
                    "METADATA",
                    format!("Substituting local fallback metadata: {err}"),
                );
                self.metadata = Some(UiMetadata::fallback(&self.local_build));
            }
        }
        self.view()
    }

    /// Rebuild the view from cached inputs and the latest action state.
    pub fn view(&self) -> PanelView {
        if self.catalog_failed {
            return PanelView::Fallback {
                client_build: self.local_build.clone(),
            };
        }
        combine(
            self.catalog_cache.as_deref(),
            self.metadata.as_ref(),
            &self.tracker.current(),
        )
    }

    /// Comparator verdict over the cached inputs.
    pub fn available_update(&self) -> Option<FormattedVersion> {
        find_available_update(self.catalog_cache.as_deref()?, self.metadata.as_ref()?)
    }

    /// Begin an update to `version`, report every transition, then
    /// re-query metadata and return the refreshed view.
    pub async fn run_update(&mut self, version: &str, logger: &Logger) -> Result<PanelView> {
        let console = self.console.clone();
        let target = version.to_string();
        let call = async move { console.update(&target).await };
        let tracker = self.tracker.clone();
        let run = tracker.run_update(version, call);
        self.drive(run, logger).await?;
        Ok(self.refresh(logger).await)
    }

    /// Begin a rollback; same reporting and refresh as updates.
    pub async fn run_rollback(&mut self, logger: &Logger) -> Result<PanelView> {
        let console = self.console.clone();
        let call = async move { console.rollback().await };
        let tracker = self.tracker.clone();
        let run = tracker.run_rollback(call);
        self.drive(run, logger).await?;
        Ok(self.refresh(logger).await)
    }

    async fn ensure_catalog(&mut self, logger: &Logger) {
        if self.catalog_cache.is_some() || self.catalog_failed {
            return;
        }
        match self.catalog.fetch_versions().await {
            Ok(entries) => {
                logger.info(
                    "CATALOG",
                    format!("Fetched {} published versions", entries.len()),
                );
                self.catalog_cache = Some(entries);
            }
            Err(err) => {
                logger.warn("CATALOG", format!("Degrading to fallback view: {err}"));
                self.catalog_failed = true;
            }
        }
    }

    async fn drive<F>(&self, run: F, logger: &Logger) -> Result<()>
    where
        F: Future<Output = Result<()>>,
    {
        let mut rx = self.tracker.subscribe();
        tokio::pin!(run);
        loop {
            tokio::select! {
                result = &mut run => {
                    // Report any transition still pending in the cell.
                    while rx.has_changed().unwrap_or(false) {
                        let state = rx.borrow_and_update().clone();
                        logger.info("ACTION", state.describe());
                    }
                    return result;
                }
                changed = rx.changed() => {
                    if changed.is_ok() {
                        let state = rx.borrow_and_update().clone();
                        logger.info("ACTION", state.describe());
                    }
                }
            }
        }
    }
}
