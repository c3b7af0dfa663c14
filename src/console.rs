/*============================================================
  Helmport Project: Helm-Up
  Module: helmup_core::console
  Etiquette: Helmport Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Talk to the console update service: read build metadata and
    issue update/rollback mutations.

  Security / Safety Notes:
    Mutations are never retried; a replayed update could race a
    server-side switchover already in progress.

  Dependencies:
    reqwest for HTTP, serde/serde_json for payloads.

  Operational Scope:
    Metadata reads feed the panel reducer; mutation results feed
    the action tracker as completion tokens or error messages.

  Revision History:
    2025-05-14 KSL  Authored console service client.
    2025-08-25 KSL  Mutation failures use the bare-message variant.
  ------------------------------------------------------------
  HSE Principles Observed:
    - Reads retried with backoff, writes dispatched exactly once
    - Service error messages surfaced verbatim to the operator
    - Configurable timeouts
============================================================*/

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;

use crate::config::ConsoleConfig;
use crate::error::{HelmupError, Result};
use crate::version::UiMetadata;

/// Client for the console update service.
#[derive(Clone)]
pub struct ConsoleClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: usize,
}

#[derive(Debug, Serialize)]
struct UpdateRequest<'a> {
    #[serde(rename = "newVersion")]
    new_version: &'a str,
}

#[derive(Debug, Deserialize)]
struct MutationResponse {
    result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    message: Option<String>,
}

impl ConsoleClient {
    /// Construct a new client from configuration.
    pub fn new(config: &ConsoleConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent("Helm-Up-Core/0.4 (console-update)")
            .build()
            .map_err(|err| HelmupError::Network(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries.max(1),
        })
    }

    /// Read build metadata for the running console.
    ///
    /// Callers substitute [`UiMetadata::fallback`] on failure; this
    /// method itself reports transport problems faithfully.
    pub async fn fetch_metadata(&self) -> Result<UiMetadata> {
        let url = format!("{}/api/v1/ui/metadata", self.base_url);
        let mut attempt = 0;
        loop {
            let response = self.client.get(&url).send().await.map_err(|err| {
                HelmupError::Network(format!("Metadata request to {url} failed: {err}"))
            })?;

            if response.status() == StatusCode::OK {
                return response.json::<UiMetadata>().await.map_err(|err| {
                    HelmupError::Serialization(format!(
                        "Failed to decode metadata response: {err}"
                    ))
                });
            }

            attempt += 1;
            if attempt >= self.max_retries {
                return Err(HelmupError::Network(format!(
                    "Metadata request {url} failed with status {} after {attempt} attempts",
                    response.status()
                )));
            }
            let exponent = (attempt as u32).min(8);
            let backoff = Duration::from_millis(200_u64.saturating_mul(1_u64 << exponent));
            sleep(backoff).await;
        }
    }

    /// Ask the console to switch to `version`.
    ///
    /// Returns the opaque completion token, or `None` when the
    /// service acknowledged without producing one.
    pub async fn update(&self, version: &str) -> Result<Option<String>> {
        let url = format!("{}/api/v1/ui/update", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&UpdateRequest {
                new_version: version,
            })
            .send()
            .await
            .map_err(|err| HelmupError::Mutation(format!("Update request failed: {err}")))?;
        Self::decode_mutation(response, "update").await
    }

    /// Ask the console to roll back to its bundled version.
    pub async fn rollback(&self) -> Result<Option<String>> {
        let url = format!("{}/api/v1/ui/rollback", self.base_url);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|err| HelmupError::Mutation(format!("Rollback request failed: {err}")))?;
        Self::decode_mutation(response, "rollback").await
    }

    async fn decode_mutation(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<Option<String>> {
        let status = response.status();
        if status.is_success() {
            let payload = response
                .json::<MutationResponse>()
                .await
                .unwrap_or(MutationResponse { result: None });
            return Ok(payload.result.filter(|token| !token.is_empty()));
        }

        // Prefer the service's own message over the bare status line.
        // Mutation errors display without a taxonomy prefix; the
        // action state stores this message verbatim.
        let message = response
            .json::<ServiceError>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| format!("{operation} failed with status {status}"));
        Err(HelmupError::Mutation(message))
    }
}
