/*============================================================
  Helmport Project: Helm-Up
  Module: helmup_core::catalog
  Etiquette: Helmport Script Etiquette — Rust Profile v1.1
  ------------------------------------------------------------
  Purpose:
    Query the release catalog service for the published versions
    of the console package.

  Security / Safety Notes:
    Performs read-only HTTPS requests to the catalog API. No
    credentials are transmitted.

  Dependencies:
    reqwest for HTTP, serde for response parsing.

  Operational Scope:
    Supplies the candidate version list consumed by the update
    comparator; fetched once per session and cached.

  Revision History:
    2025-05-14 KSL  Implemented asynchronous catalog client.
  ------------------------------------------------------------
  HSE Principles Observed:
    - Bounded retries with exponential backoff
    - Structured response parsing with explicit error paths
    - Configurable timeouts
============================================================*/

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use tokio::time::sleep;
use urlencoding::encode;

use crate::config::CatalogConfig;
use crate::error::{HelmupError, Result};
use crate::version::CatalogEntry;

/// Client for the release catalog service.
#[derive(Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
    package_name: String,
    max_retries: usize,
}

impl CatalogClient {
    /// Construct a new client from configuration.
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent("Helm-Up-Core/0.4 (console-update)")
            .build()
            .map_err(|err| HelmupError::Network(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            package_name: config.package_name.clone(),
            max_retries: config.max_retries.max(1),
        })
    }

    fn versions_url(&self) -> String {
        format!(
            "{}/package/{}/versions",
            self.base_url,
            encode(&self.package_name)
        )
    }

    /// Fetch the published versions of the console package.
    ///
    /// The catalog emits a map of version to revision; order is
    /// irrelevant here, the comparator re-sorts candidates.
    pub async fn fetch_versions(&self) -> Result<Vec<CatalogEntry>> {
        let url = self.versions_url();
        let mut attempt = 0;
        loop {
            let response = self.client.get(&url).send().await.map_err(|err| {
                HelmupError::Network(format!("Catalog request to {url} failed: {err}"))
            })?;

            if response.status() == StatusCode::OK {
                let payload = response.json::<CatalogResponse>().await.map_err(|err| {
                    HelmupError::Serialization(format!(
                        "Failed to decode catalog response: {err}"
                    ))
                })?;
                let entries = payload
                    .results
                    .into_iter()
                    .map(|(version, revision)| CatalogEntry { version, revision })
                    .collect();
                return Ok(entries);
            }

            attempt += 1;
            if attempt >= self.max_retries {
                return Err(HelmupError::Network(format!(
                    "Catalog request {url} failed with status {} after {attempt} attempts",
                    response.status()
                )));
            }
            let exponent = (attempt as u32).min(8);
            let backoff = Duration::from_millis(200_u64.saturating_mul(1_u64 << exponent));
            sleep(backoff).await;
        }
    }
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    results: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> CatalogConfig {
        CatalogConfig {
            base_url,
            package_name: "helm-console-ui".to_string(),
            timeout: 5,
            max_retries: 2,
        }
    }

    #[tokio::test]
    async fn decodes_version_map_into_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/package/helm-console-ui/versions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": { "2.0.0": "1", "1.5.0": "0" }
            })))
            .mount(&server)
            .await;

        let client = CatalogClient::new(&config(server.uri())).unwrap();
        let entries = client.fetch_versions().await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.contains(&CatalogEntry {
            version: "2.0.0".to_string(),
            revision: "1".to_string(),
        }));
    }

    #[tokio::test]
    async fn surfaces_exhausted_retries_as_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/package/helm-console-ui/versions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = CatalogClient::new(&config(server.uri())).unwrap();
        let result = client.fetch_versions().await;
        assert!(matches!(result, Err(HelmupError::Network(_))));
    }
}
