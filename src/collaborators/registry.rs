//! 公式関税表（USITC HTS REST API）の検索
//!
//! `GET {base}/search?keyword=...` の結果（htsno / description / general）を
//! RegistryMatch に変換する。見出し行（コードなし）は除外。

use super::RegistryLookup;
use crate::error::{ClassifierError, Result};
use async_trait::async_trait;
use hts_common::{parse_registry_response, RegistryMatch};
use std::time::Duration;

pub struct UsitcRegistryLookup {
    client: reqwest::Client,
    base_url: String,
    max_results: usize,
}

impl UsitcRegistryLookup {
    pub fn new(base_url: impl Into<String>, max_results: usize, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_results,
        })
    }
}

#[async_trait]
impl RegistryLookup for UsitcRegistryLookup {
    async fn search(&self, query: &str) -> Result<Vec<RegistryMatch>> {
        let url = format!("{}/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("keyword", query)])
            .send()
            .await
            .map_err(|e| ClassifierError::SourceUnavailable {
                source_name: "official registry",
                reason: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::SourceUnavailable {
                source_name: "official registry",
                reason: format!("HTTP {}", status),
            });
        }

        let body = response.text().await.map_err(|e| ClassifierError::SourceUnavailable {
            source_name: "official registry",
            reason: e.without_url().to_string(),
        })?;
        let mut matches = parse_registry_response(&body).map_err(|e| {
            ClassifierError::MalformedResponse {
                source_name: "official registry",
                reason: e.to_string(),
            }
        })?;

        tracing::debug!(query, hits = matches.len(), "registry lookup finished");
        matches.truncate(self.max_results);
        Ok(matches)
    }
}
