//! AI CLI連携（意味照合）
//!
//! Claude / Codex / Gemini の CLI を非対話モードで起動し、
//! 候補コードごとの信頼度を JSON で受け取る。

use super::SemanticMatcher;
use crate::ai_provider::AiProvider;
use crate::error::{ClassifierError, Result};
use async_trait::async_trait;
use hts_common::{build_semantic_prompt, parse_semantic_response, Catalog, ProductDescriptor, SemanticMatch};
use std::sync::Arc;
use tokio::process::Command;

pub struct AiCliSemanticMatcher {
    provider: AiProvider,
    catalog: Arc<Catalog>,
}

impl AiCliSemanticMatcher {
    pub fn new(provider: AiProvider, catalog: Arc<Catalog>) -> Self {
        Self { provider, catalog }
    }

    async fn run_cli(&self, prompt: &str) -> Result<String> {
        let args = self.provider.prompt_args(prompt);

        // Windowsではcmd /c経由
        #[cfg(windows)]
        let mut command = {
            let mut c = Command::new("cmd");
            c.arg("/c").arg(self.provider.command_name()).args(&args);
            c
        };

        #[cfg(not(windows))]
        let mut command = {
            let mut c = Command::new(self.provider.command_name());
            c.args(&args);
            c
        };

        // 呼び出し元が中断したら子プロセスも終了させる
        let output = command
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| ClassifierError::CliExecution(format!("{} 実行エラー: {}", self.provider.command_name(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClassifierError::SourceUnavailable {
                source_name: "semantic matcher",
                reason: format!(
                    "{} failed (code {:?}): {}",
                    self.provider.command_name(),
                    output.status.code(),
                    stderr.trim()
                ),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[async_trait]
impl SemanticMatcher for AiCliSemanticMatcher {
    fn name(&self) -> &'static str {
        self.provider.command_name()
    }

    async fn rank(
        &self,
        descriptor: &ProductDescriptor,
        candidate_codes: &[String],
    ) -> Result<Vec<SemanticMatch>> {
        let prompt = build_semantic_prompt(descriptor, candidate_codes, &self.catalog);
        tracing::debug!(provider = ?self.provider, prompt_len = prompt.len(), "running semantic matcher");

        let response = self.run_cli(&prompt).await?;
        tracing::debug!(response_len = response.len(), "semantic matcher responded");

        parse_semantic_response(&response).map_err(|e| ClassifierError::MalformedResponse {
            source_name: "semantic matcher",
            reason: e.to_string(),
        })
    }
}
