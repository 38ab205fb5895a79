//! 分類のオーケストレーション
//!
//! 1. キーワード照合（同期・I/Oなし）
//! 2. 意味照合・公式レジストリ・画像解析を並行実行（個別にタイムアウト）
//! 3. 候補統合 → 全体信頼度 → 要確認判定
//!
//! 協調先の失敗・タイムアウトは「寄与なし」として続行する。
//! 返された Future を破棄すれば実行中の呼び出しもすべて中断される。

use crate::collaborators::{
    AiCliSemanticMatcher, GeminiImageAnalyzer, ImageAnalyzer, RegistryLookup, SemanticMatcher,
    UsitcRegistryLookup,
};
use crate::config::Config;
use crate::error::{ClassifierError, Result};
use hts_common::collaborator::MAX_SEMANTIC_CODES;
use hts_common::{
    assemble, checked_image_findings, checked_registry_matches, image_candidates,
    match_keywords, rank_codes, semantic_candidates, Catalog, PredictionResult,
    ProductDescriptor, Sources,
};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// 公式レジストリ検索に使う語数の上限
const REGISTRY_QUERY_WORDS: usize = 8;

pub struct Classifier {
    catalog: Arc<Catalog>,
    semantic: Option<Arc<dyn SemanticMatcher>>,
    registry: Option<Arc<dyn RegistryLookup>>,
    image_analyzer: Option<Arc<dyn ImageAnalyzer>>,
    timeout: Duration,
}

impl Classifier {
    /// 協調先なし（キーワード照合とフォールバックのみ）
    pub fn offline(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            semantic: None,
            registry: None,
            image_analyzer: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_semantic(mut self, semantic: Arc<dyn SemanticMatcher>) -> Self {
        self.semantic = Some(semantic);
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn RegistryLookup>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_image_analyzer(mut self, analyzer: Arc<dyn ImageAnalyzer>) -> Self {
        self.image_analyzer = Some(analyzer);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// 設定から協調先を組み立てる
    ///
    /// 画像解析はAPIキーがある場合のみ有効。
    pub fn from_config(config: &Config, catalog: Arc<Catalog>) -> Result<Self> {
        let timeout = config.collaborator_timeout();
        let mut classifier = Self::offline(catalog.clone()).with_timeout(timeout);

        if config.semantic_enabled {
            classifier = classifier.with_semantic(Arc::new(AiCliSemanticMatcher::new(
                config.semantic_provider,
                catalog,
            )));
        }

        if config.registry_enabled {
            classifier = classifier.with_registry(Arc::new(UsitcRegistryLookup::new(
                config.registry_base_url.clone(),
                config.registry_max_results,
                timeout,
            )?));
        }

        match config.get_gemini_api_key() {
            Ok(key) => {
                classifier = classifier.with_image_analyzer(Arc::new(GeminiImageAnalyzer::new(
                    key,
                    config.image_model.clone(),
                    config.max_image_size,
                    timeout,
                )?));
            }
            Err(ClassifierError::MissingApiKey) => {
                tracing::debug!("no Gemini API key, image analysis disabled");
            }
            Err(e) => return Err(e),
        }

        Ok(classifier)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// 分類結果を左右する構成の識別子（有効な協調先 + カタログ内容のハッシュ）
    ///
    /// キャッシュキーに含める。
    pub fn profile(&self) -> String {
        let mut hasher = Sha256::new();
        for entry in self.catalog.entries() {
            // Serialize の derive なので失敗しない
            if let Ok(bytes) = serde_json::to_vec(entry) {
                hasher.update(bytes);
            }
        }
        let catalog_hash = hex::encode(hasher.finalize());

        format!(
            "semantic={};registry={};image={};catalog={}",
            self.semantic.as_ref().map(|s| s.name()).unwrap_or("-"),
            self.registry.as_ref().map(|r| r.name()).unwrap_or("-"),
            self.image_analyzer.as_ref().map(|a| a.name()).unwrap_or("-"),
            &catalog_hash[..16],
        )
    }

    /// 商品情報を分類する
    ///
    /// タイトルと説明が両方空の場合のみエラー。それ以外は必ず結果を返す。
    pub async fn classify(
        &self,
        descriptor: &ProductDescriptor,
        image: Option<&[u8]>,
    ) -> Result<PredictionResult> {
        if descriptor.is_blank() {
            return Err(ClassifierError::InvalidDescriptor);
        }

        let local = match_keywords(&self.catalog, descriptor);
        tracing::debug!(local = local.len(), "keyword matching finished");

        let codes = semantic_candidate_codes(&self.catalog, descriptor, &local);
        let query = registry_query(descriptor);

        let semantic_call = async {
            match &self.semantic {
                Some(s) => guarded(s.name(), self.timeout, s.rank(descriptor, &codes)).await,
                None => None,
            }
        };
        let registry_call = async {
            match &self.registry {
                Some(r) => guarded(r.name(), self.timeout, r.search(&query)).await,
                None => None,
            }
        };
        let image_call = async {
            match (&self.image_analyzer, image) {
                (Some(a), Some(bytes)) => guarded(a.name(), self.timeout, a.analyze(bytes)).await,
                _ => None,
            }
        };

        let (semantic, official, findings) = tokio::join!(semantic_call, registry_call, image_call);

        let semantic = semantic
            .map(|m| semantic_candidates(&m, &self.catalog, &local))
            .unwrap_or_default();
        let official = official.map(checked_registry_matches).unwrap_or_default();
        let findings = findings.and_then(checked_image_findings);
        let from_image = findings
            .as_ref()
            .map(|f| image_candidates(f, &self.catalog))
            .unwrap_or_default();

        let sources = Sources {
            local: &local,
            semantic: &semantic,
            official: &official,
            image_candidates: &from_image,
            image: findings.as_ref(),
        };
        let result = assemble(&sources, descriptor);

        tracing::info!(
            top = result.top().map(|c| c.code.as_str()).unwrap_or(""),
            overall = result.overall_confidence(),
            needs_review = result.needs_human_review(),
            semantic = semantic.len(),
            official = official.len(),
            image = findings.is_some(),
            "classification finished"
        );

        Ok(result)
    }
}

/// 協調先呼び出しをタイムアウト付きで実行し、失敗は None にする
async fn guarded<T, F>(name: &'static str, timeout: Duration, call: F) -> Option<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) if e.is_source_failure() => {
            tracing::warn!(source = name, error = %e, "collaborator failed, continuing without it");
            None
        }
        // 画像読み込みなど協調先以外の失敗は設定や入力の問題
        Ok(Err(e)) => {
            tracing::error!(source = name, error = %e, "collaborator call could not be made, continuing without it");
            None
        }
        Err(_) => {
            tracing::warn!(source = name, ?timeout, "collaborator timed out, continuing without it");
            None
        }
    }
}

/// 意味照合に渡す候補コード（キーワード照合の結果 → 生スコア順で補充、最大10件）
pub fn semantic_candidate_codes(
    catalog: &Catalog,
    descriptor: &ProductDescriptor,
    local: &[hts_common::Candidate],
) -> Vec<String> {
    let mut codes: Vec<String> = local.iter().map(|c| c.code.clone()).collect();
    for code in rank_codes(catalog, descriptor, MAX_SEMANTIC_CODES) {
        if codes.len() >= MAX_SEMANTIC_CODES {
            break;
        }
        if !codes.contains(&code) {
            codes.push(code);
        }
    }
    codes.truncate(MAX_SEMANTIC_CODES);
    codes
}

/// 公式レジストリの検索語（タイトル優先、なければ説明の先頭）
pub fn registry_query(descriptor: &ProductDescriptor) -> String {
    let source = if descriptor.title.trim().is_empty() {
        &descriptor.description
    } else {
        &descriptor.title
    };
    source
        .split_whitespace()
        .take(REGISTRY_QUERY_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}
