//! 分類処理の型定義
//!
//! CLIとライブラリで共有される型:
//! - ProductDescriptor: 分類対象の商品情報（入力）
//! - CatalogEntry / TriggerTerm: カタログ（参照データ）
//! - Candidate: スコア付きの候補コード
//! - PredictionResult: 最終出力

use serde::{Deserialize, Serialize};

/// 分類対象の商品情報
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductDescriptor {
    pub title: String,
    pub description: String,
    /// カテゴリのヒント（自由記述）
    pub category: String,
    /// 素材のヒント（自由記述）
    pub materials: String,
    pub has_image: bool,
}

impl ProductDescriptor {
    /// タイトルと説明の両方が空（空白のみを含む）か
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.description.trim().is_empty()
    }

    /// タイトル+説明（照合・審査ルールの対象テキスト）
    pub fn search_text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }

    /// 全フィールドを連結したテキスト（フォールバック判定用）
    pub fn full_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.title, self.description, self.category, self.materials
        )
    }
}

/// トリガー語の重み区分
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeightClass {
    /// 「それが何か」を表す語（mug, wallet, shirt）
    ProductType,
    Material,
    Category,
    General,
}

/// カタログエントリのトリガー語
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerTerm {
    pub term: String,
    pub weight_class: WeightClass,
}

impl TriggerTerm {
    pub fn new(term: impl Into<String>, weight_class: WeightClass) -> Self {
        Self {
            term: term.into(),
            weight_class,
        }
    }
}

/// カタログエントリ（起動時に読み込み、以後は読み取り専用）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub code: String,
    pub description: String,
    pub category: String,
    pub trigger_terms: Vec<TriggerTerm>,
    #[serde(default)]
    pub tariff_rate_hint: String,
}

/// 候補の出所
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CandidateSource {
    LocalKeyword,
    #[serde(rename = "semanticAI")]
    SemanticAi,
    OfficialRegistry,
    ImageAnalysis,
    Fallback,
}

impl std::fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateSource::LocalKeyword => write!(f, "local keyword"),
            CandidateSource::SemanticAi => write!(f, "semantic AI"),
            CandidateSource::OfficialRegistry => write!(f, "official registry"),
            CandidateSource::ImageAnalysis => write!(f, "image analysis"),
            CandidateSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// スコア付きの候補コード
///
/// `confidence` は常に 0〜100 スケール。
/// 別スケールの協調先は境界で [`ConfidenceScale::normalize`] を通すこと。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub code: String,
    pub description: String,
    pub confidence: f64,
    pub category: String,
    pub source: CandidateSource,
    #[serde(default)]
    pub is_officially_validated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tariff_rate_hint: Option<String>,
    /// 判定根拠の履歴
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasoning: Vec<String>,
}

impl Candidate {
    pub fn new(
        code: impl Into<String>,
        description: impl Into<String>,
        confidence: f64,
        category: impl Into<String>,
        source: CandidateSource,
    ) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            confidence,
            category: category.into(),
            source,
            is_officially_validated: false,
            tariff_rate_hint: None,
            reasoning: Vec::new(),
        }
    }

    pub fn with_reasoning(mut self, reason: impl Into<String>) -> Self {
        self.reasoning.push(reason.into());
        self
    }
}

/// 協調先が報告する信頼度のスケール
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceScale {
    /// 0〜100
    Percent,
    /// 0〜1
    Unit,
}

impl ConfidenceScale {
    /// 0〜100 スケールに変換する
    ///
    /// 宣言されたスケールの範囲外・非有限値は `None`（不正エントリとして破棄）。
    pub fn normalize(self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        match self {
            ConfidenceScale::Percent if (0.0..=100.0).contains(&value) => Some(value),
            ConfidenceScale::Unit if (0.0..=1.0).contains(&value) => Some(value * 100.0),
            _ => None,
        }
    }
}

/// 審査要否の判定結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDecision {
    pub needs_review: bool,
    pub reasons: Vec<String>,
}

impl ReviewDecision {
    pub fn from_reasons(reasons: Vec<String>) -> Self {
        Self {
            needs_review: !reasons.is_empty(),
            reasons,
        }
    }
}

/// 分類の最終出力（構築後は不変）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    candidates: Vec<Candidate>,
    overall_confidence: f64,
    needs_human_review: bool,
    review_reasons: Vec<String>,
}

impl PredictionResult {
    pub fn new(candidates: Vec<Candidate>, overall_confidence: f64, review: ReviewDecision) -> Self {
        Self {
            candidates,
            overall_confidence,
            needs_human_review: !review.reasons.is_empty(),
            review_reasons: review.reasons,
        }
    }

    /// 信頼度の降順、コード重複なし
    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn top(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    pub fn overall_confidence(&self) -> f64 {
        self.overall_confidence
    }

    pub fn needs_human_review(&self) -> bool {
        self.needs_human_review
    }

    pub fn review_reasons(&self) -> &[String] {
        &self.review_reasons
    }
}
