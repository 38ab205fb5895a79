//! 協調先（意味照合・公式レジストリ・画像解析）とのデータ交換型
//!
//! 協調先の応答はここで検証・正規化してから統合処理に渡す。
//! - 信頼度は協調先ごとに宣言されたスケールから 0〜100 に変換
//! - コード形式が不正なエントリ、範囲外の信頼度は破棄して警告ログ
//!
//! 1件の不正エントリで応答全体を捨てることはしない。

use crate::catalog::{is_valid_code, Catalog};
use crate::error::{Error, Result};
use crate::matcher::match_keywords;
use crate::parser::extract_json;
use crate::types::{Candidate, CandidateSource, ConfidenceScale, ProductDescriptor};
use serde::{Deserialize, Serialize};

/// 意味照合の信頼度スケール
pub const SEMANTIC_SCALE: ConfidenceScale = ConfidenceScale::Percent;
/// 画像解析の信頼度スケール
pub const IMAGE_SCALE: ConfidenceScale = ConfidenceScale::Unit;
/// 意味照合に渡す候補コードの上限
pub const MAX_SEMANTIC_CODES: usize = 10;

/// 意味照合の1件（信頼度は 0〜100 に正規化済み）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticMatch {
    pub code: String,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
}

/// 公式レジストリの1件（信頼度は持たない）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryMatch {
    #[serde(alias = "htsno")]
    pub code: String,
    pub description: String,
    pub category: String,
    #[serde(alias = "general")]
    pub tariff_rate_hint: String,
}

/// 画像解析の結果（信頼度は 0〜100 に正規化済み）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageFindings {
    pub materials: Vec<String>,
    pub product_type: String,
    pub confidence: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSemanticMatch {
    code: String,
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawImageFindings {
    #[serde(default)]
    materials: Vec<String>,
    #[serde(default)]
    product_type: String,
    confidence: f64,
}

/// JSON配列を要素ごとに取り出す（配列でなければエラー）
fn parse_array(json: &str, source: &str) -> Result<Vec<serde_json::Value>> {
    match serde_json::from_str::<serde_json::Value>(json)? {
        serde_json::Value::Array(items) => Ok(items),
        other => Err(Error::Parse(format!(
            "{}: JSON配列ではありません: {}",
            source, other
        ))),
    }
}

/// 意味照合のレスポンスをパース
///
/// 不正なエントリは破棄する。JSONが見つからない場合のみエラー。
pub fn parse_semantic_response(response: &str) -> Result<Vec<SemanticMatch>> {
    let items = parse_array(extract_json(response)?, "semantic")?;

    let matches = items
        .into_iter()
        .filter_map(|item| {
            let raw: RawSemanticMatch = match serde_json::from_value(item) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(error = %e, "discarding malformed semantic entry");
                    return None;
                }
            };
            let code = raw.code.trim();
            if !is_valid_code(code) {
                tracing::warn!(code, "discarding semantic entry with invalid code");
                return None;
            }
            let Some(confidence) = SEMANTIC_SCALE.normalize(raw.confidence) else {
                tracing::warn!(code, confidence = raw.confidence, "discarding semantic entry with out-of-scale confidence");
                return None;
            };
            Some(SemanticMatch {
                code: code.to_string(),
                confidence,
                reasoning: raw.reasoning,
            })
        })
        .collect();

    Ok(matches)
}

/// 公式レジストリのレスポンス（JSON配列）をパース
///
/// 見出し行などコードのない行は破棄する。
pub fn parse_registry_response(json: &str) -> Result<Vec<RegistryMatch>> {
    let items = parse_array(json, "registry")?;

    let matches = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RegistryMatch>(item) {
            Ok(m) if is_valid_code(&m.code) => Some(RegistryMatch {
                code: m.code.trim().to_string(),
                ..m
            }),
            Ok(m) => {
                if !m.code.trim().is_empty() {
                    tracing::warn!(code = %m.code, "discarding registry entry with invalid code");
                }
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "discarding malformed registry entry");
                None
            }
        })
        .collect();

    Ok(matches)
}

/// 画像解析のレスポンスをパース（信頼度 0〜1 → 0〜100）
pub fn parse_image_response(response: &str) -> Result<ImageFindings> {
    let raw: RawImageFindings = serde_json::from_str(extract_json(response)?)?;

    let confidence = IMAGE_SCALE.normalize(raw.confidence).ok_or_else(|| {
        Error::Parse(format!("画像解析の信頼度が範囲外: {}", raw.confidence))
    })?;

    Ok(ImageFindings {
        materials: raw
            .materials
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect(),
        product_type: raw.product_type.trim().to_string(),
        confidence,
    })
}

/// 意味照合の結果を候補に変換
///
/// 協調先の実装を問わず、コード形式と 0〜100 の範囲をここで再検証する。
/// 説明・カテゴリはキーワード照合の候補、次にカタログから補う。
pub fn semantic_candidates(
    matches: &[SemanticMatch],
    catalog: &Catalog,
    local: &[Candidate],
) -> Vec<Candidate> {
    matches
        .iter()
        .filter_map(|m| {
            let code = m.code.trim();
            if !is_valid_code(code) {
                tracing::warn!(code, "discarding semantic match with invalid code");
                return None;
            }
            let Some(confidence) = SEMANTIC_SCALE.normalize(m.confidence) else {
                tracing::warn!(code, confidence = m.confidence, "discarding semantic match with out-of-scale confidence");
                return None;
            };

            let (description, category, hint) =
                match local.iter().find(|c| c.code == code) {
                    Some(c) => (c.description.clone(), c.category.clone(), c.tariff_rate_hint.clone()),
                    None => match catalog.get(code) {
                        Some(e) => (
                            e.description.clone(),
                            e.category.clone(),
                            Some(e.tariff_rate_hint.clone()).filter(|h| !h.is_empty()),
                        ),
                        None => (String::new(), String::new(), None),
                    },
                };

            let mut candidate = Candidate::new(
                code.to_string(),
                description,
                confidence,
                category,
                CandidateSource::SemanticAi,
            );
            candidate.tariff_rate_hint = hint;
            if !m.reasoning.is_empty() {
                candidate.reasoning.push(m.reasoning.clone());
            }
            Some(candidate)
        })
        .collect()
}

/// 公式レジストリの結果からコード形式が不正な行を除く
pub fn checked_registry_matches(matches: Vec<RegistryMatch>) -> Vec<RegistryMatch> {
    matches
        .into_iter()
        .filter_map(|m| {
            let code = m.code.trim();
            if !is_valid_code(code) {
                tracing::warn!(code, "discarding registry match with invalid code");
                return None;
            }
            Some(RegistryMatch {
                code: code.to_string(),
                ..m
            })
        })
        .collect()
}

/// 画像解析の結果を検証する
///
/// `ImageAnalyzer` は 0〜100 に正規化済みの値を返す約束なので、
/// ここでは再変換せず範囲だけ確かめる。範囲外なら結果ごと捨てる。
pub fn checked_image_findings(findings: ImageFindings) -> Option<ImageFindings> {
    match ConfidenceScale::Percent.normalize(findings.confidence) {
        Some(confidence) => Some(ImageFindings {
            confidence,
            ..findings
        }),
        None => {
            tracing::warn!(confidence = findings.confidence, "discarding image findings with out-of-scale confidence");
            None
        }
    }
}

/// 画像解析の商品種別・素材からカタログ候補を導く
///
/// 信頼度は画像解析の信頼度で縮める。
pub fn image_candidates(findings: &ImageFindings, catalog: &Catalog) -> Vec<Candidate> {
    if findings.product_type.is_empty() {
        return Vec::new();
    }
    let descriptor = ProductDescriptor {
        title: findings.product_type.clone(),
        materials: findings.materials.join(" "),
        ..Default::default()
    };

    match_keywords(catalog, &descriptor)
        .into_iter()
        .map(|mut c| {
            c.confidence = (c.confidence * findings.confidence / 100.0).round();
            c.source = CandidateSource::ImageAnalysis;
            c.reasoning = vec![format!(
                "image shows {} ({:.0}% confident)",
                findings.product_type, findings.confidence
            )];
            c
        })
        .collect()
}
