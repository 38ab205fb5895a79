//! 候補統合モジュール
//!
//! キーワード照合・意味照合・公式レジストリ・画像解析の候補を
//! コード単位で重複排除しながら統合する。
//!
//! ## 統合順序（後の段が前の段の結果を書き換える）
//! 1. 意味照合の候補
//! 2. キーワード照合の候補（既存コードは高い方を残す）
//! 3. 画像解析から導いた候補（同上）
//! 4. 公式レジストリ: 既存なら +20（上限98）、新規なら 92 で追加
//! 5. 画像解析の素材と一致する候補に +5（上限99）
//! 6. 信頼度の降順に並べる
//!
//! 全ての照合元が空ならフォールバック候補を1件合成する。

use crate::collaborator::{ImageFindings, RegistryMatch};
use crate::fallback::fallback_candidate;
use crate::types::{Candidate, CandidateSource, ProductDescriptor};
use std::collections::HashMap;

pub const OFFICIAL_BOOST: f64 = 20.0;
pub const OFFICIAL_BOOST_CAP: f64 = 98.0;
pub const OFFICIAL_NEW_CONFIDENCE: f64 = 92.0;
pub const IMAGE_BOOST: f64 = 5.0;
pub const IMAGE_BOOST_CAP: f64 = 99.0;
const IMAGE_CONFIRMATION: &str = " (confirmed by image analysis)";

/// 統合の入力（各照合元の結果）
///
/// 失敗・タイムアウトした照合元は空スライス/`None` を渡す。
#[derive(Debug, Clone, Copy, Default)]
pub struct Sources<'a> {
    pub local: &'a [Candidate],
    pub semantic: &'a [Candidate],
    pub official: &'a [RegistryMatch],
    /// 画像解析の商品種別・素材からカタログで導いた候補
    pub image_candidates: &'a [Candidate],
    pub image: Option<&'a ImageFindings>,
}

/// コード単位で一意な候補の集合（挿入順を保持）
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    items: Vec<Candidate>,
    index: HashMap<String, usize>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, code: &str) -> Option<&Candidate> {
        self.index.get(code.trim()).map(|&i| &self.items[i])
    }

    fn get_mut(&mut self, code: &str) -> Option<&mut Candidate> {
        match self.index.get(code.trim()) {
            Some(&i) => Some(&mut self.items[i]),
            None => None,
        }
    }

    fn push(&mut self, mut candidate: Candidate) {
        candidate.code = candidate.code.trim().to_string();
        self.index.insert(candidate.code.clone(), self.items.len());
        self.items.push(candidate);
    }

    /// 追加または統合
    ///
    /// 同じコードが既にあれば高い信頼度の方を残し、
    /// 公式検証フラグは論理和をとる。弱い候補が強い候補を上書きすることはない。
    pub fn upsert(&mut self, candidate: Candidate) {
        let Some(existing) = self.get_mut(&candidate.code) else {
            self.push(candidate);
            return;
        };

        let validated = existing.is_officially_validated || candidate.is_officially_validated;
        if candidate.confidence > existing.confidence {
            let mut reasoning = std::mem::take(&mut existing.reasoning);
            let fallback_hint = existing.tariff_rate_hint.take();
            *existing = Candidate {
                code: existing.code.clone(),
                ..candidate
            };
            reasoning.append(&mut existing.reasoning);
            existing.reasoning = reasoning;
            if existing.tariff_rate_hint.is_none() {
                existing.tariff_rate_hint = fallback_hint;
            }
        } else {
            if existing.tariff_rate_hint.is_none() {
                existing.tariff_rate_hint = candidate.tariff_rate_hint;
            }
            existing.reasoning.extend(candidate.reasoning);
        }
        existing.is_officially_validated = validated;
    }

    /// 公式レジストリの結果を反映する
    ///
    /// 検証済みの候補は再度加点しない（同じ結果を2回反映しても1回と同じ）。
    pub fn apply_official(&mut self, official: &RegistryMatch) {
        if let Some(existing) = self.get_mut(&official.code) {
            if existing.is_officially_validated {
                return;
            }
            existing.confidence = (existing.confidence + OFFICIAL_BOOST).min(OFFICIAL_BOOST_CAP);
            existing.is_officially_validated = true;
            if existing.category.is_empty() {
                existing.category = official.category.clone();
            }
            if existing.tariff_rate_hint.is_none() && !official.tariff_rate_hint.is_empty() {
                existing.tariff_rate_hint = Some(official.tariff_rate_hint.clone());
            }
            existing
                .reasoning
                .push("validated by official registry".to_string());
            return;
        }

        let mut candidate = Candidate::new(
            official.code.clone(),
            official.description.clone(),
            OFFICIAL_NEW_CONFIDENCE,
            official.category.clone(),
            CandidateSource::OfficialRegistry,
        )
        .with_reasoning("found in official registry");
        candidate.is_officially_validated = true;
        if !official.tariff_rate_hint.is_empty() {
            candidate.tariff_rate_hint = Some(official.tariff_rate_hint.clone());
        }
        self.push(candidate);
    }

    /// 画像解析の素材が説明・カテゴリに含まれる候補を加点する
    pub fn apply_image(&mut self, image: &ImageFindings) {
        let materials: Vec<String> = image
            .materials
            .iter()
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty())
            .collect();
        if materials.is_empty() {
            return;
        }

        for candidate in &mut self.items {
            let description = candidate.description.to_lowercase();
            let category = candidate.category.to_lowercase();
            let confirmed = materials
                .iter()
                .find(|m| description.contains(m.as_str()) || category.contains(m.as_str()));

            if let Some(material) = confirmed {
                candidate.confidence = (candidate.confidence + IMAGE_BOOST).min(IMAGE_BOOST_CAP);
                candidate
                    .reasoning
                    .push(format!("material \"{}\"{}", material, IMAGE_CONFIRMATION));
            }
        }
    }

    /// 信頼度の降順（同点は挿入順）
    pub fn into_sorted(self) -> Vec<Candidate> {
        let mut items = self.items;
        items.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        items
    }
}

/// 候補を統合する
///
/// 戻り値は空にならない。コード重複なし、信頼度の降順。
pub fn combine(sources: &Sources, descriptor: &ProductDescriptor) -> Vec<Candidate> {
    let mut set = CandidateSet::new();

    for candidate in sources.semantic {
        set.upsert(Candidate {
            source: CandidateSource::SemanticAi,
            ..candidate.clone()
        });
    }

    for candidate in sources.local {
        set.upsert(Candidate {
            source: CandidateSource::LocalKeyword,
            ..candidate.clone()
        });
    }

    for candidate in sources.image_candidates {
        set.upsert(Candidate {
            source: CandidateSource::ImageAnalysis,
            ..candidate.clone()
        });
    }

    for official in sources.official {
        set.apply_official(official);
    }

    if let Some(image) = sources.image {
        set.apply_image(image);
    }

    if set.is_empty() {
        tracing::debug!("no candidates from any source, using fallback");
        return vec![fallback_candidate(descriptor)];
    }

    set.into_sorted()
}

/// コード単位で重複を畳み込む（高い信頼度を残し、検証フラグは論理和）
pub fn dedup_by_code(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut set = CandidateSet::new();
    for candidate in candidates {
        set.upsert(candidate);
    }
    set.into_sorted()
}
