//! キーワード照合モジュール
//!
//! 商品情報をカタログと照合し、重み付きルールでスコアを付ける。
//! I/Oなし・乱数なしの純粋関数（同じ入力には常に同じ順序で返す）。
//!
//! ## スコア
//! - ProductType語（タイトル/説明）: 1語ごとに +15
//! - Material語（素材欄）: 1語ごとに +12
//! - Category語（カテゴリ欄と語幹一致）: +8
//! - General語（タイトル）: 1語ごとに +4、上限あり
//! - 付加点: 説明100字超 +3、200字超さらに +2、素材欄あり +5、画像あり +5

use crate::catalog::Catalog;
use crate::text::Tokens;
use crate::types::{Candidate, CandidateSource, CatalogEntry, ProductDescriptor, WeightClass};

pub const PRODUCT_TYPE_POINTS: u32 = 15;
pub const MATERIAL_POINTS: u32 = 12;
pub const CATEGORY_POINTS: u32 = 8;
pub const GENERAL_POINTS: u32 = 4;
/// General語だけで最弱のProductType一致（15点）を超えないこと
pub const GENERAL_CAP: u32 = 12;

/// これ未満のエントリは破棄
pub const SCORE_FLOOR: u32 = 20;
pub const MIN_CONFIDENCE: f64 = 30.0;
/// キーワード照合だけでは確実とは言えない
pub const MAX_CONFIDENCE: f64 = 92.0;
pub const MAX_LOCAL_CANDIDATES: usize = 5;

/// 1エントリの採点結果
#[derive(Debug, Clone)]
pub struct EntryScore<'a> {
    pub entry: &'a CatalogEntry,
    pub score: u32,
    /// ProductType または Material の一致があるか
    pub strong_signal: bool,
    pub matched_terms: Vec<&'a str>,
}

/// 照合対象フィールドを事前に語幹化したもの
struct DescriptorTokens {
    title_and_description: Tokens,
    title: Tokens,
    materials: Tokens,
    category: Tokens,
}

impl DescriptorTokens {
    fn new(descriptor: &ProductDescriptor) -> Self {
        Self {
            title_and_description: Tokens::new(&descriptor.search_text()),
            title: Tokens::new(&descriptor.title),
            materials: Tokens::new(&descriptor.materials),
            category: Tokens::new(&descriptor.category),
        }
    }
}

/// エントリに依存しない付加点
fn flat_bonus(descriptor: &ProductDescriptor) -> u32 {
    let mut bonus = 0;
    let description_len = descriptor.description.trim().chars().count();
    if description_len > 100 {
        bonus += 3;
    }
    if description_len > 200 {
        bonus += 2;
    }
    if descriptor.materials.trim().chars().count() > 5 {
        bonus += 5;
    }
    if descriptor.has_image {
        bonus += 5;
    }
    bonus
}

fn score_entry<'a>(entry: &'a CatalogEntry, tokens: &DescriptorTokens, bonus: u32) -> EntryScore<'a> {
    let mut product_type = 0;
    let mut material = 0;
    let mut general = 0;
    let mut category_hit = false;
    let mut matched_terms = Vec::new();
    let mut seen: Vec<(&str, WeightClass)> = Vec::new();

    for trigger in &entry.trigger_terms {
        let term = trigger.term.as_str();
        // 同じ区分の同じ語は1回だけ数える
        if seen.contains(&(term, trigger.weight_class)) {
            continue;
        }
        let hit = match trigger.weight_class {
            WeightClass::ProductType => tokens.title_and_description.contains_phrase(term),
            WeightClass::Material => tokens.materials.contains_phrase(term),
            WeightClass::Category => tokens.category.shares_stem(term),
            WeightClass::General => tokens.title.contains_phrase(term),
        };
        if !hit {
            continue;
        }
        seen.push((term, trigger.weight_class));
        match trigger.weight_class {
            WeightClass::ProductType => product_type += PRODUCT_TYPE_POINTS,
            WeightClass::Material => material += MATERIAL_POINTS,
            WeightClass::Category => category_hit = true,
            WeightClass::General => general += GENERAL_POINTS,
        }
        matched_terms.push(term);
    }

    let category = if category_hit { CATEGORY_POINTS } else { 0 };
    let term_score = product_type + material + category + general.min(GENERAL_CAP);

    EntryScore {
        entry,
        score: if term_score > 0 { term_score + bonus } else { 0 },
        strong_signal: product_type > 0 || material > 0,
        matched_terms,
    }
}

/// 全エントリを宣言順に採点する（足切り前の生スコア）
pub fn score_entries<'a>(catalog: &'a Catalog, descriptor: &ProductDescriptor) -> Vec<EntryScore<'a>> {
    if descriptor.is_blank() {
        return Vec::new();
    }
    let tokens = DescriptorTokens::new(descriptor);
    let bonus = flat_bonus(descriptor);

    catalog
        .entries()
        .iter()
        .map(|entry| score_entry(entry, &tokens, bonus))
        .collect()
}

/// キーワード照合
///
/// 最大5件、信頼度の降順（同点はカタログの宣言順）。
/// 空の商品情報には空を返す（呼び出し側がフォールバックする）。
pub fn match_keywords(catalog: &Catalog, descriptor: &ProductDescriptor) -> Vec<Candidate> {
    let mut survivors: Vec<(f64, EntryScore)> = score_entries(catalog, descriptor)
        .into_iter()
        .filter(|s| s.score >= SCORE_FLOOR && s.strong_signal)
        .map(|s| {
            let confidence = f64::from(s.score).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE);
            (confidence, s)
        })
        .collect();

    // sort_by は安定ソート: 同点は宣言順のまま
    survivors.sort_by(|a, b| b.0.total_cmp(&a.0));
    survivors.truncate(MAX_LOCAL_CANDIDATES);

    survivors
        .into_iter()
        .map(|(confidence, s)| {
            let mut candidate = Candidate::new(
                s.entry.code.clone(),
                s.entry.description.clone(),
                confidence,
                s.entry.category.clone(),
                CandidateSource::LocalKeyword,
            )
            .with_reasoning(format!(
                "keyword match: {} (score {})",
                s.matched_terms.join(", "),
                s.score
            ));
            if !s.entry.tariff_rate_hint.is_empty() {
                candidate.tariff_rate_hint = Some(s.entry.tariff_rate_hint.clone());
            }
            candidate
        })
        .collect()
}

/// 意味照合に渡す候補コードを生スコア順に選ぶ
///
/// 一致語のあるエントリのみ。足切り前のスコアで並べる。
pub fn rank_codes(catalog: &Catalog, descriptor: &ProductDescriptor, limit: usize) -> Vec<String> {
    let mut scored: Vec<EntryScore> = score_entries(catalog, descriptor)
        .into_iter()
        .filter(|s| s.score > 0)
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
        .into_iter()
        .take(limit)
        .map(|s| s.entry.code.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TriggerTerm;

    fn tshirt() -> ProductDescriptor {
        ProductDescriptor {
            title: "cotton t-shirt".to_string(),
            description: "100% cotton casual wear".to_string(),
            materials: "cotton".to_string(),
            ..Default::default()
        }
    }

    fn entry(code: &str, terms: &[(&str, WeightClass)]) -> CatalogEntry {
        CatalogEntry {
            code: code.to_string(),
            description: format!("entry {}", code),
            category: "Test".to_string(),
            trigger_terms: terms.iter().map(|(t, c)| TriggerTerm::new(*t, *c)).collect(),
            tariff_rate_hint: String::new(),
        }
    }

    #[test]
    fn test_cotton_tshirt_matches_apparel() {
        let catalog = Catalog::builtin();
        let candidates = match_keywords(&catalog, &tshirt());

        assert!(!candidates.is_empty());
        let top = &candidates[0];
        assert_eq!(top.code, "6109.10.00");
        assert_eq!(top.source, CandidateSource::LocalKeyword);
        assert!(top.confidence >= 30.0);
        assert_eq!(top.tariff_rate_hint.as_deref(), Some("16.5%"));
    }

    #[test]
    fn test_tshirt_score_breakdown() {
        let catalog = Catalog::builtin();
        let scores = score_entries(&catalog, &tshirt());
        let apparel = scores
            .iter()
            .find(|s| s.entry.code == "6109.10.00")
            .unwrap();
        // t-shirt(15) + shirt(15) + cotton(12) + casual(title外なので0) + 素材欄ボーナス(5)
        assert_eq!(apparel.score, 47);
        assert!(apparel.strong_signal);
    }

    #[test]
    fn test_empty_descriptor_returns_nothing() {
        let catalog = Catalog::builtin();
        let descriptor = ProductDescriptor {
            materials: "cotton".to_string(),
            has_image: true,
            ..Default::default()
        };
        assert!(match_keywords(&catalog, &descriptor).is_empty());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let catalog = Catalog::builtin();
        let descriptor = ProductDescriptor {
            title: "Stoneware coffee mug, cup and bowl set with saucer and plate".to_string(),
            description: "x".repeat(250),
            materials: "ceramic stoneware earthenware".to_string(),
            category: "Kitchen & Dining".to_string(),
            has_image: true,
        };

        let candidates = match_keywords(&catalog, &descriptor);
        assert!(!candidates.is_empty());
        assert_eq!(candidates[0].code, "6912.00.48");
        assert_eq!(candidates[0].confidence, MAX_CONFIDENCE);
        for c in &candidates {
            assert!(c.confidence >= MIN_CONFIDENCE && c.confidence <= MAX_CONFIDENCE);
        }
    }

    #[test]
    fn test_general_terms_alone_do_not_survive() {
        let catalog = Catalog::from_entries(vec![entry(
            "1111.11.11",
            &[
                ("alpha", WeightClass::General),
                ("beta", WeightClass::General),
                ("gamma", WeightClass::General),
                ("delta", WeightClass::General),
                ("epsilon", WeightClass::General),
            ],
        )])
        .unwrap();
        let descriptor = ProductDescriptor {
            title: "alpha beta gamma delta epsilon".to_string(),
            description: "y".repeat(250),
            materials: "unknown fabric".to_string(),
            has_image: true,
            ..Default::default()
        };

        let scores = score_entries(&catalog, &descriptor);
        // General語は上限12点 + 付加点15点
        assert_eq!(scores[0].score, GENERAL_CAP + 15);
        assert!(match_keywords(&catalog, &descriptor).is_empty());
    }

    #[test]
    fn test_below_floor_is_discarded() {
        let catalog = Catalog::from_entries(vec![entry(
            "2222.22.22",
            &[("cotton", WeightClass::Material)],
        )])
        .unwrap();
        let descriptor = ProductDescriptor {
            title: "something".to_string(),
            materials: "cotton".to_string(),
            ..Default::default()
        };
        // 12 + 5 = 17 < 20
        assert!(match_keywords(&catalog, &descriptor).is_empty());
    }

    #[test]
    fn test_category_stem_match() {
        let catalog = Catalog::from_entries(vec![entry(
            "3333.33.33",
            &[("lamp", WeightClass::ProductType), ("lighting", WeightClass::Category)],
        )])
        .unwrap();
        let descriptor = ProductDescriptor {
            title: "Reading lamp".to_string(),
            category: "Home > Lighting".to_string(),
            ..Default::default()
        };
        let scores = score_entries(&catalog, &descriptor);
        assert_eq!(scores[0].score, PRODUCT_TYPE_POINTS + CATEGORY_POINTS);
    }

    #[test]
    fn test_ties_keep_declaration_order() {
        let catalog = Catalog::from_entries(vec![
            entry("4444.00.01", &[("widget", WeightClass::ProductType), ("steel", WeightClass::Material)]),
            entry("4444.00.02", &[("widget", WeightClass::ProductType), ("steel", WeightClass::Material)]),
            entry("4444.00.03", &[("widget", WeightClass::ProductType), ("steel", WeightClass::Material)]),
        ])
        .unwrap();
        let descriptor = ProductDescriptor {
            title: "steel widget".to_string(),
            materials: "steel".to_string(),
            ..Default::default()
        };

        let first = match_keywords(&catalog, &descriptor);
        let codes: Vec<&str> = first.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["4444.00.01", "4444.00.02", "4444.00.03"]);

        // 繰り返しても同じ結果
        for _ in 0..5 {
            assert_eq!(match_keywords(&catalog, &descriptor), first);
        }
    }

    #[test]
    fn test_at_most_five_candidates() {
        let entries = (0..8)
            .map(|i| {
                entry(
                    &format!("5555.00.0{}", i),
                    &[("gadget", WeightClass::ProductType), ("brass", WeightClass::Material)],
                )
            })
            .collect();
        let catalog = Catalog::from_entries(entries).unwrap();
        let descriptor = ProductDescriptor {
            title: "brass gadget".to_string(),
            materials: "brass".to_string(),
            ..Default::default()
        };
        assert_eq!(match_keywords(&catalog, &descriptor).len(), MAX_LOCAL_CANDIDATES);
    }

    #[test]
    fn test_rank_codes_includes_sub_floor_entries() {
        let catalog = Catalog::builtin();
        let descriptor = ProductDescriptor {
            title: "hoodie".to_string(),
            ..Default::default()
        };
        // 15点で足切りされるが、意味照合の候補には残る
        assert!(match_keywords(&catalog, &descriptor).is_empty());
        let codes = rank_codes(&catalog, &descriptor, 10);
        assert_eq!(codes, vec!["6110.20.20".to_string()]);
    }
}
