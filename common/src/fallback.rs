//! フォールバック候補
//!
//! どの照合元からも候補が得られなかった場合に、商品テキストから
//! 固定の候補を1件だけ合成する。結果が空になることはない。
//!
//! 信頼度は意図的に低く（70未満）、必ず人手確認の対象になる。

use crate::text::Tokens;
use crate::types::{Candidate, CandidateSource, ProductDescriptor};

/// フォールバック規則（上から順に評価）
struct FallbackRule {
    terms: &'static [&'static str],
    code: &'static str,
    description: &'static str,
    category: &'static str,
    confidence: f64,
}

const RULES: &[FallbackRule] = &[
    FallbackRule {
        terms: &["ceramic", "porcelain", "stoneware", "mug", "cup", "bowl"],
        code: "6912.00.48",
        description: "Ceramic tableware and kitchenware, other than porcelain or china",
        category: "Ceramics",
        confidence: 65.0,
    },
    FallbackRule {
        terms: &["textile", "cotton", "apparel", "clothing", "garment", "shirt", "dress", "polyester"],
        code: "6109.10.00",
        description: "T-shirts, singlets, tank tops and similar garments, knitted or crocheted, of cotton",
        category: "Apparel",
        confidence: 60.0,
    },
    FallbackRule {
        terms: &["electronic", "electronics", "electrical", "charger", "usb", "bluetooth", "phone", "cable"],
        code: "8543.70.99",
        description: "Other electrical machines and apparatus having individual functions",
        category: "Electronics",
        confidence: 45.0,
    },
    FallbackRule {
        terms: &["furniture", "chair", "table", "sofa", "home", "decor"],
        code: "9403.60.80",
        description: "Other wooden furniture",
        category: "Furniture",
        confidence: 40.0,
    },
];

pub const GENERIC_CODE: &str = "9999.00.0000";
const GENERIC_DESCRIPTION: &str = "Other articles, not elsewhere specified";
const GENERIC_CONFIDENCE: f64 = 25.0;

/// フォールバック候補を1件生成する
pub fn fallback_candidate(descriptor: &ProductDescriptor) -> Candidate {
    let tokens = Tokens::new(&descriptor.full_text());

    for rule in RULES {
        if let Some(term) = rule.terms.iter().find(|t| tokens.contains_phrase(t)) {
            return Candidate::new(
                rule.code,
                rule.description,
                rule.confidence,
                rule.category,
                CandidateSource::Fallback,
            )
            .with_reasoning(format!("fallback rule matched \"{}\"", term));
        }
    }

    Candidate::new(
        GENERIC_CODE,
        GENERIC_DESCRIPTION,
        GENERIC_CONFIDENCE,
        "General",
        CandidateSource::Fallback,
    )
    .with_reasoning("no fallback rule matched")
}
