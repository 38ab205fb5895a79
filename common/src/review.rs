//! 人手確認の要否判定
//!
//! 全ルールを評価して理由を蓄積する（途中で打ち切らない）。
//! 理由が1つでもあれば要確認。

use crate::types::{Candidate, ProductDescriptor, ReviewDecision};

pub const LOW_CONFIDENCE_THRESHOLD: f64 = 70.0;
pub const SIMILAR_CANDIDATES_SPREAD: f64 = 15.0;

pub const REASON_LOW_CONFIDENCE: &str = "Low confidence prediction";
pub const REASON_SIMILAR_CANDIDATES: &str = "Multiple similar candidates";
pub const REASON_SPECIAL_CONSIDERATION: &str = "Product requires special customs consideration";
pub const REASON_NO_CANDIDATES: &str = "No suitable HTS codes found";

/// 特別な通関上の配慮が必要な語
pub const WATCH_LIST: &[&str] = &[
    "battery",
    "lithium",
    "food",
    "cosmetic",
    "pharmaceutical",
    "medical",
    "chemical",
    "hazardous",
    "explosive",
    "flammable",
    "dangerous",
    "supplement",
    "medicine",
    "drug",
    "organic",
    "agriculture",
];

/// タイトル+説明に監視語が含まれるか（大文字小文字を区別しない部分一致）
pub fn watch_list_hit(descriptor: &ProductDescriptor) -> Option<&'static str> {
    let text = descriptor.search_text().to_lowercase();
    WATCH_LIST.iter().copied().find(|w| text.contains(*w))
}

/// 要確認かどうかと理由を判定
pub fn decide(
    candidates: &[Candidate],
    overall_confidence: f64,
    descriptor: &ProductDescriptor,
) -> ReviewDecision {
    let mut reasons = Vec::new();

    if overall_confidence < LOW_CONFIDENCE_THRESHOLD {
        reasons.push(REASON_LOW_CONFIDENCE.to_string());
    }

    if let [first, second, ..] = candidates {
        if first.confidence - second.confidence < SIMILAR_CANDIDATES_SPREAD {
            reasons.push(REASON_SIMILAR_CANDIDATES.to_string());
        }
    }

    if let Some(word) = watch_list_hit(descriptor) {
        tracing::debug!(word, "watch-list term found");
        reasons.push(REASON_SPECIAL_CONSIDERATION.to_string());
    }

    if candidates.is_empty() {
        reasons.push(REASON_NO_CANDIDATES.to_string());
    }

    ReviewDecision::from_reasons(reasons)
}
