//! 全体信頼度の集計
//!
//! 統合済み候補（信頼度の降順）から予測全体の信頼度を1つ求める。

use crate::types::Candidate;

pub const VALIDATED_BONUS: f64 = 5.0;
pub const VALIDATED_CAP: f64 = 99.0;
/// 1位と2位の差がこれ未満なら曖昧とみなす
pub const AMBIGUITY_SPREAD: f64 = 10.0;
pub const AMBIGUITY_PENALTY: f64 = 15.0;

/// 全体信頼度（0〜100の整数値）
///
/// - 1位の信頼度から開始
/// - 公式検証済みの候補があれば +5（上限99）
/// - 1位と2位の差が10未満なら -15（下限0）
pub fn aggregate(candidates: &[Candidate]) -> f64 {
    let Some(top) = candidates.first() else {
        return 0.0;
    };

    let mut confidence = top.confidence;

    if candidates.iter().any(|c| c.is_officially_validated) {
        confidence = (confidence + VALIDATED_BONUS).min(VALIDATED_CAP);
    }

    let spread = match candidates.get(1) {
        Some(second) => top.confidence - second.confidence,
        None => top.confidence,
    };
    if spread < AMBIGUITY_SPREAD {
        confidence = (confidence - AMBIGUITY_PENALTY).max(0.0);
    }

    confidence.round().clamp(0.0, 100.0)
}
