//! 統合 → 集計 → 審査判定 をつなぐ

use crate::aggregator::aggregate;
use crate::combiner::{combine, Sources};
use crate::review::decide;
use crate::types::{PredictionResult, ProductDescriptor};

/// 各照合元の結果から最終出力を組み立てる
pub fn assemble(sources: &Sources, descriptor: &ProductDescriptor) -> PredictionResult {
    let candidates = combine(sources, descriptor);
    let overall = aggregate(&candidates);
    let review = decide(&candidates, overall, descriptor);

    tracing::debug!(
        candidates = candidates.len(),
        overall,
        needs_review = review.needs_review,
        "prediction assembled"
    );

    PredictionResult::new(candidates, overall, review)
}
