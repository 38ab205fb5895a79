//! HTS Classification Core
//!
//! 商品情報から関税分類コード（HS/HTS）の候補を推定する中核ロジック。
//! I/Oを持たない純粋な処理のみ（協調先の呼び出しはCLI側）。
//!
//! 商品情報 → キーワード照合 → 候補統合 → 全体信頼度 → 要確認判定

pub mod aggregator;
pub mod catalog;
pub mod collaborator;
pub mod combiner;
pub mod error;
pub mod fallback;
pub mod matcher;
pub mod parser;
pub mod pipeline;
pub mod prompts;
pub mod review;
pub mod text;
pub mod types;

pub use aggregator::aggregate;
pub use catalog::{is_valid_code, Catalog};
pub use collaborator::{
    checked_image_findings, checked_registry_matches, image_candidates, parse_image_response,
    parse_registry_response, parse_semantic_response, semantic_candidates, ImageFindings,
    RegistryMatch, SemanticMatch,
};
pub use combiner::{combine, dedup_by_code, CandidateSet, Sources};
pub use error::{Error, Result};
pub use fallback::fallback_candidate;
pub use matcher::{match_keywords, rank_codes};
pub use parser::extract_json;
pub use pipeline::assemble;
pub use prompts::{build_semantic_prompt, IMAGE_ANALYSIS_PROMPT};
pub use review::decide;
pub use types::{
    Candidate, CandidateSource, CatalogEntry, ConfidenceScale, PredictionResult,
    ProductDescriptor, ReviewDecision, TriggerTerm, WeightClass,
};
