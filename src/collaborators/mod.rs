//! 協調先（外部システム）
//!
//! - SemanticMatcher: AIによる意味照合（候補コードの評価）
//! - RegistryLookup: 公式関税表の検索
//! - ImageAnalyzer: 商品画像の素材・種別推定
//!
//! どの協調先も失敗・タイムアウトしうる。呼び出し側はエラーを
//! 「寄与なし」として扱い、分類全体を失敗させない。

mod ai_cli;
mod gemini;
mod registry;

pub use ai_cli::AiCliSemanticMatcher;
pub use gemini::GeminiImageAnalyzer;
pub use registry::UsitcRegistryLookup;

use crate::error::Result;
use async_trait::async_trait;
use hts_common::{ImageFindings, ProductDescriptor, RegistryMatch, SemanticMatch};

/// 意味照合
#[async_trait]
pub trait SemanticMatcher: Send + Sync {
    fn name(&self) -> &'static str {
        "semantic matcher"
    }

    /// 候補コード（最大10件）を評価する。信頼度は 0〜100。
    async fn rank(
        &self,
        descriptor: &ProductDescriptor,
        candidate_codes: &[String],
    ) -> Result<Vec<SemanticMatch>>;
}

/// 公式レジストリ検索（信頼度は返さない）
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    fn name(&self) -> &'static str {
        "official registry"
    }

    async fn search(&self, query: &str) -> Result<Vec<RegistryMatch>>;
}

/// 画像解析（信頼度は 0〜100 に正規化して返す）
#[async_trait]
pub trait ImageAnalyzer: Send + Sync {
    fn name(&self) -> &'static str {
        "image analyzer"
    }

    async fn analyze(&self, image: &[u8]) -> Result<ImageFindings>;
}
