//! プロンプト生成モジュール
//!
//! - build_semantic_prompt: 意味照合（候補コードの中から選ばせる）用
//! - IMAGE_ANALYSIS_PROMPT: 画像解析用

use crate::catalog::Catalog;
use crate::collaborator::MAX_SEMANTIC_CODES;
use crate::types::ProductDescriptor;

/// 画像解析プロンプト（信頼度は 0〜1 で返させる）
pub const IMAGE_ANALYSIS_PROMPT: &str = r#"You are a customs classification assistant. Look at the product photo and report what the product is made of and what kind of product it is.

## Output format (strictly this JSON object)
{
  "materials": ["primary material", "secondary material"],
  "productType": "short noun phrase, e.g. mug, wallet, t-shirt",
  "confidence": 0.0
}

- "confidence" is a number between 0 and 1
- Only describe what is visible; do not guess brand or origin
- Output the JSON object only, no explanation"#;

/// 意味照合プロンプト生成
///
/// # Arguments
/// * `descriptor` - 商品情報
/// * `candidate_codes` - 候補コード（先頭から最大10件を使用）
/// * `catalog` - 候補コードの説明を引くためのカタログ
pub fn build_semantic_prompt(
    descriptor: &ProductDescriptor,
    candidate_codes: &[String],
    catalog: &Catalog,
) -> String {
    let code_list = candidate_codes
        .iter()
        .take(MAX_SEMANTIC_CODES)
        .map(|code| match catalog.get(code) {
            Some(entry) => format!("- {}: {}", code, entry.description),
            None => format!("- {}", code),
        })
        .collect::<Vec<_>>()
        .join("\n");

    let or_none = |s: &str| if s.trim().is_empty() { "none".to_string() } else { s.trim().to_string() };

    format!(
        r#"You are a licensed customs broker classifying products under the Harmonized Tariff Schedule.

## Product
Title: {title}
Description: {description}
Category hint: {category}
Materials: {materials}

## Candidate HTS codes
{code_list}

## Rules
1. Rate how well each candidate code fits the product
2. You may add at most one better code that is not in the list
3. "confidence" is a number between 0 and 100
4. Omit codes that clearly do not apply

## Output format (JSON array)
```json
[
  {{
    "code": "6109.10.00",
    "confidence": 85,
    "reasoning": "one sentence"
  }}
]
```

- Output the JSON array only, no explanation
"#,
        title = or_none(&descriptor.title),
        description = or_none(&descriptor.description),
        category = or_none(&descriptor.category),
        materials = or_none(&descriptor.materials),
    )
}
