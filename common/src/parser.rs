//! 協調先レスポンスのパーサー
//!
//! Claude CLI や Gemini のテキスト応答から JSON 部分を抽出する。

use crate::error::{Error, Result};

/// レスポンスからJSON部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 先に現れる `[...]` または `{...}`
/// 3. エラー
///
/// # Examples
/// ```
/// use hts_common::extract_json;
///
/// let response = "Here you go: [{\"code\": \"6109.10.00\"}]";
/// let json = extract_json(response).unwrap();
/// assert!(json.starts_with('['));
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    // ```json ... ``` ブロックを探す
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    let array_start = response.find('[');
    let object_start = response.find('{');
    let (start, close) = match (array_start, object_start) {
        (Some(a), Some(o)) if o < a => (o, '}'),
        (Some(a), _) => (a, ']'),
        (None, Some(o)) => (o, '}'),
        (None, None) => return Err(Error::Parse("JSONが見つかりません".into())),
    };

    match response.rfind(close) {
        Some(end) if end > start => Ok(&response[start..=end]),
        _ => Err(Error::Parse("JSONが閉じていません".into())),
    }
}
