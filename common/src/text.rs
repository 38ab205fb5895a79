//! テキスト正規化
//!
//! 照合は語単位で行う（"cup" が "cupboard" に一致しないように）。
//! 小文字化 → 英数字以外で分割 → 簡易ステミング（複数形の除去）。

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NON_WORD: Regex = Regex::new(r"[^\p{L}\p{N}]+").unwrap();
}

/// 簡易ステミング（英語の複数形のみ対応）
pub fn stem(word: &str) -> String {
    let len = word.chars().count();
    if len > 4 && word.ends_with("ies") {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if word.ends_with("sses") {
        return word[..word.len() - 2].to_string();
    }
    if len > 4 && (word.ends_with("ches") || word.ends_with("shes") || word.ends_with("xes")) {
        return word[..word.len() - 2].to_string();
    }
    if len > 3 && word.ends_with('s') && !word.ends_with("ss") && !word.ends_with("us") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// テキストを語幹の列に変換する
pub fn stems(text: &str) -> Vec<String> {
    NON_WORD
        .split(&text.to_lowercase())
        .filter(|w| !w.is_empty())
        .map(stem)
        .collect()
}

/// 語幹列に変換済みのテキスト
#[derive(Debug, Clone, Default)]
pub struct Tokens {
    stems: Vec<String>,
}

impl Tokens {
    pub fn new(text: &str) -> Self {
        Self { stems: stems(text) }
    }

    pub fn is_empty(&self) -> bool {
        self.stems.is_empty()
    }

    /// 語句（複数語可）が連続した語幹列として含まれるか
    pub fn contains_phrase(&self, phrase: &str) -> bool {
        let needle = stems(phrase);
        if needle.is_empty() || needle.len() > self.stems.len() {
            return false;
        }
        self.stems
            .windows(needle.len())
            .any(|window| window == needle.as_slice())
    }

    /// 語句のいずれかの語幹がこのテキストに含まれるか
    pub fn shares_stem(&self, phrase: &str) -> bool {
        stems(phrase).iter().any(|s| self.stems.contains(s))
    }
}
