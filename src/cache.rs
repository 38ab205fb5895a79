//! 分類結果キャッシュモジュール
//!
//! 商品情報（と画像）の SHA-256 をキーにして分類結果をキャッシュし、
//! 同じ商品の再分類（協調先の呼び出し）をスキップする。

use crate::error::Result;
use chrono::{DateTime, Utc};
use hts_common::{PredictionResult, ProductDescriptor};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

const CACHE_FILE_NAME: &str = ".hts-prediction-cache.json";

/// キャッシュファイルの構造
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultCache {
    /// バージョン（互換性チェック用）
    version: u32,
    /// キー → 分類結果のマップ
    entries: HashMap<String, CacheEntry>,
}

/// キャッシュエントリ
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// 商品タイトル（確認用）
    pub title: String,
    pub cached_at: DateTime<Utc>,
    pub result: PredictionResult,
}

impl ResultCache {
    const CURRENT_VERSION: u32 = 1;

    /// 既定のキャッシュディレクトリ
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .map(|d| d.join("hts-classifier"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn cache_path(folder: &Path) -> PathBuf {
        folder.join(CACHE_FILE_NAME)
    }

    /// キャッシュファイルを読み込み（なければ・壊れていれば空）
    pub fn load(folder: &Path) -> Self {
        let cache_path = Self::cache_path(folder);
        if !cache_path.exists() {
            return Self::default();
        }

        let file = match File::open(&cache_path) {
            Ok(f) => f,
            Err(_) => return Self::default(),
        };

        let reader = BufReader::new(file);
        match serde_json::from_reader::<_, ResultCache>(reader) {
            Ok(cache) if cache.version == Self::CURRENT_VERSION => cache,
            Ok(cache) => {
                tracing::warn!(found = cache.version, "cache version mismatch, starting fresh");
                Self::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "unreadable cache file, starting fresh");
                Self::default()
            }
        }
    }

    /// キャッシュファイルを保存
    pub fn save(&self, folder: &Path) -> Result<()> {
        std::fs::create_dir_all(folder)?;
        let file = File::create(Self::cache_path(folder))?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// キャッシュファイルを削除（存在しなければ false）
    pub fn clear(folder: &Path) -> Result<bool> {
        let cache_path = Self::cache_path(folder);
        if !cache_path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(cache_path)?;
        Ok(true)
    }

    pub fn get(&self, key: &str) -> Option<&PredictionResult> {
        self.entries.get(key).map(|e| &e.result)
    }

    pub fn insert(&mut self, key: String, title: String, result: PredictionResult) {
        self.entries.insert(
            key,
            CacheEntry {
                title,
                cached_at: Utc::now(),
                result,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            entries: HashMap::new(),
        }
    }
}

/// キャッシュキー（前後の空白と大文字小文字を無視）
///
/// `profile` は [`Classifier::profile`](crate::Classifier::profile)。
/// オフラインの結果が協調先ありの分類に流用されないようにする。
pub fn cache_key(descriptor: &ProductDescriptor, image: Option<&[u8]>, profile: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(profile.as_bytes());
    hasher.update([0u8]);
    for field in [
        &descriptor.title,
        &descriptor.description,
        &descriptor.category,
        &descriptor.materials,
    ] {
        hasher.update(field.trim().to_lowercase().as_bytes());
        hasher.update([0u8]);
    }
    hasher.update([descriptor.has_image as u8]);
    if let Some(bytes) = image {
        hasher.update(bytes);
    }
    hex::encode(hasher.finalize())
}
