//! 一括分類
//!
//! 商品情報のJSON配列を順に分類する。1件の失敗で全体を止めない。

use crate::classifier::Classifier;
use crate::error::{ClassifierError, Result};
use hts_common::{PredictionResult, ProductDescriptor};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 入力の1件（商品情報 + 画像パス）
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItem {
    #[serde(flatten)]
    pub descriptor: ProductDescriptor,
    #[serde(default)]
    pub image_path: Option<PathBuf>,
}

/// 出力の1件（結果またはエラー）
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    pub descriptor: ProductDescriptor,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PredictionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn load_batch(path: &Path) -> Result<Vec<BatchItem>> {
    if !path.exists() {
        return Err(ClassifierError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let items: Vec<BatchItem> = serde_json::from_str(&content)?;
    Ok(items)
}

/// 画像パスは入力ファイルの親ディレクトリ基準で解決する
fn read_image(item: &BatchItem, base_dir: &Path) -> Option<Vec<u8>> {
    let path = item.image_path.as_ref()?;
    let path = if path.is_relative() {
        base_dir.join(path)
    } else {
        path.clone()
    };
    match std::fs::read(&path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "image unreadable, classifying without it");
            None
        }
    }
}

pub async fn classify_batch(
    classifier: &Classifier,
    items: Vec<BatchItem>,
    base_dir: &Path,
    show_progress: bool,
) -> Vec<BatchRecord> {
    let progress = if show_progress {
        let pb = ProgressBar::new(items.len() as u64);
        if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
            pb.set_style(style);
        }
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut records = Vec::with_capacity(items.len());

    for item in items {
        let image = read_image(&item, base_dir);
        let mut descriptor = item.descriptor;
        if image.is_some() {
            descriptor.has_image = true;
        }
        progress.set_message(descriptor.title.clone());

        let record = match classifier.classify(&descriptor, image.as_deref()).await {
            Ok(result) => BatchRecord {
                descriptor,
                result: Some(result),
                error: None,
            },
            Err(e) => BatchRecord {
                descriptor,
                result: None,
                error: Some(e.to_string()),
            },
        };
        records.push(record);
        progress.inc(1);
    }

    progress.finish_and_clear();
    records
}
