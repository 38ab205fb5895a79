//! キャッシュ機能テスト
//!
//! 分類結果キャッシュの動作を検証

use async_trait::async_trait;
use hts_classifier::cache::{cache_key, ResultCache};
use hts_classifier::collaborators::SemanticMatcher;
use hts_classifier::{Classifier, Result};
use hts_common::{Catalog, PredictionResult, ProductDescriptor, SemanticMatch};
use std::sync::Arc;
use tempfile::tempdir;

fn mug() -> ProductDescriptor {
    ProductDescriptor {
        title: "Ceramic coffee mug".to_string(),
        materials: "stoneware".to_string(),
        ..Default::default()
    }
}

struct NoopSemantic;

#[async_trait]
impl SemanticMatcher for NoopSemantic {
    async fn rank(&self, _: &ProductDescriptor, _: &[String]) -> Result<Vec<SemanticMatch>> {
        Ok(Vec::new())
    }
}

async fn classify(descriptor: &ProductDescriptor) -> PredictionResult {
    Classifier::offline(Arc::new(Catalog::builtin()))
        .classify(descriptor, None)
        .await
        .expect("分類失敗")
}

/// 空のキャッシュファイル
#[test]
fn test_cache_file_empty() {
    let dir = tempdir().expect("Failed to create temp dir");
    let cache = ResultCache::load(dir.path());

    assert_eq!(cache.len(), 0);
    assert!(cache.is_empty());
}

/// キャッシュの保存と読み込み
#[tokio::test]
async fn test_cache_save_and_load() {
    let dir = tempdir().expect("Failed to create temp dir");
    let descriptor = mug();
    let result = classify(&descriptor).await;
    let key = cache_key(&descriptor, None, "-");

    let mut cache = ResultCache::load(dir.path());
    cache.insert(key.clone(), descriptor.title.clone(), result.clone());
    cache.save(dir.path()).expect("キャッシュ保存失敗");

    let loaded = ResultCache::load(dir.path());
    assert_eq!(loaded.len(), 1);
    let cached = loaded.get(&key).expect("キャッシュが見つからない");
    assert_eq!(cached, &result);
    assert_eq!(cached.top().unwrap().code, "6912.00.48");
}

/// キーは前後の空白・大文字小文字を無視する
#[test]
fn test_cache_key_normalizes_fields() {
    let a = mug();
    let b = ProductDescriptor {
        title: "  CERAMIC coffee Mug ".to_string(),
        ..mug()
    };
    assert_eq!(cache_key(&a, None, "-"), cache_key(&b, None, "-"));
}

/// 内容や画像が違えば別キー
#[test]
fn test_cache_key_differs() {
    let a = mug();
    let b = ProductDescriptor {
        materials: "porcelain".to_string(),
        ..mug()
    };
    assert_ne!(cache_key(&a, None, "-"), cache_key(&b, None, "-"));
    assert_ne!(cache_key(&a, None, "-"), cache_key(&a, Some(b"image"), "-"));
    assert_ne!(cache_key(&a, Some(b"one"), "-"), cache_key(&a, Some(b"two"), "-"));
}

/// バージョン不一致は空のキャッシュ
#[test]
fn test_cache_version_mismatch() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(
        ResultCache::cache_path(dir.path()),
        r#"{"version": 999, "entries": {}}"#,
    )
    .unwrap();

    let cache = ResultCache::load(dir.path());
    assert!(cache.is_empty());
}

/// 壊れたキャッシュファイルは空のキャッシュ
#[test]
fn test_cache_corrupted_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    std::fs::write(ResultCache::cache_path(dir.path()), "{ invalid json").unwrap();

    let cache = ResultCache::load(dir.path());
    assert!(cache.is_empty());
}

/// キャッシュ削除
#[test]
fn test_cache_clear() {
    let dir = tempdir().expect("Failed to create temp dir");
    assert!(!ResultCache::clear(dir.path()).unwrap());

    ResultCache::default().save(dir.path()).unwrap();
    assert!(ResultCache::cache_path(dir.path()).exists());

    assert!(ResultCache::clear(dir.path()).unwrap());
    assert!(!ResultCache::cache_path(dir.path()).exists());
}

/// 保存先ディレクトリがなければ作成する
#[test]
fn test_cache_save_creates_folder() {
    let dir = tempdir().expect("Failed to create temp dir");
    let nested = dir.path().join("a").join("b");

    ResultCache::default().save(&nested).unwrap();
    assert!(ResultCache::cache_path(&nested).exists());
}

/// オフラインの結果は協調先ありの分類とキーを共有しない
#[test]
fn test_cache_key_depends_on_classifier_profile() {
    let catalog = Arc::new(Catalog::builtin());
    let offline = Classifier::offline(catalog.clone());
    let online = Classifier::offline(catalog).with_semantic(Arc::new(NoopSemantic));
    let descriptor = mug();

    assert_ne!(offline.profile(), online.profile());
    assert_ne!(
        cache_key(&descriptor, None, &offline.profile()),
        cache_key(&descriptor, None, &online.profile())
    );
    assert_eq!(
        offline.profile(),
        Classifier::offline(Arc::new(Catalog::builtin())).profile()
    );
}

/// カタログが変われば別キー
#[test]
fn test_cache_key_depends_on_catalog() {
    let custom = Catalog::from_json(
        r#"[{"code": "6912.00.48", "description": "Mugs", "category": "Ceramics",
             "triggerTerms": [{"term": "mug", "weightClass": "productType"}]}]"#,
    )
    .unwrap();
    let builtin = Classifier::offline(Arc::new(Catalog::builtin()));
    let external = Classifier::offline(Arc::new(custom));

    assert_ne!(builtin.profile(), external.profile());
    assert_ne!(
        cache_key(&mug(), None, &builtin.profile()),
        cache_key(&mug(), None, &external.profile())
    );
}
