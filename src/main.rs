use anyhow::Context;
use clap::Parser;
use hts_classifier::{batch, cache, cli, config, logging, Classifier};
use hts_common::{Catalog, PredictionResult, ProductDescriptor};
use cli::{Cli, Commands};
use config::Config;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = Config::load().context("設定ファイルの読み込みに失敗")?;
    if let Some(provider) = cli.ai_provider {
        config.semantic_provider = provider;
    }

    match cli.command {
        Commands::Classify { title, description, category, materials, image, offline, use_cache, json } => {
            let image_bytes = match &image {
                Some(path) => Some(
                    std::fs::read(path)
                        .with_context(|| format!("画像を読み込めません: {}", path.display()))?,
                ),
                None => None,
            };

            let descriptor = ProductDescriptor {
                title,
                description,
                category,
                materials,
                has_image: image_bytes.is_some(),
            };

            let classifier = build_classifier(&config, offline)?;
            let cache_dir = cache::ResultCache::default_dir();
            let key = cache::cache_key(&descriptor, image_bytes.as_deref(), &classifier.profile());
            let mut result_cache = if use_cache {
                Some(cache::ResultCache::load(&cache_dir))
            } else {
                None
            };

            let cached = result_cache.as_ref().and_then(|c| c.get(&key)).cloned();
            let result = match cached {
                Some(result) => {
                    if !json {
                        println!("✔ キャッシュから取得");
                    }
                    result
                }
                None => {
                    if !json {
                        println!("🔎 分類中...{}", if offline { " (オフライン)" } else { "" });
                    }
                    let result = classifier.classify(&descriptor, image_bytes.as_deref()).await?;

                    if let Some(c) = result_cache.as_mut() {
                        c.insert(key, descriptor.title.clone(), result.clone());
                        c.save(&cache_dir).context("キャッシュの保存に失敗")?;
                    }
                    result
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
        }

        Commands::Batch { input, output, offline } => {
            println!("📦 hts-classify - 一括分類\n");

            let items = batch::load_batch(&input)
                .with_context(|| format!("入力ファイルを読み込めません: {}", input.display()))?;
            println!("✔ {}件の商品を読み込み\n", items.len());

            let classifier = build_classifier(&config, offline)?;
            let base_dir = input.parent().unwrap_or(Path::new("."));
            let records = batch::classify_batch(&classifier, items, base_dir, true).await;

            let failed = records.iter().filter(|r| r.error.is_some()).count();
            let review = records
                .iter()
                .filter(|r| r.result.as_ref().is_some_and(|res| res.needs_human_review()))
                .count();

            let output = output.unwrap_or_else(|| default_output_path(&input));
            let json = serde_json::to_string_pretty(&records)?;
            std::fs::write(&output, json)
                .with_context(|| format!("結果を書き込めません: {}", output.display()))?;

            println!("✔ 結果を保存: {}", output.display());
            println!("  要確認: {}件 / エラー: {}件", review, failed);
            println!("\n✅ 一括分類完了");
        }

        Commands::Catalog { code } => {
            let catalog = load_catalog(&config)?;
            match code {
                Some(code) => {
                    let entry = catalog
                        .get(&code)
                        .with_context(|| format!("カタログにないコード: {}", code))?;
                    println!("{}  {}", entry.code, entry.description);
                    println!("  カテゴリ: {}", entry.category);
                    if !entry.tariff_rate_hint.is_empty() {
                        println!("  税率目安: {}", entry.tariff_rate_hint);
                    }
                    for term in &entry.trigger_terms {
                        println!("  - {} ({:?})", term.term, term.weight_class);
                    }
                }
                None => {
                    println!("カタログ: {}件", catalog.len());
                    for entry in catalog.entries() {
                        println!("  {:<12} {:<14} {}", entry.code, entry.category, entry.description);
                    }
                }
            }
        }

        Commands::Config { set_gemini_key, show } => {
            if let Some(key) = set_gemini_key {
                config.set_gemini_api_key(key)?;
                println!("✔ Gemini APIキーを設定しました");
            }

            if show {
                println!("設定:");
                println!("  意味照合: {} ({})",
                    if config.semantic_enabled { "有効" } else { "無効" },
                    config.semantic_provider.command_name());
                println!("  公式レジストリ: {} ({})",
                    if config.registry_enabled { "有効" } else { "無効" },
                    config.registry_base_url);
                println!("  画像モデル: {}", config.image_model);
                println!("  最大画像サイズ: {}px", config.max_image_size);
                println!("  タイムアウト: {}秒", config.collaborator_timeout().as_secs());
                println!("  カタログ: {}", config
                    .catalog_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "組み込み".to_string()));
                println!("  APIキー: {}", if config.get_gemini_api_key().is_ok() { "設定済み" } else { "未設定" });
            }
        }

        Commands::Cache { clear, info } => {
            let target = cache::ResultCache::default_dir();
            let cache_path = cache::ResultCache::cache_path(&target);

            if info || !clear {
                if cache_path.exists() {
                    let result_cache = cache::ResultCache::load(&target);
                    println!("キャッシュ情報:");
                    println!("  パス: {}", cache_path.display());
                    println!("  件数: {}", result_cache.len());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("キャッシュファイルが存在しません: {}", cache_path.display());
                }
            }

            if clear {
                match cache::ResultCache::clear(&target) {
                    Ok(true) => println!("✔ キャッシュを削除しました: {}", cache_path.display()),
                    Ok(false) => println!("キャッシュファイルが存在しません"),
                    Err(e) => println!("キャッシュ削除エラー: {}", e),
                }
            }
        }
    }

    Ok(())
}

fn load_catalog(config: &Config) -> anyhow::Result<Catalog> {
    match &config.catalog_path {
        Some(path) => Catalog::from_json_file(path)
            .with_context(|| format!("カタログを読み込めません: {}", path.display())),
        None => Ok(Catalog::builtin()),
    }
}

fn build_classifier(config: &Config, offline: bool) -> anyhow::Result<Classifier> {
    let catalog = Arc::new(load_catalog(config)?);
    if offline {
        return Ok(Classifier::offline(catalog));
    }
    Classifier::from_config(config, catalog).context("協調先の初期化に失敗")
}

/// input.json → input.result.json
fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "batch".to_string());
    input.with_file_name(format!("{}.result.json", stem))
}

fn print_result(result: &PredictionResult) {
    println!();
    for (i, c) in result.candidates().iter().enumerate() {
        println!(
            "{}. {}  {:>3.0}%  {}{}",
            i + 1,
            c.code,
            c.confidence,
            c.description,
            if c.is_officially_validated { "  [公式確認済]" } else { "" }
        );
        println!("   出所: {} / カテゴリ: {}", c.source, c.category);
        if let Some(hint) = &c.tariff_rate_hint {
            println!("   税率目安: {}", hint);
        }
        for reason in &c.reasoning {
            println!("   - {}", reason);
        }
    }

    println!("\n全体信頼度: {:.0}%", result.overall_confidence());
    if result.needs_human_review() {
        println!("⚠ 要確認:");
        for reason in result.review_reasons() {
            println!("  - {}", reason);
        }
    } else {
        println!("✅ 自動判定可");
    }
}
