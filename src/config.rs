use crate::ai_provider::AiProvider;
use crate::error::{ClassifierError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 画像解析（Gemini）のAPIキー
    pub gemini_api_key: Option<String>,
    pub image_model: String,
    /// 意味照合に使うAI CLI
    pub semantic_provider: AiProvider,
    pub semantic_enabled: bool,
    pub registry_base_url: String,
    pub registry_max_results: usize,
    pub registry_enabled: bool,
    /// 協調先ごとのタイムアウト
    pub collaborator_timeout_seconds: u64,
    pub max_image_size: u32,
    /// 外部カタログJSON（未指定なら組み込みカタログ）
    pub catalog_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            image_model: "gemini-2.0-flash".into(),
            semantic_provider: AiProvider::Claude,
            semantic_enabled: true,
            registry_base_url: "https://hts.usitc.gov/reststop".into(),
            registry_max_results: 5,
            registry_enabled: true,
            collaborator_timeout_seconds: 30,
            max_image_size: 1568,
            catalog_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| ClassifierError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("hts-classifier").join("config.json"))
    }

    pub fn get_gemini_api_key(&self) -> Result<String> {
        // 環境変数を優先
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                return Ok(key);
            }
        }

        self.gemini_api_key.clone().ok_or(ClassifierError::MissingApiKey)
    }

    pub fn set_gemini_api_key(&mut self, key: String) -> Result<()> {
        self.gemini_api_key = Some(key);
        self.save()
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_secs(self.collaborator_timeout_seconds.max(1))
    }
}
