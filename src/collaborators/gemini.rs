//! Gemini API連携（画像解析）
//!
//! 画像を縮小・JPEG化して base64 で送り、素材と商品種別を受け取る。
//! 応答の信頼度（0〜1）はパーサーで 0〜100 に変換する。

use super::ImageAnalyzer;
use crate::error::{ClassifierError, Result};
use async_trait::async_trait;
use base64::Engine as _;
use hts_common::{parse_image_response, ImageFindings, IMAGE_ANALYSIS_PROMPT};
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::time::Duration;

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini APIリクエスト
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Gemini APIレスポンス
#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Deserialize)]
struct ResponseCandidate {
    content: ResponseContent,
}

#[derive(Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

pub struct GeminiImageAnalyzer {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_image_size: u32,
}

impl GeminiImageAnalyzer {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_image_size: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_API_BASE.to_string(),
            max_image_size,
        })
    }

    /// APIの接続先を差し替える（テスト用）
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// 長辺を max_size 以下に縮小して JPEG にする
pub fn prepare_image(bytes: &[u8], max_size: u32) -> Result<Vec<u8>> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| ClassifierError::ImageLoad(e.to_string()))?;

    let img = if img.width() > max_size || img.height() > max_size {
        img.resize(max_size, max_size, image::imageops::FilterType::Triangle)
    } else {
        img
    };

    // JPEGはアルファを持てない
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buffer = Cursor::new(Vec::new());
    rgb.write_to(&mut buffer, ImageFormat::Jpeg)
        .map_err(|e| ClassifierError::ImageLoad(e.to_string()))?;
    Ok(buffer.into_inner())
}

#[async_trait]
impl ImageAnalyzer for GeminiImageAnalyzer {
    async fn analyze(&self, image: &[u8]) -> Result<ImageFindings> {
        let jpeg = prepare_image(image, self.max_image_size)?;

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: IMAGE_ANALYSIS_PROMPT.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/jpeg".to_string(),
                            data: base64::engine::general_purpose::STANDARD.encode(&jpeg),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                response_mime_type: "application/json".to_string(),
            },
        };

        // キーはURLに載せずヘッダーで送る
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ClassifierError::SourceUnavailable {
                source_name: "image analyzer",
                reason: e.without_url().to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifierError::SourceUnavailable {
                source_name: "image analyzer",
                reason: format!("HTTP {}", status),
            });
        }

        let payload: GeminiResponse = response.json().await.map_err(|e| {
            ClassifierError::MalformedResponse {
                source_name: "image analyzer",
                reason: e.without_url().to_string(),
            }
        })?;
        let text = payload
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .unwrap_or_default();

        parse_image_response(text).map_err(|e| ClassifierError::MalformedResponse {
            source_name: "image analyzer",
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([200, 100, 50, 128]));
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_prepare_image_downscales() {
        let jpeg = prepare_image(&png_bytes(400, 200), 100).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 100);
        assert_eq!(decoded.height(), 50);
    }

    #[test]
    fn test_prepare_image_keeps_small_images() {
        let jpeg = prepare_image(&png_bytes(40, 30), 100).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (40, 30));
    }

    #[test]
    fn test_prepare_image_rejects_garbage() {
        let result = prepare_image(b"not an image", 100);
        assert!(matches!(result, Err(ClassifierError::ImageLoad(_))));
    }
}
