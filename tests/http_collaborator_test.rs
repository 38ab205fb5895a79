//! HTTP協調先（公式レジストリ・Gemini）のテスト
//!
//! wiremock でAPIを差し替えて検証

use hts_classifier::collaborators::{
    GeminiImageAnalyzer, ImageAnalyzer, RegistryLookup, UsitcRegistryLookup,
};
use hts_classifier::error::ClassifierError;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde_json::json;
use std::io::Cursor;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn registry(server: &MockServer, max_results: usize) -> UsitcRegistryLookup {
    UsitcRegistryLookup::new(server.uri(), max_results, TIMEOUT).unwrap()
}

/// USITCの行をコード・税率目安に変換（見出し行・不正コードは除外）
#[tokio::test]
async fn test_registry_maps_usitc_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("keyword", "cotton t-shirt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"htsno": "6109", "description": "T-shirts, singlets, tank tops", "general": "", "indent": "0"},
            {"htsno": "", "description": "Of cotton:", "general": ""},
            {"htsno": "6109.10.00", "description": "Of cotton", "general": "16.5%", "indent": "1"},
            {"htsno": "N/A", "description": "bogus"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let matches = registry(&server, 5).search("cotton t-shirt").await.unwrap();

    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].code, "6109");
    assert_eq!(matches[1].code, "6109.10.00");
    assert_eq!(matches[1].tariff_rate_hint, "16.5%");
}

/// 件数上限で切り詰める
#[tokio::test]
async fn test_registry_truncates_results() {
    let server = MockServer::start().await;
    let rows: Vec<_> = (10..20)
        .map(|i| json!({"htsno": format!("6109.{}.00", i), "description": "row"}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(&server)
        .await;

    let matches = registry(&server, 3).search("shirt").await.unwrap();
    assert_eq!(matches.len(), 3);
    assert_eq!(matches[0].code, "6109.10.00");
}

/// HTTPエラーは協調先の応答なし
#[tokio::test]
async fn test_registry_http_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = registry(&server, 5).search("mug").await.unwrap_err();
    assert!(matches!(err, ClassifierError::SourceUnavailable { .. }));
    assert!(err.is_source_failure());
}

/// 配列でない応答は不正レスポンス
#[tokio::test]
async fn test_registry_non_array_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = registry(&server, 5).search("mug").await.unwrap_err();
    assert!(matches!(err, ClassifierError::MalformedResponse { .. }));
}

fn jpeg_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(64, 48, Rgb([180, 120, 90]));
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .unwrap();
    buffer.into_inner()
}

fn gemini_reply(text: &str) -> serde_json::Value {
    json!({
        "candidates": [
            {"content": {"parts": [{"text": text}]}}
        ]
    })
}

fn analyzer(server: &MockServer) -> GeminiImageAnalyzer {
    GeminiImageAnalyzer::new("test-key", "gemini-2.0-flash", 1568, TIMEOUT)
        .unwrap()
        .with_base_url(server.uri())
}

/// 信頼度 0〜1 を 0〜100 に変換
#[tokio::test]
async fn test_gemini_findings_are_normalized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(
            r#"{"materials": ["Ceramic"], "productType": "mug", "confidence": 0.8}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let findings = analyzer(&server).analyze(&jpeg_bytes()).await.unwrap();

    assert_eq!(findings.product_type, "mug");
    assert_eq!(findings.materials.len(), 1);
    assert!((findings.confidence - 80.0).abs() < 1e-9);
}

/// 0〜100 スケールで返された信頼度は推測せず不正扱い
#[tokio::test]
async fn test_gemini_out_of_scale_confidence_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gemini_reply(
            r#"{"materials": [], "productType": "mug", "confidence": 80}"#,
        )))
        .mount(&server)
        .await;

    let err = analyzer(&server).analyze(&jpeg_bytes()).await.unwrap_err();
    assert!(matches!(err, ClassifierError::MalformedResponse { .. }));
}

/// 読めない画像はAPIを呼ばずにエラー
#[tokio::test]
async fn test_gemini_unreadable_image_never_calls_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = analyzer(&server).analyze(b"not an image").await.unwrap_err();
    assert!(matches!(err, ClassifierError::ImageLoad(_)));
}

/// 接続失敗のエラーにAPIキーが含まれない
#[tokio::test]
async fn test_gemini_connection_error_hides_api_key() {
    let analyzer = GeminiImageAnalyzer::new("SECRET-KEY-123", "m", 1568, TIMEOUT)
        .unwrap()
        .with_base_url("http://127.0.0.1:1");

    let err = analyzer.analyze(&jpeg_bytes()).await.unwrap_err();
    assert!(matches!(err, ClassifierError::SourceUnavailable { .. }));
    assert!(!err.to_string().contains("SECRET-KEY-123"));
    assert!(!format!("{:?}", err).contains("SECRET-KEY-123"));
}

/// 応答の解析失敗のエラーにAPIキーが含まれない
#[tokio::test]
async fn test_gemini_decode_error_hides_api_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/m:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    let analyzer = GeminiImageAnalyzer::new("SECRET-KEY-123", "m", 1568, TIMEOUT)
        .unwrap()
        .with_base_url(server.uri());

    let err = analyzer.analyze(&jpeg_bytes()).await.unwrap_err();
    assert!(matches!(err, ClassifierError::MalformedResponse { .. }));
    assert!(!err.to_string().contains("SECRET-KEY-123"));

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0].url.as_str().contains("SECRET-KEY-123"));
}
