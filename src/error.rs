use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`hts-classify config --set-gemini-key YOUR_KEY` で設定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("商品情報が不正です: タイトルと説明の両方が空です")]
    InvalidDescriptor,

    #[error("{source_name} が応答しません: {reason}")]
    SourceUnavailable { source_name: &'static str, reason: String },

    #[error("{source_name} のレスポンスが不正: {reason}")]
    MalformedResponse { source_name: &'static str, reason: String },

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] hts_common::Error),
}

impl ClassifierError {
    /// 協調先の失敗（呼び出し側で空の結果として扱う）か
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            ClassifierError::SourceUnavailable { .. }
                | ClassifierError::MalformedResponse { .. }
                | ClassifierError::CliExecution(_)
                | ClassifierError::Http(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ClassifierError>;
