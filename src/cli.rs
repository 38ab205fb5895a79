use clap::{Parser, Subcommand};
use crate::ai_provider::AiProvider;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hts-classify")]
#[command(about = "商品情報から関税分類コード（HS/HTS）を推定するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 意味照合に使うAIプロバイダ（設定ファイルより優先）
    #[arg(long, global = true)]
    pub ai_provider: Option<AiProvider>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 商品1件を分類
    Classify {
        /// 商品タイトル
        #[arg(short, long, default_value = "")]
        title: String,

        /// 商品説明
        #[arg(short, long, default_value = "")]
        description: String,

        /// カテゴリのヒント
        #[arg(short, long, default_value = "")]
        category: String,

        /// 素材のヒント
        #[arg(short, long, default_value = "")]
        materials: String,

        /// 商品画像
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// 協調先を使わない（キーワード照合のみ）
        #[arg(long)]
        offline: bool,

        /// キャッシュを使用（再分類をスキップ）
        #[arg(long)]
        use_cache: bool,

        /// 結果をJSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 商品情報のJSON配列を一括分類
    Batch {
        /// 入力JSONファイル
        #[arg(required = true)]
        input: PathBuf,

        /// 出力JSONファイル（デフォルト: 入力ファイル名.result.json）
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 協調先を使わない（キーワード照合のみ）
        #[arg(long)]
        offline: bool,
    },

    /// カタログを表示
    Catalog {
        /// 指定コードのトリガー語を表示
        #[arg(long)]
        code: Option<String>,
    },

    /// 設定を管理
    Config {
        /// Gemini APIキーを設定
        #[arg(long)]
        set_gemini_key: Option<String>,

        /// 現在の設定を表示
        #[arg(long)]
        show: bool,
    },

    /// キャッシュを管理
    Cache {
        /// キャッシュを削除
        #[arg(long)]
        clear: bool,

        /// キャッシュ情報を表示
        #[arg(long)]
        info: bool,
    },
}
