//! hts-classifier
//!
//! 分類の中核（hts-common）に協調先・設定・キャッシュ・CLIをつなぐ。

pub mod ai_provider;
pub mod batch;
pub mod cache;
pub mod classifier;
pub mod cli;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod logging;

pub use classifier::Classifier;
pub use error::{ClassifierError, Result};
