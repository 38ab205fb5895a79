use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// 意味照合に使うAI CLI
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Claude,
    Codex,
    Gemini,
}

impl AiProvider {
    pub fn command_name(&self) -> &'static str {
        match self {
            AiProvider::Claude => "claude",
            AiProvider::Codex => "codex",
            AiProvider::Gemini => "gemini",
        }
    }

    /// 非対話モードでプロンプトを渡す引数
    pub fn prompt_args(&self, prompt: &str) -> Vec<String> {
        match self {
            AiProvider::Claude => vec![
                "-p".into(),
                prompt.into(),
                "--output-format".into(),
                "text".into(),
            ],
            AiProvider::Codex => vec!["exec".into(), prompt.into()],
            AiProvider::Gemini => vec!["-p".into(), prompt.into()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claude_args() {
        let args = AiProvider::Claude.prompt_args("hello");
        assert_eq!(args, vec!["-p", "hello", "--output-format", "text"]);
    }

    #[test]
    fn test_codex_args() {
        assert_eq!(AiProvider::Codex.prompt_args("hi"), vec!["exec", "hi"]);
        assert_eq!(AiProvider::Codex.command_name(), "codex");
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&AiProvider::Gemini).unwrap();
        assert_eq!(json, "\"gemini\"");
    }
}
