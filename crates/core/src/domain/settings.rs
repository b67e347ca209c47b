use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// アプリケーション設定
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Gemini API キー（未設定ならチャット不可）
    pub gemini_api_key: Option<String>,
    /// 生成モデル名
    pub gemini_model: String,
    /// 最大出力トークン数
    pub max_output_tokens: u32,
    /// サンプリング温度
    pub temperature: f64,
    /// Google Speech-to-Text API キー
    pub speech_api_key: Option<String>,
    /// STTエンジン選択
    pub stt_engine: SttEngineChoice,
    /// STT 認識言語（デフォルト "ur-PK"）
    pub stt_language: String,
    /// 音声モードで応答を読み上げるか
    pub tts_enabled: bool,
    /// 言語判定に失敗したときの読み上げ言語
    pub fallback_language: String,
    /// 合成音声の出力先（None ならシステムの一時ディレクトリ）
    pub audio_dir: Option<PathBuf>,
    /// HTTP リクエストのタイムアウト秒数
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SttEngineChoice {
    Google,
    Noop,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: "gemini-1.5-flash".to_string(),
            max_output_tokens: 2048,
            temperature: 0.7,
            speech_api_key: None,
            stt_engine: SttEngineChoice::Google,
            stt_language: "ur-PK".to_string(),
            tts_enabled: true,
            fallback_language: "en".to_string(),
            audio_dir: None,
            request_timeout_secs: 30,
        }
    }
}

impl AppSettings {
    /// 空文字のキーは未設定として扱う
    pub fn gemini_key(&self) -> Option<&str> {
        self.gemini_api_key.as_deref().filter(|k| !k.trim().is_empty())
    }

    pub fn speech_key(&self) -> Option<&str> {
        self.speech_api_key.as_deref().filter(|k| !k.trim().is_empty())
    }
}
