use std::path::{Path, PathBuf};

use crate::domain::error::AppError;
use crate::domain::settings::AppSettings;

/// 設定ファイルパスを上書きする環境変数
pub const SETTINGS_PATH_ENV: &str = "VA_SETTINGS_PATH";
pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const SPEECH_API_KEY_ENV: &str = "GOOGLE_SPEECH_API_KEY";

/// JSON 設定ファイルの読み書き
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 既定パス: $VA_SETTINGS_PATH → <config_dir>/voice-assistant/settings.json
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(SETTINGS_PATH_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voice-assistant")
            .join("settings.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 設定を読み込む。ファイルがなければデフォルト値。
    pub fn load(&self) -> Result<AppSettings, AppError> {
        if !self.path.exists() {
            log::debug!("設定ファイルなし、デフォルトを使用: {:?}", self.path);
            return Ok(AppSettings::default());
        }

        let raw = std::fs::read_to_string(&self.path)
            .map_err(|e| AppError::config(format!("設定ファイル読み込み失敗: {e}")))?;
        serde_json::from_str(&raw)
            .map_err(|e| AppError::config(format!("設定ファイルの形式が不正: {e}")))
    }

    /// 設定を保存する（親ディレクトリは自動作成）
    pub fn save(&self, settings: &AppSettings) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::config(format!("設定ディレクトリ作成失敗: {e}")))?;
        }
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| AppError::internal(format!("settings serialize: {e}")))?;
        std::fs::write(&self.path, json)
            .map_err(|e| AppError::config(format!("設定ファイル書き込み失敗: {e}")))?;
        log::info!("設定を保存: {:?}", self.path);
        Ok(())
    }

    /// 環境変数で API キーを上書きする
    pub fn apply_env(settings: &mut AppSettings) {
        Self::apply_overrides(settings, |name| std::env::var(name).ok());
    }

    fn apply_overrides(settings: &mut AppSettings, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(GEMINI_API_KEY_ENV).filter(|k| !k.is_empty()) {
            settings.gemini_api_key = Some(key);
        }
        if let Some(key) = lookup(SPEECH_API_KEY_ENV).filter(|k| !k.is_empty()) {
            settings.speech_api_key = Some(key);
        }
    }
}
