use std::path::PathBuf;
use std::sync::Arc;

use va_core::domain::error::AppError;
use va_core::domain::settings::AppSettings;
use va_core::domain::stt::AudioInput;
use va_core::domain::types::Mode;
use va_core::infra::llm::GeminiClient;
use va_core::infra::settings_store::SettingsStore;
use va_core::usecase::assistant::AssistantService;

use crate::render;

/// REPL で受け付けるコマンド
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// 現在のモードへメッセージを送る（テキストモード）
    Say(String),
    /// WAV ファイルを音声モードへ送る
    Voice(PathBuf),
    /// マイクから指定秒数録音して音声モードへ送る
    Record(u64),
    SetMode(Mode),
    Clear,
    History,
    SetKey(String),
    Metrics,
    Help,
    Quit,
}

/// コマンド解析エラー
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("Unknown command: /{0} (type /help)")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
}

/// 録音秒数の上限（同期認識 API の上限に合わせる）
const MAX_RECORD_SECS: u64 = 60;

/// 1行を解析する。空行は None。
///
/// `/` で始まらない行は、テキストモードではメッセージ、音声モードでは WAV パスとして扱う。
pub fn parse(line: &str, mode: Mode) -> Option<Result<Command, ParseError>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Some(Ok(match mode {
            Mode::Text => Command::Say(line.to_string()),
            Mode::Voice => Command::Voice(PathBuf::from(line)),
        }));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let cmd = match name {
        "mode" => match arg {
            "text" => Ok(Command::SetMode(Mode::Text)),
            "voice" => Ok(Command::SetMode(Mode::Voice)),
            _ => Err(ParseError::Usage("/mode text|voice")),
        },
        "voice" if arg.is_empty() => Err(ParseError::Usage("/voice <file.wav>")),
        "voice" => Ok(Command::Voice(PathBuf::from(arg))),
        "record" => match arg.parse::<u64>() {
            Ok(secs) if (1..=MAX_RECORD_SECS).contains(&secs) => Ok(Command::Record(secs)),
            _ => Err(ParseError::Usage("/record <seconds 1-60>")),
        },
        "clear" => Ok(Command::Clear),
        "history" => Ok(Command::History),
        "key" => Ok(Command::SetKey(arg.to_string())),
        "metrics" => Ok(Command::Metrics),
        "help" | "?" => Ok(Command::Help),
        "quit" | "exit" | "q" => Ok(Command::Quit),
        other => Err(ParseError::Unknown(other.to_string())),
    };
    Some(cmd)
}

/// コマンド実行エラー
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{0}")]
    App(#[from] AppError),
    #[error("Audio recording is not available in this build (enable the `microphone` feature)")]
    RecordingUnavailable,
    #[error("API keys cannot be changed in offline mode")]
    Offline,
}

type CmdResult<T> = Result<T, CommandError>;

/// コマンド実行後の継続判定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// REPL の状態: 現在モード + サービス + 設定ファイル
pub struct Repl {
    pub mode: Mode,
    service: AssistantService,
    /// /key で差し替えるため Gemini クライアントを別に保持する（offline 時は None）
    gemini: Option<Arc<GeminiClient>>,
    store: SettingsStore,
}

impl Repl {
    pub fn new(
        service: AssistantService,
        gemini: Option<Arc<GeminiClient>>,
        store: SettingsStore,
    ) -> Self {
        Self {
            mode: Mode::Text,
            service,
            gemini,
            store,
        }
    }

    pub fn prompt(&self) -> String {
        format!("[{}] > ", self.mode.as_str())
    }

    pub async fn execute(&mut self, cmd: Command) -> CmdResult<Flow> {
        match cmd {
            Command::Say(text) => {
                let outcome = self.service.chat_text(&text).await?;
                println!("{}", render::outcome(&outcome));
            }
            Command::Voice(path) => {
                self.mode = Mode::Voice;
                let input = AudioInput::from_wav_path(path);
                let outcome = self.service.chat_voice(Some(&input)).await?;
                println!("{}", render::outcome(&outcome));
            }
            Command::Record(secs) => {
                self.mode = Mode::Voice;
                let input = record(secs).await?;
                let outcome = self.service.chat_voice(input.as_ref()).await?;
                println!("{}", render::outcome(&outcome));
            }
            Command::SetMode(mode) => {
                self.mode = mode;
                println!("Switched to {} mode", mode.as_str());
            }
            Command::Clear => {
                self.service.clear(self.mode).await;
                println!("Cleared {} conversation", self.mode.as_str());
            }
            Command::History => {
                let turns = self.service.turns(self.mode).await;
                println!("{}", render::history(self.mode, &turns));
            }
            Command::SetKey(key) => self.set_key(key)?,
            Command::Metrics => println!("{}", render::metrics(&self.service.metrics())),
            Command::Help => println!("{}", render::HELP),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Gemini API キーを差し替えて設定ファイルに保存する（空文字で解除）。
    ///
    /// 環境変数・フラグ由来の値を書き込まないよう、ファイルの内容を読み直して
    /// gemini_api_key だけを更新する。
    fn set_key(&mut self, key: String) -> CmdResult<()> {
        let gemini = self.gemini.as_ref().ok_or(CommandError::Offline)?;
        let key = Some(key).filter(|k| !k.trim().is_empty());

        gemini.set_api_key(key.clone());
        let cleared = key.is_none();

        let mut stored: AppSettings = self.store.load()?;
        stored.gemini_api_key = key;
        self.store.save(&stored)?;

        if cleared {
            println!("Gemini API key cleared");
        } else {
            println!("Gemini API key saved to {}", self.store.path().display());
        }
        Ok(())
    }
}

#[cfg(feature = "microphone")]
async fn record(secs: u64) -> CmdResult<Option<AudioInput>> {
    use std::time::Duration;
    use va_core::infra::audio;

    println!("Recording for {secs}s...");
    let started_at = chrono::Utc::now();
    let result = tokio::task::spawn_blocking(move || audio::record(Duration::from_secs(secs)))
        .await
        .map_err(|e| AppError::internal(format!("recording task failed: {e}")))?;

    match result {
        Ok(pcm) if !pcm.samples.is_empty() => Ok(Some(AudioInput::from_samples(
            pcm.samples,
            pcm.sample_rate,
            started_at,
        ))),
        Ok(_) => Ok(None),
        Err(e) => Err(AppError::device(e.to_string()).into()),
    }
}

#[cfg(not(feature = "microphone"))]
async fn record(_secs: u64) -> CmdResult<Option<AudioInput>> {
    Err(CommandError::RecordingUnavailable)
}
