mod commands;
mod render;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use va_core::domain::settings::{AppSettings, SttEngineChoice};
use va_core::domain::stt::{SttContext, SttEngine};
use va_core::infra::llm::{ChatModel, EchoModel, GeminiClient, GeminiConfig};
use va_core::infra::settings_store::SettingsStore;
use va_core::infra::stt::{GoogleSpeechConfig, GoogleSpeechEngine, NoopSttEngine};
use va_core::infra::tts::{GoogleTranslateTts, NoopSynthesizer, SpeechSynthesizer, TtsConfig};
use va_core::usecase::assistant::AssistantService;

use crate::commands::{CommandError, Flow, Repl};

/// Conversational assistant with text and voice (Urdu) modes backed by Gemini
#[derive(Parser)]
#[command(name = "voice-assistant", version, about)]
struct Cli {
    /// Gemini API key (overrides GEMINI_API_KEY and the settings file)
    #[arg(long)]
    api_key: Option<String>,

    /// Google Speech-to-Text API key (overrides GOOGLE_SPEECH_API_KEY and the settings file)
    #[arg(long)]
    speech_api_key: Option<String>,

    /// Settings file path
    #[arg(long, env = "VA_SETTINGS_PATH")]
    settings: Option<PathBuf>,

    /// Do not synthesize spoken replies in voice mode
    #[arg(long)]
    no_tts: bool,

    /// Run without network services (echo model, fixed transcription)
    #[arg(long)]
    offline: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn,va_core=info",
        1 => "info,va_core=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let store = SettingsStore::new(cli.settings.clone().unwrap_or_else(SettingsStore::default_path));
    let mut settings = store.load()?;
    SettingsStore::apply_env(&mut settings);
    if let Some(key) = cli.api_key.clone() {
        settings.gemini_api_key = Some(key);
    }
    if let Some(key) = cli.speech_api_key.clone() {
        settings.speech_api_key = Some(key);
    }
    if cli.no_tts {
        settings.tts_enabled = false;
    }

    tracing::info!(
        settings = %store.path().display(),
        offline = cli.offline,
        tts = settings.tts_enabled,
        stt_language = %settings.stt_language,
        "starting voice assistant"
    );

    let (model, gemini) = create_model(&settings, cli.offline);
    let service = AssistantService::new(
        create_stt_engine(&settings, cli.offline),
        model,
        create_synthesizer(&settings, cli.offline),
        SttContext {
            language: settings.stt_language.clone(),
        },
        settings.fallback_language.clone(),
    );

    if gemini.as_ref().is_some_and(|g| g.config().api_key.is_none()) {
        println!("No Gemini API key configured. Use /key <api-key> or set GEMINI_API_KEY.");
    }
    println!("Type /help for commands.");

    let mut repl = Repl::new(service, gemini, store);
    repl_loop(&mut repl).await
}

async fn repl_loop(repl: &mut Repl) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", repl.prompt());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let Some(parsed) = commands::parse(&line, repl.mode) else {
            continue;
        };

        let cmd = match parsed {
            Ok(cmd) => cmd,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match repl.execute(cmd).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Quit) => break,
            Err(CommandError::App(e)) => {
                tracing::warn!(code = e.code.as_str(), recoverable = e.recoverable, "{}", e.message);
                println!("{e}");
            }
            Err(e) => println!("{e}"),
        }
    }
    Ok(())
}

/// 会話モデルを構築する（Gemini クライアントは /key 用に別途返す）
fn create_model(
    settings: &AppSettings,
    offline: bool,
) -> (Arc<dyn ChatModel>, Option<Arc<GeminiClient>>) {
    if offline {
        tracing::info!("Offline mode: using echo model");
        let model: Arc<dyn ChatModel> = Arc::new(EchoModel);
        return (model, None);
    }

    let client = Arc::new(GeminiClient::new(GeminiConfig {
        api_key: settings.gemini_key().map(str::to_string),
        model: settings.gemini_model.clone(),
        max_output_tokens: settings.max_output_tokens,
        temperature: settings.temperature,
        timeout_secs: settings.request_timeout_secs,
    }));
    let model: Arc<dyn ChatModel> = client.clone();
    (model, Some(client))
}

/// STT エンジンを構築する（設定 + offline フラグで選択）
fn create_stt_engine(settings: &AppSettings, offline: bool) -> Arc<dyn SttEngine> {
    if offline || settings.stt_engine == SttEngineChoice::Noop {
        tracing::info!("Using Noop STT engine");
        return Arc::new(NoopSttEngine::new());
    }

    if settings.speech_key().is_none() {
        tracing::warn!("No Google Speech API key configured; voice turns will fail recognition");
    }
    Arc::new(GoogleSpeechEngine::new(GoogleSpeechConfig {
        api_key: settings.speech_key().map(str::to_string),
        timeout_secs: settings.request_timeout_secs,
        ..Default::default()
    }))
}

fn create_synthesizer(settings: &AppSettings, offline: bool) -> Arc<dyn SpeechSynthesizer> {
    if offline || !settings.tts_enabled {
        return Arc::new(NoopSynthesizer);
    }
    Arc::new(GoogleTranslateTts::new(TtsConfig {
        output_dir: settings.audio_dir.clone(),
        timeout_secs: settings.request_timeout_secs,
    }))
}
