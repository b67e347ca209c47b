use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::domain::conversation::{Conversation, ConversationHandle, ConversationState, Turn};
use crate::domain::error::{AppError, ErrorCode};
use crate::domain::stt::{AudioInput, SttContext, SttEngine, SttError};
use crate::domain::types::{Message, Mode};
use crate::infra::lang;
use crate::infra::llm::ChatModel;
use crate::infra::metrics::{Metrics, MetricsSummary, Phase};
use crate::infra::post_processor::PostProcessor;
use crate::infra::tts::{AudioHandle, SpeechSynthesizer, SynthesisError};

/// 1回の交換（ユーザー操作1回分）の結果
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeOutcome {
    pub mode: Mode,
    /// 追加または完了した最終ターン（履歴が変化しなかった場合は None）
    pub turn: Option<Turn>,
    pub state: ConversationState,
    /// 音声モードで合成された応答音声
    pub audio: Option<AudioHandle>,
}

/// アシスタントサービス（フロントエンドが所有する）。
///
/// テキストモードと音声モードはそれぞれ独立した会話を持つ。
/// 各会話のロックは交換全体（追加→スナップショット→生成→コミット）の間保持されるため、
/// 同じ会話への同時操作は直列化される。
pub struct AssistantService {
    text: ConversationHandle,
    voice: ConversationHandle,
    stt_engine: Arc<dyn SttEngine>,
    model: Arc<dyn ChatModel>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    stt_context: SttContext,
    fallback_language: String,
    metrics: Metrics,
}

impl AssistantService {
    pub fn new(
        stt_engine: Arc<dyn SttEngine>,
        model: Arc<dyn ChatModel>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        stt_context: SttContext,
        fallback_language: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        let new_conversation = |mode: Mode| {
            Conversation::new(uuid::Uuid::new_v4().to_string(), mode, now.clone()).into_handle()
        };

        log::info!(
            "Assistant ready: stt={}, model={}, tts={}",
            stt_engine.name(),
            model.name(),
            synthesizer.name()
        );

        Self {
            text: new_conversation(Mode::Text),
            voice: new_conversation(Mode::Voice),
            stt_engine,
            model,
            synthesizer,
            stt_context,
            fallback_language: fallback_language.into(),
            metrics: Metrics::new(),
        }
    }

    // ==================== Text Mode ====================

    /// 入力テキストを1ターンとして送信し、モデル応答をコミットする
    pub async fn chat_text(&self, message: &str) -> Result<ExchangeOutcome, AppError> {
        let utterance = PostProcessor::utterance(message)
            .ok_or_else(|| AppError::invalid_input("メッセージが空です"))?;

        let mut conv = self.text.lock().await;

        if let Err(e) = self.model.ensure_ready() {
            self.push_failure(&mut conv, Some(utterance), e.code(), e.to_string())?;
            return Ok(Self::outcome(&conv, None));
        }

        conv.append_user_turn(utterance)?;
        self.metrics.inc_turns(Mode::Text);
        self.generate_into(&mut conv).await?;

        Ok(Self::outcome(&conv, None))
    }

    // ==================== Voice Mode ====================

    /// 音声を文字起こしして1ターンとして送信し、応答を読み上げ音声にする。
    /// audio が None の場合は履歴を変更しない。
    pub async fn chat_voice(
        &self,
        audio: Option<&AudioInput>,
    ) -> Result<ExchangeOutcome, AppError> {
        let mut conv = self.voice.lock().await;

        if let Err(e) = self.model.ensure_ready() {
            self.push_failure(&mut conv, None, e.code(), e.to_string())?;
            return Ok(Self::outcome(&conv, None));
        }

        let Some(audio) = audio else {
            return Ok(ExchangeOutcome {
                mode: Mode::Voice,
                turn: None,
                state: conv.state(),
                audio: None,
            });
        };

        let utterance = match self.recognize(audio).await {
            Ok(text) => text,
            Err(e) => {
                self.push_failure(&mut conv, None, ErrorCode::Recognition, e.to_string())?;
                return Ok(Self::outcome(&conv, None));
            }
        };

        conv.append_user_turn(utterance)?;
        self.metrics.inc_turns(Mode::Voice);
        self.generate_into(&mut conv).await?;

        let reply = conv.last_turn().and_then(|t| t.model_reply.clone());
        let mut outcome = Self::outcome(&conv, None);
        // 読み上げは会話状態を変更しないのでロックを解放してから行う
        drop(conv);

        if let Some(reply) = reply {
            outcome.audio = self.speak(&reply).await;
        }
        Ok(outcome)
    }

    // ==================== Conversation Control ====================

    /// 指定モードの会話を消去する
    pub async fn clear(&self, mode: Mode) {
        let mut conv = self.conversation(mode).lock().await;
        conv.clear();
        log::info!("{} conversation cleared", mode.as_str());
    }

    /// 指定モードの全ターンのスナップショット
    pub async fn turns(&self, mode: Mode) -> Vec<Turn> {
        self.conversation(mode).lock().await.turns().to_vec()
    }

    pub async fn state(&self, mode: Mode) -> ConversationState {
        self.conversation(mode).lock().await.state()
    }

    pub fn conversation(&self, mode: Mode) -> &ConversationHandle {
        match mode {
            Mode::Text => &self.text,
            Mode::Voice => &self.voice,
        }
    }

    pub fn metrics(&self) -> MetricsSummary {
        self.metrics.summary()
    }

    // ==================== Internals ====================

    /// 文字起こし + 正規化。空の結果は NoSpeech として扱う。
    async fn recognize(&self, audio: &AudioInput) -> Result<String, SttError> {
        let start = Instant::now();
        let result = self.stt_engine.transcribe(audio, &self.stt_context).await;
        self.metrics
            .record_latency(Phase::Recognize, start.elapsed().as_millis() as u64);

        let recognition = result?;
        log::debug!(
            "Recognized ({}, confidence {:?}): {}",
            recognition.language,
            recognition.confidence,
            recognition.text
        );
        PostProcessor::utterance(&recognition.text).ok_or_else(SttError::no_speech)
    }

    /// 現在のトランスクリプトでモデルを呼び、応答または失敗を最終ターンにコミットする
    async fn generate_into(&self, conv: &mut Conversation) -> Result<(), AppError> {
        let transcript: Vec<Message<'_>> = conv.to_transcript().collect();

        let start = Instant::now();
        let result = self.model.generate(&transcript).await;
        self.metrics
            .record_latency(Phase::Generate, start.elapsed().as_millis() as u64);

        match result {
            Ok(reply) => {
                conv.commit_model_reply(reply)?;
                self.metrics.inc_replies_generated();
            }
            Err(e) => {
                log::warn!("生成失敗 ({}): {e}", self.model.name());
                self.metrics.inc_error(e.code());
                conv.commit_failure(e.code(), e.to_string())?;
            }
        }
        Ok(())
    }

    /// 応答テキストを判定言語で読み上げる。失敗しても会話は継続する。
    async fn speak(&self, text: &str) -> Option<AudioHandle> {
        let language = lang::detect_or(text, &self.fallback_language);

        let start = Instant::now();
        let result = self.synthesizer.synthesize(text, language).await;
        self.metrics
            .record_latency(Phase::Synthesize, start.elapsed().as_millis() as u64);

        match result {
            Ok(handle) => {
                self.metrics.inc_speech_synthesized();
                Some(handle)
            }
            Err(SynthesisError::Disabled) => None,
            Err(e) => {
                log::warn!("読み上げ失敗 ({language}): {e}");
                self.metrics.inc_error(ErrorCode::Synthesis);
                None
            }
        }
    }

    fn push_failure(
        &self,
        conv: &mut Conversation,
        utterance: Option<String>,
        code: ErrorCode,
        message: String,
    ) -> Result<(), AppError> {
        log::warn!("[{}] {} turn failed: {message}", code.as_str(), conv.mode.as_str());
        self.metrics.inc_error(code);
        conv.push_failed_turn(utterance, code, message)
    }

    fn outcome(conv: &Conversation, audio: Option<AudioHandle>) -> ExchangeOutcome {
        ExchangeOutcome {
            mode: conv.mode,
            turn: conv.last_turn().cloned(),
            state: conv.state(),
            audio,
        }
    }
}
