use va_core::domain::conversation::Turn;
use va_core::domain::types::Mode;
use va_core::infra::metrics::MetricsSummary;
use va_core::usecase::assistant::ExchangeOutcome;

pub const HELP: &str = "\
Commands:
  <message>          send a message (text mode) or a WAV path (voice mode)
  /mode text|voice   switch conversation
  /voice <file.wav>  send a recorded utterance to the voice conversation
  /record <seconds>  record from the microphone (microphone builds only)
  /clear             clear the current conversation
  /history           show the current conversation
  /key <api-key>     set the Gemini API key (empty to clear)
  /metrics           show counters and latencies
  /help              show this help
  /quit              exit";

/// 1ターンを表示用に整形する
pub fn turn(t: &Turn) -> String {
    let mut out = String::new();
    if let Some(user) = &t.user_utterance {
        out.push_str(&format!("you: {user}\n"));
    }
    match (&t.model_reply, t.failure) {
        (Some(reply), Some(code)) => out.push_str(&format!("! [{}] {reply}", code.as_str())),
        (Some(reply), None) => out.push_str(&format!("assistant: {reply}")),
        (None, _) => out.push_str("assistant: ..."),
    }
    out
}

/// 交換結果を表示用に整形する
pub fn outcome(o: &ExchangeOutcome) -> String {
    let Some(t) = &o.turn else {
        return "(no audio; conversation unchanged)".to_string();
    };

    let mut out = turn(t);
    if let Some(audio) = &o.audio {
        out.push_str(&format!(
            "\n♪ {} ({}, {} bytes)",
            audio.path.display(),
            audio.language,
            audio.bytes
        ));
    }
    out
}

pub fn history(mode: Mode, turns: &[Turn]) -> String {
    if turns.is_empty() {
        return format!("({} conversation is empty)", mode.as_str());
    }
    turns
        .iter()
        .enumerate()
        .map(|(i, t)| format!("#{}\n{}", i + 1, turn(t)))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn metrics(summary: &MetricsSummary) -> String {
    serde_json::to_string_pretty(summary).unwrap_or_else(|e| format!("metrics unavailable: {e}"))
}
