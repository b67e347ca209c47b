use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;

use crate::domain::error::ErrorCode;
use crate::domain::types::Mode;

/// 保持するレイテンシ記録の上限
const MAX_LATENCY_RECORDS: usize = 1000;

/// ローカルメトリクス収集器
pub struct Metrics {
    counters: Mutex<MetricsCounters>,
    latencies: Mutex<Vec<LatencyRecord>>,
}

#[derive(Debug, Default)]
struct MetricsCounters {
    text_turns: u64,
    voice_turns: u64,
    replies_generated: u64,
    speech_synthesized: u64,
    errors: HashMap<ErrorCode, u64>,
}

/// 計測フェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Recognize,
    Generate,
    Synthesize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LatencyRecord {
    pub phase: Phase,
    pub duration_ms: u64,
    pub timestamp: String,
}

/// メトリクスサマリー（フロントエンド表示用）
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSummary {
    pub text_turns: u64,
    pub voice_turns: u64,
    pub replies_generated: u64,
    pub speech_synthesized: u64,
    pub error_counts: ErrorCounts,
    pub avg_latency_ms: AvgLatency,
    pub recent_latencies: Vec<LatencyRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorCounts {
    pub recognition: u64,
    pub generation: u64,
    pub missing_api_key: u64,
    pub synthesis: u64,
    pub other: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvgLatency {
    pub recognize: Option<f64>,
    pub generate: Option<f64>,
    pub synthesize: Option<f64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            counters: Mutex::new(MetricsCounters::default()),
            latencies: Mutex::new(Vec::new()),
        }
    }

    pub fn inc_turns(&self, mode: Mode) {
        let mut c = self.counters.lock();
        match mode {
            Mode::Text => c.text_turns += 1,
            Mode::Voice => c.voice_turns += 1,
        }
    }

    pub fn inc_replies_generated(&self) {
        self.counters.lock().replies_generated += 1;
    }

    pub fn inc_speech_synthesized(&self) {
        self.counters.lock().speech_synthesized += 1;
    }

    pub fn inc_error(&self, code: ErrorCode) {
        *self.counters.lock().errors.entry(code).or_default() += 1;
    }

    pub fn record_latency(&self, phase: Phase, duration_ms: u64) {
        let record = LatencyRecord {
            phase,
            duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };
        let mut latencies = self.latencies.lock();
        latencies.push(record);
        if latencies.len() > MAX_LATENCY_RECORDS {
            let excess = latencies.len() - MAX_LATENCY_RECORDS;
            latencies.drain(0..excess);
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let c = self.counters.lock();
        let latencies = self.latencies.lock();

        let avg = |phase: Phase| -> Option<f64> {
            let vals: Vec<f64> = latencies
                .iter()
                .filter(|r| r.phase == phase)
                .map(|r| r.duration_ms as f64)
                .collect();
            if vals.is_empty() {
                None
            } else {
                Some(vals.iter().sum::<f64>() / vals.len() as f64)
            }
        };

        let count = |code: ErrorCode| c.errors.get(&code).copied().unwrap_or(0);
        let known = [
            ErrorCode::Recognition,
            ErrorCode::Generation,
            ErrorCode::MissingApiKey,
            ErrorCode::Synthesis,
        ];
        let other: u64 = c
            .errors
            .iter()
            .filter(|(code, _)| !known.contains(*code))
            .map(|(_, n)| *n)
            .sum();

        let recent: Vec<LatencyRecord> = latencies.iter().rev().take(20).cloned().collect();

        MetricsSummary {
            text_turns: c.text_turns,
            voice_turns: c.voice_turns,
            replies_generated: c.replies_generated,
            speech_synthesized: c.speech_synthesized,
            error_counts: ErrorCounts {
                recognition: count(ErrorCode::Recognition),
                generation: count(ErrorCode::Generation),
                missing_api_key: count(ErrorCode::MissingApiKey),
                synthesis: count(ErrorCode::Synthesis),
                other,
            },
            avg_latency_ms: AvgLatency {
                recognize: avg(Phase::Recognize),
                generate: avg(Phase::Generate),
                synthesize: avg(Phase::Synthesize),
            },
            recent_latencies: recent,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
