/*!
 * Structured Tracing
 * Subscriber bootstrap and per-wait spans using the tracing crate
 *
 * Features:
 * - EnvFilter driven levels (RUST_LOG)
 * - JSON-formatted logs for structured parsing
 * - One span per blocking wait with its outcome and duration
 */

use crate::core::id::WaitSessionId;
use crate::core::limits::ENV_TRACE_JSON;
use crate::core::sync::{MatchCondition, WaitOutcome};
use std::time::{Duration, Instant};
use tracing::{debug, span, Level};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Waits blocked longer than this are reported at debug level as slow
const SLOW_WAIT: Duration = Duration::from_millis(100);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - MULTIWAIT_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_file(true)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        debug!(json = use_json, "structured tracing initialized");
    }
    installed
}

/// Span covering one wait call
pub struct WaitSpan {
    span: tracing::Span,
    start: Instant,
}

impl WaitSpan {
    pub fn new(session: WaitSessionId, objects: usize, condition: MatchCondition) -> Self {
        let span = span!(
            Level::TRACE,
            "wait",
            session = %session,
            objects,
            condition = ?condition,
            outcome = tracing::field::Empty,
            duration_us = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
        }
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Record the resolution and close the span
    pub fn finish(self, outcome: WaitOutcome) {
        let elapsed = self.start.elapsed();
        self.span.record("outcome", tracing::field::display(outcome));
        self.span.record("duration_us", elapsed.as_micros() as u64);

        if elapsed > SLOW_WAIT {
            let _entered = self.span.enter();
            debug!(
                %outcome,
                duration_ms = elapsed.as_millis() as u64,
                slow = true,
                "long wait finished"
            );
        }
    }
}
