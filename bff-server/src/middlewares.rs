use http::Request;
use tower_http::trace::MakeSpan;
use tracing::{Level, Span};

pub const TRACE_ID: &str = "X-Trace-Id";

/// Request span tagged with the trace id. Headers are never recorded since
/// they carry caller tokens.
#[derive(Clone, Copy, Debug)]
pub struct MakeSpanWithTrace {
    level: Level,
}

impl MakeSpanWithTrace {
    pub fn new() -> Self {
        Self {
            level: Level::DEBUG,
        }
    }

    /// Set the [`Level`] used for the request span.
    ///
    /// Defaults to [`Level::DEBUG`].
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }
}

impl Default for MakeSpanWithTrace {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> MakeSpan<B> for MakeSpanWithTrace {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let unique_id = match request.headers().get(TRACE_ID) {
            Some(v) => v.to_str().unwrap_or_default(),
            None => "",
        };
        // `tracing::span!` needs a constant level
        macro_rules! make_span {
            ($level:expr) => {
                tracing::span!(
                    $level,
                    "request",
                    trace_id = %unique_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            };
        }

        match self.level {
            Level::ERROR => make_span!(Level::ERROR),
            Level::WARN => make_span!(Level::WARN),
            Level::INFO => make_span!(Level::INFO),
            Level::DEBUG => make_span!(Level::DEBUG),
            Level::TRACE => make_span!(Level::TRACE),
        }
    }
}
