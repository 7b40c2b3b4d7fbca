use std::time::Instant;

/// Receives pipeline events so orchestration code does not depend on a
/// particular output mechanism.
pub trait PipelineLogger: Send {
    /// Record how long a named stage took.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Report a human-readable status message.
    fn info(&mut self, message: &str);

    /// Emit an end-of-run summary. Default: no-op.
    fn summary(&self) {}
}

/// Discards all events. Used by tests.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn info(&mut self, _message: &str) {}
}

/// Forwards messages to the `log` facade and keeps stage timings, in the
/// order they were recorded, for the summary.
pub struct LogPipelineLogger {
    timings: Vec<(String, f64)>,
    start_time: Instant,
}

impl LogPipelineLogger {
    pub fn new() -> Self {
        Self {
            timings: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Returns the formatted summary, or `None` if no stage was timed.
    pub fn summary_string(&self) -> Option<String> {
        if self.timings.is_empty() {
            return None;
        }

        let elapsed_ms = self.start_time.elapsed().as_secs_f64() * 1000.0;
        let mut lines = vec![format!("Run summary ({elapsed_ms:.1}ms total):")];
        for (stage, ms) in &self.timings {
            lines.push(format!("  {stage:8}: {ms:8.1}ms"));
        }
        Some(lines.join("\n"))
    }

    /// Total time recorded for `stage`, if it ran.
    pub fn timing_for(&self, stage: &str) -> Option<f64> {
        let mut matching = self.timings.iter().filter(|(s, _)| s == stage).peekable();
        matching.peek()?;
        Some(matching.map(|(_, ms)| ms).sum())
    }
}

impl Default for LogPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for LogPipelineLogger {
    fn timing(&mut self, stage: &str, duration_ms: f64) {
        log::debug!("{stage} took {duration_ms:.1}ms");
        self.timings.push((stage.to_string(), duration_ms));
    }

    fn info(&mut self, message: &str) {
        log::info!("{message}");
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::debug!("{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.timing("detect", 5.0);
        logger.info("hello");
        logger.summary();
    }

    #[test]
    fn test_timing_records_values() {
        let mut logger = LogPipelineLogger::new();
        logger.timing("detect", 20.0);
        logger.timing("draw", 5.0);

        assert_relative_eq!(logger.timing_for("detect").unwrap(), 20.0);
        assert_relative_eq!(logger.timing_for("draw").unwrap(), 5.0);
        assert!(logger.timing_for("save").is_none());
    }

    #[test]
    fn test_repeated_stage_is_summed() {
        let mut logger = LogPipelineLogger::new();
        logger.timing("detect", 10.0);
        logger.timing("detect", 2.5);
        assert_relative_eq!(logger.timing_for("detect").unwrap(), 12.5);
    }

    #[test]
    fn test_summary_lists_stages_in_order() {
        let mut logger = LogPipelineLogger::new();
        logger.timing("read", 3.0);
        logger.timing("detect", 40.0);
        logger.timing("write", 7.0);

        let summary = logger.summary_string().unwrap();
        assert!(summary.starts_with("Run summary"));
        let read = summary.find("read").unwrap();
        let detect = summary.find("detect").unwrap();
        let write = summary.find("write").unwrap();
        assert!(read < detect && detect < write);
    }

    #[test]
    fn test_empty_summary_returns_none() {
        assert!(LogPipelineLogger::new().summary_string().is_none());
    }
}
