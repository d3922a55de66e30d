use async_trait::async_trait;
use logging::EventLogger;
use verifier_core::{OutcomeReport, OutcomeSink};

/// Sink that only records outcomes in the structured log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

#[async_trait]
impl OutcomeSink for LogSink {
    async fn deliver(&self, report: OutcomeReport) {
        EventLogger::log_outcome(&report);
    }
}
