//! The registry's diagnostic sink.
//!
//! Every registry operation reports one human-readable line to its sink.
//! Lines are observational only; a sink cannot fail an operation.

/// Accepts one diagnostic line at a time.
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, line: &str) {
        self(line)
    }
}

/// Default sink: writes each line to standard output.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleSink;

impl LogSink for ConsoleSink {
    fn log(&self, line: &str) {
        println!("{line}");
    }
}

/// Forwards lines to `tracing` at info level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, line: &str) {
        tracing::info!(target: "sgp_registry", "{line}");
    }
}
