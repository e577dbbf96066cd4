use crate::events::LogLevel;

/// User-facing notification sink for phase outcomes.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: LogLevel, message: &str);
}

/// Routes notifications into the tracing pipeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => tracing::info!(target: "testgen.notify", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "testgen.notify", "{message}"),
            LogLevel::Error => tracing::error!(target: "testgen.notify", "{message}"),
        }
    }
}
