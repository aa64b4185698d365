use tracing::{error, info};

/// Surfaces the outcome of a user action.
pub trait Notifier: Send + Sync {
    fn report_success(&self, message: &str);
    fn report_error(&self, message: &str);
}

/// Reports through the tracing subscriber installed by the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn report_success(&self, message: &str) {
        info!("{message}");
    }

    fn report_error(&self, message: &str) {
        error!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_notifier_runs_without_subscriber() {
        let notifier = TracingNotifier;
        notifier.report_success("ok");
        notifier.report_error("failed");
    }
}
