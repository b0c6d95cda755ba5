//! User-facing notifications (toasts in a browser, status lines in a terminal).

/// Fire-and-forget sink for success and error notices.
pub trait Notifier: Send + Sync {
    fn notify_success(&self, message: &str);
    fn notify_error(&self, message: &str);
}

/// Routes notices into the tracing log. Used when no front end is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_success(&self, message: &str) {
        tracing::info!(target: "datasage::notify", "{}", message);
    }

    fn notify_error(&self, message: &str) {
        tracing::error!(target: "datasage::notify", "{}", message);
    }
}
