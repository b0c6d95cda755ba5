use datasage_core::Notifier;

/// Prints notices as colored status lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify_success(&self, message: &str) {
        println!("  \x1b[0;32m✓\x1b[0m {}", message);
    }

    fn notify_error(&self, message: &str) {
        eprintln!("  \x1b[0;31m✗ {}\x1b[0m", message);
    }
}
