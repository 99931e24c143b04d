//! User-visible operation notices.

use console::style;

/// Sink for the success and error notices emitted by auth operations.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Writes styled notices to the terminal.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        println!("{} {}", style("ok").green().bold(), message);
    }

    fn error(&self, message: &str) {
        eprintln!("{} {}", style("error").red().bold(), message);
    }
}
