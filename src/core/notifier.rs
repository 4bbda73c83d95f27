//! Observability hook for availability checks
//!
//! The core never prints. It reports progress and per-interface failures to a
//! caller-supplied [`Notifier`]; [`TracingNotifier`] is the fallback.

use std::fmt;
use std::sync::Mutex;

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for NotifyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyLevel::Info => write!(f, "info"),
            NotifyLevel::Warning => write!(f, "warning"),
            NotifyLevel::Error => write!(f, "error"),
        }
    }
}

/// Receives notifications from concurrently running checks
pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str);
}

impl<F> Notifier for F
where
    F: Fn(NotifyLevel, &str) + Send + Sync,
{
    fn notify(&self, level: NotifyLevel, message: &str) {
        self(level, message)
    }
}

/// Forwards notifications to `tracing` at the matching level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Info => tracing::info!(target: "fleetprobe::notify", "{}", message),
            NotifyLevel::Warning => tracing::warn!(target: "fleetprobe::notify", "{}", message),
            NotifyLevel::Error => tracing::error!(target: "fleetprobe::notify", "{}", message),
        }
    }
}

/// Keeps every notification in memory, in arrival order
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    entries: Mutex<Vec<(NotifyLevel, String)>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(NotifyLevel, String)> {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Messages recorded at `level`
    pub fn messages(&self, level: NotifyLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_collecting_notifier_filters_by_level() {
        let notifier = CollectingNotifier::new();
        notifier.notify(NotifyLevel::Info, "testing pi on 10.0.0.2");
        notifier.notify(NotifyLevel::Warning, "Host rpi3+armv7l: unreachable");

        assert_eq!(notifier.entries().len(), 2);
        assert_eq!(
            notifier.messages(NotifyLevel::Warning),
            vec!["Host rpi3+armv7l: unreachable".to_string()]
        );
    }

    #[test]
    fn test_closure_notifier() {
        let count = AtomicUsize::new(0);
        let notifier = |_: NotifyLevel, _: &str| {
            count.fetch_add(1, Ordering::SeqCst);
        };
        notifier.notify(NotifyLevel::Info, "one");
        notifier.notify(NotifyLevel::Error, "two");
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_level_display() {
        assert_eq!(NotifyLevel::Warning.to_string(), "warning");
    }
}
