//! Notification emission
//!
//! The pipeline only decides *whether* to notify (the resolved category has
//! notifications enabled); delivery is a collaborator behind this trait.
//! Fire-and-forget: a notifier must never fail the run.

use tracing::info;

pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str);
}

impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    fn notify(&self, title: &str, body: &str) {
        (**self).notify(title, body)
    }
}

/// Default notifier that reports through the log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str) {
        info!("Notification: {} - {:.100}", title, body);
    }
}

/// Notifier that drops everything (disabled notifications, tests)
#[derive(Debug, Default, Clone)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _title: &str, _body: &str) {}
}
