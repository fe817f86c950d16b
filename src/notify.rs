use std::cell::RefCell;
use std::time::{Duration, Instant};

/// How long a notification stays visible in the browse view.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

/// Fire-and-forget user messages.
pub trait Notifier {
    fn notify(&self, message: &str);
}

/// Prints to stderr so stdout stays clean for listings.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        eprintln!("{}", message);
    }
}

/// Holds the latest message for a fixed lifetime; newer messages replace it.
#[derive(Default)]
pub struct Toasts {
    current: RefCell<Option<(String, Instant)>>,
}

impl Toasts {
    pub fn active(&self) -> Option<String> {
        self.active_at(Instant::now())
    }

    fn active_at(&self, now: Instant) -> Option<String> {
        let current = self.current.borrow();
        let (message, shown_at) = current.as_ref()?;
        if now.saturating_duration_since(*shown_at) < NOTIFICATION_TTL {
            Some(message.clone())
        } else {
            None
        }
    }
}

impl Notifier for Toasts {
    fn notify(&self, message: &str) {
        tracing::debug!(message, "notification");
        *self.current.borrow_mut() = Some((message.to_string(), Instant::now()));
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: RefCell<Vec<String>>,
}

#[cfg(test)]
impl RecordingNotifier {
    pub fn last(&self) -> Option<String> {
        self.messages.borrow().last().cloned()
    }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}
