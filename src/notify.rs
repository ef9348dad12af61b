use std::sync::OnceLock;

use notify_rust::{Notification, Timeout};

use crate::truncate;

const APP_NAME: &str = "Chattograph";
const BODY_PREVIEW_CHARS: usize = 120;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Permission {
    Granted,
    Denied,
}

/// Fire-and-forget alert for a message from someone else.
pub(crate) trait Notifier: Send {
    /// Asks once per session; later calls return the cached answer.
    fn request_permission(&self) -> Permission;

    fn notify(&self, author: &str, text: &str);
}

pub(crate) struct DesktopNotifier {
    enabled: bool,
    permission: OnceLock<Permission>,
}

impl DesktopNotifier {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            permission: OnceLock::new(),
        }
    }
}

impl Notifier for DesktopNotifier {
    fn request_permission(&self) -> Permission {
        *self.permission.get_or_init(|| {
            let permission = if self.enabled {
                Permission::Granted
            } else {
                Permission::Denied
            };
            tracing::info!(?permission, "desktop notification permission");
            permission
        })
    }

    fn notify(&self, author: &str, text: &str) {
        if self.request_permission() != Permission::Granted {
            return;
        }
        let summary = format!("{APP_NAME}: {author}");
        let body = truncate(text, BODY_PREVIEW_CHARS);
        std::thread::spawn(move || {
            if let Err(err) = Notification::new()
                .appname(APP_NAME)
                .summary(&summary)
                .body(&body)
                .timeout(Timeout::Milliseconds(5000))
                .show()
            {
                tracing::debug!(error = %err, "desktop notification unavailable");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_notifier_denies_and_stays_denied() {
        let notifier = DesktopNotifier::new(false);
        assert_eq!(notifier.request_permission(), Permission::Denied);
        assert_eq!(notifier.request_permission(), Permission::Denied);
        notifier.notify("someone", "silently dropped");
    }

    #[test]
    fn enabled_notifier_is_granted() {
        let notifier = DesktopNotifier::new(true);
        assert_eq!(notifier.request_permission(), Permission::Granted);
    }
}
