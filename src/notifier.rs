//! Restock announcements.
//!
//! Delivery is best-effort: failures are logged and never reach the poll loop.

use std::sync::Arc;

use common::config::NotifyConfig;
use common::{Error, WantedItem};
use stock::StockUpdate;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub trait Notifier: Send + Sync {
    fn notify(&self, text: &str);
}

/// Shows a desktop notification by running `<command> <app_name> <text>`.
pub struct DesktopNotifier {
    command: String,
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            command: config.command.clone(),
            app_name: config.app_name.clone(),
        }
    }

    /// Start the notifier command on the current runtime.
    ///
    /// The task logs and resolves to the command's outcome.
    fn send(&self, text: &str) -> Result<JoinHandle<Result<(), Error>>, Error> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Notify(format!("no runtime to spawn notifier: {}", e)))?;

        let mut cmd = Command::new(&self.command);
        cmd.arg(&self.app_name).arg(text);
        let program = self.command.clone();

        Ok(runtime.spawn(async move {
            let outcome = match cmd.status().await {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(Error::Notify(format!("{} exited with {}", program, status))),
                Err(e) => Err(Error::Notify(format!("failed to run {}: {}", program, e))),
            };
            match &outcome {
                Ok(()) => debug!("Notification delivered"),
                Err(e) => warn!("{}", e),
            }
            outcome
        }))
    }
}

impl Notifier for DesktopNotifier {
    fn notify(&self, text: &str) {
        // Runs detached from the poll loop.
        if let Err(e) = self.send(text) {
            warn!("{}", e);
        }
    }
}

/// Writes announcements to the log instead of the desktop.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, text: &str) {
        info!("Restock notice:\n{}", text);
    }
}

pub fn from_config(config: &NotifyConfig) -> Arc<dyn Notifier> {
    if config.enabled {
        Arc::new(DesktopNotifier::new(config))
    } else {
        Arc::new(LogNotifier)
    }
}

/// Message body for a set of restocked items, or `None` when there is nothing to say.
pub fn format_restock_message(items: &[WantedItem], updated_at: &str) -> Option<String> {
    if items.is_empty() {
        return None;
    }

    let mut text = String::from("The following items are in stock:\n\n");
    for item in items {
        text.push_str(&item.name);
        text.push('\n');
    }
    text.push_str(&format!("Updated at {}\n", updated_at));

    Some(text)
}

/// Handle one published update.
pub fn announce(notifier: &dyn Notifier, update: &StockUpdate) {
    info!("Found {} items in stock", update.restocked.len());

    let updated_at = update.container.fetch_time_string();
    if let Some(text) = format_restock_message(&update.restocked, &updated_at) {
        notifier.notify(&text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::ShopContainer;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, text: &str) {
            self.sent.lock().unwrap().push(text.to_string());
        }
    }

    fn item(name: &str) -> WantedItem {
        WantedItem {
            name: name.into(),
            quantity: 1,
            shop_refresh_epoch: 0,
            predicted_restock_epoch: None,
        }
    }

    #[test]
    fn test_message_format() {
        let text = format_restock_message(&[item("Mushroom"), item("Koi")], "14 Nov 23 22:13 +0000")
            .unwrap();
        assert_eq!(
            text,
            "The following items are in stock:\n\nMushroom\nKoi\nUpdated at 14 Nov 23 22:13 +0000\n"
        );
    }

    #[test]
    fn test_nothing_restocked_sends_nothing() {
        let notifier = RecordingNotifier::default();
        announce(&notifier, &StockUpdate::default());
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn test_announce_sends_once_per_update() {
        let notifier = RecordingNotifier::default();
        let update = StockUpdate {
            container: Arc::new(ShopContainer::default()),
            restocked: Arc::new(vec![item("Bug Egg")]),
        };
        announce(&notifier, &update);

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].contains("Bug Egg\n"));
    }

    #[test]
    fn test_desktop_notifier_needs_a_runtime() {
        let notifier = DesktopNotifier::new(&NotifyConfig::default());
        assert!(matches!(notifier.send("hello"), Err(Error::Notify(_))));
        // The trait path only logs.
        notifier.notify("hello");
    }

    #[tokio::test]
    async fn test_desktop_notifier_missing_command_fails() {
        let notifier = DesktopNotifier::new(&NotifyConfig {
            command: "garden-watch-no-such-notifier".into(),
            ..NotifyConfig::default()
        });
        let outcome = notifier.send("hello").unwrap().await.unwrap();
        match outcome {
            Err(Error::Notify(msg)) => assert!(msg.contains("garden-watch-no-such-notifier")),
            other => panic!("expected notify error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_desktop_notifier_reports_exit_status() {
        let ok = DesktopNotifier::new(&NotifyConfig {
            command: "true".into(),
            ..NotifyConfig::default()
        });
        assert!(ok.send("hello").unwrap().await.unwrap().is_ok());

        let failing = DesktopNotifier::new(&NotifyConfig {
            command: "false".into(),
            ..NotifyConfig::default()
        });
        match failing.send("hello").unwrap().await.unwrap() {
            Err(Error::Notify(msg)) => assert!(msg.contains("exited with")),
            other => panic!("expected notify error, got {:?}", other),
        }
    }
}
