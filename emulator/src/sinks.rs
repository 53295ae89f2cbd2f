//! Companion collaborators that record what a phone would have shown.

use alert_core::receiver::{NotificationSink, SinkError, TextMessageSink};

#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    pub delivered: Vec<(String, String)>,
}

impl NotificationSink for ConsoleNotifier {
    fn notify(&mut self, title: &str, body: &str) -> Result<(), SinkError> {
        self.delivered.push((title.to_owned(), body.to_owned()));
        Ok(())
    }
}

/// Text hand-off. Without a composer every message goes out as an `sms:` URL.
#[derive(Debug, Default)]
pub struct ConsoleTexts {
    pub composer: bool,
    pub composed: Vec<(String, String)>,
    pub opened: Vec<String>,
}

impl TextMessageSink for ConsoleTexts {
    fn can_compose(&self) -> bool {
        self.composer
    }

    fn compose(&mut self, recipient: &str, body: &str) -> Result<(), SinkError> {
        if !self.composer {
            return Err(SinkError::Unavailable);
        }
        self.composed.push((recipient.to_owned(), body.to_owned()));
        Ok(())
    }

    fn open_url(&mut self, url: &str) -> Result<(), SinkError> {
        self.opened.push(url.to_owned());
        Ok(())
    }
}
