//! SMTP notification sender

use crate::error::{DsutilError, Result};
use lettre::message::header::ContentType;
use lettre::{Message, SmtpTransport, Transport};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// Email relay settings, usually loaded from the `email` block of a YAML
/// config file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailConfig {
    /// Sender address
    pub from: String,
    /// Recipient address(es), comma separated
    pub to: String,
    /// SMTP relay host
    pub host: String,
}

/// A notification to deliver through the relay
#[derive(Debug, Clone, Default)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    /// Files whose contents are appended to the body
    pub attachments: Vec<std::path::PathBuf>,
}

impl Notification {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            attachments: Vec::new(),
        }
    }

    /// Append a file whose contents are inlined into the message body
    pub fn with_attachment(mut self, path: impl AsRef<Path>) -> Self {
        self.attachments.push(path.as_ref().to_path_buf());
        self
    }

    /// Render the final body, inlining attachment contents
    fn render_body(&self) -> String {
        let mut body = self.body.clone();
        for path in &self.attachments {
            match fs::read_to_string(path) {
                Ok(text) => {
                    body.push_str(&format!("\n\n==== {} ====\n", path.display()));
                    body.push_str(&text);
                }
                Err(e) => {
                    warn!("Could not attach {}: {}", path.display(), e);
                }
            }
        }
        body
    }
}

/// Deliver a notification. Errors are returned so callers deciding to
/// ignore them can do so explicitly via [`send_best_effort`].
pub fn send(config: &EmailConfig, notification: &Notification) -> Result<()> {
    let mut builder = Message::builder()
        .from(
            config
                .from
                .parse()
                .map_err(|e| DsutilError::EmailError(format!("bad from address: {e}")))?,
        )
        .subject(&notification.subject)
        .header(ContentType::TEXT_PLAIN);
    for to in config.to.split(',') {
        let to = to.trim();
        if to.is_empty() {
            continue;
        }
        builder = builder.to(to
            .parse()
            .map_err(|e| DsutilError::EmailError(format!("bad to address '{to}': {e}")))?);
    }
    let message = builder
        .body(notification.render_body())
        .map_err(|e| DsutilError::EmailError(e.to_string()))?;
    let mailer = SmtpTransport::builder_dangerous(&config.host).build();
    mailer
        .send(&message)
        .map_err(|e| DsutilError::EmailError(e.to_string()))?;
    info!("Notification '{}' sent to {}", notification.subject, config.to);
    Ok(())
}

/// Deliver a notification, logging instead of failing when the relay is
/// unreachable
pub fn send_best_effort(config: &EmailConfig, notification: &Notification) {
    if let Err(e) = send(config, notification) {
        warn!("Failed to send notification '{}': {}", notification.subject, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_render_body_inlines_attachments() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "log line").unwrap();
        let notification =
            Notification::new("subject", "body").with_attachment(file.path());
        let body = notification.render_body();
        assert!(body.starts_with("body"));
        assert!(body.contains("log line"));
        assert!(body.contains(&file.path().display().to_string()));
    }

    #[test]
    fn test_missing_attachment_is_skipped() {
        let notification =
            Notification::new("s", "b").with_attachment("/no/such/file.txt");
        assert_eq!(notification.render_body(), "b");
    }

    #[test]
    fn test_email_config_yaml() {
        let yaml = "from: a@example.com\nto: b@example.com, c@example.com\nhost: relay.example.com\n";
        let config: EmailConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.host, "relay.example.com");
    }
}
