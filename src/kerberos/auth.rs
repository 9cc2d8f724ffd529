//! kinit invocation and outcome reporting

use crate::error::{DsutilError, Result};
use crate::notify::{self, EmailConfig, Notification};
use chrono::Local;
use std::io::Write;
use std::net::ToSocketAddrs;
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{info, warn};

/// Default kinit binary
pub const KINIT_BIN: &str = "/usr/bin/kinit";

/// Outcome of one authentication attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    Succeeded,
    Failed,
}

impl AuthOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Settings for an authentication run
#[derive(Debug, Clone)]
pub struct Authenticator {
    /// kinit binary path
    pub bin: String,
    /// Principal to authenticate; the current user when empty
    pub user: String,
    /// Optional notification relay
    pub email: Option<EmailConfig>,
}

impl Authenticator {
    pub fn new(user: impl Into<String>, email: Option<EmailConfig>) -> Self {
        Self {
            bin: KINIT_BIN.to_string(),
            user: user.into(),
            email,
        }
    }

    /// Run kinit once, feeding the password on stdin. Reports the outcome
    /// via log and email; only infrastructure failures (spawn errors) are
    /// returned as Err.
    pub fn authenticate(&self, password: &str) -> Result<AuthOutcome> {
        let user = if self.user.is_empty() {
            crate::memory::current_user()
        } else {
            self.user.clone()
        };
        let mut child = Command::new(&self.bin)
            .arg(&user)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| DsutilError::CommandIo {
                command: format!("{} {}", self.bin, user),
                source: e,
            })?;
        if let Some(stdin) = child.stdin.as_mut() {
            // kinit reads the password followed by a newline from stdin. A
            // broken pipe means the child already exited; its status tells
            // the rest of the story.
            if let Err(e) = stdin.write_all(format!("{password}\n").as_bytes()) {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(DsutilError::CommandIo {
                        command: self.bin.clone(),
                        source: e,
                    });
                }
            }
        }
        let output = child.wait_with_output().map_err(|e| DsutilError::CommandIo {
            command: self.bin.clone(),
            source: e,
        })?;
        let outcome = if output.status.success() {
            AuthOutcome::Succeeded
        } else {
            AuthOutcome::Failed
        };
        self.report(outcome);
        if outcome == AuthOutcome::Succeeded {
            self.warn_passwd_expiration(&String::from_utf8_lossy(&output.stdout));
        }
        Ok(outcome)
    }

    fn report(&self, outcome: AuthOutcome) {
        let message = self.outcome_message(outcome);
        match outcome {
            AuthOutcome::Succeeded => info!("{message}"),
            AuthOutcome::Failed => warn!("{message}"),
        }
        if let Some(email) = &self.email {
            let subject = format!("kinit: authentication {}", outcome.as_str());
            notify::send_best_effort(email, &Notification::new(subject, message));
        }
    }

    fn outcome_message(&self, outcome: AuthOutcome) -> String {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "unknown".to_string());
        let ip = resolve_ip(&host).unwrap_or_else(|| "?".to_string());
        format!(
            "kinit ({}): authentication on {} ({}) {} at {}",
            std::process::id(),
            host,
            ip,
            outcome.as_str(),
            Local::now().format("%Y-%m-%d %H:%M:%S"),
        )
    }

    /// Forward any password-expiration warnings kinit printed
    fn warn_passwd_expiration(&self, stdout: &str) {
        let message: String = stdout
            .lines()
            .filter(|line| line.trim_start().starts_with("Warning: Your password will expire"))
            .collect::<Vec<_>>()
            .join("\n");
        if message.is_empty() {
            return;
        }
        warn!("{message}");
        if let Some(email) = &self.email {
            notify::send_best_effort(
                email,
                &Notification::new("Your Hadoop cluster password is expiring!", message),
            );
        }
    }

    /// Re-authenticate with the saved password every `interval`
    pub fn run_daemon(&self, interval: Duration, profile: &std::path::PathBuf) -> Result<()> {
        loop {
            let password = crate::kerberos::read_passwd(profile)?;
            if password.is_empty() {
                return Err(DsutilError::NoPassword);
            }
            self.authenticate(&password)?;
            std::thread::sleep(interval);
        }
    }
}

fn resolve_ip(host: &str) -> Option<String> {
    (host, 0)
        .to_socket_addrs()
        .ok()?
        .next()
        .map(|addr| addr.ip().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_message_fields() {
        let auth = Authenticator::new("alice", None);
        let message = auth.outcome_message(AuthOutcome::Failed);
        assert!(message.starts_with("kinit ("));
        assert!(message.contains("failed"));
    }

    #[test]
    fn test_failed_auth_with_fake_binary() {
        let mut auth = Authenticator::new("alice", None);
        auth.bin = "/bin/false".to_string();
        assert_eq!(auth.authenticate("pw").unwrap(), AuthOutcome::Failed);
    }

    #[test]
    fn test_missing_binary_is_error() {
        let mut auth = Authenticator::new("alice", None);
        auth.bin = "/no/such/kinit".to_string();
        assert!(auth.authenticate("pw").is_err());
    }
}
