//! Notification payloads.
//!
//! A queued item carries exactly one `Payload`: either a plain notification
//! or one that also carries captured command output. The queue never looks
//! inside; the variant only decides which delivery call is made.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    #[default]
    Info,
    Warning,
    Error,
    Success,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warning => "WARN",
            Level::Error => "ERROR",
            Level::Success => "SUCCESS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub level: Level,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>, level: Level) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level,
        }
    }

    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Level::Info)
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Level::Warning)
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Level::Error)
    }

    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(title, message, Level::Success)
    }
}

/// A notification that carries the output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputNotification {
    pub notification: Notification,
    pub output: String,

    /// Exit code of the command; `-1` when unknown.
    pub exit_code: i32,

    /// Bytes removed from `output` before delivery.
    pub truncated_bytes: usize,
}

impl OutputNotification {
    pub fn new(notification: Notification, output: impl Into<String>, exit_code: i32) -> Self {
        Self {
            notification,
            output: output.into(),
            exit_code,
            truncated_bytes: 0,
        }
    }

    /// Cut `output` down to at most `max_len` bytes, never splitting a char.
    pub fn truncated(mut self, max_len: usize) -> Self {
        if self.output.len() <= max_len {
            return self;
        }
        let mut cut = max_len;
        while !self.output.is_char_boundary(cut) {
            cut -= 1;
        }
        self.truncated_bytes += self.output.len() - cut;
        self.output.truncate(cut);
        self
    }

    /// Fold the output into the message body for targets that can only show
    /// plain notifications.
    pub fn to_plain(&self) -> Notification {
        let mut message = self.notification.message.clone();
        if !self.output.is_empty() {
            if !message.is_empty() {
                message.push_str("\n\n");
            }
            message.push_str(&self.output);
            if self.truncated_bytes > 0 {
                message.push_str(&format!("\n... ({} bytes truncated)", self.truncated_bytes));
            }
        }
        if self.exit_code != 0 && self.exit_code != -1 {
            message.push_str(&format!("\nExit code: {}", self.exit_code));
        }
        Notification {
            title: self.notification.title.clone(),
            message,
            level: self.notification.level,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Plain(Notification),
    WithOutput(OutputNotification),
}

impl Payload {
    pub fn title(&self) -> &str {
        match self {
            Payload::Plain(n) => &n.title,
            Payload::WithOutput(n) => &n.notification.title,
        }
    }
}

impl From<Notification> for Payload {
    fn from(notification: Notification) -> Self {
        Payload::Plain(notification)
    }
}

impl From<OutputNotification> for Payload {
    fn from(notification: OutputNotification) -> Self {
        Payload::WithOutput(notification)
    }
}
