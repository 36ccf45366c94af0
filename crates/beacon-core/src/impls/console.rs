//! ConsoleTarget - print notifications to a terminal.

use std::io::{IsTerminal, Write};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::{Level, Notification, OutputNotification};
use crate::error::DeliveryError;
use crate::ports::DeliveryTarget;

const RESET: &str = "\x1b[0m";
const GRAY: &str = "\x1b[90m";
const RED: &str = "\x1b[31m";
const INDENT: &str = "        ";

/// Writes notifications as timestamped, level-prefixed lines.
///
/// Colours are used only when the sink is a terminal.
pub struct ConsoleTarget {
    sink: Mutex<Box<dyn Write + Send>>,
    color: bool,
}

impl ConsoleTarget {
    pub fn stderr() -> Self {
        let color = std::io::stderr().is_terminal();
        Self::with_writer(Box::new(std::io::stderr()), color)
    }

    pub fn with_writer(sink: Box<dyn Write + Send>, color: bool) -> Self {
        Self {
            sink: Mutex::new(sink),
            color,
        }
    }

    fn write(&self, text: &str) -> Result<(), DeliveryError> {
        let mut sink = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        sink.write_all(text.as_bytes())?;
        sink.flush()?;
        Ok(())
    }

    fn timestamp() -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }

    fn paint(&self, code: &'static str) -> (&'static str, &'static str) {
        if self.color { (code, RESET) } else { ("", "") }
    }

    fn render(&self, n: &Notification, timestamp: &str) -> String {
        let (color, reset) = self.paint(level_color(n.level));
        let prefix = if self.color {
            format!("{} {}", level_icon(n.level), n.level.as_str())
        } else {
            format!("[{}]", n.level.as_str())
        };

        match (n.title.is_empty(), n.message.is_empty()) {
            (false, false) => format!(
                "{color}[{timestamp}] {prefix}{reset}: {}{reset}\n{color}{INDENT}{}{reset}\n",
                n.title, n.message
            ),
            (false, true) => format!("{color}[{timestamp}] {prefix}: {}{reset}\n", n.title),
            _ => format!("{color}[{timestamp}] {prefix}: {}{reset}\n", n.message),
        }
    }

    fn render_output(&self, n: &OutputNotification, timestamp: &str) -> String {
        let mut text = self.render(&n.notification, timestamp);
        if n.output.is_empty() {
            return text;
        }

        let (color, reset) = self.paint(GRAY);
        text.push_str(&format!("{color}[{timestamp}] Output:{reset}\n"));
        text.push_str(&format!("{color}{}{reset}\n", indent(&n.output)));
        if n.truncated_bytes > 0 {
            text.push_str(&format!(
                "{color}... ({} bytes truncated){reset}\n",
                n.truncated_bytes
            ));
        }
        if n.exit_code != 0 && n.exit_code != -1 {
            let (exit_color, reset) = self.paint(RED);
            text.push_str(&format!(
                "{exit_color}[{timestamp}] Exit code: {}{reset}\n",
                n.exit_code
            ));
        }
        text
    }
}

fn level_color(level: Level) -> &'static str {
    match level {
        Level::Info => "\x1b[36m",
        Level::Warning => "\x1b[33m",
        Level::Error => "\x1b[31m",
        Level::Success => "\x1b[32m",
    }
}

fn level_icon(level: Level) -> &'static str {
    match level {
        Level::Info => "ℹ️ ",
        Level::Warning => "⚠️ ",
        Level::Error => "❌",
        Level::Success => "✅",
    }
}

/// Indent every non-empty line.
fn indent(output: &str) -> String {
    output
        .split('\n')
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{INDENT}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl DeliveryTarget for ConsoleTarget {
    async fn deliver(&self, notification: &Notification) -> Result<(), DeliveryError> {
        self.write(&self.render(notification, &Self::timestamp()))
    }

    async fn deliver_with_output(
        &self,
        notification: &OutputNotification,
    ) -> Result<(), DeliveryError> {
        self.write(&self.render_output(notification, &Self::timestamp()))
    }

    fn supports_output(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    /// Writer that appends into a shared buffer.
    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn plain_console() -> (ConsoleTarget, Buffer) {
        let buf = Buffer::default();
        (ConsoleTarget::with_writer(Box::new(buf.clone()), false), buf)
    }

    #[test]
    fn renders_title_and_message_on_two_lines() {
        let (console, _) = plain_console();

        let text = console.render(&Notification::warning("Disk", "almost full"), "12:00:00");

        assert_eq!(text, "[12:00:00] [WARN]: Disk\n        almost full\n");
    }

    #[test]
    fn renders_title_only() {
        let (console, _) = plain_console();

        let text = console.render(&Notification::info("Hello", ""), "12:00:00");

        assert_eq!(text, "[12:00:00] [INFO]: Hello\n");
    }

    #[test]
    fn renders_message_only() {
        let (console, _) = plain_console();

        let text = console.render(&Notification::error("", "boom"), "12:00:00");

        assert_eq!(text, "[12:00:00] [ERROR]: boom\n");
    }

    #[test]
    fn output_is_indented_with_trailers() {
        let (console, _) = plain_console();
        let mut n = OutputNotification::new(Notification::success("Build", ""), "line1\n\nline2", 3);
        n.truncated_bytes = 12;

        let text = console.render_output(&n, "12:00:00");

        assert!(text.contains("[12:00:00] Output:\n"));
        assert!(text.contains("        line1\n\n        line2\n"));
        assert!(text.contains("... (12 bytes truncated)\n"));
        assert!(text.contains("[12:00:00] Exit code: 3\n"));
    }

    #[test]
    fn zero_and_unknown_exit_codes_are_hidden() {
        let (console, _) = plain_console();
        for code in [0, -1] {
            let n = OutputNotification::new(Notification::info("t", "m"), "out", code);
            assert!(!console.render_output(&n, "t").contains("Exit code"));
        }
    }

    #[test]
    fn colour_mode_wraps_in_ansi_codes() {
        let console = ConsoleTarget::with_writer(Box::new(Buffer::default()), true);

        let text = console.render(&Notification::success("Done", ""), "12:00:00");

        assert!(text.starts_with("\x1b[32m"));
        assert!(text.contains("SUCCESS"));
        assert!(text.ends_with("\x1b[0m\n"));
    }

    #[tokio::test]
    async fn deliver_writes_to_sink() {
        let (console, buf) = plain_console();

        console
            .deliver(&Notification::info("Queued", "hello"))
            .await
            .unwrap();

        let out = buf.contents();
        assert!(out.contains("[INFO]: Queued"));
        assert!(out.contains("hello"));
    }

    #[tokio::test]
    async fn deliver_with_output_writes_output_block() {
        let (console, buf) = plain_console();
        let n = OutputNotification::new(Notification::info("Cmd", "done"), "result", 0);

        console.deliver_with_output(&n).await.unwrap();

        assert!(buf.contents().contains("        result"));
    }
}
