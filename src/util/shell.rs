//! Centralized shell output.
//!
//! Every user-facing line goes through [`Shell`]:
//! - Status messages with a right-aligned label (`Copied`, `Skipped`, ...)
//! - Completion lines prefixed with a checkmark
//! - JSON output mode for machine-readable output
//!
//! Human and JSON output are mutually exclusive. In JSON mode every status
//! line becomes one JSON event on stdout.

use std::fmt::Display;
use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};

/// Shell output mode - Human and Json are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellMode {
    /// Human-readable output with optional colors.
    Human {
        verbosity: Verbosity,
        color: ColorChoice,
    },
    /// Machine-readable JSON output only.
    Json,
}

impl Default for ShellMode {
    fn default() -> Self {
        ShellMode::Human {
            verbosity: Verbosity::Normal,
            color: ColorChoice::Auto,
        }
    }
}

/// Output verbosity level (Human mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// --quiet: errors only
    Quiet,
    #[default]
    Normal,
    /// --verbose: also prints debug-level status lines
    Verbose,
}

/// Color output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Detect TTY and use colors if available.
    #[default]
    Auto,
    /// Always use ANSI colors.
    Always,
    /// Never use ANSI colors.
    Never,
}

impl std::str::FromStr for ColorChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ColorChoice::Auto),
            "always" => Ok(ColorChoice::Always),
            "never" => Ok(ColorChoice::Never),
            _ => Err(format!(
                "invalid color choice '{}'; expected 'auto', 'always', or 'never'",
                s
            )),
        }
    }
}

/// Status types for output messages.
///
/// Shell handles all formatting - callers just specify the semantic status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    // Success statuses (green)
    Copied,
    Updated,
    Removed,
    Done,

    // In-progress statuses (cyan)
    Detected,
    Installing,
    Patching,

    // Info statuses (blue/default)
    Info,

    // Warning statuses (yellow)
    Skipped,
    Warning,

    // Error status (red)
    Error,
}

impl Status {
    /// Get the display text for this status.
    fn as_str(&self) -> &'static str {
        match self {
            Status::Copied => "Copied",
            Status::Updated => "Updated",
            Status::Removed => "Removed",
            Status::Done => "\u{2705}",
            Status::Detected => "Detected",
            Status::Installing => "Installing",
            Status::Patching => "Patching",
            Status::Info => "Info",
            Status::Skipped => "Skipped",
            Status::Warning => "Warning",
            Status::Error => "error",
        }
    }

    /// Name used for the `reason` field of JSON events.
    fn json_reason(&self) -> &'static str {
        match self {
            Status::Copied => "copied",
            Status::Updated => "updated",
            Status::Removed => "removed",
            Status::Done => "done",
            Status::Detected => "detected",
            Status::Installing => "installing",
            Status::Patching => "patching",
            Status::Info => "info",
            Status::Skipped => "skipped",
            Status::Warning => "warning",
            Status::Error => "error",
        }
    }

    /// Get the ANSI color code for this status.
    fn color_code(&self) -> &'static str {
        match self {
            // Success: bold green
            Status::Copied
            | Status::Updated
            | Status::Removed
            | Status::Done => "\x1b[1;32m",
            // In-progress: bold cyan
            Status::Detected | Status::Installing | Status::Patching => "\x1b[1;36m",
            // Info: bold blue
            Status::Info => "\x1b[1;34m",
            // Warning: bold yellow
            Status::Skipped | Status::Warning => "\x1b[1;33m",
            // Error: bold red
            Status::Error => "\x1b[1;31m",
        }
    }

    /// Get the width for alignment (12 characters).
    fn width(&self) -> usize {
        12
    }
}

/// Central shell for all CLI output.
#[derive(Debug)]
pub struct Shell {
    mode: ShellMode,
    use_color: bool,
    /// Whether we've printed anything
    has_output: AtomicBool,
}

impl Shell {
    /// Create a new shell with the given mode.
    pub fn new(mode: ShellMode) -> Self {
        let use_color = match &mode {
            ShellMode::Json => false,
            ShellMode::Human { color, .. } => match color {
                ColorChoice::Auto => io::stderr().is_terminal(),
                ColorChoice::Always => true,
                ColorChoice::Never => false,
            },
        };

        Shell {
            mode,
            use_color,
            has_output: AtomicBool::new(false),
        }
    }

    /// Create a shell from CLI flags with proper precedence.
    ///
    /// JSON mode takes precedence over quiet/verbose.
    pub fn from_flags(
        quiet: bool,
        verbose: bool,
        color: ColorChoice,
        message_format_json: bool,
    ) -> Self {
        let mode = if message_format_json {
            ShellMode::Json
        } else {
            let verbosity = if quiet {
                Verbosity::Quiet
            } else if verbose {
                Verbosity::Verbose
            } else {
                Verbosity::Normal
            };
            ShellMode::Human { verbosity, color }
        };

        Shell::new(mode)
    }

    /// A shell that prints nothing but errors. Used by tests.
    pub fn quiet() -> Self {
        Shell::new(ShellMode::Human {
            verbosity: Verbosity::Quiet,
            color: ColorChoice::Never,
        })
    }

    /// Check if shell is in quiet mode.
    pub fn is_quiet(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Quiet,
                ..
            }
        )
    }

    /// Check if shell is in verbose mode.
    pub fn is_verbose(&self) -> bool {
        matches!(
            self.mode,
            ShellMode::Human {
                verbosity: Verbosity::Verbose,
                ..
            }
        )
    }

    /// Check if shell is in JSON mode.
    pub fn is_json(&self) -> bool {
        matches!(self.mode, ShellMode::Json)
    }

    /// Check if colors are enabled.
    pub fn use_color(&self) -> bool {
        self.use_color
    }

    /// Whether any line has been printed yet.
    pub fn has_output(&self) -> bool {
        self.has_output.load(Ordering::SeqCst)
    }

    /// Print a status message.
    ///
    /// Format: `{status:>12} {message}`, or `✅ {message}` for [`Status::Done`].
    ///
    /// In quiet mode, only Error status is printed.
    /// In JSON mode the message is emitted as `{"reason": ..., "message": ...}`.
    pub fn status(&self, status: Status, msg: impl Display) {
        if self.is_json() {
            let event = serde_json::json!({
                "reason": status.json_reason(),
                "message": msg.to_string()
            });
            self.json_event(&event);
            return;
        }

        if self.is_quiet() && status != Status::Error {
            return;
        }

        eprintln!("{}", self.format_line(status, &msg.to_string()));
        self.has_output.store(true, Ordering::SeqCst);
    }

    /// Print a status message only with `--verbose`.
    ///
    /// JSON mode has no verbosity and always emits the event.
    pub fn verbose(&self, status: Status, msg: impl Display) {
        if self.is_json() || self.is_verbose() {
            self.status(status, msg);
        }
    }

    /// Print a completed-step line.
    pub fn done(&self, msg: impl Display) {
        self.status(Status::Done, msg);
    }

    /// Print an info message.
    pub fn note(&self, msg: impl Display) {
        self.status(Status::Info, msg);
    }

    /// Print a warning message.
    pub fn warn(&self, msg: impl Display) {
        self.status(Status::Warning, msg);
    }

    /// Print an error message.
    pub fn error(&self, msg: impl Display) {
        self.status(Status::Error, msg);
    }

    /// Print a JSON event to stdout.
    ///
    /// Only works in JSON mode; silently ignored in human mode.
    pub fn json_event(&self, event: &serde_json::Value) {
        if !self.is_json() {
            return;
        }

        let json_str = serde_json::to_string(event).unwrap_or_default();
        println!("{}", json_str);
        let _ = io::stdout().flush();
        self.has_output.store(true, Ordering::SeqCst);
    }

    /// Format a whole status line with optional color.
    fn format_line(&self, status: Status, msg: &str) -> String {
        if status == Status::Done {
            return format!("{} {}", status.as_str(), msg);
        }

        let text = status.as_str();
        let width = status.width();

        if self.use_color {
            let color = status.color_code();
            format!("{}{:>width$}\x1b[0m {}", color, text, msg, width = width)
        } else {
            format!("{:>width$} {}", text, msg, width = width)
        }
    }
}

impl Default for Shell {
    fn default() -> Self {
        Shell::new(ShellMode::default())
    }
}
