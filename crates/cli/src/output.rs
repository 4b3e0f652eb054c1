// Output format auto-detection for the CLI.
//
// TTY → human-readable text. Piped/redirected → structured JSON.
// `--json` flag forces JSON output regardless of terminal.

use crate::client::{api_error_code, is_relay_unreachable};
use crate::exit_code::NotSignedIn;

use serde::Serialize;
use std::io::{self, IsTerminal, Write};

const ANSI_RED: &str = "\x1b[31m";
const ANSI_YELLOW: &str = "\x1b[33m";
const ANSI_RESET: &str = "\x1b[0m";

/// Output format for CLI commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text (tables, colors, etc.).
    Human,
    /// Machine-readable JSON (one object per response).
    Json,
}

impl OutputFormat {
    /// Auto-detect format: JSON if `--json` was passed or stdout is not a TTY.
    pub fn detect(json_flag: bool) -> Self {
        if json_flag {
            return Self::Json;
        }
        Self::detect_from_terminal(io::stdout().is_terminal())
    }

    /// Testable variant that takes an explicit `is_tty` flag.
    pub fn detect_from_terminal(is_tty: bool) -> Self {
        if is_tty {
            Self::Human
        } else {
            Self::Json
        }
    }
}

/// Print `value` on stdout: `human_fn` renders it for terminals, JSON otherwise.
pub fn print_output<T, F>(format: OutputFormat, value: &T, human_fn: F) -> io::Result<()>
where
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    write_output(&mut io::stdout().lock(), format, value, human_fn)
}

/// Same as [`print_output`] against any writer.
pub fn write_output<W, T, F>(
    writer: &mut W,
    format: OutputFormat,
    value: &T,
    human_fn: F,
) -> io::Result<()>
where
    W: Write,
    T: Serialize,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Human => writeln!(writer, "{}", human_fn(value)),
        OutputFormat::Json => {
            serde_json::to_writer(&mut *writer, value).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Error,
    Warning,
}

impl Severity {
    fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }

    fn color(self) -> &'static str {
        match self {
            Self::Error => ANSI_RED,
            Self::Warning => ANSI_YELLOW,
        }
    }
}

pub fn print_error(format: OutputFormat, code: &str, message: &str) {
    print_notice(format, Severity::Error, code, message);
}

pub fn print_warning(format: OutputFormat, code: &str, message: &str) {
    print_notice(format, Severity::Warning, code, message);
}

// Stderr failures are ignored: there is nowhere left to report them.
fn print_notice(format: OutputFormat, severity: Severity, code: &str, message: &str) {
    let is_tty = io::stderr().is_terminal();
    let _ = write_notice(&mut io::stderr().lock(), format, severity, code, message, is_tty);
}

fn write_notice<W: Write>(
    writer: &mut W,
    format: OutputFormat,
    severity: Severity,
    code: &str,
    message: &str,
    is_tty: bool,
) -> io::Result<()> {
    match format {
        OutputFormat::Human => {
            writeln!(writer, "{}", render_human_stderr_line(severity, message, is_tty))
        }
        OutputFormat::Json => {
            let notice = serde_json::json!({
                (severity.label()): { "code": code, "message": message }
            });
            serde_json::to_writer(&mut *writer, &notice).map_err(io::Error::other)?;
            writeln!(writer)
        }
    }
}

/// Print a mapped, actionable error for a command failure.
pub fn print_anyhow_error(format: OutputFormat, error: &anyhow::Error) {
    let (code, message) = actionable_error(error);
    print_error(format, code, &message);
}

fn actionable_error(error: &anyhow::Error) -> (&'static str, String) {
    if is_relay_unreachable(error) {
        return (
            "RELAY_UNREACHABLE",
            format!("{error:#}. Check the relay is running or pass --relay <url>"),
        );
    }

    if error.chain().any(|cause| cause.downcast_ref::<NotSignedIn>().is_some()) {
        return ("NOT_SIGNED_IN", "Not signed in. Run: folio signin".to_string());
    }

    match api_error_code(error) {
        Some("UNAUTHORIZED") => (
            "UNAUTHORIZED",
            "Session expired or document not visible. Run: folio signin".to_string(),
        ),
        Some("INVALID_CREDENTIALS") => {
            ("INVALID_CREDENTIALS", "Invalid email or password.".to_string())
        }
        Some("FORBIDDEN") => (
            "FORBIDDEN",
            "Only the document's creator or an organization admin can do that.".to_string(),
        ),
        Some("DUPLICATE_EMAIL") => (
            "DUPLICATE_EMAIL",
            "That email is already registered. Run: folio signin".to_string(),
        ),
        Some("INVALID_INVITE_CODE") => (
            "INVALID_INVITE_CODE",
            "Invite code not recognized. Ask an organization member for the current code."
                .to_string(),
        ),
        _ => ("RELAY_ERROR", format!("{error:#}")),
    }
}

fn render_human_stderr_line(severity: Severity, message: &str, is_tty: bool) -> String {
    let label = severity.label();
    if is_tty {
        format!("{}{label}:{ANSI_RESET} {message}", severity.color())
    } else {
        format!("{label}: {message}")
    }
}
