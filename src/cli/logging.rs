// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Colored terminal output for the CLI.
//!
//! Library code logs through `tracing`; these macros are for messages meant
//! for the person at the terminal.

use std::sync::atomic::{AtomicBool, Ordering};

use colored::{ColoredString, Colorize};

/// Global verbosity flag.
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set the global verbosity flag.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

/// Check if verbose output is enabled.
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Kind of prefixed status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Recoverable problem, e.g. a declined overwrite.
    Warning,
    /// Command failure.
    Error,
    /// Record saved.
    Success,
}

impl Status {
    fn prefix(self) -> ColoredString {
        match self {
            Self::Warning => "WARNING ⚠️".yellow().bold(),
            Self::Error => "Error:".red().bold(),
            Self::Success => "✅".green(),
        }
    }

    const fn to_stderr(self) -> bool {
        matches!(self, Self::Warning | Self::Error)
    }
}

/// Render a status line with its colored prefix.
#[must_use]
pub fn status_line(status: Status, message: &str) -> String {
    format!("{} {message}", status.prefix())
}

/// Render a section title underlined to its width.
#[must_use]
pub fn section_header(title: &str) -> String {
    let rule = "─".repeat(title.chars().count());
    format!("{}\n{}", title.cyan().bold(), rule.cyan())
}

#[doc(hidden)]
pub fn emit(status: Status, message: &str) {
    let line = status_line(status, message);
    if status.to_stderr() {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
}

/// Macro for standard info messages.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        println!($($arg)*)
    };
}

/// Macro for warning messages.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::cli::logging::emit($crate::cli::logging::Status::Warning, &format!($($arg)*))
    };
}

/// Macro for error messages.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::cli::logging::emit($crate::cli::logging::Status::Error, &format!($($arg)*))
    };
}

/// Macro for success messages.
#[macro_export]
macro_rules! success {
    ($($arg:tt)*) => {
        $crate::cli::logging::emit($crate::cli::logging::Status::Success, &format!($($arg)*))
    };
}

/// Macro for messages shown only with `--verbose`.
#[macro_export]
macro_rules! verbose {
    ($($arg:tt)*) => {
        if $crate::cli::logging::is_verbose() {
            println!($($arg)*);
        }
    };
}

/// Macro for section headers.
#[macro_export]
macro_rules! section {
    ($($arg:tt)*) => {{
        println!();
        println!("{}", $crate::cli::logging::section_header(&format!($($arg)*)));
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_toggle() {
        set_verbose(true);
        assert!(is_verbose());

        set_verbose(false);
        assert!(!is_verbose());
    }

    #[test]
    fn test_status_lines_without_color() {
        colored::control::set_override(false);
        assert_eq!(
            status_line(Status::Warning, "Frame 2 exists"),
            "WARNING ⚠️ Frame 2 exists"
        );
        assert_eq!(status_line(Status::Error, "boom"), "Error: boom");
        assert_eq!(
            status_line(Status::Success, "Created annotation (ID: 1)"),
            "✅ Created annotation (ID: 1)"
        );
        assert!(Status::Error.to_stderr());
        assert!(!Status::Success.to_stderr());
    }

    #[test]
    fn test_section_header_is_underlined() {
        colored::control::set_override(false);
        assert_eq!(section_header("Frame"), "Frame\n─────");
        assert_eq!(section_header(""), "\n");
    }
}
