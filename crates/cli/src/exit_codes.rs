//! CLI Exit Code Registry
//!
//! This is the single source of truth for all `hypomatch` exit codes.
//! Exit codes are part of the shell contract; batch scripts chaining
//! comparisons rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage / configuration error (missing locator, etc.)  |
//! | 3    | Schema error (missing or mistyped column)            |
//! | 4    | Data IO error (dataset or output unreadable)         |
//! | 5    | Interrupted (load cancelled or timed out)            |
//! | 6    | Internal invariant violation (a bug)                 |

use hypomatch_compare::{CompareError, ErrorClass};

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage or configuration error. Reported before any dataset is touched.
pub const EXIT_CONFIG: u8 = 2;

/// A dataset lacks a required column or holds a value of the wrong type.
pub const EXIT_SCHEMA: u8 = 3;

/// A dataset source or the output destination could not be read/written.
pub const EXIT_IO: u8 = 4;

/// Loading was cancelled (Ctrl-C) or exceeded `--load-timeout-secs`.
pub const EXIT_INTERRUPTED: u8 = 5;

/// Internal invariant violation in the reducer/matcher.
pub const EXIT_INTERNAL: u8 = 6;

/// Map a CompareError to its exit code.
pub fn compare_exit_code(err: &CompareError) -> u8 {
    match err.class() {
        ErrorClass::Config => EXIT_CONFIG,
        ErrorClass::Schema => EXIT_SCHEMA,
        ErrorClass::Io => EXIT_IO,
        ErrorClass::Interrupted => EXIT_INTERRUPTED,
        ErrorClass::Logic => EXIT_INTERNAL,
    }
}

/// Machine-parseable error, printed to stderr when `--json` is set.
#[derive(Debug, serde::Serialize)]
pub struct ErrorOutput {
    pub error: &'static str,
    pub message: String,
    pub exit_code: u8,
}

impl ErrorOutput {
    pub fn new(code: u8, message: &str) -> Self {
        let error = match code {
            EXIT_CONFIG => "config_error",
            EXIT_SCHEMA => "schema_error",
            EXIT_IO => "io_error",
            EXIT_INTERRUPTED => "interrupted",
            EXIT_INTERNAL => "internal_error",
            _ => "error",
        };
        Self { error, message: message.to_string(), exit_code: code }
    }

    pub fn print(&self, json: bool) {
        if json {
            if let Ok(output) = serde_json::to_string(self) {
                eprintln!("{}", output);
            }
        } else {
            eprintln!("error: {}", self.message);
        }
    }
}
