// Consistent exit codes for the folio CLI.
//
//   0  = success
//   1  = general error
//   2  = usage/validation error
//   10 = relay not reachable
//   11 = authentication error
//   12 = conflict (e.g. email already registered)
//   13 = not found (e.g. unknown invite code)

use std::process;

use crate::client::{api_error_code, is_relay_unreachable};

/// Named exit codes for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Error = 1,
    Usage = 2,
    RelayDown = 10,
    Auth = 11,
    Conflict = 12,
    NotFound = 13,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Map an anyhow error to an exit code by inspecting the error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        if is_relay_unreachable(err) {
            return Self::RelayDown;
        }
        if let Some(code) = api_error_code(err) {
            return Self::from_api_code(code);
        }
        if err.chain().any(|cause| cause.downcast_ref::<NotSignedIn>().is_some()) {
            return Self::Auth;
        }
        Self::Error
    }

    /// Map a relay error code string to an exit code.
    pub fn from_api_code(code: &str) -> Self {
        match code {
            "UNAUTHORIZED" | "FORBIDDEN" | "INVALID_CREDENTIALS" => Self::Auth,
            "DUPLICATE_EMAIL" => Self::Conflict,
            "INVALID_INVITE_CODE" => Self::NotFound,
            "VALIDATION_FAILED" | "PAYLOAD_TOO_LARGE" => Self::Usage,
            _ => Self::Error,
        }
    }
}

impl From<ExitCode> for process::ExitCode {
    fn from(code: ExitCode) -> Self {
        process::ExitCode::from(code.code() as u8)
    }
}

/// A command needed a stored session and there was none.
#[derive(Debug)]
pub struct NotSignedIn;

impl std::fmt::Display for NotSignedIn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("not signed in")
    }
}

impl std::error::Error for NotSignedIn {}
