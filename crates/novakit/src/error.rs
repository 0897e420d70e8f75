//! Error types for aggregate reconciliation.
//!
//! Errors are categorized so the executor can decide what is worth a retry
//! and what needs a different credential source. Everything else is handed
//! back to the caller untouched.

use regex::Regex;
use std::path::PathBuf;
use std::sync::LazyLock;
use thiserror::Error;

/// Messages from the openstack CLI that indicate a transient failure.
static TRANSIENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"\[Errno 111\] Connection refused", r"\(HTTP 400\)"]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
});

/// Categories of errors for retry and fallback logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Authentication configuration is missing or incomplete
    Config,
    /// No usable credentials were supplied to the invocation
    AuthInput,
    /// Connection refused or HTTP 400 from the API (retryable once)
    Transient,
    /// The CLI ran and reported a failure
    Command,
    /// The openstack binary could not be found
    NotFound,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Whether this error category is worth a retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient)
    }

    /// Whether a fallback credential source should be tried.
    pub fn wants_fallback(&self) -> bool {
        matches!(self, Self::AuthInput)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Config => "Nova configuration incomplete",
            Self::AuthInput => "Missing credentials",
            Self::Transient => "Identity or compute API unavailable",
            Self::Command => "openstack command failed",
            Self::NotFound => "openstack CLI not installed",
            Self::Other => "Unexpected error",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Config => "Add the [keystone_authtoken] admin credentials to nova.conf",
            Self::AuthInput => "Export OS_* variables or point --nova-conf at a complete nova.conf",
            Self::Transient => "Check that keystone and nova-api are reachable and try again",
            Self::Command => "Check the error details from the openstack CLI",
            Self::NotFound => "Install python-openstackclient or pass --openstack <path>",
            Self::Other => "Check the error details for more information",
        }
    }
}

/// Errors that can occur while reconciling aggregates.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration file lacks the keys needed for authentication
    #[error(
        "File: {} does not contain all required sections. Nova aggregate types will not work if nova is not correctly configured. ({message})",
        path.display()
    )]
    Config {
        /// Path of the configuration file that was read
        path: PathBuf,
        /// What exactly was missing
        message: String,
    },

    /// Credentials for the invocation are incomplete
    #[error("insufficient credentials to authenticate: {message}")]
    AuthInput {
        /// Which credential fields were missing
        message: String,
    },

    /// Connection refused or HTTP 400 from the API
    #[error("transient failure: {message}")]
    Transient {
        /// Message reported by the CLI
        message: String,
    },

    /// Command execution failed
    #[error("command failed: {message}{}", stderr_suffix(.stderr))]
    CommandFailed {
        /// Description of what command failed
        message: String,
        /// Standard error output from the failed command
        stderr: String,
    },

    /// The openstack binary is not installed or not in PATH
    #[error("openstack CLI not found in PATH")]
    CliNotFound,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Get the error category for retry logic.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config { .. } => ErrorCategory::Config,
            Error::AuthInput { .. } => ErrorCategory::AuthInput,
            Error::Transient { .. } => ErrorCategory::Transient,
            Error::CommandFailed { .. } => ErrorCategory::Command,
            Error::CliNotFound => ErrorCategory::NotFound,
            _ => ErrorCategory::Other,
        }
    }

    /// Whether this error is worth exactly one retry.
    pub fn is_retryable(&self) -> bool {
        self.category().is_retryable()
    }

    /// Whether a fallback credential source should be tried.
    pub fn wants_fallback(&self) -> bool {
        self.category().wants_fallback()
    }

    /// Create an error from openstack command output.
    ///
    /// Only the two known transient signatures become [`Error::Transient`];
    /// everything else is a plain command failure.
    pub fn from_cli_output(stderr: &str, command: &str) -> Self {
        let stderr = stderr.trim();

        if TRANSIENT_PATTERNS.iter().any(|re| re.is_match(stderr)) {
            return Error::Transient {
                message: stderr.to_string(),
            };
        }

        Error::CommandFailed {
            message: format!("openstack {command}"),
            stderr: stderr.to_string(),
        }
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Result type for aggregate operations.
pub type Result<T> = std::result::Result<T, Error>;
