//! Backend abstraction for openstack CLI invocations.
//!
//! The [`Backend`] trait is the single point where a [`Request`] turns into
//! an external process, allowing for different implementations (real CLI,
//! recording mock for testing).

pub mod openstack;

use crate::error::Result;
use std::fmt;

/// Output format requested from the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `--quiet --format csv`, used for list operations
    Csv,
    /// `--format shell`, used for show/create/set
    Shell,
    /// No format flags
    None,
}

/// One openstack CLI call: `openstack <resource> <action> [format] <args>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Resource kind, e.g. `aggregate`
    pub resource: String,
    /// Action, possibly several words (`add host`)
    pub action: String,
    /// Requested output format
    pub format: OutputFormat,
    /// Positional arguments and option pairs
    pub args: Vec<String>,
}

impl Request {
    /// Create a request without arguments.
    pub fn new(
        resource: impl Into<String>,
        action: impl Into<String>,
        format: OutputFormat,
    ) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            format,
            args: Vec::new(),
        }
    }

    /// `list` request with csv output.
    pub fn list(resource: &str) -> Self {
        Self::new(resource, "list", OutputFormat::Csv)
    }

    /// `show`/`create`/`set` style request with shell output.
    pub fn shell(resource: &str, action: &str) -> Self {
        Self::new(resource, action, OutputFormat::Shell)
    }

    /// Request that produces no parsed output.
    pub fn plain(resource: &str, action: &str) -> Self {
        Self::new(resource, action, OutputFormat::None)
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Full argument vector passed to the binary.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = vec![self.resource.clone()];
        argv.extend(self.action.split_whitespace().map(str::to_string));
        match self.format {
            OutputFormat::Csv => argv.extend(["--quiet", "--format", "csv"].map(String::from)),
            OutputFormat::Shell => argv.extend(["--format", "shell"].map(String::from)),
            OutputFormat::None => {}
        }
        argv.extend(self.args.iter().cloned());
        argv
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.resource, self.action)
    }
}

/// Environment changes for one child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildEnv {
    /// Variables to set
    pub set: Vec<(String, String)>,
    /// Inherited variables to clear
    pub remove: Vec<String>,
}

impl ChildEnv {
    /// Set these variables and clear nothing.
    pub fn new(set: Vec<(String, String)>) -> Self {
        Self {
            set,
            remove: Vec::new(),
        }
    }

    /// Also clear `keys` from the inherited environment.
    pub fn removing<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.remove.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Value set for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.set
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Backend trait for openstack invocations.
///
/// `env` holds the credential changes for this call only. They must be
/// applied to the child process, never to the caller's environment.
pub trait Backend: Send + Sync {
    /// Check if the CLI is available.
    fn is_available(&self) -> bool;

    /// Run a request and return its standard output.
    fn run(&self, request: &Request, env: &ChildEnv) -> Result<String>;
}

/// Get the default backend (real openstack CLI).
pub fn default_backend() -> Result<openstack::OpenstackCli> {
    openstack::OpenstackCli::new()
}
