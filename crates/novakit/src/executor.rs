//! Authenticated invocation of the openstack CLI.
//!
//! Every call gets credentials in the child environment
//! (`OS_AUTH_URL`, `OS_USERNAME`, `OS_TENANT_NAME`, `OS_PASSWORD`). Ambient
//! `OS_*` variables are used when they form a complete set; otherwise the
//! admin account from `nova.conf` stands in, and inherited `OS_PROJECT_*`
//! variables are cleared so they cannot override its tenant. A
//! connection-refused or HTTP 400 failure is retried once after a fixed delay.

use crate::backend::{Backend, ChildEnv, Request};
use crate::codec::{self, Record};
use crate::credentials::CredentialStore;
use crate::error::{Error, Result};
use crate::retry::{self, LogCallback, RetryCallback, Sleeper};
use crate::types::{COMPETING_PROJECT_VARS, Credentials, RetryConfig};

/// Runs requests through a [`Backend`] with credentials and retry applied.
pub struct AuthenticatedExecutor {
    backend: Box<dyn Backend>,
    store: CredentialStore,
    ambient: Credentials,
    retry: RetryConfig,
    callback: Box<dyn RetryCallback + Send + Sync>,
    sleeper: Box<Sleeper>,
}

impl AuthenticatedExecutor {
    /// Create an executor using ambient `OS_*` variables with `store` as fallback.
    pub fn new(backend: Box<dyn Backend>, store: CredentialStore) -> Self {
        Self {
            backend,
            store,
            ambient: Credentials::from_env(),
            retry: RetryConfig::default(),
            callback: Box::new(LogCallback),
            sleeper: Box::new(std::thread::sleep),
        }
    }

    /// Replace the ambient credentials captured at construction.
    pub fn with_ambient(mut self, credentials: Credentials) -> Self {
        self.ambient = credentials;
        self
    }

    /// Use a custom retry configuration.
    pub fn with_retry(mut self, config: RetryConfig) -> Self {
        self.retry = config;
        self
    }

    /// Use a custom retry callback.
    pub fn with_callback(mut self, callback: Box<dyn RetryCallback + Send + Sync>) -> Self {
        self.callback = callback;
        self
    }

    /// Use a custom pause between attempts (useful for testing).
    pub fn with_sleeper(
        mut self,
        sleeper: impl Fn(std::time::Duration) + Send + Sync + 'static,
    ) -> Self {
        self.sleeper = Box::new(sleeper);
        self
    }

    /// The fallback credential store.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Check if the CLI is available.
    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Run a request and return its raw output.
    pub fn invoke(&self, request: &Request) -> Result<String> {
        let env = match self.ambient_credentials() {
            Ok(credentials) => ChildEnv::new(credentials.to_env()),
            Err(e) if e.wants_fallback() => {
                let credentials = self.fallback_credentials(e)?;
                ChildEnv::new(credentials.to_env()).removing(COMPETING_PROJECT_VARS)
            }
            Err(e) => return Err(e),
        };
        let callback: &dyn RetryCallback = self.callback.as_ref();

        log::debug!("Invoking openstack {request}");
        retry::with_retry(&self.retry, Some(callback), self.sleeper.as_ref(), || {
            self.backend.run(request, &env)
        })
    }

    /// Run a csv-format request and decode its rows.
    pub fn records(&self, request: &Request) -> Result<Vec<Record>> {
        Ok(codec::parse_csv(&self.invoke(request)?))
    }

    /// Run a shell-format request and decode the object.
    pub fn record(&self, request: &Request) -> Result<Record> {
        Ok(codec::parse_shell(&self.invoke(request)?))
    }

    fn ambient_credentials(&self) -> Result<Credentials> {
        if self.ambient.is_complete() {
            return Ok(self.ambient.clone());
        }
        Err(Error::AuthInput {
            message: format!("missing {}", self.ambient.missing().join(", ")),
        })
    }

    /// Substitute the nova.conf credentials, or give back `original`.
    fn fallback_credentials(&self, original: Error) -> Result<Credentials> {
        let credentials = self.store.credentials()?;
        if !credentials.is_complete() {
            return Err(original);
        }
        log::info!(
            "Using credentials from {} ({original})",
            self.store.path().display()
        );
        Ok(credentials)
    }
}
