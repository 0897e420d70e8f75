//! Credential discovery from `nova.conf`.
//!
//! The `[keystone_authtoken]` section carries the admin account the
//! aggregate commands run as:
//! ```text
//! [keystone_authtoken]
//! auth_host = 192.168.56.210
//! auth_port = 35357
//! auth_protocol = https
//! admin_tenant_name = services
//! admin_user = nova
//! admin_password = secret
//! ```
//! A [`CredentialStore`] reads the file once and keeps the result until
//! [`CredentialStore::reset`] is called.

use crate::error::{Error, Result};
use crate::types::Credentials;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Default location of the nova configuration file.
pub const DEFAULT_NOVA_CONF: &str = "/etc/nova/nova.conf";

/// Section holding the service credentials.
pub const AUTH_SECTION: &str = "keystone_authtoken";

/// Keys that must all be present in [`AUTH_SECTION`].
pub const REQUIRED_KEYS: [&str; 6] = [
    "auth_host",
    "auth_port",
    "auth_protocol",
    "admin_tenant_name",
    "admin_user",
    "admin_password",
];

/// Section name for keys that appear before any header.
const DEFAULT_SECTION: &str = "DEFAULT";

/// Parsed INI document: section -> key -> raw value.
pub type IniDocument = BTreeMap<String, BTreeMap<String, String>>;

/// Parse INI text.
///
/// Comment lines start with `#` or `;`. Both `key = value` and `key: value`
/// are accepted; later duplicates win.
pub fn parse_ini(content: &str) -> IniDocument {
    let mut doc = IniDocument::new();
    let mut section = DEFAULT_SECTION.to_string();

    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        if let Some(name) = trimmed
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            section = name.trim().to_string();
            doc.entry(section.clone()).or_default();
            continue;
        }

        let split = match (trimmed.find('='), trimmed.find(':')) {
            (Some(eq), Some(colon)) => Some(eq.min(colon)),
            (Some(i), None) | (None, Some(i)) => Some(i),
            (None, None) => None,
        };
        let Some(pos) = split else {
            log::debug!("Ignoring malformed ini line: {trimmed}");
            continue;
        };

        let key = trimmed[..pos].trim().to_string();
        let value = trimmed[pos + 1..].to_string();
        doc.entry(section.clone()).or_default().insert(key, value);
    }

    doc
}

/// Where the store reads its configuration from.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// An INI file on disk
    File(PathBuf),
    /// INI text held in memory, reported under a display path
    Inline {
        /// Path shown in error messages
        path: PathBuf,
        /// INI content
        content: String,
    },
}

impl ConfigSource {
    fn path(&self) -> &Path {
        match self {
            Self::File(path) | Self::Inline { path, .. } => path,
        }
    }

    fn load(&self) -> Result<IniDocument> {
        match self {
            Self::File(path) => {
                let content = std::fs::read_to_string(path).map_err(|e| Error::Config {
                    path: path.clone(),
                    message: format!("could not read file: {e}"),
                })?;
                Ok(parse_ini(&content))
            }
            Self::Inline { content, .. } => Ok(parse_ini(content)),
        }
    }
}

/// The six `[keystone_authtoken]` values, trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NovaCredentials {
    values: BTreeMap<String, String>,
}

impl NovaCredentials {
    /// Value of one of [`REQUIRED_KEYS`].
    pub fn get(&self, key: &str) -> &str {
        self.values.get(key).map(String::as_str).unwrap_or("")
    }

    /// All resolved key/value pairs.
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// `{protocol}://{host}:{port}/v2.0/`
    pub fn auth_endpoint(&self) -> String {
        format!(
            "{}://{}:{}/v2.0/",
            self.get("auth_protocol"),
            self.get("auth_host"),
            self.get("auth_port")
        )
    }
}

#[derive(Debug, Default)]
struct Cache {
    config: Option<IniDocument>,
    credentials: Option<NovaCredentials>,
    endpoint: Option<String>,
}

/// Caller-owned credential resolution context.
///
/// Resolution happens at most once between resets. Share one store across
/// every reconciler in a session.
#[derive(Debug)]
pub struct CredentialStore {
    source: ConfigSource,
    cache: Mutex<Cache>,
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(DEFAULT_NOVA_CONF)
    }
}

impl CredentialStore {
    /// Create a store reading the given configuration file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_source(ConfigSource::File(path.into()))
    }

    /// Create a store over any configuration source.
    pub fn with_source(source: ConfigSource) -> Self {
        Self {
            source,
            cache: Mutex::new(Cache::default()),
        }
    }

    /// Create a store over in-memory INI text (useful for testing).
    pub fn from_ini(content: impl Into<String>) -> Self {
        Self::with_source(ConfigSource::Inline {
            path: PathBuf::from(DEFAULT_NOVA_CONF),
            content: content.into(),
        })
    }

    /// Path of the configuration file.
    pub fn path(&self) -> &Path {
        self.source.path()
    }

    fn lock(&self) -> MutexGuard<'_, Cache> {
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Resolve the six authentication keys.
    ///
    /// Fails with [`Error::Config`] when the section or any key is missing.
    pub fn resolve(&self) -> Result<NovaCredentials> {
        let mut cache = self.lock();
        if let Some(creds) = &cache.credentials {
            return Ok(creds.clone());
        }

        if cache.config.is_none() {
            log::debug!("Reading {}", self.path().display());
            cache.config = Some(self.source.load()?);
        }
        let config = cache.config.as_ref().map(|c| c.get(AUTH_SECTION));

        let Some(Some(section)) = config else {
            return Err(self.config_error(format!("no [{AUTH_SECTION}] section")));
        };

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|k| !section.contains_key(*k))
            .collect();
        if !missing.is_empty() {
            return Err(self.config_error(format!("missing {}", missing.join(", "))));
        }

        let values = REQUIRED_KEYS
            .iter()
            .map(|k| (k.to_string(), section[*k].trim().to_string()))
            .collect();
        let creds = NovaCredentials { values };
        cache.credentials = Some(creds.clone());
        Ok(creds)
    }

    /// Identity endpoint built from the resolved keys.
    pub fn auth_endpoint(&self) -> Result<String> {
        if let Some(endpoint) = &self.lock().endpoint {
            return Ok(endpoint.clone());
        }
        let endpoint = self.resolve()?.auth_endpoint();
        self.lock().endpoint = Some(endpoint.clone());
        Ok(endpoint)
    }

    /// Credential bundle for injection into an invocation.
    pub fn credentials(&self) -> Result<Credentials> {
        let nova = self.resolve()?;
        let non_empty = |v: &str| (!v.is_empty()).then(|| v.to_string());
        Ok(Credentials {
            username: non_empty(nova.get("admin_user")),
            password: non_empty(nova.get("admin_password")),
            project_name: non_empty(nova.get("admin_tenant_name")),
            auth_url: Some(self.auth_endpoint()?),
        })
    }

    /// Forget everything read so far.
    pub fn reset(&self) {
        *self.lock() = Cache::default();
    }

    fn config_error(&self, message: String) -> Error {
        Error::Config {
            path: self.path().to_path_buf(),
            message,
        }
    }
}
