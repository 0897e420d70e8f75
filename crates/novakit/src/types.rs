//! Core types for aggregate reconciliation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// Environment variables injected into every openstack invocation.
pub const ENV_AUTH_URL: &str = "OS_AUTH_URL";
/// Username variable.
pub const ENV_USERNAME: &str = "OS_USERNAME";
/// Tenant (project) variable understood by the v2.0 identity API.
pub const ENV_TENANT_NAME: &str = "OS_TENANT_NAME";
/// Password variable.
pub const ENV_PASSWORD: &str = "OS_PASSWORD";
/// Project variable used by keystone v3 style environments.
pub const ENV_PROJECT_NAME: &str = "OS_PROJECT_NAME";

/// Inherited project variables that take priority over `OS_TENANT_NAME`.
/// Cleared from the child when the nova.conf credentials stand in.
pub const COMPETING_PROJECT_VARS: [&str; 3] = [ENV_PROJECT_NAME, "OS_PROJECT_ID", "OS_TENANT_ID"];

/// Credentials used to authenticate a single invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Keystone user name
    pub username: Option<String>,
    /// Keystone password
    pub password: Option<String>,
    /// Project (tenant) name
    pub project_name: Option<String>,
    /// Identity endpoint
    pub auth_url: Option<String>,
}

impl Credentials {
    /// Read credentials from the current process environment.
    ///
    /// `OS_PROJECT_NAME` wins over `OS_TENANT_NAME` when both are set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build credentials from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            username: lookup(ENV_USERNAME),
            password: lookup(ENV_PASSWORD),
            project_name: lookup(ENV_PROJECT_NAME).or_else(|| lookup(ENV_TENANT_NAME)),
            auth_url: lookup(ENV_AUTH_URL),
        }
    }

    /// Whether all four fields are present and non-empty.
    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    /// Names of the fields that are absent or empty.
    pub fn missing(&self) -> Vec<&'static str> {
        let fields = [
            ("username", &self.username),
            ("password", &self.password),
            ("project_name", &self.project_name),
            ("auth_url", &self.auth_url),
        ];
        fields
            .into_iter()
            .filter(|(_, v)| v.as_deref().is_none_or(str::is_empty))
            .map(|(name, _)| name)
            .collect()
    }

    /// Environment pairs for the child process.
    pub fn to_env(&self) -> Vec<(String, String)> {
        let value = |v: &Option<String>| v.clone().unwrap_or_default();
        vec![
            (ENV_AUTH_URL.to_string(), value(&self.auth_url)),
            (ENV_USERNAME.to_string(), value(&self.username)),
            (ENV_TENANT_NAME.to_string(), value(&self.project_name)),
            (ENV_PASSWORD.to_string(), value(&self.password)),
        ]
    }
}

/// Whether an aggregate should exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ensure {
    /// The aggregate should exist
    #[default]
    Present,
    /// The aggregate should be removed
    Absent,
}

/// Presence of an aggregate as reported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateState {
    /// No aggregate with the desired name
    Absent,
    /// The aggregate exists
    Present,
}

/// Desired configuration of a host aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredAggregate {
    /// Aggregate name
    pub name: String,
    /// Whether the aggregate should exist
    #[serde(default)]
    pub ensure: Ensure,
    /// Availability zone to assign
    #[serde(default)]
    pub availability_zone: Option<String>,
    /// Member hosts, `None` leaves membership alone
    #[serde(default)]
    pub hosts: Option<Vec<String>>,
    /// Metadata properties
    #[serde(default)]
    pub metadata: Option<BTreeMap<String, String>>,
}

impl DesiredAggregate {
    /// Create a desired aggregate with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ensure: Ensure::Present,
            availability_zone: None,
            hosts: None,
            metadata: None,
        }
    }

    /// Set the availability zone.
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.availability_zone = Some(zone.into());
        self
    }

    /// Set the managed host list.
    pub fn with_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts = Some(hosts.into_iter().map(Into::into).collect());
        self
    }

    /// Add a metadata property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Mark the aggregate for removal.
    pub fn absent(mut self) -> Self {
        self.ensure = Ensure::Absent;
        self
    }

    /// Desired hosts without duplicates, in first-seen order.
    pub fn unique_hosts(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.hosts
            .iter()
            .flatten()
            .filter(|h| seen.insert(h.as_str()))
            .cloned()
            .collect()
    }

    /// `--zone`/`--property` arguments for create and set.
    pub(crate) fn property_args(&self, skip_empty_zone: bool) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(zone) = &self.availability_zone {
            if !(skip_empty_zone && zone.is_empty()) {
                args.push("--zone".to_string());
                args.push(zone.clone());
            }
        }
        for (key, value) in self.metadata.iter().flatten() {
            args.push("--property".to_string());
            args.push(format!("{key}={value}"));
        }
        args
    }
}

/// Aggregate as reported by the openstack CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedAggregate {
    /// Aggregate id
    pub id: String,
    /// Aggregate name
    pub name: String,
    /// Availability zone, empty when unset
    pub availability_zone: String,
    /// Member hosts
    pub hosts: Vec<String>,
    /// Metadata properties
    pub metadata: BTreeMap<String, String>,
    /// Whether the aggregate exists
    pub present: bool,
}

impl ObservedAggregate {
    /// State derived from the `present` flag.
    pub fn state(&self) -> AggregateState {
        if self.present {
            AggregateState::Present
        } else {
            AggregateState::Absent
        }
    }
}

/// Host membership changes needed to converge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatePlan {
    /// Desired hosts that are not members yet
    pub hosts_to_add: Vec<String>,
    /// Member hosts that are not desired
    pub hosts_to_remove: Vec<String>,
    /// Zone and metadata are re-sent on every update
    pub reassert_properties: bool,
}

impl AggregatePlan {
    /// Whether the plan changes host membership.
    pub fn changes_hosts(&self) -> bool {
        !self.hosts_to_add.is_empty() || !self.hosts_to_remove.is_empty()
    }
}

/// What a converge pass did (or would do on a dry run).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Nothing to do
    Unchanged,
    /// The aggregate was created
    Created,
    /// Properties and membership were updated
    Updated(AggregatePlan),
    /// The aggregate was removed
    Removed,
}

impl Outcome {
    /// Whether this outcome represents a change.
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Configuration for the transient-failure retry.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Create a config that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_complete() {
        let creds = Credentials {
            username: Some("admin".into()),
            password: Some("secret".into()),
            project_name: Some("admin".into()),
            auth_url: Some("http://127.0.0.1:5000/v2.0/".into()),
        };
        assert!(creds.is_complete());

        let partial = Credentials {
            password: Some(String::new()),
            ..creds
        };
        assert!(!partial.is_complete());
        assert_eq!(partial.missing(), vec!["password"]);
    }

    #[test]
    fn test_credentials_from_lookup_prefers_project_name() {
        let creds = Credentials::from_lookup(|key| match key {
            ENV_PROJECT_NAME => Some("proj".into()),
            ENV_TENANT_NAME => Some("tenant".into()),
            _ => None,
        });
        assert_eq!(creds.project_name.as_deref(), Some("proj"));
        assert!(!creds.is_complete());
    }

    #[test]
    fn test_credentials_to_env() {
        let creds = Credentials {
            username: Some("admin".into()),
            password: Some("pw".into()),
            project_name: Some("services".into()),
            auth_url: Some("https://keystone:35357/v2.0/".into()),
        };
        let env = creds.to_env();
        let names: Vec<&str> = env.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec![ENV_AUTH_URL, ENV_USERNAME, ENV_TENANT_NAME, ENV_PASSWORD]);
        assert!(env.contains(&(ENV_TENANT_NAME.to_string(), "services".to_string())));
    }

    #[test]
    fn test_unique_hosts_keeps_order() {
        let desired = DesiredAggregate::new("agg").with_hosts(["b", "a", "b", "c"]);
        assert_eq!(desired.unique_hosts(), vec!["b", "a", "c"]);
        assert!(DesiredAggregate::new("agg").unique_hosts().is_empty());
    }

    #[test]
    fn test_property_args() {
        let desired = DesiredAggregate::new("agg")
            .with_zone("az1")
            .with_property("ssd", "true")
            .with_property("gpu", "false");
        assert_eq!(
            desired.property_args(true),
            vec!["--zone", "az1", "--property", "gpu=false", "--property", "ssd=true"]
        );

        let empty_zone = DesiredAggregate::new("agg").with_zone("");
        assert!(empty_zone.property_args(true).is_empty());
        assert_eq!(empty_zone.property_args(false), vec!["--zone", ""]);
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.delay, Duration::from_secs(10));
    }
}
