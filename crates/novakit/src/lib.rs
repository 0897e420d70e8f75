//! # novakit
//!
//! Reconcile OpenStack Nova host aggregates through the `openstack` CLI.
//!
//! This crate provides functionality for:
//! - Resolving service credentials from `nova.conf`
//! - Running CLI commands with per-call credentials and a single retry on
//!   transient failures
//! - Parsing the CLI's csv and shell output, including the Python reprs
//!   embedded in host and property fields
//! - Diffing a desired aggregate against the reported one and issuing the
//!   minimal create/set/add/remove/delete commands
//!
//! ## Example
//!
//! ```no_run
//! use novakit::{AggregateReconciler, AuthenticatedExecutor, CredentialStore, DesiredAggregate};
//! use novakit::backend::openstack::OpenstackCli;
//!
//! let backend = OpenstackCli::new().expect("openstack CLI not available");
//! let executor = AuthenticatedExecutor::new(
//!     Box::new(backend),
//!     CredentialStore::new("/etc/nova/nova.conf"),
//! );
//!
//! let desired = DesiredAggregate::new("ssd-hosts")
//!     .with_zone("az1")
//!     .with_hosts(["compute-1", "compute-2"])
//!     .with_property("ssd", "true");
//!
//! let mut reconciler = AggregateReconciler::new(&executor, desired);
//! let outcome = reconciler.converge(false).expect("reconcile failed");
//! println!("{outcome:?}");
//! ```
//!
//! ## Retry Logic
//!
//! `[Errno 111] Connection refused` and `(HTTP 400)` failures are retried
//! exactly once after ten seconds. Anything else is returned as-is.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod backend;
pub mod codec;
pub mod credentials;
pub mod error;
pub mod executor;
pub mod retry;
pub mod types;

pub use aggregate::AggregateReconciler;
pub use credentials::CredentialStore;
pub use error::{Error, ErrorCategory, Result};
pub use executor::AuthenticatedExecutor;
pub use types::{
    AggregatePlan, AggregateState, Credentials, DesiredAggregate, Ensure, ObservedAggregate,
    Outcome, RetryConfig,
};
