//! Host aggregate lifecycle: exists, create, flush, destroy.
//!
//! A reconciler pairs one [`DesiredAggregate`] with the last observation the
//! CLI reported for it. Observations are never trusted across calls:
//! [`AggregateReconciler::exists`] always re-queries, and
//! [`AggregateReconciler::flush`] forgets what it saw.

use crate::backend::Request;
use crate::codec::{self, Record, decode_quoted_list, decode_quoted_map};
use crate::error::Result;
use crate::executor::AuthenticatedExecutor;
use crate::types::{
    AggregatePlan, AggregateState, DesiredAggregate, Ensure, ObservedAggregate, Outcome,
};

const RESOURCE: &str = "aggregate";

/// Converges one aggregate towards its desired state.
pub struct AggregateReconciler<'a> {
    executor: &'a AuthenticatedExecutor,
    desired: DesiredAggregate,
    observed: Option<ObservedAggregate>,
}

impl<'a> AggregateReconciler<'a> {
    /// Create a reconciler for `desired`, issuing commands through `executor`.
    pub fn new(executor: &'a AuthenticatedExecutor, desired: DesiredAggregate) -> Self {
        Self {
            executor,
            desired,
            observed: None,
        }
    }

    /// The desired state.
    pub fn desired(&self) -> &DesiredAggregate {
        &self.desired
    }

    /// The last observation, if any and not yet flushed.
    pub fn observed(&self) -> Option<&ObservedAggregate> {
        self.observed.as_ref()
    }

    /// State according to the last observation.
    pub fn state(&self) -> AggregateState {
        self.observed
            .as_ref()
            .map_or(AggregateState::Absent, ObservedAggregate::state)
    }

    /// Query the CLI and record whether the aggregate exists.
    pub fn exists(&mut self) -> Result<bool> {
        let observed = self.lookup()?;
        let present = observed.present;
        self.observed = Some(observed);
        Ok(present)
    }

    /// Query the CLI for the aggregate's current state.
    ///
    /// Lists aggregates, then shows the one whose name matches.
    pub fn lookup(&self) -> Result<ObservedAggregate> {
        let rows = self
            .executor
            .records(&Request::list(RESOURCE).arg("--long"))?;

        let Some(row) = rows
            .iter()
            .find(|row| codec::field(row, "name") == self.desired.name)
        else {
            log::debug!("Aggregate {} not found", self.desired.name);
            return Ok(ObservedAggregate {
                name: self.desired.name.clone(),
                ..Default::default()
            });
        };

        let id = codec::field(row, "id");
        let attrs = self
            .executor
            .record(&Request::shell(RESOURCE, "show").arg(id))?;
        Ok(self.observed_from(&attrs, id))
    }

    fn observed_from(&self, attrs: &Record, fallback_id: &str) -> ObservedAggregate {
        let or = |value: &str, fallback: &str| {
            if value.is_empty() { fallback.to_string() } else { value.to_string() }
        };
        ObservedAggregate {
            id: or(codec::field(attrs, "id"), fallback_id),
            name: or(codec::field(attrs, "name"), &self.desired.name),
            availability_zone: codec::field(attrs, "availability_zone").to_string(),
            hosts: decode_quoted_list(codec::field(attrs, "hosts")),
            metadata: decode_quoted_map(codec::field(attrs, "properties")),
            present: true,
        }
    }

    /// Create the aggregate, then add each desired host in order.
    pub fn create(&mut self) -> Result<()> {
        let request = Request::shell(RESOURCE, "create")
            .arg(&self.desired.name)
            .args(self.desired.property_args(true));
        let attrs = self.executor.record(&request)?;

        let mut observed = self.observed_from(&attrs, &self.desired.name);
        log::info!("Created aggregate {} ({})", observed.name, observed.id);

        for host in self.desired.unique_hosts() {
            self.change_host("add host", &observed.id, &host)?;
            if !observed.hosts.contains(&host) {
                observed.hosts.push(host);
            }
        }

        self.observed = Some(observed);
        Ok(())
    }

    /// Remove every member host, then delete the aggregate.
    ///
    /// Uses the last observation, querying first when there is none.
    pub fn destroy(&mut self) -> Result<()> {
        let observed = match self.observed.take() {
            Some(observed) if observed.present => observed,
            _ => self.lookup()?,
        };
        if !observed.present {
            self.observed = Some(observed);
            return Ok(());
        }

        for host in &observed.hosts {
            self.change_host("remove host", &observed.id, host)?;
        }
        self.executor
            .invoke(&Request::plain(RESOURCE, "delete").arg(&observed.id))?;
        log::info!("Deleted aggregate {} ({})", observed.name, observed.id);

        self.observed = Some(ObservedAggregate {
            name: observed.name,
            ..Default::default()
        });
        Ok(())
    }

    /// Push zone, metadata and membership to an existing aggregate.
    ///
    /// The `set` command is always sent. Returns the applied plan, or `None`
    /// when the last observation says the aggregate is absent. The
    /// observation is cleared either way.
    pub fn flush(&mut self) -> Result<Option<AggregatePlan>> {
        let Some(observed) = self.observed.take().filter(|o| o.present) else {
            return Ok(None);
        };

        let set = Request::plain(RESOURCE, "set")
            .arg(&observed.name)
            .args(self.desired.property_args(false));
        self.executor.invoke(&set)?;

        let plan = self.plan(&observed);
        for host in &plan.hosts_to_remove {
            self.change_host("remove host", &observed.id, host)?;
        }
        for host in &plan.hosts_to_add {
            self.change_host("add host", &observed.id, host)?;
        }

        Ok(Some(plan))
    }

    /// Membership changes needed to go from `observed` to the desired hosts.
    pub fn plan(&self, observed: &ObservedAggregate) -> AggregatePlan {
        if self.desired.hosts.is_none() {
            return AggregatePlan {
                reassert_properties: true,
                ..Default::default()
            };
        }

        let desired = self.desired.unique_hosts();
        AggregatePlan {
            hosts_to_add: desired
                .iter()
                .filter(|h| !observed.hosts.contains(h))
                .cloned()
                .collect(),
            hosts_to_remove: observed
                .hosts
                .iter()
                .filter(|h| !desired.contains(h))
                .cloned()
                .collect(),
            reassert_properties: true,
        }
    }

    /// Whether the managed properties or hosts differ from `observed`.
    pub fn needs_update(&self, observed: &ObservedAggregate) -> bool {
        let zone_differs = self
            .desired
            .availability_zone
            .as_ref()
            .is_some_and(|zone| *zone != observed.availability_zone);
        let metadata_differs = self
            .desired
            .metadata
            .as_ref()
            .is_some_and(|m| *m != observed.metadata);

        zone_differs || metadata_differs || self.plan(observed).changes_hosts()
    }

    /// Bring the aggregate to its desired state.
    ///
    /// With `dry_run`, only the existence query runs and the outcome says
    /// what would have happened.
    pub fn converge(&mut self, dry_run: bool) -> Result<Outcome> {
        let present = self.exists()?;

        match (self.desired.ensure, present) {
            (Ensure::Present, false) => {
                if !dry_run {
                    self.create()?;
                }
                Ok(Outcome::Created)
            }
            (Ensure::Absent, true) => {
                if !dry_run {
                    self.destroy()?;
                }
                Ok(Outcome::Removed)
            }
            (Ensure::Present, true) => {
                let Some(observed) = self.observed.as_ref() else {
                    return Ok(Outcome::Unchanged);
                };
                if !self.needs_update(observed) {
                    return Ok(Outcome::Unchanged);
                }
                if dry_run {
                    return Ok(Outcome::Updated(self.plan(observed)));
                }
                Ok(self
                    .flush()?
                    .map_or(Outcome::Unchanged, Outcome::Updated))
            }
            (Ensure::Absent, false) => Ok(Outcome::Unchanged),
        }
    }

    fn change_host(&self, action: &str, id: &str, host: &str) -> Result<()> {
        log::debug!("aggregate {action} {id} {host}");
        self.executor
            .invoke(&Request::plain(RESOURCE, action).args([id, host]))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::executor::tests::{MockBackend, executor};

    const LIST: &str = r#""ID","Name","Availability Zone","Properties"
1,"just","simple","{u'nice': u'cookie'}"
2,"other","","{}"
"#;

    const LIST_EMPTY: &str = "\"ID\",\"Name\",\"Availability Zone\",\"Properties\"\n";

    fn show(hosts: &str) -> String {
        format!(
            "availability_zone=\"simple\"\nid=\"1\"\nname=\"just\"\n\
             properties=\"{{u'nice': u'cookie'}}\"\nhosts=\"{hosts}\"\n"
        )
    }

    fn existing(hosts: &str) -> MockBackend {
        let backend = MockBackend::default();
        backend.answer(&["aggregate", "list"], LIST);
        backend.answer(&["aggregate", "show"], &show(hosts));
        backend
    }

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn desired() -> DesiredAggregate {
        DesiredAggregate::new("just")
            .with_zone("simple")
            .with_hosts(["example"])
            .with_property("nice", "cookie")
    }

    fn count(calls: &[Vec<String>], prefix: &[&str]) -> usize {
        calls.iter().filter(|c| c.starts_with(&argv(prefix))).count()
    }

    #[test]
    fn test_exists_decodes_observed_state() {
        let backend = existing("[u'example']");
        let exec = executor(&backend);
        let mut reconciler = AggregateReconciler::new(&exec, desired());

        assert!(reconciler.exists().unwrap());
        assert_eq!(reconciler.state(), AggregateState::Present);

        let observed = reconciler.observed().unwrap();
        assert_eq!(observed.id, "1");
        assert_eq!(observed.availability_zone, "simple");
        assert_eq!(observed.hosts, vec!["example"]);
        assert_eq!(observed.metadata["nice"], "cookie");

        assert_eq!(
            backend.argvs(),
            vec![
                argv(&["aggregate", "list", "--quiet", "--format", "csv", "--long"]),
                argv(&["aggregate", "show", "--format", "shell", "1"]),
            ]
        );
    }

    #[test]
    fn test_exists_when_absent() {
        let backend = MockBackend::default();
        backend.answer(&["aggregate", "list"], LIST_EMPTY);
        let exec = executor(&backend);
        let mut reconciler = AggregateReconciler::new(&exec, desired());

        assert!(!reconciler.exists().unwrap());
        assert_eq!(reconciler.state(), AggregateState::Absent);
        assert_eq!(backend.argvs().len(), 1);
    }

    #[test]
    fn test_exists_requeries_every_call() {
        let backend = existing("[]");
        let exec = executor(&backend);
        let mut reconciler = AggregateReconciler::new(&exec, desired());

        reconciler.exists().unwrap();
        reconciler.exists().unwrap();
        assert_eq!(count(&backend.argvs(), &["aggregate", "list"]), 2);
    }

    #[test]
    fn test_create_then_add_hosts_in_order() {
        let backend = MockBackend::default();
        backend.answer(
            &["aggregate", "create"],
            "name=\"just\"\nid=\"9\"\navailability_zone=\"simple\"\nhosts=\"[]\"\n",
        );
        let exec = executor(&backend);
        let mut reconciler =
            AggregateReconciler::new(&exec, desired().with_hosts(["h2", "h1"]));

        reconciler.create().unwrap();

        assert_eq!(
            backend.argvs(),
            vec![
                argv(&[
                    "aggregate", "create", "--format", "shell", "just", "--zone", "simple",
                    "--property", "nice=cookie",
                ]),
                argv(&["aggregate", "add", "host", "9", "h2"]),
                argv(&["aggregate", "add", "host", "9", "h1"]),
            ]
        );
        assert_eq!(reconciler.observed().unwrap().hosts, vec!["h2", "h1"]);
    }

    #[test]
    fn test_create_without_hosts_or_zone() {
        let backend = MockBackend::default();
        let exec = executor(&backend);
        let desired = DesiredAggregate::new("bare")
            .with_zone("")
            .with_hosts(Vec::<String>::new());
        let mut reconciler = AggregateReconciler::new(&exec, desired);

        reconciler.create().unwrap();

        let calls = backend.argvs();
        assert_eq!(calls, vec![argv(&["aggregate", "create", "--format", "shell", "bare"])]);
        assert_eq!(count(&calls, &["aggregate", "add", "host"]), 0);
        // No id in the output: the name stands in.
        assert_eq!(reconciler.observed().unwrap().id, "bare");
    }

    #[test]
    fn test_destroy_removes_hosts_before_delete() {
        let backend = existing("[u'a', u'b']");
        let exec = executor(&backend);
        let mut reconciler = AggregateReconciler::new(&exec, desired().absent());

        assert!(reconciler.exists().unwrap());
        reconciler.destroy().unwrap();

        let calls = backend.argvs();
        assert_eq!(
            calls[2..].to_vec(),
            vec![
                argv(&["aggregate", "remove", "host", "1", "a"]),
                argv(&["aggregate", "remove", "host", "1", "b"]),
                argv(&["aggregate", "delete", "1"]),
            ]
        );
        assert_eq!(reconciler.state(), AggregateState::Absent);
    }

    #[test]
    fn test_destroy_queries_when_not_observed() {
        let backend = MockBackend::default();
        backend.answer(&["aggregate", "list"], LIST_EMPTY);
        let exec = executor(&backend);
        let mut reconciler = AggregateReconciler::new(&exec, desired().absent());

        reconciler.destroy().unwrap();
        assert_eq!(backend.argvs().len(), 1);
    }

    #[test]
    fn test_flush_diffs_hosts() {
        let backend = existing("[u'B', u'C']");
        let exec = executor(&backend);
        let mut reconciler = AggregateReconciler::new(&exec, desired().with_hosts(["A", "B"]));

        reconciler.exists().unwrap();
        let plan = reconciler.flush().unwrap().unwrap();

        assert_eq!(plan.hosts_to_add, vec!["A"]);
        assert_eq!(plan.hosts_to_remove, vec!["C"]);

        let calls = backend.argvs();
        assert_eq!(count(&calls, &["aggregate", "set"]), 1);
        assert_eq!(count(&calls, &["aggregate", "remove", "host", "1", "C"]), 1);
        assert_eq!(count(&calls, &["aggregate", "add", "host", "1", "A"]), 1);
        assert_eq!(count(&calls, &["aggregate", "remove", "host"]), 1);
        assert_eq!(count(&calls, &["aggregate", "add", "host"]), 1);
        assert!(reconciler.observed().is_none());
    }

    #[test]
    fn test_flush_always_sends_set() {
        let backend = existing("[u'example']");
        let exec = executor(&backend);
        let mut reconciler = AggregateReconciler::new(&exec, desired().with_zone("new-zone"));

        reconciler.exists().unwrap();
        reconciler.flush().unwrap();

        let calls = backend.argvs();
        assert!(calls.contains(&argv(&[
            "aggregate", "set", "just", "--zone", "new-zone", "--property", "nice=cookie",
        ])));
        assert_eq!(calls.len(), 3);
    }

    #[test]
    fn test_flush_leaves_unmanaged_hosts() {
        let backend = existing("[u'x', u'y']");
        let exec = executor(&backend);
        let mut desired = desired();
        desired.hosts = None;
        let mut reconciler = AggregateReconciler::new(&exec, desired);

        reconciler.exists().unwrap();
        let plan = reconciler.flush().unwrap().unwrap();

        assert!(!plan.changes_hosts());
        assert_eq!(count(&backend.argvs(), &["aggregate", "remove"]), 0);
    }

    #[test]
    fn test_flush_when_absent_does_nothing() {
        let backend = MockBackend::default();
        let exec = executor(&backend);
        let mut reconciler = AggregateReconciler::new(&exec, desired());

        assert!(reconciler.flush().unwrap().is_none());
        assert!(backend.argvs().is_empty());
    }

    #[test]
    fn test_needs_update() {
        let backend = MockBackend::default();
        let exec = executor(&backend);
        let reconciler = AggregateReconciler::new(&exec, desired());

        let mut observed = ObservedAggregate {
            id: "1".into(),
            name: "just".into(),
            availability_zone: "simple".into(),
            hosts: vec!["example".into()],
            metadata: [("nice".to_string(), "cookie".to_string())].into(),
            present: true,
        };
        assert!(!reconciler.needs_update(&observed));

        observed.availability_zone = "other".into();
        assert!(reconciler.needs_update(&observed));

        observed.availability_zone = "simple".into();
        observed.hosts.push("extra".into());
        assert!(reconciler.needs_update(&observed));
    }

    #[test]
    fn test_converge_unchanged() {
        let backend = existing("[u'example']");
        let exec = executor(&backend);
        let mut reconciler = AggregateReconciler::new(&exec, desired());

        assert_eq!(reconciler.converge(false).unwrap(), Outcome::Unchanged);
        assert_eq!(backend.argvs().len(), 2);
    }

    #[test]
    fn test_converge_creates_missing() {
        let backend = MockBackend::default();
        backend.answer(&["aggregate", "list"], LIST_EMPTY);
        backend.answer(&["aggregate", "create"], "id=\"5\"\nname=\"just\"\n");
        let exec = executor(&backend);
        let mut reconciler = AggregateReconciler::new(&exec, desired());

        assert_eq!(reconciler.converge(false).unwrap(), Outcome::Created);
        assert_eq!(count(&backend.argvs(), &["aggregate", "add", "host", "5", "example"]), 1);
    }

    #[test]
    fn test_converge_dry_run_only_queries() {
        let backend = existing("[u'old']");
        let exec = executor(&backend);
        let mut reconciler = AggregateReconciler::new(&exec, desired());

        let outcome = reconciler.converge(true).unwrap();
        let Outcome::Updated(plan) = outcome else {
            panic!("expected update, got {outcome:?}");
        };
        assert_eq!(plan.hosts_to_add, vec!["example"]);
        assert_eq!(plan.hosts_to_remove, vec!["old"]);
        assert_eq!(backend.argvs().len(), 2);
    }

    #[test]
    fn test_converge_removes_unwanted() {
        let backend = existing("[]");
        let exec = executor(&backend);
        let mut reconciler = AggregateReconciler::new(&exec, desired().absent());

        assert_eq!(reconciler.converge(false).unwrap(), Outcome::Removed);
        assert_eq!(count(&backend.argvs(), &["aggregate", "delete", "1"]), 1);
    }

    #[test]
    fn test_failure_propagates_without_rollback() {
        let backend = MockBackend::default();
        backend.answer(&["aggregate", "create"], "id=\"3\"\n");
        backend.fail_on(&["aggregate", "add", "host", "3", "bad"], "Compute host bad not found");
        let exec = executor(&backend);
        let desired = desired().with_hosts(["good", "bad", "later"]);
        let mut reconciler = AggregateReconciler::new(&exec, desired);

        let err = reconciler.create().unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }));

        let calls = backend.argvs();
        assert_eq!(count(&calls, &["aggregate", "add", "host"]), 2);
        assert_eq!(count(&calls, &["aggregate", "delete"]), 0);
        assert_eq!(count(&calls, &["aggregate", "remove"]), 0);
    }
}
