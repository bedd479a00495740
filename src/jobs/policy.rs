use std::collections::BTreeSet;

use serde::Serialize;

use crate::jobs::registry::JobRegistry;

/// Which jobs a run executes and whether it bypasses the process lock
///
/// Built once from run configuration and never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionPolicy {
    allow: BTreeSet<String>,
    deny: BTreeSet<String>,
    force: bool,
}

impl ExecutionPolicy {
    pub fn new<A, D, S1, S2>(allow: A, deny: D, force: bool) -> Self
    where
        A: IntoIterator<Item = S1>,
        D: IntoIterator<Item = S2>,
        S1: Into<String>,
        S2: Into<String>,
    {
        Self {
            allow: allow.into_iter().map(Into::into).collect(),
            deny: deny.into_iter().map(Into::into).collect(),
            force,
        }
    }

    /// Deny always wins; a non-empty allow-list restricts, an empty one doesn't
    pub fn should_run(&self, name: &str) -> bool {
        if self.deny.contains(name) {
            return false;
        }
        if !self.allow.is_empty() {
            return self.allow.contains(name);
        }
        true
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn allow(&self) -> &BTreeSet<String> {
        &self.allow
    }

    pub fn deny(&self) -> &BTreeSet<String> {
        &self.deny
    }

    /// Filter entries that name no registered job
    pub fn unknown_names<'a>(&'a self, registry: &JobRegistry) -> Vec<&'a str> {
        self.allow
            .iter()
            .chain(self.deny.iter())
            .map(String::as_str)
            .filter(|name| !registry.contains(name))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Split a comma-separated job list, trimming entries and dropping empty ones
pub fn parse_job_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
