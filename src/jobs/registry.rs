use crate::jobs::error::{JobError, JobResult};
use crate::jobs::policy::ExecutionPolicy;
use crate::jobs::types::{JobDescriptor, JobName};

/// A registered job together with the policy decision for this run
#[derive(Debug, Clone, Copy)]
pub struct PlannedJob<'a> {
    pub descriptor: &'a JobDescriptor,
    pub selected: bool,
}

impl PlannedJob<'_> {
    pub fn name(&self) -> &JobName {
        self.descriptor.name()
    }
}

/// Ordered collection of jobs; registration order is execution order
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Vec<JobDescriptor>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    /// Register a job, rejecting names that are already taken
    pub fn register(&mut self, descriptor: JobDescriptor) -> JobResult<&mut Self> {
        if self.contains(descriptor.name().as_str()) {
            return Err(JobError::DuplicateJobName(descriptor.name().to_string()));
        }

        tracing::trace!(job = %descriptor.name(), "Registered maintenance job");
        self.jobs.push(descriptor);
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.jobs.iter().any(|job| job.name().as_str() == name)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobDescriptor> {
        self.jobs.iter()
    }

    pub fn names(&self) -> Vec<&JobName> {
        self.jobs.iter().map(JobDescriptor::name).collect()
    }

    /// Jobs the policy lets through, in registration order
    pub fn filtered(&self, policy: &ExecutionPolicy) -> Vec<&JobDescriptor> {
        self.jobs
            .iter()
            .filter(|job| policy.should_run(job.name().as_str()))
            .collect()
    }

    /// Every job with its run/skip decision, in registration order.
    ///
    /// A job is selected exactly when [`JobRegistry::filtered`] yields it.
    pub fn plan(&self, policy: &ExecutionPolicy) -> Vec<PlannedJob<'_>> {
        // `filtered` is an ordered subsequence of `jobs`, so one merge pass suffices
        let mut selected = self.filtered(policy).into_iter().peekable();
        self.jobs
            .iter()
            .map(|descriptor| PlannedJob {
                descriptor,
                selected: selected
                    .next_if(|job| std::ptr::eq(*job, descriptor))
                    .is_some(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn noop(name: &str) -> JobDescriptor {
        JobDescriptor::from_fn(name, |_| async { Ok(()) }).unwrap()
    }

    fn registry_of(names: &[&str]) -> JobRegistry {
        let mut registry = JobRegistry::new();
        for name in names {
            registry.register(noop(name)).unwrap();
        }
        registry
    }

    fn names_of(jobs: &[&JobDescriptor]) -> Vec<String> {
        jobs.iter().map(|job| job.name().to_string()).collect()
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = registry_of(&["a", "b"]);
        let result = registry.register(noop("a"));
        assert!(matches!(result, Err(JobError::DuplicateJobName(name)) if name == "a"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_register_chains() {
        let mut registry = JobRegistry::new();
        registry
            .register(noop("a"))
            .unwrap()
            .register(noop("b"))
            .unwrap();
        assert_eq!(
            registry.names().iter().map(|n| n.as_str()).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn test_filtered_excludes_denied_in_order() {
        let registry = registry_of(&["A", "B", "C"]);
        let policy = ExecutionPolicy::new(Vec::<String>::new(), ["B"], false);
        assert_eq!(names_of(&registry.filtered(&policy)), vec!["A", "C"]);
    }

    #[test]
    fn test_filtered_keeps_registration_order_not_allow_order() {
        let registry = registry_of(&["A", "B", "C"]);
        let policy = ExecutionPolicy::new(["C", "A"], Vec::<String>::new(), false);
        assert_eq!(names_of(&registry.filtered(&policy)), vec!["A", "C"]);
    }

    #[test]
    fn test_plan_marks_skipped_jobs() {
        let registry = registry_of(&["A", "B"]);
        let policy = ExecutionPolicy::new(["B"], Vec::<String>::new(), false);
        let plan = registry.plan(&policy);
        assert_eq!(plan.len(), 2);
        assert!(!plan[0].selected);
        assert!(plan[1].selected);
    }

    #[test]
    fn test_unknown_filter_names() {
        let registry = registry_of(&["A", "B"]);
        let policy = ExecutionPolicy::new(["A", "Z"], ["Y"], false);
        assert_eq!(policy.unknown_names(&registry), vec!["Y", "Z"]);
    }

    proptest! {
        #[test]
        fn prop_unrestricted_policy_keeps_every_job_in_order(
            names in prop::collection::btree_set("[a-z]{1,6}", 0..10)
        ) {
            // Shuffle deterministically so registration order differs from sort order
            let mut ordered: Vec<String> = names.into_iter().collect();
            ordered.reverse();

            let mut registry = JobRegistry::new();
            for name in &ordered {
                registry.register(noop(name)).unwrap();
            }

            let filtered = registry.filtered(&ExecutionPolicy::default());
            prop_assert_eq!(names_of(&filtered), ordered);
        }

        #[test]
        fn prop_plan_selects_exactly_the_filtered_jobs(
            names in prop::collection::btree_set("[a-f]", 0..6),
            allow in prop::collection::btree_set("[a-f]", 0..4),
            deny in prop::collection::btree_set("[a-f]", 0..4),
        ) {
            let mut registry = JobRegistry::new();
            for name in names.iter().rev() {
                registry.register(noop(name)).unwrap();
            }
            let policy = ExecutionPolicy::new(allow, deny, false);

            let plan = registry.plan(&policy);
            prop_assert_eq!(plan.len(), registry.len());
            let selected: Vec<String> = plan
                .iter()
                .filter(|job| job.selected)
                .map(|job| job.name().to_string())
                .collect();
            prop_assert_eq!(selected, names_of(&registry.filtered(&policy)));
        }
    }
}
