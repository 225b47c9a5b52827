//! Pure translation from a training job to its derived workloads.

use std::collections::BTreeMap;

use crate::error::InvalidSpec;
use crate::job::{ResourceRequests, TrainingJob};
use crate::workload::{labels, DerivedWorkload, PodTemplate, Role, WorkloadKind, WorkloadMeta};

/// The three workloads derived from one training job.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedWorkloads {
    pub coordinator: DerivedWorkload,
    pub aggregator: DerivedWorkload,
    pub worker: DerivedWorkload,
}

impl TranslatedWorkloads {
    /// The workloads in creation order: coordinator, aggregator, worker.
    pub fn as_array(&self) -> [&DerivedWorkload; 3] {
        [&self.coordinator, &self.aggregator, &self.worker]
    }
}

/// Deterministic name of the workload derived for `role`.
pub fn derived_name(job_name: &str, role: Role) -> String {
    format!("{}-{}", job_name, role)
}

/// Expand a training job into its coordinator, aggregator, and worker
/// workloads.
///
/// Pure and deterministic: identical input produces identical output on every
/// call, which is what makes duplicate add events safe to replay against the
/// orchestration API. Validation runs before any workload is built, so an
/// invalid spec never yields a partial result.
pub fn translate(job: &TrainingJob) -> Result<TranslatedWorkloads, InvalidSpec> {
    validate(job)?;

    let spec = &job.spec;
    Ok(TranslatedWorkloads {
        coordinator: build(
            job,
            Role::Coordinator,
            WorkloadKind::Replicated,
            spec.coordinator.replicas,
            None,
            &spec.coordinator.image,
            spec.coordinator.resources,
        ),
        aggregator: build(
            job,
            Role::Aggregator,
            WorkloadKind::Replicated,
            spec.aggregator.replicas,
            None,
            &spec.aggregator.image,
            spec.aggregator.resources,
        ),
        worker: build(
            job,
            Role::Worker,
            WorkloadKind::Batch,
            spec.worker.parallelism,
            Some(spec.worker.completions),
            &spec.worker.image,
            spec.worker.resources,
        ),
    })
}

fn validate(job: &TrainingJob) -> Result<(), InvalidSpec> {
    let spec = &job.spec;

    let counts = [
        (Role::Coordinator, "replicas", spec.coordinator.replicas),
        (Role::Aggregator, "replicas", spec.aggregator.replicas),
        (Role::Worker, "parallelism", spec.worker.parallelism),
        (Role::Worker, "completions", spec.worker.completions),
    ];
    for (role, field, value) in counts {
        if value < 0 {
            return Err(InvalidSpec::NegativeCount { role, field, value });
        }
    }

    let images = [
        (Role::Coordinator, &spec.coordinator.image),
        (Role::Aggregator, &spec.aggregator.image),
        (Role::Worker, &spec.worker.image),
    ];
    for (role, image) in images {
        if image.is_empty() {
            return Err(InvalidSpec::MissingImage { role });
        }
    }

    Ok(())
}

fn build(
    job: &TrainingJob,
    role: Role,
    kind: WorkloadKind,
    replicas: i32,
    completions: Option<i32>,
    image: &str,
    resources: ResourceRequests,
) -> DerivedWorkload {
    DerivedWorkload {
        kind,
        metadata: WorkloadMeta {
            name: derived_name(&job.metadata.name, role),
            namespace: job.metadata.namespace.clone(),
            labels: owner_labels(job, role),
        },
        replicas,
        completions,
        template: PodTemplate {
            image: image.to_string(),
            resources,
        },
    }
}

fn owner_labels(job: &TrainingJob, role: Role) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::JOB_NAME.to_string(), job.metadata.name.clone()),
        (labels::JOB_UID.to_string(), job.metadata.uid.clone()),
        (labels::ROLE.to_string(), role.as_str().to_string()),
    ])
}
