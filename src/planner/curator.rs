//! Plan curation.
//!
//! Collapses every service's candidate chains into one deterministic chain:
//! the operator picks modes and transformers, each service keeps a single
//! mode, plans whose base artifact types are already covered are narrowed or
//! dropped, and finally the operator picks services and a target cluster.

use crate::configuration::cluster::DEFAULT_CLUSTER_TYPE;
use crate::configuration::ClusterMetadataSource;
use crate::diagnostics::{Outcome, Stage, Warnings};
use crate::qa::{fetch_multi_select, fetch_select, keys, QaEngine};
use crate::types::{ArtifactType, Mode, Plan, ServicePlan};
use std::collections::BTreeSet;
use tracing::{debug, info};

pub struct PlanCurator<'a> {
    qa: &'a dyn QaEngine,
    clusters: &'a dyn ClusterMetadataSource,
}

/// Distinct modes offered to the operator.
#[derive(Debug, Default, PartialEq, Eq)]
struct Facets {
    modes: BTreeSet<Mode>,
}

impl<'a> PlanCurator<'a> {
    pub fn new(qa: &'a dyn QaEngine, clusters: &'a dyn ClusterMetadataSource) -> Self {
        Self { qa, clusters }
    }

    pub fn curate_plan(&self, mut plan: Plan) -> Outcome<Plan> {
        let mut warnings = Warnings::new();
        let detected = plan.service_count();

        let facets = collect_facets(&plan, &mut warnings);
        let modes = self.select_modes(&facets);
        let transformers = self.select_transformers(&plan, &modes);

        let services = std::mem::take(&mut plan.spec.services);
        for (name, candidates) in services {
            let resolved = resolve_service(candidates, &modes, &transformers);
            if resolved.is_empty() {
                warnings.push(
                    Stage::Curation,
                    name.as_str(),
                    "No selectable transformer remains, dropping service",
                );
                continue;
            }
            debug!(service = %name, plans = resolved.len(), "Service resolved");
            plan.spec.services.insert(name, resolved);
        }

        self.select_services(&mut plan);
        self.select_target_cluster(&mut plan);

        info!(
            services = plan.service_count(),
            dropped = detected - plan.service_count(),
            target = %plan.spec.target_cluster.cluster_type,
            "Plan curated"
        );
        Outcome::new(plan, warnings)
    }

    fn select_modes(&self, facets: &Facets) -> BTreeSet<Mode> {
        if facets.modes.is_empty() {
            return BTreeSet::new();
        }
        let options: Vec<String> = facets.modes.iter().map(|m| m.to_string()).collect();
        fetch_multi_select(
            self.qa,
            keys::MODES,
            "Choose the deployment modes to use",
            &["Services keep the first selected mode they support"],
            &options,
            &options,
        )
        .iter()
        .map(|m| Mode::from_name(m))
        .collect()
    }

    /// Asks for transformers among those offering one of `modes`.
    fn select_transformers(&self, plan: &Plan, modes: &BTreeSet<Mode>) -> BTreeSet<String> {
        let options: Vec<String> = plan
            .services()
            .values()
            .flatten()
            .filter(|p| p.mode().map(|m| modes.contains(m)).unwrap_or(false))
            .map(|p| p.transformer_name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if options.is_empty() {
            return BTreeSet::new();
        }
        fetch_multi_select(
            self.qa,
            keys::TRANSFORMERS,
            "Choose the transformers to use",
            &["Deselected transformers are not run for any service"],
            &options,
            &options,
        )
        .into_iter()
        .collect()
    }

    fn select_services(&self, plan: &mut Plan) {
        let names: Vec<String> = plan.services().keys().cloned().collect();
        if names.is_empty() {
            return;
        }
        let selected: BTreeSet<String> = fetch_multi_select(
            self.qa,
            keys::SERVICE_NAMES,
            "Select the services to transform",
            &["Deselected services are removed from the plan"],
            &names,
            &names,
        )
        .into_iter()
        .collect();
        plan.spec.services.retain(|name, _| selected.contains(name));
    }

    fn select_target_cluster(&self, plan: &mut Plan) {
        let options: Vec<String> = self.clusters.get_clusters(plan).into_keys().collect();
        let current = plan.spec.target_cluster.cluster_type.as_str();
        let default = if options.iter().any(|o| o == current) {
            current.to_string()
        } else {
            DEFAULT_CLUSTER_TYPE.to_string()
        };
        let chosen = fetch_select(
            self.qa,
            keys::TARGET_CLUSTER_TYPE,
            "Choose the cluster type to deploy to",
            &["Custom cluster types can be added to the customizations directory"],
            &default,
            &options,
        );
        plan.spec.target_cluster.cluster_type = chosen;
        plan.spec.target_cluster.path = None;
    }
}

fn collect_facets(plan: &Plan, warnings: &mut Warnings) -> Facets {
    let mut facets = Facets::default();
    for (service, candidates) in plan.services() {
        for candidate in candidates {
            match candidate.mode() {
                Some(mode) => {
                    facets.modes.insert(mode.clone());
                }
                None => warnings.push(
                    Stage::Curation,
                    service.as_str(),
                    format!(
                        "Transformer {} declares no mode and cannot be selected",
                        candidate.transformer_name
                    ),
                ),
            }
        }
    }
    facets
}

/// Reduces one service's candidates to the chain that will run.
///
/// The first candidate with a selected mode and transformer fixes the
/// service's mode; later candidates with another mode are dropped. Base
/// artifact types already satisfied by kept candidates are removed from what
/// a candidate produces. The candidate is dropped when nothing remains, or
/// when it overlapped a kept candidate and everything left is already
/// produced by the kept ones.
pub fn resolve_service(
    candidates: ServicePlan,
    modes: &BTreeSet<Mode>,
    transformers: &BTreeSet<String>,
) -> ServicePlan {
    let mut service_mode: Option<Mode> = None;
    let mut satisfied: BTreeSet<ArtifactType> = BTreeSet::new();
    let mut produced: BTreeSet<ArtifactType> = BTreeSet::new();
    let mut kept = Vec::new();

    for mut candidate in candidates {
        let Some(mode) = candidate.mode().cloned() else {
            continue;
        };
        if !modes.contains(&mode) || !transformers.contains(&candidate.transformer_name) {
            continue;
        }
        if service_mode.is_none() {
            service_mode = Some(mode.clone());
        }
        if service_mode.as_ref() != Some(&mode) {
            continue;
        }

        let base = &candidate.base_artifact_types;
        let overlaps = base.iter().any(|t| satisfied.contains(t));
        candidate
            .artifact_types
            .retain(|t| !(base.contains(t) && satisfied.contains(t)));
        let redundant = candidate.artifact_types.is_empty()
            || (overlaps && candidate.artifact_types.iter().all(|t| produced.contains(t)));
        if redundant {
            debug!(
                transformer = %candidate.transformer_name,
                "Candidate adds nothing beyond kept transformers"
            );
            continue;
        }
        satisfied.extend(candidate.base_artifact_types.iter().cloned());
        produced.extend(candidate.artifact_types.iter().cloned());
        kept.push(candidate);
    }
    kept
}
