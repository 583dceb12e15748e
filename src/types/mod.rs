//! Data model shared by the planner, the transformers and the CLI.

#[macro_use]
pub mod id_enum_macro;

pub mod collection;
pub mod config;
pub mod ids;
pub mod ir;
pub mod plan;
pub mod transformer;

pub use collection::{ImageInfo, IMAGE_METADATA_KIND};
pub use config::{
    ArtifactConfig, ComposeConfig, ConfigKind, Configs, ImageName, MavenConfig,
    PhpTemplateConfig, ServiceConfig, SpringBootConfig,
};
pub use ids::{ArtifactType, Mode, PathKind};
pub use ir::{ContainerBuild, ContainerImage, Ir, ServiceIr};
pub use plan::{merge_services, Plan, PlanError, TargetCluster};
pub use transformer::{
    merge_path, Artifact, PathMapping, PathMappingKind, Paths, ServicePlan, TransformerPlan,
};
