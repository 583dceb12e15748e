//! Identifiers shared by transformers, plans and artifacts.

crate::define_id_enum! {
    /// Type tag of an [`Artifact`](super::Artifact); transformers match on it
    /// to decide what they consume.
    ArtifactType {
        Service => "Service",
        Ir => "IR" | "Ir",
        ContainerBuild => "ContainerBuild",
        Dockerfile => "Dockerfile",
        DockerfileForService => "DockerfileForService",
    }
}

crate::define_id_enum! {
    /// Key of the `paths` maps carried by plans and artifacts.
    PathKind {
        Dockerfile => "Dockerfile",
        ProjectPath => "ProjectPath",
        DockerCompose => "DockerCompose",
        ImageInfo => "ImageInfo",
        MavenPom => "MavenPom",
        ApacheConf => "ApacheConf",
    }
}

crate::define_id_enum! {
    /// Deployment style; services keep exactly one after curation.
    Mode {
        Container => "Container",
        Serverless => "Serverless",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_type_serialization() {
        assert_eq!(serde_json::to_string(&ArtifactType::Ir).unwrap(), "\"IR\"");
        assert_eq!(
            serde_json::to_string(&ArtifactType::DockerfileForService).unwrap(),
            "\"DockerfileForService\""
        );
    }

    #[test]
    fn test_alias_resolves_to_known_variant() {
        assert_eq!(ArtifactType::from_name("Ir"), ArtifactType::Ir);
        assert_eq!(ArtifactType::from_name("IR"), ArtifactType::Ir);
    }

    #[test]
    fn test_custom_round_trip() {
        let kind: PathKind = serde_yaml::from_str("HelmChart").unwrap();
        assert_eq!(kind, PathKind::Custom("HelmChart".to_string()));
        assert!(kind.is_custom());
        assert_eq!(serde_yaml::to_string(&kind).unwrap().trim(), "HelmChart");
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Container.to_string(), "Container");
        assert_eq!(Mode::all_variants().len(), 2);
    }
}
