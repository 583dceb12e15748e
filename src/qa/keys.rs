//! Stable question keys.

pub const BASE: &str = "planwright";
pub const DELIM: &str = ".";

pub const MODES: &str = "planwright.modes";
pub const TRANSFORMERS: &str = "planwright.transformers.types";
pub const SERVICE_NAMES: &str = "planwright.services.[].enable";
pub const TARGET_CLUSTER_TYPE: &str = "planwright.target.clustertype";

/// Key for a per-service question, e.g. `planwright.services.web.port`.
pub fn service_key(service: &str, segment: &str) -> String {
    [BASE, "services", service, segment].join(DELIM)
}

pub const APACHE_CONF_FILE_SEGMENT: &str = "apacheconfig";
pub const PORT_SEGMENT: &str = "port";
