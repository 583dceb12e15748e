//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while planning, curating and transforming
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Plan creation started
    PlanStarted { source: String },

    /// Transformer definitions loaded
    RegistryLoaded { transformers: usize },

    /// Every detection hook returned
    DetectionComplete {
        services: usize,
        warnings: usize,
        duration: Duration,
    },

    /// Curation finished
    CurationComplete { services: usize, dropped: usize },

    /// One service's transformer chain finished
    ServiceTransformed {
        service: String,
        artifacts: usize,
        duration: Duration,
    },

    /// The stage finished
    Completed { warnings: usize, total_time: Duration },

    /// The stage failed
    Failed { error: String },
}

/// Trait for handling progress events
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
