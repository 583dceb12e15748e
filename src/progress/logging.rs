//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::PlanStarted { source } => {
                info!(source = %source, "Planning started");
            }
            ProgressEvent::RegistryLoaded { transformers } => {
                debug!(transformers, "Transformers loaded");
            }
            ProgressEvent::DetectionComplete {
                services,
                warnings,
                duration,
            } => {
                info!(
                    services,
                    warnings,
                    duration_ms = duration.as_millis(),
                    "Detection complete"
                );
            }
            ProgressEvent::CurationComplete { services, dropped } => {
                if *dropped > 0 {
                    info!(services, dropped, "Curation complete, some services dropped");
                } else {
                    info!(services, "Curation complete");
                }
            }
            ProgressEvent::ServiceTransformed {
                service,
                artifacts,
                duration,
            } => {
                info!(
                    service = %service,
                    artifacts,
                    duration_ms = duration.as_millis(),
                    "Service transformed"
                );
            }
            ProgressEvent::Completed {
                warnings,
                total_time,
            } => {
                info!(
                    warnings,
                    total_time_ms = total_time.as_millis(),
                    "Completed"
                );
            }
            ProgressEvent::Failed { error } => {
                warn!(error = %error, "Failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_logging_all_events() {
        let handler = LoggingHandler;

        let events = vec![
            ProgressEvent::PlanStarted {
                source: "/test".to_string(),
            },
            ProgressEvent::RegistryLoaded { transformers: 5 },
            ProgressEvent::DetectionComplete {
                services: 2,
                warnings: 1,
                duration: Duration::from_millis(50),
            },
            ProgressEvent::CurationComplete {
                services: 1,
                dropped: 1,
            },
            ProgressEvent::CurationComplete {
                services: 2,
                dropped: 0,
            },
            ProgressEvent::ServiceTransformed {
                service: "web".to_string(),
                artifacts: 3,
                duration: Duration::from_millis(10),
            },
            ProgressEvent::Completed {
                warnings: 0,
                total_time: Duration::from_secs(1),
            },
            ProgressEvent::Failed {
                error: "Test error".to_string(),
            },
        ];

        for event in events {
            handler.on_progress(&event);
        }
    }
}
