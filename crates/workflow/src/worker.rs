//! Worker bootstrap: copies the registry and the activity set into an
//! engine worker's dispatch table.

use std::sync::Arc;

use activities::Activity;
use engine::{EngineError, WorkerHost};
use tracing::info;

use crate::registry::{register_options, WorkflowRegistry};

/// Register every workflow in `registry`, then every activity.
pub fn register_all<H>(
    host: &mut H,
    registry: &WorkflowRegistry,
    activities: Vec<Arc<dyn Activity>>,
) -> Result<(), EngineError>
where
    H: WorkerHost + ?Sized,
{
    for entry in registry.list() {
        info!(
            name = %entry.name,
            version = %entry.version,
            default = entry.is_default,
            "registering workflow"
        );
        host.register_workflow((entry.factory)(), register_options(entry))?;
    }

    for activity in activities {
        info!(activity = activity.name(), "registering activity");
        host.register_activity(activity)?;
    }

    Ok(())
}
