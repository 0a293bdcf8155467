use serde::{Deserialize, Serialize};
use trialflow_shared::ActorId;

/// Who is performing the current operation. Passed explicitly to every
/// operation that stamps created-by or audit authorship.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActorContext {
    pub actor_id: ActorId,
    pub display_name: String,
}

impl ActorContext {
    pub fn new(actor_id: ActorId, display_name: impl Into<String>) -> Self {
        Self {
            actor_id,
            display_name: display_name.into(),
        }
    }

    /// Actor used by scheduled rebills and other unattended runs.
    pub fn system() -> Self {
        Self::new(0, "system")
    }
}
