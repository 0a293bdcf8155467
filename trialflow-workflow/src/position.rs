use serde::Serialize;
use trialflow_shared::Unit;

use crate::definition::UnitSet;

/// Where an order sits within its workflow.
///
/// Neighbours are looked up by exact step number: `next` is the unit at
/// `current + 1` and nothing else, so a gap in the numbering ends the chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowPosition {
    pub current: Unit,
    pub previous: Option<Unit>,
    pub next: Option<Unit>,
    pub next_child: Option<Unit>,
}

impl WorkflowPosition {
    /// Position of the unit sitting at `current_step`, if any.
    pub fn resolve(units: &UnitSet, current_step: i32) -> Option<Self> {
        let current = units.at(current_step)?.clone();
        Some(Self::around(current, units))
    }

    /// Position around a unit that is already known. The unit itself does not
    /// need to be part of `units`.
    pub fn around(current: Unit, units: &UnitSet) -> Self {
        let step = current.step_number;
        let previous = if step > 1 {
            units.at(step - 1).cloned()
        } else {
            None
        };
        let next = successor(units, step);
        let next_child = next
            .as_ref()
            .and_then(|next| successor(units, next.step_number));

        Self {
            current,
            previous,
            next,
            next_child,
        }
    }

    /// No unit follows the current one.
    pub fn is_terminal(&self) -> bool {
        self.next.is_none()
    }
}

fn successor(units: &UnitSet, step: i32) -> Option<Unit> {
    step.checked_add(1).and_then(|next| units.at(next)).cloned()
}
