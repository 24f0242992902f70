//! Notifications the flow emits for the presentation layer.
//!
//! These are fire-and-forget hints about input focus. They carry no state; the
//! session snapshot is the source of truth.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "slot", rename_all = "snake_case")]
pub enum FlowEvent {
    /// Move focus to the given slot (after a digit was entered)
    FocusSlot(usize),
    /// Move focus back to the given slot (backspace on an empty slot)
    FocusPreviousSlot(usize),
    /// Move focus to the first slot (new code requested or code rejected)
    FocusFirstSlot,
}
