//! Canonical events captured from rendering engines.
//!
//! Engines report direct manipulation (drag, resize, in-place text editing)
//! through their own change events. Adapters translate those into
//! [`EngineEvent`]s, and the editor turns each one into an ordinary
//! [`Command`] so the executor stays the only writer of the document.

use serde::{Deserialize, Serialize};

use crate::command::{Action, Command, Selector};
use crate::object::{Bounds, ObjectId};

/// Priority assigned to commands that originate in the engine.
pub const ENGINE_COMMAND_PRIORITY: u8 = 100;

/// An edit performed inside a rendering engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum EngineEvent {
    /// A node was dragged to a new position.
    Moved {
        /// Canonical id of the node.
        id: ObjectId,
        /// New x position.
        x: f64,
        /// New y position.
        y: f64,
    },
    /// A node was resized (possibly moving its origin).
    Resized {
        /// Canonical id of the node.
        id: ObjectId,
        /// New bounds.
        bounds: Bounds,
    },
    /// Text was edited in place.
    TextEdited {
        /// Canonical id of the node.
        id: ObjectId,
        /// New content.
        text: String,
    },
    /// The engine's selection changed.
    SelectionChanged {
        /// Selected canonical ids.
        ids: Vec<ObjectId>,
    },
}

impl EngineEvent {
    /// Object the event concerns, if any.
    #[must_use]
    pub fn object_id(&self) -> Option<&ObjectId> {
        match self {
            Self::Moved { id, .. } | Self::Resized { id, .. } | Self::TextEdited { id, .. } => {
                Some(id)
            }
            Self::SelectionChanged { .. } => None,
        }
    }

    /// The command that replays this edit through the executor.
    ///
    /// Selection changes are not document mutations and yield `None`.
    #[must_use]
    pub fn to_command(&self) -> Option<Command> {
        let (action, id) = match self {
            Self::Moved { id, x, y } => (Action::MoveTo { x: *x, y: *y }, id),
            Self::Resized { id, bounds } => (Action::SetBounds { bounds: *bounds }, id),
            Self::TextEdited { id, text } => (Action::SetText { text: text.clone() }, id),
            Self::SelectionChanged { .. } => return None,
        };
        Some(
            Command::new(action, Selector::Id(id.clone()))
                .with_priority(ENGINE_COMMAND_PRIORITY),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moved_becomes_move_to() {
        let event = EngineEvent::Moved {
            id: "t1".into(),
            x: 10.0,
            y: 20.0,
        };
        let command = event.to_command().expect("command");
        assert_eq!(command.target, Selector::Id("t1".into()));
        assert_eq!(command.action, Action::MoveTo { x: 10.0, y: 20.0 });
        assert_eq!(command.priority, ENGINE_COMMAND_PRIORITY);
    }

    #[test]
    fn test_selection_is_not_a_command() {
        let event = EngineEvent::SelectionChanged { ids: vec![] };
        assert!(event.to_command().is_none());
        assert!(event.object_id().is_none());
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::json!({"event": "textEdited", "id": "t1", "text": "Hi"});
        let event: EngineEvent = serde_json::from_value(json).expect("parse");
        assert_eq!(
            event,
            EngineEvent::TextEdited {
                id: "t1".into(),
                text: "Hi".to_string()
            }
        );
    }
}
