//! Structured edit commands.
//!
//! A [`Command`] pairs an [`Action`] with a [`Selector`] that picks the
//! objects it applies to. Commands come from the parser, from engine events
//! and from async completions (image resolution); all of them go through the
//! executor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::object::{Bounds, Object, ObjectId, ObjectType};

/// Default priority for user-issued commands.
pub const DEFAULT_PRIORITY: u8 = 50;

/// How an action treats a selector matching several objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TargetPolicy {
    /// Apply to every match.
    Batch,
    /// Apply to the first match in paint order only.
    First,
    /// Operates on the active page; object selectors are ignored.
    Page,
}

/// Direction for relative moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Towards the top of the page.
    Up,
    /// Towards the bottom of the page.
    Down,
    /// Towards the left edge.
    Left,
    /// Towards the right edge.
    Right,
}

impl Direction {
    /// Recognise a direction word.
    #[must_use]
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "up" | "upward" | "upwards" | "top" => Some(Self::Up),
            "down" | "downward" | "downwards" | "bottom" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    /// Offset of a move by `amount` pixels in this direction.
    #[must_use]
    pub fn delta(self, amount: f64) -> (f64, f64) {
        match self {
            Self::Up => (0.0, -amount),
            Self::Down => (0.0, amount),
            Self::Left => (-amount, 0.0),
            Self::Right => (amount, 0.0),
        }
    }
}

/// What a command does, with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    /// Change the fill of text or shapes.
    SetFill {
        /// `#RRGGBB` color.
        color: String,
    },
    /// Replace text content.
    SetText {
        /// New content.
        text: String,
    },
    /// Change the font size of text.
    SetFontSize {
        /// Size in pixels.
        size: f64,
    },
    /// Move relative to the current position.
    MoveBy {
        /// Horizontal offset.
        dx: f64,
        /// Vertical offset.
        dy: f64,
    },
    /// Move to an absolute position.
    MoveTo {
        /// New x.
        x: f64,
        /// New y.
        y: f64,
    },
    /// Change the size, keeping the origin.
    Resize {
        /// New width.
        width: f64,
        /// New height.
        height: f64,
    },
    /// Replace the bounds outright.
    SetBounds {
        /// New bounds.
        bounds: Bounds,
    },
    /// Scale about the object's center.
    Scale {
        /// Scale factor, greater than zero.
        factor: f64,
    },
    /// Change opacity.
    SetOpacity {
        /// Opacity in `0.0..=1.0`.
        opacity: f64,
    },
    /// Remove the objects.
    Delete,
    /// Raise to the top of the parent scope.
    BringToFront,
    /// Lower to the bottom of the parent scope.
    SendToBack,
    /// Group sibling objects.
    Group,
    /// Dissolve a group into its parent scope.
    Ungroup,
    /// Change the active page background.
    SetBackground {
        /// `#RRGGBB` color.
        color: String,
    },
    /// Add an object on top of the active page.
    Insert {
        /// Object to add.
        object: Box<Object>,
    },
    /// Swap an image placeholder for its resolved source.
    ResolveImage {
        /// Resolved URL.
        src: String,
    },
    /// Mark an image placeholder as failed.
    ImageFailed,
}

impl Action {
    /// Stable name of the action.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SetFill { .. } => "setFill",
            Self::SetText { .. } => "setText",
            Self::SetFontSize { .. } => "setFontSize",
            Self::MoveBy { .. } => "moveBy",
            Self::MoveTo { .. } => "moveTo",
            Self::Resize { .. } => "resize",
            Self::SetBounds { .. } => "setBounds",
            Self::Scale { .. } => "scale",
            Self::SetOpacity { .. } => "setOpacity",
            Self::Delete => "delete",
            Self::BringToFront => "bringToFront",
            Self::SendToBack => "sendToBack",
            Self::Group => "group",
            Self::Ungroup => "ungroup",
            Self::SetBackground { .. } => "setBackground",
            Self::Insert { .. } => "insert",
            Self::ResolveImage { .. } => "resolveImage",
            Self::ImageFailed => "imageFailed",
        }
    }

    /// Multi-target policy of the action.
    #[must_use]
    pub const fn target_policy(&self) -> TargetPolicy {
        match self {
            Self::SetFill { .. }
            | Self::SetFontSize { .. }
            | Self::MoveBy { .. }
            | Self::Scale { .. }
            | Self::SetOpacity { .. }
            | Self::Delete
            | Self::Group => TargetPolicy::Batch,
            Self::SetText { .. }
            | Self::MoveTo { .. }
            | Self::Resize { .. }
            | Self::SetBounds { .. }
            | Self::BringToFront
            | Self::SendToBack
            | Self::Ungroup
            | Self::ResolveImage { .. }
            | Self::ImageFailed => TargetPolicy::First,
            Self::SetBackground { .. } | Self::Insert { .. } => TargetPolicy::Page,
        }
    }
}

/// Addresses the objects a command applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "camelCase")]
pub enum Selector {
    /// One object by id, anywhere in the document.
    Id(ObjectId),
    /// Explicit ids, typically the selection captured at parse time.
    Ids(Vec<ObjectId>),
    /// Objects with the given role on the active page.
    Role(String),
    /// The n-th object (0-based, paint order) of a type on the active page.
    TypeOrdinal {
        /// Object variant.
        object_type: ObjectType,
        /// 0-based index in paint order.
        index: usize,
    },
    /// The active page itself.
    Page,
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id '{id}'"),
            Self::Ids(ids) if ids.is_empty() => f.write_str("empty selection"),
            Self::Ids(ids) => {
                let joined: Vec<&str> = ids.iter().map(ObjectId::as_str).collect();
                write!(f, "ids [{}]", joined.join(", "))
            }
            Self::Role(role) => write!(f, "role '{role}'"),
            Self::TypeOrdinal { object_type, index } => {
                write!(f, "{object_type} #{}", index + 1)
            }
            Self::Page => f.write_str("active page"),
        }
    }
}

/// A validated instruction to mutate the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Command {
    /// What to do.
    pub action: Action,
    /// What to do it to.
    pub target: Selector,
    /// Higher values are more urgent; informational for schedulers.
    #[serde(default = "default_priority")]
    pub priority: u8,
    /// Instruction text the command was parsed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
}

impl Command {
    /// Create a command with default priority.
    #[must_use]
    pub fn new(action: Action, target: Selector) -> Self {
        Self {
            action,
            target,
            priority: DEFAULT_PRIORITY,
            source_text: None,
        }
    }

    /// Create a page-scoped command.
    #[must_use]
    pub fn page(action: Action) -> Self {
        Self::new(action, Selector::Page)
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Record the instruction text.
    #[must_use]
    pub fn with_source_text(mut self, text: impl Into<String>) -> Self {
        self.source_text = Some(text.into());
        self
    }

    /// Stable name of the action.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        self.action.kind()
    }
}

const fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}
