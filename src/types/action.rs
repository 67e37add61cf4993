//! The kinds of delayed action a label can trigger.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A delayed action the bot performs when a job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Close the thread.
    Close,
    /// Merge the pull request.
    Merge,
    /// Post the configured comment.
    Comment,
}

impl ActionKind {
    /// Every action kind, in a fixed order.
    pub const ALL: [ActionKind; 3] = [ActionKind::Close, ActionKind::Merge, ActionKind::Comment];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Close => "close",
            ActionKind::Merge => "merge",
            ActionKind::Comment => "comment",
        }
    }

    /// Returns true if scheduling this action posts a warning comment up front.
    ///
    /// The comment action's template is the delayed comment itself, so nothing
    /// is posted when it is scheduled.
    pub fn notifies_on_schedule(&self) -> bool {
        !matches!(self, ActionKind::Comment)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
