//! Normalized per-repository policy.
//!
//! These types are what the rest of the bot sees after the raw YAML document
//! has been resolved: every field has a concrete value and defaults are filled
//! in.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::ActionKind;

use super::duration::format_long;

/// How long to wait before acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delay {
    /// Act after this long.
    After(Duration),

    /// Do not schedule at all (a negative delay in the config).
    Suppressed,
}

impl Delay {
    /// Returns the duration if the delay schedules anything.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Delay::After(d) => Some(*d),
            Delay::Suppressed => None,
        }
    }

    /// Long human-readable form used for `$DELAY`; empty when suppressed.
    pub fn describe(&self) -> String {
        match self {
            Delay::After(d) => format_long(*d),
            Delay::Suppressed => String::new(),
        }
    }
}

/// A comment template, or the sentinel that disables commenting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentTemplate {
    Disabled,
    Text(String),
}

impl CommentTemplate {
    /// Builds a template from config text.
    ///
    /// Blank text and the literal string `false` disable the comment.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed == "false" {
            CommentTemplate::Disabled
        } else {
            CommentTemplate::Text(text)
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            CommentTemplate::Disabled => None,
            CommentTemplate::Text(t) => Some(t),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, CommentTemplate::Text(_))
    }
}

/// A per-label override from `labelConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverrideEntry {
    /// `<label>: false` - the label never triggers.
    Disabled,

    /// `<label>: true` - use the policy defaults.
    UseDefault,

    /// `<label>: { delayTime?, comment? }` - absent fields fall back to defaults.
    Custom {
        delay: Option<Delay>,
        comment: Option<CommentTemplate>,
    },
}

/// The label policy for one action kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPolicy {
    /// Delay used when a label has no delay override.
    pub default_delay: Delay,

    /// Comment used when a label has no comment override.
    pub default_comment: CommentTemplate,

    /// Labels that trigger this action, in declaration order.
    pub labels: Vec<String>,

    /// Per-label overrides.
    pub overrides: HashMap<String, OverrideEntry>,
}

impl LabelPolicy {
    /// A policy with no trigger labels.
    pub fn empty(default_delay: Delay, default_comment: CommentTemplate) -> Self {
        LabelPolicy {
            default_delay,
            default_comment,
            labels: Vec::new(),
            overrides: HashMap::new(),
        }
    }

    /// Returns the override for a label, if any.
    pub fn override_for(&self, label: &str) -> Option<&OverrideEntry> {
        self.overrides.get(label)
    }

    /// Position of a label in the declaration order.
    pub fn declaration_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

/// How the merge action merges a pull request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMethod {
    #[default]
    Merge,
    Squash,
    Rebase,
}

/// The merge action's policy plus its post-merge options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePolicy {
    pub policy: LabelPolicy,

    pub method: MergeMethod,

    /// Delete the head branch after merging (same-repository branches only).
    pub delete_branch: bool,

    /// Tag template created at the merge commit; supports `$NUMBER` and `$BRANCH`.
    pub tag: Option<String>,
}

/// The resolved configuration of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    pub close: LabelPolicy,
    pub merge: MergePolicy,
    pub comment: LabelPolicy,
}

impl RepoConfig {
    /// Returns the label policy for an action kind.
    pub fn policy(&self, kind: ActionKind) -> &LabelPolicy {
        match kind {
            ActionKind::Close => &self.close,
            ActionKind::Merge => &self.merge.policy,
            ActionKind::Comment => &self.comment,
        }
    }
}

impl Default for RepoConfig {
    fn default() -> Self {
        RepoConfig {
            close: LabelPolicy::empty(
                super::default_delay(ActionKind::Close),
                super::default_comment(ActionKind::Close),
            ),
            merge: MergePolicy {
                policy: LabelPolicy::empty(
                    super::default_delay(ActionKind::Merge),
                    super::default_comment(ActionKind::Merge),
                ),
                method: MergeMethod::default(),
                delete_branch: false,
                tag: None,
            },
            comment: LabelPolicy::empty(
                super::default_delay(ActionKind::Comment),
                super::default_comment(ActionKind::Comment),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_template_false_and_blank_are_disabled() {
        assert_eq!(CommentTemplate::from_text("false"), CommentTemplate::Disabled);
        assert_eq!(CommentTemplate::from_text("  false "), CommentTemplate::Disabled);
        assert_eq!(CommentTemplate::from_text("   "), CommentTemplate::Disabled);
        assert!(CommentTemplate::from_text("Closing in $DELAY").is_enabled());
    }

    #[test]
    fn suppressed_delay_has_no_duration_and_empty_description() {
        assert_eq!(Delay::Suppressed.duration(), None);
        assert_eq!(Delay::Suppressed.describe(), "");
        assert_eq!(
            Delay::After(Duration::from_millis(5)).describe(),
            "5 ms".to_string()
        );
    }

    #[test]
    fn default_config_triggers_nothing() {
        let config = RepoConfig::default();
        for kind in ActionKind::ALL {
            assert!(config.policy(kind).labels.is_empty());
        }
    }
}
