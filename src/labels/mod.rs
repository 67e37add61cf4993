//! Label matching.
//!
//! Given a thread's labels and a [`LabelPolicy`], decides which labels trigger
//! the policy's action and which single label governs the delay and comment.
//!
//! # Tie-break
//!
//! When several labels match, the one with the shortest scheduled delay wins.
//! A suppressed delay ranks after every scheduled one. Labels of equal rank
//! are ordered by their position in the policy's `labels` list.

use std::time::Duration;

use crate::config::{CommentTemplate, Delay, LabelPolicy, OverrideEntry};

/// The label that governs scheduling, with its resolved delay and comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveLabel {
    pub label: String,
    pub delay: Delay,
    pub comment: CommentTemplate,
}

/// Returns the thread labels that trigger this policy, in declaration order.
///
/// A label matches if it is declared in the policy and not disabled by an
/// override.
pub fn matching_labels(policy: &LabelPolicy, labels: &[String]) -> Vec<String> {
    policy
        .labels
        .iter()
        .filter(|declared| labels.iter().any(|l| l == *declared))
        .filter(|declared| !matches!(policy.override_for(declared), Some(OverrideEntry::Disabled)))
        .cloned()
        .collect()
}

/// Resolves the delay and comment for one label.
///
/// Returns `None` for a disabled label.
pub fn resolve_label(policy: &LabelPolicy, label: &str) -> Option<EffectiveLabel> {
    let (delay, comment) = match policy.override_for(label) {
        Some(OverrideEntry::Disabled) => return None,
        None | Some(OverrideEntry::UseDefault) => {
            (policy.default_delay, policy.default_comment.clone())
        }
        Some(OverrideEntry::Custom { delay, comment }) => (
            delay.unwrap_or(policy.default_delay),
            comment
                .clone()
                .unwrap_or_else(|| policy.default_comment.clone()),
        ),
    };

    Some(EffectiveLabel {
        label: label.to_string(),
        delay,
        comment,
    })
}

/// Picks the single label that governs scheduling.
///
/// Returns `None` when nothing matches.
pub fn effective_label(policy: &LabelPolicy, matching: &[String]) -> Option<EffectiveLabel> {
    matching
        .iter()
        .filter_map(|label| resolve_label(policy, label))
        .min_by_key(|effective| {
            let order = policy
                .declaration_index(&effective.label)
                .unwrap_or(usize::MAX);
            (delay_rank(&effective.delay), order)
        })
}

/// Ordering key for delays: scheduled delays by length, then suppressed.
fn delay_rank(delay: &Delay) -> (u8, Duration) {
    match delay {
        Delay::After(d) => (0, *d),
        Delay::Suppressed => (1, Duration::ZERO),
    }
}
