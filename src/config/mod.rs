//! Per-repository configuration and process settings.
//!
//! The repository document is YAML:
//!
//! ```yaml
//! labels: [duplicate, wontfix]
//! delayTime: 7 days
//! comment: This issue will be closed in $DELAY.
//! labelConfig:
//!   duplicate: { delayTime: 5ms, comment: "$LABEL issue created! Closing in $DELAY . . ." }
//!   wontfix: { comment: false }
//!   stale: false
//! actions:
//!   merge:
//!     labels: [automerge]
//!     delayTime: 1h
//!     method: squash
//!     deleteBranch: true
//!   comment:
//!     labels: [needs-info]
//!     delayTime: 3 days
//!     comment: "@$AUTHOR, could you add the requested details?"
//! ```
//!
//! The top level is the close policy. [`resolve`] turns the document into a
//! [`RepoConfig`], filling in defaults for everything that is absent.

use std::collections::HashMap;
use std::fmt::Display;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::effects::{GitHubEffect, GitHubInterpreter, GitHubResponse};
use crate::types::ActionKind;

pub mod duration;
pub mod policy;
pub mod settings;

pub use duration::{DurationError, format_long, parse_delay};
pub use policy::{
    CommentTemplate, Delay, LabelPolicy, MergeMethod, MergePolicy, OverrideEntry, RepoConfig,
};
pub use settings::{Settings, SettingsError};

/// Repository path of the configuration document.
pub const DEFAULT_CONFIG_PATH: &str = ".github/label-delay.yml";

const DAY: Duration = Duration::from_secs(24 * 60 * 60);
const HOUR: Duration = Duration::from_secs(60 * 60);

/// Errors from loading a repository configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The document is not valid YAML or has fields of the wrong type.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] serde_yaml::Error),

    /// A `delayTime` value could not be parsed.
    #[error("invalid delayTime for {field}: {source}")]
    InvalidDuration {
        field: String,
        #[source]
        source: DurationError,
    },

    /// The document could not be fetched.
    #[error("configuration unreachable: {0}")]
    Unreachable(String),
}

/// Default delay for an action when the document sets none.
pub fn default_delay(kind: ActionKind) -> Delay {
    match kind {
        ActionKind::Close => Delay::After(7 * DAY),
        ActionKind::Merge => Delay::After(HOUR),
        ActionKind::Comment => Delay::After(DAY),
    }
}

/// Default notification template for an action when the document sets none.
pub fn default_comment(kind: ActionKind) -> CommentTemplate {
    match kind {
        ActionKind::Close => CommentTemplate::Text(
            "This thread has been labeled `$LABEL` and will be closed in $DELAY.".to_string(),
        ),
        ActionKind::Merge => CommentTemplate::Text(
            "This pull request has been labeled `$LABEL` and will be merged in $DELAY."
                .to_string(),
        ),
        ActionKind::Comment => CommentTemplate::Disabled,
    }
}

// ============================================================================
// Raw document structures
//
// These mirror the YAML as written. Every field is optional; defaults are
// applied during resolution.
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    #[serde(flatten)]
    close: RawPolicy,
    actions: Option<RawActions>,
}

#[derive(Debug, Default, Deserialize)]
struct RawActions {
    merge: Option<RawMergePolicy>,
    comment: Option<RawPolicy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMergePolicy {
    #[serde(flatten)]
    policy: RawPolicy,
    method: Option<MergeMethod>,
    delete_branch: Option<bool>,
    tag: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPolicy {
    labels: Option<Vec<String>>,
    delay_time: Option<RawDuration>,
    comment: Option<RawComment>,
    label_config: Option<HashMap<String, Option<RawOverride>>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Millis(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawComment {
    Flag(bool),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawOverride {
    Flag(bool),
    Entry(RawOverrideEntry),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOverrideEntry {
    delay_time: Option<RawDuration>,
    comment: Option<RawComment>,
}

/// Resolves a configuration document into a [`RepoConfig`].
///
/// An empty or null document yields the defaults.
pub fn resolve(document: &str) -> Result<RepoConfig, ConfigError> {
    let trimmed = document.trim();
    let raw: RawConfig = if trimmed.is_empty() || trimmed == "~" || trimmed == "null" {
        RawConfig::default()
    } else {
        serde_yaml::from_str(document)?
    };

    let close = resolve_policy(raw.close, ActionKind::Close)?;

    let actions = raw.actions.unwrap_or_default();
    let raw_merge = actions.merge.unwrap_or_default();
    let merge = MergePolicy {
        policy: resolve_policy(raw_merge.policy, ActionKind::Merge)?,
        method: raw_merge.method.unwrap_or_default(),
        delete_branch: raw_merge.delete_branch.unwrap_or(false),
        tag: raw_merge.tag.filter(|t| !t.trim().is_empty()),
    };
    let comment = resolve_policy(actions.comment.unwrap_or_default(), ActionKind::Comment)?;

    Ok(RepoConfig {
        close,
        merge,
        comment,
    })
}

fn resolve_policy(raw: RawPolicy, kind: ActionKind) -> Result<LabelPolicy, ConfigError> {
    let default_delay = match raw.delay_time {
        Some(d) => resolve_duration(d, &format!("{kind} policy"))?,
        None => default_delay(kind),
    };
    let default_comment = match raw.comment {
        Some(c) => resolve_comment(c, || default_comment(kind)),
        None => default_comment(kind),
    };

    let mut labels: Vec<String> = Vec::new();
    for label in raw.labels.unwrap_or_default() {
        if !labels.contains(&label) {
            labels.push(label);
        }
    }

    let mut overrides = HashMap::new();
    for (label, entry) in raw.label_config.unwrap_or_default() {
        let resolved = match entry {
            None | Some(RawOverride::Flag(true)) => OverrideEntry::UseDefault,
            Some(RawOverride::Flag(false)) => OverrideEntry::Disabled,
            Some(RawOverride::Entry(entry)) => OverrideEntry::Custom {
                delay: entry
                    .delay_time
                    .map(|d| resolve_duration(d, &label))
                    .transpose()?,
                comment: entry
                    .comment
                    .map(|c| resolve_comment(c, || default_comment.clone())),
            },
        };
        overrides.insert(label, resolved);
    }

    Ok(LabelPolicy {
        default_delay,
        default_comment,
        labels,
        overrides,
    })
}

fn resolve_duration(raw: RawDuration, field: &str) -> Result<Delay, ConfigError> {
    match raw {
        RawDuration::Millis(ms) => Ok(duration::delay_from_millis(ms)),
        RawDuration::Text(text) => parse_delay(&text).map_err(|source| ConfigError::InvalidDuration {
            field: field.to_string(),
            source,
        }),
    }
}

fn resolve_comment(raw: RawComment, fallback: impl FnOnce() -> CommentTemplate) -> CommentTemplate {
    match raw {
        RawComment::Flag(true) => fallback(),
        RawComment::Flag(false) => CommentTemplate::Disabled,
        RawComment::Text(text) => CommentTemplate::from_text(text),
    }
}

/// Fetches and resolves the configuration document of the client's repository.
///
/// A missing document resolves to the defaults, which trigger nothing.
pub async fn fetch_repo_config<G>(github: &G, path: &str) -> Result<RepoConfig, ConfigError>
where
    G: GitHubInterpreter,
    G::Error: Display,
{
    let effect = GitHubEffect::GetConfigFile {
        path: path.to_string(),
    };
    match github.interpret(effect).await {
        Ok(GitHubResponse::ConfigFile(Some(document))) => resolve(&document),
        Ok(GitHubResponse::ConfigFile(None)) => {
            debug!(path, "No configuration file, using defaults");
            Ok(RepoConfig::default())
        }
        Ok(other) => Err(ConfigError::Unreachable(format!(
            "unexpected response to config fetch: {other:?}"
        ))),
        Err(e) => Err(ConfigError::Unreachable(e.to_string())),
    }
}
