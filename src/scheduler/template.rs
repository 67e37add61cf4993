//! Comment template rendering.

use crate::config::Delay;

/// Renders a notification or comment template.
///
/// Replaces every `$DELAY`, `$LABEL` and `$AUTHOR`. A suppressed delay renders
/// as the empty string.
pub fn render(template: &str, delay: &Delay, label: &str, author: &str) -> String {
    substitute(
        template,
        &[
            ("$DELAY", &delay.describe()),
            ("$LABEL", label),
            ("$AUTHOR", author),
        ],
    )
}

/// Renders a tag name template for a merged pull request.
pub fn render_tag(template: &str, number: u64, branch: &str) -> String {
    substitute(
        template,
        &[("$NUMBER", &number.to_string()), ("$BRANCH", branch)],
    )
}

/// Replaces placeholders in one pass over the template. Substituted values
/// are never scanned again.
fn substitute(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match values.iter().find(|(name, _)| tail.starts_with(name)) {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len()..];
            }
            None => {
                out.push('$');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn substitutes_all_placeholders() {
        let body = render(
            "$LABEL issue created! Closing in $DELAY . . .",
            &Delay::After(Duration::from_millis(5)),
            "duplicate",
            "octocat",
        );
        assert_eq!(body, "duplicate issue created! Closing in 5 ms . . .");
    }

    #[test]
    fn replaces_repeated_placeholders() {
        let body = render(
            "@$AUTHOR: `$LABEL` ($LABEL) in $DELAY",
            &Delay::After(Duration::from_secs(7200)),
            "stale",
            "octocat",
        );
        assert_eq!(body, "@octocat: `stale` (stale) in 2 hours");
    }

    #[test]
    fn suppressed_delay_renders_empty() {
        assert_eq!(render("in [$DELAY]", &Delay::Suppressed, "x", "y"), "in []");
    }

    #[test]
    fn placeholders_inside_values_are_left_alone() {
        let body = render(
            "$LABEL by $AUTHOR",
            &Delay::After(Duration::from_secs(60)),
            "$AUTHOR-tag",
            "alice",
        );
        assert_eq!(body, "$AUTHOR-tag by alice");
    }

    #[test]
    fn unknown_dollar_sequences_are_kept() {
        assert_eq!(
            render("costs $5, $LABELS and $", &Delay::Suppressed, "x", "y"),
            "costs $5, xS and $"
        );
    }

    #[test]
    fn tag_template() {
        assert_eq!(render_tag("release-$NUMBER-$BRANCH", 12, "feat"), "release-12-feat");
    }
}
