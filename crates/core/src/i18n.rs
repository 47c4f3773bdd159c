//! Minimal translation lookup.
//!
//! A [`Catalog`] maps dotted keys (`"comments.error.delete"`) to
//! templates. Templates use `{{name}}` placeholders filled by
//! [`interpolate`]. Unknown keys translate to themselves so a missing
//! entry is visible but never fatal.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::CoreError;

/// English messages used when no locale file is configured.
const ENGLISH: &[(&str, &str)] = &[
    ("comments.anonymous", "Anonymous"),
    ("comments.empty", "No comments yet."),
    ("comments.count", "{{count}} comments on {{job}}"),
    ("comments.added", "Comment posted as {{author}}."),
    ("comments.edited", "Comment {{id}} updated."),
    ("comments.deleted", "Comment {{id}} deleted."),
    ("comments.error.invalid", "Comment text cannot be empty."),
    ("comments.error.fetch", "Could not load comments. Showing cached content."),
    ("comments.error.add", "Could not post your comment."),
    ("comments.error.edit", "Could not update the comment. Changes were reverted."),
    ("comments.error.delete", "Could not delete the comment. It has been restored."),
    ("comments.error.not_found", "Comment {{id}} was not found."),
    ("comments.error.reset", "Your session ended before the change was saved."),
    ("jobs.page", "Loaded {{count}} jobs ({{total}} so far)."),
    ("jobs.exhausted", "No more jobs."),
    ("jobs.error.page", "Could not load more jobs."),
];

/// A flat key → template table for one locale.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: HashMap<String, String>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in English catalog.
    pub fn english() -> Self {
        Self {
            entries: ENGLISH
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Parse a catalog from a flat JSON object of string values.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let entries: HashMap<String, String> = serde_json::from_str(json)
            .map_err(|e| CoreError::Validation(format!("Invalid locale catalog: {e}")))?;
        Ok(Self { entries })
    }

    /// Layer `other` on top of this catalog; its entries win.
    pub fn merged(mut self, other: Catalog) -> Self {
        self.entries.extend(other.entries);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up `key`, returning the key itself when it is missing.
    pub fn translate<'a>(&'a self, key: &'a str) -> &'a str {
        self.entries.get(key).map(String::as_str).unwrap_or(key)
    }

    /// Look up `key` and fill its placeholders from `params`.
    pub fn format(&self, key: &str, params: &[(&str, &str)]) -> String {
        interpolate(self.translate(key), params)
    }
}

/// Pattern matching `{{name}}` placeholders, with optional inner whitespace.
pub const PLACEHOLDER_PATTERN: &str = r"\{\{\s*(\w+)\s*\}\}";

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PLACEHOLDER_PATTERN).expect("valid regex"));

/// Replace `{{name}}` placeholders in `template` with values from `params`.
///
/// Whitespace inside the braces is ignored. Placeholders without a matching
/// parameter are left as written.
pub fn interpolate(template: &str, params: &[(&str, &str)]) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| {
            let name = &caps[1];
            match params.iter().find(|(k, _)| *k == name) {
                Some((_, value)) => (*value).to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn missing_key_translates_to_itself() {
        let catalog = Catalog::new();
        assert_eq!(catalog.translate("jobs.none"), "jobs.none");
    }

    #[test]
    fn english_catalog_has_anonymous_label() {
        let catalog = Catalog::english();
        assert_eq!(catalog.translate(crate::comment::ANONYMOUS_AUTHOR_KEY), "Anonymous");
    }

    #[test]
    fn interpolate_fills_named_placeholders() {
        let out = interpolate("{{count}} comments on {{ job }}", &[("count", "3"), ("job", "job-7")]);
        assert_eq!(out, "3 comments on job-7");
    }

    #[test]
    fn interpolate_keeps_unknown_and_unterminated_placeholders() {
        assert_eq!(interpolate("Hi {{name}}", &[]), "Hi {{name}}");
        assert_eq!(interpolate("Hi {{name", &[("name", "Ann")]), "Hi {{name");
    }

    #[test]
    fn interpolate_leaves_values_unexpanded() {
        let out = interpolate("{{a}} and {{b}}", &[("a", "{{b}}"), ("b", "2")]);
        assert_eq!(out, "{{b}} and 2");
    }

    #[test]
    fn json_catalog_overrides_english() {
        let german = Catalog::from_json(r#"{"jobs.exhausted": "Keine weiteren Jobs."}"#).unwrap();
        let catalog = Catalog::english().merged(german);
        assert_eq!(catalog.translate("jobs.exhausted"), "Keine weiteren Jobs.");
        assert_eq!(catalog.translate("comments.anonymous"), "Anonymous");
    }

    #[test]
    fn non_string_values_are_rejected() {
        assert_matches!(Catalog::from_json(r#"{"a": 1}"#), Err(CoreError::Validation(_)));
    }

    #[test]
    fn format_combines_lookup_and_interpolation() {
        let catalog = Catalog::english();
        assert_eq!(
            catalog.format("comments.deleted", &[("id", "c2")]),
            "Comment c2 deleted."
        );
    }
}
