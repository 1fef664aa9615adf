use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

/// Path of the health-check endpoint. Requests to it are never counted.
pub const HEALTH_PATH: &str = "/api/health";

// ─── Rule table ──────────────────────────────────────────────────

/// What a matching rule does to the path.
enum Action {
    /// Literal route: leave the path untouched.
    Keep,
    /// Dynamic route: rewrite with a regex replacement template.
    Rewrite(&'static str),
}

struct Rule {
    pattern: Regex,
    action: Action,
}

impl Rule {
    fn keep(pattern: &str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("normalizer rule pattern"),
            action: Action::Keep,
        }
    }

    fn rewrite(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("normalizer rule pattern"),
            action: Action::Rewrite(replacement),
        }
    }
}

/// Evaluated top to bottom, first match wins. Within a resource family the
/// literal routes come first, then the longest dynamic shapes.
static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        // ── Habits ──────────────────────────────────────────────
        Rule::keep(r"^/api/habits/(stats|entries)$"),
        Rule::rewrite(
            r"^/api/habits/[^/]+/entries/[^/]+$",
            "/api/habits/:id/entries/:date",
        ),
        Rule::rewrite(r"^/api/habits/[^/]+/entries$", "/api/habits/:id/entries"),
        Rule::rewrite(r"^/api/habits/[^/]+$", "/api/habits/:id"),
        // ── Weight ──────────────────────────────────────────────
        Rule::keep(r"^/api/weight/latest$"),
        Rule::rewrite(r"^/api/weight/[^/]+$", "/api/weight/:date"),
        // ── Friends ─────────────────────────────────────────────
        Rule::keep(r"^/api/friends/(request|respond|requests)(/|$)"),
        Rule::rewrite(
            r"^/api/friends/[^/]+(?P<rest>/.*)?$",
            "/api/friends/:email${rest}",
        ),
    ]
});

// ─── Public API ──────────────────────────────────────────────────

/// Canonical path for `raw_url`: query string removed, identifier segments
/// replaced with placeholders.
pub fn normalize_path(raw_url: &str) -> Cow<'_, str> {
    let path = strip_query(raw_url);

    for rule in RULES.iter() {
        if !rule.pattern.is_match(path) {
            continue;
        }
        return match rule.action {
            Action::Keep => Cow::Borrowed(path),
            Action::Rewrite(replacement) => rule.pattern.replace(path, replacement),
        };
    }
    Cow::Borrowed(path)
}

/// Canonical endpoint key, e.g. `"GET /api/habits/:id"`.
///
/// Total and deterministic: any input, including empty strings, yields a key.
pub fn normalize(method: &str, raw_url: &str) -> String {
    endpoint_key(method, &normalize_path(raw_url))
}

/// Endpoint key from an already canonical path.
pub fn endpoint_key(method: &str, canonical_path: &str) -> String {
    format!("{} {}", method.to_ascii_uppercase(), canonical_path)
}

/// Whether `raw_url` targets the health-check endpoint.
pub fn is_health_check(raw_url: &str) -> bool {
    normalize_path(raw_url) == HEALTH_PATH
}

fn strip_query(raw_url: &str) -> &str {
    match raw_url.find('?') {
        Some(i) => &raw_url[..i],
        None => raw_url,
    }
}
