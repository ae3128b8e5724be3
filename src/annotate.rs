//! Class annotation of the document root.
//!
//! Every truthy check contributes its lowercased name as a class token.
//! Tokens are only ever appended, never removed, and a token already on
//! the root is skipped, so annotating twice is a no-op.

use std::collections::HashSet;

use tracing::debug;

use crate::host::ClassTarget;
use crate::value::CheckValue;

/// Names of the callable entries of the result object; never class tokens.
pub const RESERVED_NAMES: &[&str] = &[
    "addTest",
    "uaCheck",
    "propCheck",
    "cssCheck",
    "valCheck",
    "requestAnimFrame",
    "cancelAnimFrame",
    "setClasses",
];

const NO_JS_CLASS: &str = "no-js";
const JS_CLASS: &str = "js";

/// Projects results onto class tokens and applies them to a [`ClassTarget`].
#[derive(Debug, Clone)]
pub struct ClassAnnotator {
    replace_no_js: bool,
}

impl Default for ClassAnnotator {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ClassAnnotator {
    /// `replace_no_js` rewrites an existing `no-js` class to `js`.
    #[must_use]
    pub fn new(replace_no_js: bool) -> Self {
        Self { replace_no_js }
    }

    /// Normalizes the current class attribute, keeping its whitespace.
    #[must_use]
    pub fn normalize(&self, class_name: &str) -> String {
        if !self.replace_no_js {
            return class_name.to_string();
        }
        let mut out = String::with_capacity(class_name.len());
        let mut rest = class_name;
        while let Some(start) = rest.find(|c: char| !c.is_whitespace()) {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let end = tail.find(char::is_whitespace).unwrap_or(tail.len());
            let token = &tail[..end];
            out.push_str(if token == NO_JS_CLASS { JS_CLASS } else { token });
            rest = &tail[end..];
        }
        out.push_str(rest);
        out
    }

    /// New tokens for truthy, non-reserved results, in result order.
    pub fn compute_class_tokens<'a, I>(
        &self,
        results: I,
        excluded: &[&str],
        current_class_name: &str,
    ) -> Vec<String>
    where
        I: IntoIterator<Item = (&'a str, &'a CheckValue)>,
    {
        let normalized = self.normalize(current_class_name);
        let present: HashSet<&str> = normalized.split_whitespace().collect();
        let mut tokens = Vec::new();

        for (name, value) in results {
            if excluded.contains(&name) || !value.is_truthy() {
                continue;
            }
            let token = name.to_lowercase();
            if present.contains(token.as_str()) || tokens.contains(&token) {
                continue;
            }
            tokens.push(token);
        }
        tokens
    }

    /// Appends `tokens` to the target's class attribute; returns whether it changed.
    ///
    /// Interior whitespace is kept. The attribute is trimmed only when it is
    /// rewritten.
    pub fn apply_classes(&self, target: &mut dyn ClassTarget, tokens: &[String]) -> bool {
        let current = target.class_name();
        let normalized = self.normalize(&current);
        let mut next = normalized.trim().to_string();
        let mut added = 0;
        for token in tokens {
            if next.split_whitespace().any(|t| t == token) {
                continue;
            }
            if !next.is_empty() {
                next.push(' ');
            }
            next.push_str(token);
            added += 1;
        }

        if added == 0 && normalized == current {
            return false;
        }
        if next == current {
            return false;
        }
        debug!(added, class_name = %next, "annotated document root");
        target.set_class_name(&next);
        true
    }
}
