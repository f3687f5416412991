//! Post-processing of generated answers.

use regex::Regex;
use std::sync::LazyLock;

/// Line prefixes of the prompt scaffolding that models sometimes echo.
const SCAFFOLDING: [&str; 5] = [
    "You are",
    "INSTRUCTIONS:",
    "CONTEXT INFORMATION:",
    "USER QUESTION:",
    "RESPONSE:",
];

/// List-marker and blank-line rewrites.
struct Rules {
    numbered_item: Regex,
    bullet_item: Regex,
    blank_run: Regex,
}

impl Rules {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            numbered_item: Regex::new(r"(?m)^(\d+)[.)][ \t]*([^\d\s])")?,
            bullet_item: Regex::new(r"(?m)^[-*•]\s+")?,
            blank_run: Regex::new(r"\n{3,}")?,
        })
    }

    fn apply(&self, text: &str) -> String {
        let text = self.numbered_item.replace_all(text, "$1. $2");
        let text = self.bullet_item.replace_all(&text, "• ");
        self.blank_run.replace_all(&text, "\n\n").into_owned()
    }
}

static RULES: LazyLock<Option<Rules>> = LazyLock::new(|| Rules::compile().ok());

/// Clean a generated answer for display.
///
/// Drops echoed scaffolding lines and leading blank lines, rewrites list
/// markers to `N. ` and `• `, collapses runs of blank lines to one, and
/// trims the result.
#[must_use]
pub fn format_response(raw: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in raw.trim().lines().map(str::trim) {
        if line.is_empty() && lines.is_empty() {
            continue;
        }
        if SCAFFOLDING.iter().any(|prefix| line.starts_with(prefix)) {
            continue;
        }
        lines.push(line);
    }

    let text = lines.join("\n");
    match RULES.as_ref() {
        Some(rules) => rules.apply(&text).trim().to_string(),
        None => text.trim().to_string(),
    }
}
