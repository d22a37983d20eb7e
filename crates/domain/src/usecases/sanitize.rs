//! Output sanitizing - deterministic post-processing of raw generated text
//!
//! The sanitizer is a declarative ordered list of rules applied in
//! sequence. Each rule is a pure string transform and is unit-testable on
//! its own. The full chain is idempotent for inputs already free of the
//! stripped markers.

/// A single sanitizing rule
#[derive(Debug, Clone)]
pub enum SanitizeRule {
    /// Strip a boilerplate marker when the text begins with it
    StripLeadingMarker(String),
    /// Drop whitespace-delimited tokens beginning with the given character
    DropTokensStartingWith(char),
    /// Collapse internal whitespace and newlines to single spaces and trim
    CollapseWhitespace,
    /// Enforce a maximum length in characters; overlong text is cut to
    /// `max - 3` characters with `...` appended
    TruncateChars(usize),
}

impl SanitizeRule {
    pub fn apply(&self, text: &str) -> String {
        match self {
            SanitizeRule::StripLeadingMarker(marker) => text
                .strip_prefix(marker.as_str())
                .map(|rest| rest.trim_start().to_string())
                .unwrap_or_else(|| text.to_string()),
            SanitizeRule::DropTokensStartingWith(prefix) => text
                .split_whitespace()
                .filter(|token| !token.starts_with(*prefix))
                .collect::<Vec<_>>()
                .join(" "),
            SanitizeRule::CollapseWhitespace => {
                text.split_whitespace().collect::<Vec<_>>().join(" ")
            }
            SanitizeRule::TruncateChars(max) => {
                if text.chars().count() <= *max {
                    text.to_string()
                } else {
                    let cut = max.saturating_sub(3);
                    let kept: String = text.chars().take(cut).collect();
                    format!("{}...", kept)
                }
            }
        }
    }
}

/// Ordered rule chain turning raw generator output into publishable text
#[derive(Debug, Clone)]
pub struct Sanitizer {
    rules: Vec<SanitizeRule>,
}

impl Sanitizer {
    pub fn new(rules: Vec<SanitizeRule>) -> Self {
        Self { rules }
    }

    /// Standard chain: strip each configured marker, drop hashtag tokens,
    /// collapse whitespace, enforce the platform character limit.
    pub fn standard(markers: &[String], max_chars: usize) -> Self {
        let mut rules: Vec<SanitizeRule> = markers
            .iter()
            .map(|m| SanitizeRule::StripLeadingMarker(m.clone()))
            .collect();
        rules.push(SanitizeRule::DropTokensStartingWith('#'));
        rules.push(SanitizeRule::CollapseWhitespace);
        rules.push(SanitizeRule::TruncateChars(max_chars));
        Self::new(rules)
    }

    /// Default boilerplate markers observed in generator output
    pub fn default_markers() -> Vec<String> {
        [
            "Output:",
            "Response:",
            "Tweet:",
            "Generated tweet:",
            "Here's a tweet:",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    pub fn sanitize(&self, text: &str) -> String {
        let mut current = text.trim().to_string();
        for rule in &self.rules {
            current = rule.apply(&current);
        }
        current
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::standard(&Self::default_markers(), 280)
    }
}
