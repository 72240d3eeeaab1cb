//! Quality heuristic for recognized text
//!
//! Good OCR output of business documents is dense with values: amounts,
//! dates, ids, email addresses. Text that is short, or whose lines are mostly
//! free prose or noise, is considered low quality.

use regex::Regex;
use std::sync::LazyLock;

/// Minimum number of characters for text to be considered at all
pub const MIN_TEXT_CHARS: usize = 100;

/// Minimum fraction of value-bearing lines
pub const MIN_VALUE_LINE_RATIO: f64 = 0.20;

static VALUE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\d{2,}",
        r"@",
        r"\$\s*\d+",
        r"\d{1,2}/\d{1,2}/\d{2,4}",
        r"\d{4}-\d{2}-\d{2}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Outcome of the quality heuristic
#[derive(Debug, Clone, PartialEq)]
pub struct QualityReport {
    /// Character count
    pub chars: usize,
    /// Number of lines
    pub lines: usize,
    /// Lines matching at least one value pattern
    pub value_lines: usize,
    /// `value_lines / lines`
    pub ratio: f64,
    /// Whether the text passes
    pub passed: bool,
}

/// Whether a single line carries a value
pub fn is_value_line(line: &str) -> bool {
    VALUE_PATTERNS.iter().any(|re| re.is_match(line))
}

/// Evaluate recognized text
pub fn assess(text: &str) -> QualityReport {
    let chars = text.chars().count();
    let lines: Vec<&str> = text.split('\n').collect();
    let value_lines = lines.iter().filter(|l| is_value_line(l)).count();
    let ratio = if lines.is_empty() {
        0.0
    } else {
        value_lines as f64 / lines.len() as f64
    };
    let passed = chars >= MIN_TEXT_CHARS && ratio >= MIN_VALUE_LINE_RATIO;

    QualityReport {
        chars,
        lines: lines.len(),
        value_lines,
        ratio,
        passed,
    }
}

/// Shorthand for `assess(text).passed`
pub fn passes_quality_gate(text: &str) -> bool {
    assess(text).passed
}
