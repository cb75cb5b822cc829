//! Suspicious-content registries and the host-element filter

use once_cell::sync::Lazy;
use regex::Regex;

use crate::host::ElementInfo;

/// A phrase that betrays answer-helper UI, matched against leaf text only
pub struct TextPattern {
    pub name: &'static str,
    pub pattern: &'static str,
    pub weight: u32,
}

pub static TEXT_PATTERNS: &[TextPattern] = &[
    TextPattern { name: "get_answer", pattern: r"(?i)\bget\s+answers?\b", weight: 8 },
    TextPattern { name: "show_answer", pattern: r"(?i)\bshow\s+answers?\b", weight: 7 },
    TextPattern { name: "solve_this", pattern: r"(?i)\bsolve\s+(this|question|quiz)\b", weight: 7 },
    TextPattern { name: "ask_ai", pattern: r"(?i)\bask\s+ai\b", weight: 7 },
    TextPattern { name: "ai_answer", pattern: r"(?i)\bai\s+answers?\b", weight: 8 },
    TextPattern { name: "copy_answer", pattern: r"(?i)\bcopy\s+answers?\b", weight: 8 },
    TextPattern { name: "homework_help", pattern: r"(?i)\bhomework\s+help\b", weight: 6 },
    TextPattern { name: "brainly", pattern: r"(?i)\bbrainly\b", weight: 8 },
    TextPattern { name: "chegg", pattern: r"(?i)\bchegg\b", weight: 8 },
    TextPattern { name: "course_hero", pattern: r"(?i)\bcourse\s*hero\b", weight: 8 },
    TextPattern { name: "quizlet", pattern: r"(?i)\bquizlet\b", weight: 6 },
    TextPattern { name: "comet_assistant", pattern: r"(?i)\bcomet\s+assistant\b", weight: 10 },
    TextPattern { name: "perplexity", pattern: r"(?i)\bperplexity\b", weight: 9 },
];

/// A class/id/src/href shape used by helper tooling
pub struct AttributePattern {
    pub name: &'static str,
    pub pattern: &'static str,
    pub weight: u32,
}

pub static ATTRIBUTE_PATTERNS: &[AttributePattern] = &[
    AttributePattern { name: "comet_marker", pattern: r"(?i)comet-(assistant|overlay|panel|sidebar)", weight: 10 },
    AttributePattern { name: "perplexity_marker", pattern: r"(?i)perplexity", weight: 9 },
    AttributePattern { name: "quiz_solver", pattern: r"(?i)(quiz|question|test|exam)[-_]?solver", weight: 9 },
    AttributePattern { name: "auto_answer", pattern: r"(?i)auto[-_]?answer", weight: 9 },
    AttributePattern { name: "answer_overlay", pattern: r"(?i)answer[-_]?(overlay|popup|panel|bubble|widget)", weight: 8 },
    AttributePattern { name: "ai_helper", pattern: r"(?i)\bai[-_](helper|assist|assistant|answer)", weight: 8 },
    AttributePattern { name: "homework_helper", pattern: r"(?i)homework[-_]?help", weight: 8 },
    AttributePattern { name: "extension_content_root", pattern: r"(?i)extension[-_]?content[-_]?(root|script|frame)", weight: 7 },
];

static COMPILED_TEXT: Lazy<Vec<Regex>> = Lazy::new(|| {
    TEXT_PATTERNS
        .iter()
        .map(|p| Regex::new(p.pattern).expect("valid regex"))
        .collect()
});

static COMPILED_ATTRIBUTES: Lazy<Vec<Regex>> = Lazy::new(|| {
    ATTRIBUTE_PATTERNS
        .iter()
        .map(|p| Regex::new(p.pattern).expect("valid regex"))
        .collect()
});

/// Iterate text patterns with their compiled regexes
pub fn text_patterns() -> impl Iterator<Item = (&'static TextPattern, &'static Regex)> {
    TEXT_PATTERNS.iter().zip(COMPILED_TEXT.iter())
}

/// Iterate attribute patterns with their compiled regexes
pub fn attribute_patterns() -> impl Iterator<Item = (&'static AttributePattern, &'static Regex)> {
    ATTRIBUTE_PATTERNS.iter().zip(COMPILED_ATTRIBUTES.iter())
}

/// Class/id prefixes owned by the host platform, its editors, icon fonts
/// and the utility-class framework underneath its theme
static HOST_PREFIXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Platform page chrome and component prefixes
        r"^(moodle|yui|core_|theme_|block_|mod_|qtype_|que\b|region-|page-|path-|context-|drawer|navbar|usermenu|action-menu|activity|course|section)",
        // Editor toolbars
        r"^(atto_|tiny|tox-|cke_|mce|editor_)",
        // Utility / component classes from the bundled CSS framework
        r"^(btn|col-|row$|container|card|badge|dropdown|modal|tooltip|popover|carousel|alert|nav|form-|input-|custom-|list-group|table|progress|spinner|close|collapse|fade|show|active|disabled|d-|m[tblrxye]?-|p[tblrxye]?-|text-|bg-|border|rounded|shadow|w-\d|h-\d|align-|justify-|flex|float-|position-|sr-only|visually-hidden)",
        // Icon fonts
        r"^(fa|icon|bi-|material-icons)",
        // Test hooks owned by the platform's own suite
        r"^(behat|fixture-)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Data attributes that mark platform-rendered elements
pub static HOST_DATA_ATTRIBUTES: &[&str] = &[
    "data-region",
    "data-action",
    "data-toggle",
    "data-dismiss",
    "data-target",
    "data-usertour",
    "data-auto-rows",
];

/// Whether the element belongs to the host platform and must be skipped
pub fn is_host_element(element: &ElementInfo) -> bool {
    let id_hit = !element.id.is_empty() && HOST_PREFIXES.iter().any(|re| re.is_match(&element.id));
    if id_hit {
        return true;
    }

    let class_hit = element
        .classes
        .split_whitespace()
        .any(|token| HOST_PREFIXES.iter().any(|re| re.is_match(token)));
    if class_hit {
        return true;
    }

    element
        .data_attrs
        .iter()
        .any(|attr| HOST_DATA_ATTRIBUTES.contains(&attr.as_str()))
}
