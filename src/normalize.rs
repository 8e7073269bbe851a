//! Whitespace normalization applied to every field before validation.

use crate::column::ColumnRule;

/// Ideographic space, treated as whitespace alongside ASCII whitespace.
pub const FULL_WIDTH_SPACE: char = '\u{3000}';

pub fn is_space(c: char) -> bool {
    matches!(
        c,
        ' ' | '\t' | '\n' | '\u{0B}' | '\u{0C}' | '\r' | FULL_WIDTH_SPACE
    )
}

/// True for an empty value or one made only of whitespace.
pub fn is_blank(value: &str) -> bool {
    value.chars().all(is_space)
}

pub fn normalize(raw: Option<&str>, rule: &ColumnRule) -> String {
    let mut value = raw.unwrap_or_default();
    if rule.trim() {
        value = value.trim_matches(is_space);
    }
    // Legacy rule: one trailing tab, CR or space is always dropped.
    if let Some(stripped) = value
        .strip_suffix(' ')
        .or_else(|| value.strip_suffix('\t'))
        .or_else(|| value.strip_suffix('\r'))
    {
        value = stripped;
    }
    value.to_string()
}
