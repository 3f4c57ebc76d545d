//! Topic text normalization.

/// Clean a raw topic text.
///
/// Trims whitespace, strips list markers and surrounding quotes, collapses
/// inner whitespace and truncates at a word boundary to `max_chars`.
/// Returns `None` if nothing is left.
pub fn normalize_topic_text(raw: &str, max_chars: usize) -> Option<String> {
    let text = strip_list_marker(raw.trim());
    let text = text
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '\u{201c}' | '\u{201d}'))
        .trim();
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(truncate_at_word(collapsed, max_chars))
}

/// Key used for exact duplicate detection.
pub fn duplicate_key(text: &str) -> String {
    text.to_lowercase()
}

fn strip_list_marker(text: &str) -> &str {
    let text = text
        .trim_start_matches(|c: char| matches!(c, '-' | '*' | '\u{2022}'))
        .trim_start();
    let digits = text.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &text[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return stripped.trim_start();
        }
    }
    text
}

fn truncate_at_word(text: String, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text;
    }
    let cut: String = text.chars().take(max_chars).collect();
    match cut.rfind(' ') {
        Some(idx) if idx > 0 => cut[..idx].trim_end().to_string(),
        _ => cut,
    }
}
