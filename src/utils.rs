// src/utils.rs

/// Output languages the model is asked to write in.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[("en", "English"), ("de", "German"), ("fr", "French")];

/// Normalize language code
pub fn normalize_language(lang: Option<&str>) -> String {
    match lang.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("fr") | Some("french") | Some("français") => "fr".to_string(),
        Some("de") | Some("german") | Some("deutsch") => "de".to_string(),
        _ => "en".to_string(), // Default to English for None or unknown languages
    }
}

/// Human name of a normalized language code, as written in prompts.
pub fn language_name(code: &str) -> &'static str {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
        .unwrap_or("English")
}

/// Get file extension in lowercase
pub fn get_file_extension(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

pub fn is_http_url(value: &str) -> bool {
    let value = value.trim_start();
    value.starts_with("http://") || value.starts_with("https://")
}

/// Cut to at most `max` characters without splitting a code point.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Trim every line, collapse inner whitespace and drop empty lines.
pub fn clean_text(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove a surrounding markdown code fence (```json ... ```) if present.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Byte ranges where `term` occurs in `haystack` as a whole word,
/// ignoring case. Terms like "C++" or "Node.js" work as written.
pub fn term_spans(haystack: &str, term: &str) -> Vec<(usize, usize)> {
    let term = term.trim();
    if term.is_empty() {
        return Vec::new();
    }
    let Ok(re) = regex::RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
    else {
        return Vec::new();
    };

    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    re.find_iter(haystack)
        .filter(|m| {
            let before = haystack[..m.start()].chars().next_back();
            let after = haystack[m.end()..].chars().next();
            !before.is_some_and(is_word) && !after.is_some_and(is_word)
        })
        .map(|m| (m.start(), m.end()))
        .collect()
}

pub fn mentions_term(haystack: &str, term: &str) -> bool {
    !term_spans(haystack, term).is_empty()
}
