/// Posts conventionally open with `Company | Role | Location | ...`.
pub fn company_name(text: &str, max_len: usize) -> Option<String> {
    let mut parts = text.split('|');
    let first = parts.next()?.trim();
    parts.next()?;
    (!first.is_empty() && first.chars().count() < max_len).then(|| first.to_string())
}

pub fn role_title(text: &str) -> Option<String> {
    text.split('|')
        .nth(1)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

// ── Tests ──
