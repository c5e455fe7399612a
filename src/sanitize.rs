use std::collections::HashSet;

use tracing::info;

use crate::models::RawComment;

/// Dedupe, then drop spam. Order of surviving records is preserved.
///
/// 1. by id, first occurrence wins
/// 2. by (calendar month, exact text), first occurrence wins
/// 3. drop text shorter than `min_len` characters
/// 4. drop quote replies (text starting with `>`)
pub fn sanitize(records: Vec<RawComment>, min_len: usize) -> Vec<RawComment> {
    let initial = records.len();

    let mut seen_ids = HashSet::new();
    let by_id: Vec<RawComment> = records
        .into_iter()
        .filter(|r| seen_ids.insert(r.id.clone()))
        .collect();
    let after_id = by_id.len();

    let mut seen_text = HashSet::new();
    let by_text: Vec<RawComment> = by_id
        .into_iter()
        .filter(|r| seen_text.insert((r.month_key(), r.raw_text.clone())))
        .collect();
    let after_text = by_text.len();

    let kept: Vec<RawComment> = by_text
        .into_iter()
        .filter(|r| r.raw_text.chars().count() >= min_len)
        .filter(|r| !r.raw_text.trim().starts_with('>'))
        .collect();

    info!(
        initial,
        duplicate_ids = initial - after_id,
        reposts = after_id - after_text,
        spam = after_text - kept.len(),
        kept = kept.len(),
        "Sanitation complete"
    );
    kept
}

// ── Tests ──
