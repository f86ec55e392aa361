use crate::blocks::{BlockDocument, normalize_whitespace, strip_markup};

/// Fraction of the search text (by character count) that must be present for
/// a fuzzy prefix match.
const FUZZY_PREFIX_RATIO: f64 = 0.9;
/// Extra characters pulled past the expected span end when recovering the
/// matched text from the block.
const FUZZY_SPAN_SLACK: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchOutcome {
    Replaced { block_index: usize },
    NotFound,
}

/// Applies an approved (old, new) replacement to the first block whose plain
/// text contains the old text, exactly or by 90%-prefix fuzzy match.
///
/// The matched block is rewritten from its plain-text form, so inline markup
/// inside that block is dropped. The fuzzy span recovery is a heuristic and
/// can clip or overrun the intended selection by a few characters; the exact
/// path is always preferred.
pub fn apply_replacement(doc: &mut BlockDocument, old_text: &str, new_text: &str) -> PatchOutcome {
    let search = normalize_whitespace(old_text);
    if search.is_empty() {
        return PatchOutcome::NotFound;
    }

    for (block_index, block) in doc.blocks.iter_mut().enumerate() {
        let Some(text) = block.data.text.as_deref() else {
            continue;
        };
        let plain = strip_markup(text);
        if plain.is_empty() {
            continue;
        }

        let Some(matched) = locate_span(&plain, &search) else {
            continue;
        };

        let replaced = plain.replacen(&matched, new_text, 1);
        tracing::debug!(
            block_index,
            matched_len = matched.len(),
            "text patch applied"
        );
        block.data.text = Some(replaced);
        return PatchOutcome::Replaced { block_index };
    }

    tracing::warn!(search_len = search.len(), "text patch target not found");
    PatchOutcome::NotFound
}

/// The span of `plain` to replace: the search text itself on an exact hit,
/// otherwise the fuzzy-recovered text starting at the 90%-prefix position.
fn locate_span(plain: &str, search: &str) -> Option<String> {
    if plain.contains(search) {
        return Some(search.to_owned());
    }

    let search_chars = search.chars().count();
    let prefix_chars = (search_chars as f64 * FUZZY_PREFIX_RATIO).floor() as usize;
    if prefix_chars == 0 {
        return None;
    }
    let prefix = search.chars().take(prefix_chars).collect::<String>();

    let start = plain.find(&prefix)?;
    let end = clamp_to_char_boundary(plain, start + search.len() + FUZZY_SPAN_SLACK);
    let candidate = &plain[start..end];

    let span_end = clamp_to_char_boundary(candidate, search.len());
    Some(candidate[..span_end].to_owned())
}

fn clamp_to_char_boundary(text: &str, mut idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
