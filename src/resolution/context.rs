use crate::config::ExtractionConfig;
use super::domain::ParameterSchema;

/// Returns the smallest faithful excerpt of `prompt` that still carries the
/// modifier words near a matched hint, so storage and embedding never lose
/// a qualifying adjective sitting next to the hint.
///
/// Tiers, tried in order: verbatim short prompt, sentence window around the
/// hint, fixed character window around the hint, description-keyword
/// fallback, truncated prompt. Whenever a hint matched, the returned
/// excerpt contains that hint whole.
pub fn extract_context(prompt: &str, schema: &ParameterSchema, config: &ExtractionConfig) -> String {
    if prompt.chars().count() <= config.full_prompt_max_chars {
        return prompt.to_string();
    }

    let hint_span = schema
        .semantic_hints
        .iter()
        .find_map(|hint| find_case_insensitive(prompt, hint));

    if let Some(hint) = hint_span {
        let sentences = split_sentences(prompt);
        if sentences.len() > 1 {
            if let Some(excerpt) = sentence_excerpt(prompt, &sentences, hint, config) {
                return excerpt;
            }
        }
        return window_excerpt(prompt, hint, config);
    }

    if let Some(excerpt) = keyword_fallback(prompt, &schema.description, config) {
        return excerpt;
    }

    truncate_chars(prompt, config.excerpt_max_chars)
        .trim()
        .to_string()
}

/// Case-insensitive substring search returning the byte span of the first
/// match. Safe on multi-byte text; comparison is on lowercased forms.
pub(crate) fn find_case_insensitive(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    let needle = needle.trim();
    if needle.is_empty() {
        return None;
    }
    let needle_lower = needle.to_lowercase();
    let needle_chars = needle.chars().count();
    let boundaries = haystack
        .char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(haystack.len()))
        .collect::<Vec<_>>();

    for start in 0..boundaries.len() {
        if start + needle_chars >= boundaries.len() {
            break;
        }
        let byte_start = boundaries[start];
        let byte_end = boundaries[start + needle_chars];
        if haystack[byte_start..byte_end].to_lowercase() == needle_lower {
            return Some((byte_start, byte_end));
        }
    }
    None
}

fn sentence_excerpt(
    prompt: &str,
    sentences: &[(usize, usize)],
    hint: (usize, usize),
    config: &ExtractionConfig,
) -> Option<String> {
    let idx = sentences
        .iter()
        .position(|&(start, end)| start <= hint.0 && hint.0 < end)?;

    let span_start = if idx > 0 {
        sentences[idx - 1].0
    } else {
        sentences[idx].0
    };
    let span_end = if idx + 1 < sentences.len() {
        sentences[idx + 1].1
    } else {
        sentences[idx].1
    };

    let clipped = clip_centered(prompt, (span_start, span_end), hint, config.excerpt_max_chars);
    let excerpt = prompt[clipped.0..clipped.1].trim();
    if excerpt.chars().count() >= config.min_sentence_excerpt_chars {
        Some(excerpt.to_string())
    } else {
        None
    }
}

fn window_excerpt(prompt: &str, hint: (usize, usize), config: &ExtractionConfig) -> String {
    let boundaries = char_boundaries(prompt);
    let hint_mid = (hint.0 + hint.1) / 2;
    let mid_idx = boundaries.partition_point(|&b| b <= hint_mid).saturating_sub(1);

    let start_idx = mid_idx.saturating_sub(config.window_radius_chars);
    let end_idx = (mid_idx + config.window_radius_chars).min(boundaries.len() - 1);
    let mut start = boundaries[start_idx].min(hint.0);
    let mut end = boundaries[end_idx].max(hint.1);

    // Snap outward so the window never opens or closes mid-word.
    start = snap_outward_left(prompt, start);
    end = snap_outward_right(prompt, end);

    let clipped = clip_centered(prompt, (start, end), hint, config.excerpt_max_chars);
    prompt[clipped.0..clipped.1].trim().to_string()
}

fn keyword_fallback(prompt: &str, description: &str, config: &ExtractionConfig) -> Option<String> {
    let keywords = significant_words(description);
    if keywords.is_empty() {
        return None;
    }

    let mut sentences = split_sentences(prompt);
    if sentences.is_empty() {
        sentences.push((0, prompt.len()));
    }

    let mut best: Option<((usize, usize), usize)> = None;
    for &span in &sentences {
        let overlap = significant_words(&prompt[span.0..span.1])
            .iter()
            .filter(|word| keywords.contains(*word))
            .count();
        if overlap > 0 && best.map(|(_, count)| overlap > count).unwrap_or(true) {
            best = Some((span, overlap));
        }
    }

    let (span, _) = best?;
    Some(
        truncate_chars(&prompt[span.0..span.1], config.excerpt_max_chars)
            .trim()
            .to_string(),
    )
}

fn significant_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| word.chars().count() > 3)
        .map(|word| word.to_lowercase())
        .collect()
}

/// Byte spans of trimmed sentences, split after `.`, `!`, `?` or newline.
fn split_sentences(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut start = 0usize;
    for (idx, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?' | '\n') {
            let end = idx + ch.len_utf8();
            push_trimmed_span(text, start, end, &mut spans);
            start = end;
        }
    }
    push_trimmed_span(text, start, text.len(), &mut spans);
    spans
}

fn push_trimmed_span(text: &str, start: usize, end: usize, spans: &mut Vec<(usize, usize)>) {
    let raw = &text[start..end];
    let trimmed_start = start + (raw.len() - raw.trim_start().len());
    let trimmed_end = end - (raw.len() - raw.trim_end().len());
    if trimmed_start < trimmed_end {
        spans.push((trimmed_start, trimmed_end));
    }
}

/// Clips `span` to at most `max_chars` characters centered on the hint,
/// shrinking edges to word boundaries without ever splitting the hint.
fn clip_centered(
    text: &str,
    span: (usize, usize),
    hint: (usize, usize),
    max_chars: usize,
) -> (usize, usize) {
    let boundaries = char_boundaries(text);
    let span_start_idx = boundaries.partition_point(|&b| b < span.0);
    let span_end_idx = boundaries.partition_point(|&b| b < span.1);
    if span_end_idx - span_start_idx <= max_chars {
        return span;
    }

    let hint_mid = (hint.0 + hint.1) / 2;
    let mid_idx = boundaries.partition_point(|&b| b <= hint_mid).saturating_sub(1);
    let half = max_chars / 2;

    let mut start_idx = mid_idx.saturating_sub(half).max(span_start_idx);
    let end_idx = (start_idx + max_chars).min(span_end_idx);
    start_idx = end_idx.saturating_sub(max_chars).max(span_start_idx);

    let mut start = boundaries[start_idx].min(hint.0);
    let mut end = boundaries[end_idx].max(hint.1);

    start = snap_inward_right(text, start, hint.0);
    end = snap_inward_left(text, end, hint.1);
    (start, end)
}

/// Moves `start` forward past a partial word to the next whitespace
/// boundary, never past `limit`.
fn snap_inward_right(text: &str, start: usize, limit: usize) -> usize {
    if start == 0 || start >= limit {
        return start;
    }
    let prev_is_word = text[..start]
        .chars()
        .next_back()
        .map(|c| c.is_alphanumeric())
        .unwrap_or(false);
    let cur_is_word = text[start..]
        .chars()
        .next()
        .map(|c| c.is_alphanumeric())
        .unwrap_or(false);
    if !(prev_is_word && cur_is_word) {
        return start;
    }
    match text[start..limit].find(char::is_whitespace) {
        Some(offset) => {
            let mut snapped = start + offset;
            for ch in text[snapped..limit].chars() {
                if ch.is_whitespace() {
                    snapped += ch.len_utf8();
                } else {
                    break;
                }
            }
            snapped
        }
        None => start,
    }
}

/// Moves `end` backward past a partial word to the previous whitespace
/// boundary, never before `floor`.
fn snap_inward_left(text: &str, end: usize, floor: usize) -> usize {
    if end >= text.len() || end <= floor {
        return end;
    }
    let prev_is_word = text[..end]
        .chars()
        .next_back()
        .map(|c| c.is_alphanumeric())
        .unwrap_or(false);
    let cur_is_word = text[end..]
        .chars()
        .next()
        .map(|c| c.is_alphanumeric())
        .unwrap_or(false);
    if !(prev_is_word && cur_is_word) {
        return end;
    }
    match text[floor..end].rfind(char::is_whitespace) {
        Some(offset) => floor + offset,
        None => end,
    }
}

fn snap_outward_left(text: &str, mut start: usize) -> usize {
    while start > 0 {
        let prev = match text[..start].chars().next_back() {
            Some(ch) => ch,
            None => break,
        };
        if prev.is_whitespace() || prev.is_ascii_punctuation() {
            break;
        }
        start -= prev.len_utf8();
    }
    start
}

fn snap_outward_right(text: &str, mut end: usize) -> usize {
    while end < text.len() {
        let next = match text[end..].chars().next() {
            Some(ch) => ch,
            None => break,
        };
        if next.is_whitespace() || next.is_ascii_punctuation() {
            break;
        }
        end += next.len_utf8();
    }
    end
}

fn char_boundaries(text: &str) -> Vec<usize> {
    text.char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(text.len()))
        .collect()
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
