//! Sentence segmentation of merged section text.

/// Sentences kept together at most while a bracket stays open.
const MAX_BRACKET_SPAN: usize = 10;

/// Split text at `.`, `?`, `!` followed by whitespace, and at line breaks.
///
/// Every non-whitespace character of the input ends up in exactly one
/// returned sentence; sentences are trimmed and never empty.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            flush(&mut current, &mut sentences);
            continue;
        }
        current.push(c);
        if matches!(c, '.' | '?' | '!') && chars.peek().is_some_and(|n| n.is_whitespace()) {
            flush(&mut current, &mut sentences);
        }
    }
    flush(&mut current, &mut sentences);

    sentences
}

fn flush(current: &mut String, sentences: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_owned());
    }
    current.clear();
}

/// Re-join sentences whose brackets are still open, e.g. a citation list
/// `(Smith et al. 2001; Lee 2004)` cut at an abbreviation.
#[must_use]
pub fn join_bracketed(sentences: Vec<String>) -> Vec<String> {
    let mut joined = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    let (mut open, mut close) = (0usize, 0usize);

    for sentence in sentences {
        for c in sentence.chars() {
            match c {
                '(' | '[' => open += 1,
                ')' | ']' => close += 1,
                _ => {}
            }
        }
        pending.push(sentence);
        if open > close && pending.len() < MAX_BRACKET_SPAN {
            continue;
        }
        joined.push(pending.join(" "));
        pending.clear();
        open = 0;
        close = 0;
    }
    if !pending.is_empty() {
        joined.push(pending.join(" "));
    }

    joined
}

/// Segment a section's merged paragraph text into sentences.
#[must_use]
pub fn segment(text: &str) -> Vec<String> {
    join_bracketed(split_sentences(text))
}
