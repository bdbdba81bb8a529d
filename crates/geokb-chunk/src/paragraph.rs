//! Re-joining of paragraph lines broken apart by line wrapping.

use std::sync::LazyLock;

use regex::Regex;

/// Paragraphs shorter than this (in characters) are glued to their neighbour.
const SHORT_PARAGRAPH_CHARS: usize = 100;

static TABLE_ROW_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\|(.+)\|").unwrap());

fn ends_sentence(text: &str) -> bool {
    text.ends_with(['.', '!', '?'])
}

/// `false` while an opening `(` or `[` is still waiting for its close.
fn brackets_closed(text: &str) -> bool {
    let (mut paren, mut square) = (0i64, 0i64);
    for c in text.chars() {
        match c {
            '(' => paren += 1,
            ')' => paren -= 1,
            '[' => square += 1,
            ']' => square -= 1,
            _ => {}
        }
    }
    paren <= 0 && square <= 0
}

/// Continue a wrapped line; a trailing hyphen joins the halves of a word.
fn join_wrapped(prev: &mut String, next: &str) {
    if !prev.ends_with('-') {
        prev.push(' ');
    }
    prev.push_str(next);
}

fn append_paragraph(merged: &mut Vec<String>, next: &str) {
    let Some(prev) = merged.last_mut() else {
        merged.push(next.to_owned());
        return;
    };

    if !ends_sentence(prev) || !brackets_closed(prev) {
        join_wrapped(prev, next);
    } else if prev.chars().count() < SHORT_PARAGRAPH_CHARS
        || next.chars().count() < SHORT_PARAGRAPH_CHARS
    {
        prev.push('\n');
        prev.push_str(next);
    } else {
        merged.push(next.to_owned());
    }
}

/// Merge one section's raw lines into paragraphs.
///
/// Consecutive pipe-delimited table rows form a single block. Other lines
/// extend the previous paragraph when it does not end a sentence, leaves a
/// bracket open, or when either side is short.
pub(crate) fn merge_paragraphs(lines: &[String]) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    let mut in_table = false;

    for line in lines.iter().filter(|l| !l.is_empty()) {
        if TABLE_ROW_RE.is_match(line) {
            match (in_table, merged.last_mut()) {
                (true, Some(table)) => {
                    table.push('\n');
                    table.push_str(line);
                }
                _ => {
                    merged.push(line.clone());
                    in_table = true;
                }
            }
            continue;
        }

        if in_table {
            in_table = false;
            merged.push(line.clone());
            continue;
        }

        append_paragraph(&mut merged, line);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| (*s).to_owned()).collect()
    }

    fn long(prefix: &str) -> String {
        format!("{prefix} {}.", "sediment ".repeat(15).trim_end())
    }

    #[test]
    fn unterminated_line_continues_with_space() {
        let out = merge_paragraphs(&owned(&["The river carried", "fine silt downstream."]));
        assert_eq!(out, vec!["The river carried fine silt downstream."]);
    }

    #[test]
    fn hyphenated_wrap_joins_without_space() {
        let out = merge_paragraphs(&owned(&["The sedi-", "ment settled."]));
        assert_eq!(out, vec!["The sedi-ment settled."]);
    }

    #[test]
    fn open_parenthesis_continues() {
        let a = long("First (see Fig. 2.");
        let b = long("Second");
        let out = merge_paragraphs(&[a.clone(), b.clone()]);
        assert_eq!(out, vec![format!("{a} {b}")]);
    }

    #[test]
    fn open_bracket_continues() {
        assert!(!brackets_closed("cited in [12, 14."));
        assert!(brackets_closed("cited in [12, 14]."));
    }

    #[test]
    fn short_paragraphs_join_with_newline() {
        let out = merge_paragraphs(&owned(&["Short one.", "Short two."]));
        assert_eq!(out, vec!["Short one.\nShort two."]);
    }

    #[test]
    fn long_terminated_paragraphs_stay_separate() {
        let a = long("Alpha");
        let b = long("Beta");
        let out = merge_paragraphs(&[a.clone(), b.clone()]);
        assert_eq!(out, vec![a, b]);
    }

    #[test]
    fn table_rows_form_one_block() {
        let out = merge_paragraphs(&owned(&[
            "Intro text.",
            "| site | depth |",
            "| A | 12 |",
            "| B | 40 |",
            "After the table.",
        ]));
        assert_eq!(
            out,
            vec![
                "Intro text.",
                "| site | depth |\n| A | 12 |\n| B | 40 |",
                "After the table.",
            ]
        );
    }

    #[test]
    fn question_and_exclamation_end_sentences() {
        assert!(ends_sentence("Why?"));
        assert!(ends_sentence("Done!"));
        assert!(!ends_sentence("and then"));
    }
}
