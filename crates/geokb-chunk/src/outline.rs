//! Structural parsing of semi-structured text into a title/section/subsection
//! outline.
//!
//! Parsing is a pure fold over trimmed, non-empty lines: every line produces a
//! new [`OutlineState`] from the previous one. Missing or irregular headings
//! are never errors; they are repaired by the heuristics in
//! [`Outline::into_sections`].

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::paragraph::merge_paragraphs;
use crate::types::SectionPath;

/// Headings that denote a main section even when written at a deeper level.
const SECTION_KEYWORDS: [&str; 5] = [
    "abstract",
    "introduction",
    "conclusion",
    "acknowledgement",
    "reference",
];

/// Sections that end chunking: everything from the first match on is dropped.
const FILTERED_SECTIONS: [&str; 3] = ["acknowledgement", "acknowledgment", "reference"];

/// Bold spans must end before this column to count as a subsection heading.
const MAX_BOLD_HEADING_LEN: usize = 50;

static BOLD_HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\*{2}(.{2,}?)\*{2}").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
enum LineKind<'a> {
    Title(&'a str),
    Section(&'a str),
    Subsection { name: &'a str, rest: &'a str },
    Paragraph(&'a str),
}

/// Number of leading `#` characters when they form a markdown heading marker.
fn heading_level(line: &str) -> Option<usize> {
    let level = line.chars().take_while(|c| *c == '#').count();
    if level == 0 {
        return None;
    }
    line[level..]
        .starts_with(char::is_whitespace)
        .then_some(level)
}

fn has_section_keyword(text: &str) -> bool {
    let lower = text.to_lowercase();
    SECTION_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn is_filtered_section(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    FILTERED_SECTIONS.iter().any(|k| lower.contains(k))
}

fn classify(line: &str) -> LineKind<'_> {
    if let Some(level) = heading_level(line) {
        let text = line.trim_start_matches('#').trim();
        return match level {
            1 => LineKind::Title(text),
            2 => LineKind::Section(text),
            _ if has_section_keyword(text) => LineKind::Section(text),
            3 => LineKind::Subsection {
                name: text,
                rest: "",
            },
            _ => LineKind::Paragraph(line),
        };
    }

    if let Some(caps) = BOLD_HEADING_RE.captures(line)
        && let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1))
        && line[..whole.end()].chars().count() < MAX_BOLD_HEADING_LEN
    {
        return LineKind::Subsection {
            name: inner.as_str().trim(),
            rest: line[whole.end()..].trim(),
        };
    }

    LineKind::Paragraph(line)
}

/// Parser state threaded through the line fold.
#[derive(Debug, Clone)]
pub struct OutlineState {
    title: String,
    section: String,
    subsection: String,
    index: usize,
    sections: BTreeMap<usize, SectionPath>,
    raw: BTreeMap<usize, Vec<String>>,
}

impl Default for OutlineState {
    fn default() -> Self {
        Self {
            title: String::new(),
            section: String::new(),
            subsection: String::new(),
            index: 0,
            sections: BTreeMap::from([(0, SectionPath::default())]),
            raw: BTreeMap::new(),
        }
    }
}

impl OutlineState {
    #[must_use]
    pub fn step(self, line: &str) -> Self {
        match classify(line) {
            LineKind::Title(title) => Self {
                title: title.to_owned(),
                ..Self::default()
            },
            LineKind::Section(name) => self.open(name.to_owned(), String::new()),
            LineKind::Subsection { name, rest } => {
                let section = self.section.clone();
                let next = self.open(section, name.to_owned());
                if rest.is_empty() {
                    next
                } else {
                    next.push_line(rest)
                }
            }
            LineKind::Paragraph(text) => self.push_line(text),
        }
    }

    fn open(mut self, section: String, subsection: String) -> Self {
        self.index += 1;
        self.sections
            .insert(self.index, SectionPath::new(section.clone(), subsection.clone()));
        self.section = section;
        self.subsection = subsection;
        self
    }

    fn push_line(mut self, text: &str) -> Self {
        self.raw
            .entry(self.index)
            .or_default()
            .push(text.to_owned());
        self
    }

    #[must_use]
    pub fn finish(self) -> Outline {
        Outline {
            title: self.title,
            sections: self.sections,
            paragraphs: self.raw,
        }
    }
}

/// Final structured document: ordered section slots with their raw lines.
#[derive(Debug, Clone, Default)]
pub struct Outline {
    pub title: String,
    pub sections: BTreeMap<usize, SectionPath>,
    pub paragraphs: BTreeMap<usize, Vec<String>>,
}

/// One section slot after repair, truncation, and paragraph merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionBlock {
    pub index: usize,
    pub path: SectionPath,
    pub paragraphs: Vec<String>,
}

impl SectionBlock {
    /// Merged paragraphs joined line by line.
    #[must_use]
    pub fn text(&self) -> String {
        self.paragraphs.join("\n")
    }
}

impl Outline {
    /// Repair, truncate, and merge into chunkable section blocks, in index order.
    ///
    /// - When no main section name was ever recognized, subsection names are
    ///   promoted into the section slot.
    /// - Scanning stops at the first section named like an acknowledgement or
    ///   reference list.
    /// - Slots without any paragraph lines are skipped.
    #[must_use]
    pub fn into_sections(self) -> Vec<SectionBlock> {
        let sections = promote_subsections(self.sections);
        let mut paragraphs = self.paragraphs;
        let mut blocks = Vec::new();

        for (index, path) in sections {
            if is_filtered_section(&path.section) {
                tracing::debug!(section = %path.section, "truncating document at filtered section");
                break;
            }
            let Some(lines) = paragraphs.remove(&index) else {
                continue;
            };
            let merged = merge_paragraphs(&lines);
            if merged.is_empty() {
                continue;
            }
            blocks.push(SectionBlock {
                index,
                path,
                paragraphs: merged,
            });
        }

        blocks
    }
}

fn promote_subsections(sections: BTreeMap<usize, SectionPath>) -> BTreeMap<usize, SectionPath> {
    if sections.values().any(|p| !p.section.is_empty()) {
        return sections;
    }
    sections
        .into_iter()
        .map(|(i, p)| (i, SectionPath::new(p.subsection, String::new())))
        .collect()
}

/// Split into trimmed, non-empty lines, dropping consecutive duplicate
/// non-heading lines.
fn clean_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if !line.starts_with('#') && lines.last() == Some(&line) {
            continue;
        }
        lines.push(line);
    }
    lines
}

/// Parse raw document text into an [`Outline`].
#[must_use]
pub fn parse_outline(text: &str) -> Outline {
    clean_lines(text)
        .into_iter()
        .fold(OutlineState::default(), OutlineState::step)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_title_section_subsection() {
        assert_eq!(classify("# Coastal Erosion"), LineKind::Title("Coastal Erosion"));
        assert_eq!(classify("## Methods"), LineKind::Section("Methods"));
        assert_eq!(
            classify("### Field sites"),
            LineKind::Subsection {
                name: "Field sites",
                rest: ""
            }
        );
    }

    #[test]
    fn keyword_heading_is_section_at_any_depth() {
        assert_eq!(classify("### 1. Introduction"), LineKind::Section("1. Introduction"));
        assert_eq!(classify("#### References"), LineKind::Section("References"));
    }

    #[test]
    fn deep_heading_without_keyword_is_paragraph() {
        assert_eq!(classify("#### Notes"), LineKind::Paragraph("#### Notes"));
    }

    #[test]
    fn hash_without_space_is_not_heading() {
        assert_eq!(classify("#hashtag text"), LineKind::Paragraph("#hashtag text"));
    }

    #[test]
    fn bold_span_is_subsection_with_trailing_text() {
        assert_eq!(
            classify("**Sampling.** Cores were taken every 5 m."),
            LineKind::Subsection {
                name: "Sampling.",
                rest: "Cores were taken every 5 m."
            }
        );
    }

    #[test]
    fn bold_heading_stops_at_first_closing_marker() {
        assert_eq!(
            classify("**Sampling.** Cores from **site A** were logged."),
            LineKind::Subsection {
                name: "Sampling.",
                rest: "Cores from **site A** were logged."
            }
        );
    }

    #[test]
    fn long_bold_span_is_paragraph() {
        let line = format!("**{}** tail", "x".repeat(60));
        assert!(matches!(classify(&line), LineKind::Paragraph(_)));
    }

    #[test]
    fn bold_not_at_column_zero_is_paragraph() {
        assert!(matches!(classify("see **Table 2**"), LineKind::Paragraph(_)));
    }

    #[test]
    fn section_index_increases_on_every_heading() {
        let outline = parse_outline(
            "# Title\n## Introduction\nText one.\n### Background\nText two.\n## Methods\nText three.",
        );
        assert_eq!(outline.title, "Title");
        let paths: Vec<_> = outline.sections.iter().map(|(i, p)| (*i, p.clone())).collect();
        assert_eq!(
            paths,
            vec![
                (0, SectionPath::default()),
                (1, SectionPath::new("Introduction", "")),
                (2, SectionPath::new("Introduction", "Background")),
                (3, SectionPath::new("Methods", "")),
            ]
        );
        assert_eq!(outline.paragraphs[&1], vec!["Text one."]);
        assert_eq!(outline.paragraphs[&2], vec!["Text two."]);
        assert_eq!(outline.paragraphs[&3], vec!["Text three."]);
    }

    #[test]
    fn title_resets_tree() {
        let outline = parse_outline("## Old\nstale text\n# New Title\n## Results\nfresh");
        assert_eq!(outline.title, "New Title");
        assert_eq!(outline.sections.len(), 2);
        assert!(!outline.paragraphs.values().flatten().any(|l| l == "stale text"));
    }

    #[test]
    fn bold_subsection_trailing_text_becomes_paragraph() {
        let outline = parse_outline("## Methods\n**Drilling** Cores were drilled.");
        assert_eq!(outline.sections[&2], SectionPath::new("Methods", "Drilling"));
        assert_eq!(outline.paragraphs[&2], vec!["Cores were drilled."]);
    }

    #[test]
    fn consecutive_duplicate_lines_dropped() {
        let lines = clean_lines("a line\na line\n## H\n## H\nother\na line");
        assert_eq!(lines, vec!["a line", "## H", "## H", "other", "a line"]);
    }

    #[test]
    fn subsections_promoted_when_no_main_section() {
        let sections = parse_outline("### Alpha\nfirst.\n### Beta\nsecond.").into_sections();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].path, SectionPath::new("Alpha", ""));
        assert_eq!(sections[1].path, SectionPath::new("Beta", ""));
    }

    #[test]
    fn truncates_at_references() {
        let sections = parse_outline(
            "# T\n## Introduction\nBody text.\n## References\n[1] Smith 2001.\n## Appendix\nMore.",
        )
        .into_sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].path.section, "Introduction");
    }

    #[test]
    fn truncates_at_acknowledgment_spelling_variant() {
        let sections =
            parse_outline("## Results\nR.\n## Acknowledgments\nThanks.").into_sections();
        assert_eq!(sections.len(), 1);
    }

    #[test]
    fn untitled_text_lands_in_root_slot() {
        let sections = parse_outline("Just some text without headings.").into_sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].index, 0);
        assert_eq!(sections[0].path, SectionPath::default());
    }

    #[test]
    fn empty_sections_are_skipped() {
        let sections = parse_outline("## Abstract\n## Introduction\nSome text.").into_sections();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].path.section, "Introduction");
    }
}
