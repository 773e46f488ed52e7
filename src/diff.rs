use std::ops::Range;

use diffy::{DiffOptions, Line};

/// One changed line, with an optional byte range marking the smallest
/// differing sub-span against its counterpart on the other side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffSpan {
    pub text: String,
    pub emphasis: Option<Range<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Context(String),
    Delete(DiffSpan),
    Insert(DiffSpan),
}

#[derive(Debug, Clone)]
pub struct DiffHunk {
    pub old_start: usize,
    pub old_len: usize,
    pub new_start: usize,
    pub new_len: usize,
    pub lines: Vec<DiffLine>,
}

impl DiffHunk {
    pub fn header(&self) -> String {
        format!(
            "@@ -{},{} +{},{} @@",
            self.old_start, self.old_len, self.new_start, self.new_len
        )
    }
}

/// A zero-context, character-refined diff. The revised text is retained
/// verbatim so it can be exported independently of the rendered view.
#[derive(Debug, Clone)]
pub struct DiffReport {
    pub hunks: Vec<DiffHunk>,
    pub revised: String,
}

impl DiffReport {
    pub fn is_empty(&self) -> bool {
        self.hunks.is_empty()
    }

    /// (inserted, deleted) line counts across all hunks.
    pub fn counts(&self) -> (usize, usize) {
        let mut added = 0;
        let mut removed = 0;
        for hunk in &self.hunks {
            for line in &hunk.lines {
                match line {
                    DiffLine::Insert(_) => added += 1,
                    DiffLine::Delete(_) => removed += 1,
                    DiffLine::Context(_) => {}
                }
            }
        }
        (added, removed)
    }
}

/// Compute the unified diff between two text blobs with zero context lines,
/// then refine paired delete/insert lines to their smallest differing
/// character sub-spans.
pub fn report(original: &str, revised: &str) -> DiffReport {
    let patch = DiffOptions::new()
        .set_context_len(0)
        .create_patch(original, revised);

    let mut hunks = Vec::new();
    for hunk in patch.hunks() {
        let mut deletes: Vec<DiffSpan> = Vec::new();
        let mut inserts: Vec<DiffSpan> = Vec::new();
        let mut context: Vec<String> = Vec::new();

        for line in hunk.lines() {
            match line {
                Line::Delete(text) => deletes.push(DiffSpan {
                    text: strip_newline(text),
                    emphasis: None,
                }),
                Line::Insert(text) => inserts.push(DiffSpan {
                    text: strip_newline(text),
                    emphasis: None,
                }),
                Line::Context(text) => context.push(strip_newline(text)),
            }
        }

        // Pair the i-th deleted line with the i-th inserted line and mark
        // the differing sub-span on both sides; unpaired lines stay whole.
        for i in 0..deletes.len().min(inserts.len()) {
            let (old_span, new_span) = refine(&deletes[i].text, &inserts[i].text);
            deletes[i].emphasis = Some(old_span);
            inserts[i].emphasis = Some(new_span);
        }

        let mut lines: Vec<DiffLine> = Vec::new();
        lines.extend(context.into_iter().map(DiffLine::Context));
        lines.extend(deletes.into_iter().map(DiffLine::Delete));
        lines.extend(inserts.into_iter().map(DiffLine::Insert));

        hunks.push(DiffHunk {
            old_start: hunk.old_range().start(),
            old_len: hunk.old_range().len(),
            new_start: hunk.new_range().start(),
            new_len: hunk.new_range().len(),
            lines,
        });
    }

    DiffReport {
        hunks,
        revised: revised.to_string(),
    }
}

fn strip_newline(line: &str) -> String {
    line.trim_end_matches('\n').trim_end_matches('\r').to_string()
}

/// Byte ranges of the differing middles after trimming the common character
/// prefix and suffix of the two lines.
fn refine(old: &str, new: &str) -> (Range<usize>, Range<usize>) {
    let prefix = common_prefix_len(old, new);
    let suffix = common_suffix_len(&old[prefix..], &new[prefix..]);
    (
        prefix..old.len() - suffix,
        prefix..new.len() - suffix,
    )
}

fn common_prefix_len(a: &str, b: &str) -> usize {
    let mut len = 0;
    for (x, y) in a.chars().zip(b.chars()) {
        if x != y {
            break;
        }
        len += x.len_utf8();
    }
    len
}

fn common_suffix_len(a: &str, b: &str) -> usize {
    let mut len = 0;
    for (x, y) in a.chars().rev().zip(b.chars().rev()) {
        if x != y {
            break;
        }
        len += x.len_utf8();
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_yield_empty_report() {
        let report = report("a\nb\n", "a\nb\n");
        assert!(report.is_empty());
        assert_eq!(report.counts(), (0, 0));
    }

    #[test]
    fn single_changed_line_marks_sub_span() {
        let report = report("a\nb\n", "a\nc\n");
        assert_eq!(report.hunks.len(), 1);

        let lines = &report.hunks[0].lines;
        assert_eq!(lines.len(), 2);
        match (&lines[0], &lines[1]) {
            (DiffLine::Delete(old), DiffLine::Insert(new)) => {
                assert_eq!(old.text, "b");
                assert_eq!(new.text, "c");
                assert_eq!(old.emphasis, Some(0..1));
                assert_eq!(new.emphasis, Some(0..1));
            }
            other => panic!("unexpected line shape: {:?}", other),
        }
    }

    #[test]
    fn refinement_trims_common_prefix_and_suffix() {
        let report = report("the quick fox\n", "the slow fox\n");
        let lines = &report.hunks[0].lines;
        match (&lines[0], &lines[1]) {
            (DiffLine::Delete(old), DiffLine::Insert(new)) => {
                assert_eq!(&old.text[old.emphasis.clone().unwrap()], "quick");
                assert_eq!(&new.text[new.emphasis.clone().unwrap()], "slow");
            }
            other => panic!("unexpected line shape: {:?}", other),
        }
    }

    #[test]
    fn zero_context_shows_only_changed_lines() {
        let report = report("a\nb\nc\nd\n", "a\nB\nc\nD\n");
        for hunk in &report.hunks {
            for line in &hunk.lines {
                assert!(!matches!(line, DiffLine::Context(_)));
            }
        }
        assert_eq!(report.counts(), (2, 2));
    }

    #[test]
    fn revised_text_is_retained_verbatim() {
        let report = report("old\n", "new\n");
        assert_eq!(report.revised, "new\n");
    }

    #[test]
    fn pure_insertion_yields_unpaired_insert() {
        let report = report("a\n", "a\nb\n");
        let (added, removed) = report.counts();
        assert_eq!((added, removed), (1, 0));
        let lines = &report.hunks[0].lines;
        match &lines[0] {
            DiffLine::Insert(span) => {
                assert_eq!(span.text, "b");
                assert_eq!(span.emphasis, None);
            }
            other => panic!("unexpected line shape: {:?}", other),
        }
    }

    #[test]
    fn multibyte_refinement_stays_on_char_boundaries() {
        let report = report("héllo\n", "hàllo\n");
        let lines = &report.hunks[0].lines;
        match (&lines[0], &lines[1]) {
            (DiffLine::Delete(old), DiffLine::Insert(new)) => {
                assert_eq!(&old.text[old.emphasis.clone().unwrap()], "é");
                assert_eq!(&new.text[new.emphasis.clone().unwrap()], "à");
            }
            other => panic!("unexpected line shape: {:?}", other),
        }
    }
}
